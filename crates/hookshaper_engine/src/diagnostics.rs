//! Closed taxonomy of pipeline failures and their user-facing reports.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::EngineError;
use crate::extract::ExtractError;
use crate::materialize::MaterializeError;
use crate::pipeline::PipelineError;

/// Pipeline stage a [`Diagnostic`] originated in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extraction,
    Materialization,
    Execution,
    Validation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub stage: Stage,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.stage, self.message)
    }
}

impl From<&ExtractError> for Diagnostic {
    fn from(error: &ExtractError) -> Self {
        Self {
            stage: Stage::Extraction,
            message: error.to_string(),
        }
    }
}

impl From<&MaterializeError> for Diagnostic {
    fn from(error: &MaterializeError) -> Self {
        Self {
            stage: Stage::Materialization,
            message: error.to_string(),
        }
    }
}

impl From<&EngineError> for Diagnostic {
    fn from(error: &EngineError) -> Self {
        match error {
            EngineError::Execution(message) => Self {
                stage: Stage::Execution,
                message: message.clone(),
            },
            EngineError::Validation(message) => Self {
                stage: Stage::Validation,
                message: message.clone(),
            },
        }
    }
}

/// Category a front end keys its presentation on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    InputParse,
    CodeExtraction,
    CodeMaterialization,
    ExecutionFailure,
    SchemaValidation,
    ModelRequestFailure,
    DeliveryFailure,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::InputParse => "input_parse",
            Category::CodeExtraction => "code_extraction",
            Category::CodeMaterialization => "code_materialization",
            Category::ExecutionFailure => "execution_failure",
            Category::SchemaValidation => "schema_validation",
            Category::ModelRequestFailure => "model_request_failure",
            Category::DeliveryFailure => "delivery_failure",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub display_message: String,
    pub category: Category,
}

/// Map a pipeline failure to its display payload
pub fn report(error: &PipelineError) -> Report {
    let (category, display_message) = match error {
        PipelineError::Input(e) => (
            Category::InputParse,
            format!("{e}. Fix the sample payload and try again."),
        ),
        PipelineError::Extraction(_) => (
            Category::CodeExtraction,
            "No handler function found in the response. Try again or refine your request."
                .to_string(),
        ),
        PipelineError::Materialization(MaterializeError::HandlerNotFound) => (
            Category::CodeMaterialization,
            "The generated code does not define a function named 'handler'. Ask for the entry point to be named 'handler'."
                .to_string(),
        ),
        PipelineError::Materialization(e) => (
            Category::CodeMaterialization,
            format!("The generated code could not be loaded. {e}"),
        ),
        PipelineError::Engine(EngineError::Execution(message)) => (
            Category::ExecutionFailure,
            format!("The handler threw while processing the sample payload: {message}"),
        ),
        PipelineError::Engine(EngineError::Validation(message)) => (
            Category::SchemaValidation,
            format!("The handler output does not match the event schema: {message}"),
        ),
        PipelineError::Model(message) => (
            Category::ModelRequestFailure,
            format!("Model request failed: {message}"),
        ),
        PipelineError::Delivery(message) => (
            Category::DeliveryFailure,
            format!("Delivery failed: {message}"),
        ),
    };

    Report {
        display_message,
        category,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{InputKind, normalize};

    #[test]
    fn test_categories_are_distinct_per_stage() {
        let cases = vec![
            (
                PipelineError::Input(normalize("{", InputKind::Json).unwrap_err()),
                Category::InputParse,
            ),
            (
                PipelineError::Extraction(ExtractError::NotFound),
                Category::CodeExtraction,
            ),
            (
                PipelineError::Materialization(MaterializeError::Syntax("x".into())),
                Category::CodeMaterialization,
            ),
            (
                PipelineError::Materialization(MaterializeError::HandlerNotFound),
                Category::CodeMaterialization,
            ),
            (
                PipelineError::Engine(EngineError::Execution("boom".into())),
                Category::ExecutionFailure,
            ),
            (
                PipelineError::Engine(EngineError::Validation("bad".into())),
                Category::SchemaValidation,
            ),
            (PipelineError::Model("401".into()), Category::ModelRequestFailure),
            (PipelineError::Delivery("refused".into()), Category::DeliveryFailure),
        ];

        for (error, category) in cases {
            assert_eq!(report(&error).category, category, "{error}");
        }
    }

    #[test]
    fn test_report_carries_underlying_message() {
        let r = report(&PipelineError::Engine(EngineError::Validation(
            "element 2 missing required field 'data'".into(),
        )));
        assert!(r.display_message.contains("element 2"));
    }

    #[test]
    fn test_handler_not_found_is_distinguishable() {
        let missing = report(&PipelineError::Materialization(
            MaterializeError::HandlerNotFound,
        ));
        let syntax = report(&PipelineError::Materialization(MaterializeError::Syntax(
            "Unexpected token".into(),
        )));
        assert_eq!(missing.category, syntax.category);
        assert_ne!(missing.display_message, syntax.display_message);
        assert!(syntax.display_message.contains("Unexpected token"));
    }

    #[test]
    fn test_diagnostic_stage_from_engine_error() {
        let d = Diagnostic::from(&EngineError::Execution("boom".into()));
        assert_eq!(d.stage, Stage::Execution);
        let d = Diagnostic::from(&EngineError::Validation("bad".into()));
        assert_eq!(d.stage, Stage::Validation);
        let d = Diagnostic::from(&ExtractError::NotFound);
        assert_eq!(d.stage, Stage::Extraction);
    }
}
