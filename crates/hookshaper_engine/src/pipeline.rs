//! Extraction, materialization, execution and validation as one fail-closed run.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::diagnostics::{Diagnostic, Report, report};
use crate::engine::{ConsoleOutput, Engine, EngineError};
use crate::extract::{ExtractError, ExtractedSource, extract};
use crate::input::{NormalizedInput, ParseError};
use crate::materialize::{MaterializeError, materialize};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Input(#[from] ParseError),

    #[error(transparent)]
    Extraction(#[from] ExtractError),

    #[error(transparent)]
    Materialization(#[from] MaterializeError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Model request failed: {0}")]
    Model(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

impl PipelineError {
    /// Stage diagnostic for failures raised by the pipeline itself
    pub fn diagnostic(&self) -> Option<Diagnostic> {
        match self {
            PipelineError::Extraction(e) => Some(e.into()),
            PipelineError::Materialization(e) => Some(e.into()),
            PipelineError::Engine(e) => Some(e.into()),
            PipelineError::Input(_) | PipelineError::Model(_) | PipelineError::Delivery(_) => {
                None
            }
        }
    }

    pub fn report(&self) -> Report {
        report(self)
    }
}

/// Successful run: the handler source that ran and the events it produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Preview {
    pub source: ExtractedSource,
    /// Source as evaluated, with any injected helpers
    pub evaluated_source: String,
    pub injected_helpers: Vec<&'static str>,
    pub events: Vec<Value>,
    pub console: ConsoleOutput,
}

/// Runs generated handlers against sample input with a fixed set of constants
#[derive(Debug, Default)]
pub struct Pipeline {
    engine: Engine,
    constants: IndexMap<String, Value>,
}

impl Pipeline {
    pub fn new(constants: IndexMap<String, Value>) -> Self {
        Self {
            engine: Engine::new(),
            constants,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn constants(&self) -> &IndexMap<String, Value> {
        &self.constants
    }

    /// Extract a handler from a model response, then run it
    ///
    /// # Errors
    /// The first failing stage, no partial output accompanies it
    pub fn run_response(
        &mut self,
        response: &str,
        input: &NormalizedInput,
    ) -> Result<Preview, PipelineError> {
        let source = extract(response)?;
        self.run_source(source, input)
    }

    /// Materialize and run already extracted source
    ///
    /// # Errors
    /// The first failing stage, no partial output accompanies it
    pub fn run_source(
        &mut self,
        source: ExtractedSource,
        input: &NormalizedInput,
    ) -> Result<Preview, PipelineError> {
        debug!(
            provenance = ?source.provenance(),
            code_length = source.code().len(),
            "Running handler pipeline"
        );

        let handler = materialize(&source, &self.constants)?;
        let evaluated_source = handler.source().to_string();
        let injected_helpers = handler.injected_helpers().to_vec();

        let output = self.engine.run(handler, input)?;
        info!(event_count = output.events.len(), "Preview generated");

        Ok(Preview {
            source,
            evaluated_source,
            injected_helpers,
            events: output.events,
            console: output.console,
        })
    }
}
