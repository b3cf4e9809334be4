//! Invoking a materialized handler and enforcing the event contract.

use deno_core::{JsRuntime, v8};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::input::NormalizedInput;
use crate::materialize::{HANDLER_SLOT, MaterializedHandler, js_string};

/// Fields every event record must carry
pub const REQUIRED_EVENT_FIELDS: &[&str] = &["name", "data"];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("Handler threw: {0}")]
    Execution(String),

    #[error("Invalid handler output: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Idle,
    Invoking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Succeeded,
    FailedExecution,
    FailedValidation,
}

/// Console output captured while the handler ran
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleOutput {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

impl ConsoleOutput {
    pub fn is_empty(&self) -> bool {
        self.stdout.is_empty() && self.stderr.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunOutput {
    /// Handler result, exactly as returned
    pub events: Vec<Value>,
    pub console: ConsoleOutput,
}

/// Runs handlers one at a time: `Idle -> Invoking -> Idle`, recording how
/// the last run ended. A failed run is never retried.
#[derive(Debug)]
pub struct Engine {
    state: EngineState,
    last_outcome: Option<Outcome>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self {
            state: EngineState::Idle,
            last_outcome: None,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn last_outcome(&self) -> Option<Outcome> {
        self.last_outcome
    }

    /// Invoke `handler` once with `input` and validate the result
    ///
    /// # Errors
    /// * `EngineError::Execution` - the handler threw
    /// * `EngineError::Validation` - the result is not an array of events
    ///   carrying `name` and `data`; reports the first offending element
    #[tracing::instrument(skip_all, fields(stage = "execution", input_kind = %input.kind()))]
    pub fn run(
        &mut self,
        handler: MaterializedHandler,
        input: &NormalizedInput,
    ) -> Result<RunOutput, EngineError> {
        self.state = EngineState::Invoking;
        let result = invoke(handler, input);
        self.state = EngineState::Idle;

        self.last_outcome = Some(match &result {
            Ok(_) => Outcome::Succeeded,
            Err(EngineError::Execution(_)) => Outcome::FailedExecution,
            Err(EngineError::Validation(_)) => Outcome::FailedValidation,
        });

        result
    }
}

fn invoke(
    mut handler: MaterializedHandler,
    input: &NormalizedInput,
) -> Result<RunOutput, EngineError> {
    let payload = serde_json::to_string(input)
        .map_err(|e| EngineError::Execution(format!("Failed to serialize input: {e}")))?;
    let payload = js_string(&payload).map_err(|e| EngineError::Execution(e.to_string()))?;

    // Serialized in JS so dates, `toJSON` and undefined fields follow JSON.stringify
    let script = format!(
        r#"(() => {{
    const result = globalThis.{HANDLER_SLOT}(JSON.parse({payload}));
    try {{
        return {{ json: JSON.stringify(result) ?? null }};
    }} catch (e) {{
        return {{ unserializable: String(e) }};
    }}
}})()"#
    );
    let runtime = &mut handler.runtime;

    let returned = runtime.execute_script("<invoke>", script).map_err(|e| {
        warn!(error = %e, "Handler threw");
        EngineError::Execution(e.to_string())
    })?;

    let returned = to_json(runtime, returned).map_err(EngineError::Execution)?;
    let output = serialized_output(&returned)?;

    let events = validate(output)?;
    let console = capture_console(runtime);
    debug!(event_count = events.len(), "Handler output validated");

    Ok(RunOutput { events, console })
}

/// Reads the `{ json }` / `{ unserializable }` envelope built by the invoke script
fn serialized_output(envelope: &Value) -> Result<Value, EngineError> {
    if let Some(reason) = envelope.get("unserializable") {
        warn!(%reason, "Handler output is not JSON");
        return Err(EngineError::Validation(format!(
            "handler output is not JSON-serializable: {}",
            reason.as_str().unwrap_or_default()
        )));
    }

    match envelope.get("json") {
        Some(Value::String(json)) => serde_json::from_str(json).map_err(|e| {
            EngineError::Validation(format!("handler output is not JSON-serializable: {e}"))
        }),
        _ => Ok(Value::Null),
    }
}

/// Checks the output contract, returning the events untouched
///
/// # Errors
/// `EngineError::Validation` naming the first violation
pub fn validate(output: Value) -> Result<Vec<Value>, EngineError> {
    let Value::Array(events) = output else {
        warn!(returned = json_kind(&output), "Handler did not return an array");
        return Err(EngineError::Validation(format!(
            "handler must return an array of events, got {}",
            json_kind(&output)
        )));
    };

    for (i, event) in events.iter().enumerate() {
        for field in REQUIRED_EVENT_FIELDS {
            if event.get(field).is_none_or(is_falsy) {
                warn!(index = i, field, "Event missing required field");
                return Err(EngineError::Validation(format!(
                    "element {i} missing required field '{field}'"
                )));
            }
        }
    }

    Ok(events)
}

/// JavaScript truthiness: `null`, `false`, `0`, `""` do not count as present
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n == 0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null or undefined",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn capture_console(runtime: &mut JsRuntime) -> ConsoleOutput {
    let capture_script = r"
        ({
            stdout: globalThis.__hookshaperConsole?.stdout ?? [],
            stderr: globalThis.__hookshaperConsole?.stderr ?? []
        })
    ";

    runtime
        .execute_script("<capture_output>", capture_script)
        .ok()
        .and_then(|global| to_json(runtime, global).ok())
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default()
}

/// Convert a script result into JSON
pub(crate) fn to_json(
    runtime: &mut JsRuntime,
    value: v8::Global<v8::Value>,
) -> Result<Value, String> {
    deno_core::scope!(scope, &mut *runtime);
    let local = v8::Local::new(scope, value);
    deno_core::serde_v8::from_v8::<Value>(scope, local).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_accepts_events() {
        let output = json!([{"name": "customers", "data": {}}]);
        assert_eq!(validate(output.clone()).unwrap(), output.as_array().unwrap().clone());
    }

    #[test]
    fn test_validate_rejects_object() {
        let err = validate(json!({"not": "an array"})).unwrap_err();
        assert!(matches!(err, EngineError::Validation(ref m) if m.contains("must return an array")));
    }

    #[test]
    fn test_validate_rejects_null() {
        assert!(matches!(validate(Value::Null), Err(EngineError::Validation(_))));
    }

    #[test]
    fn test_validate_reports_first_violation() {
        let output = json!([
            {"name": "customers", "data": {}},
            {"name": "customers/events"},
            {"data": {}},
        ]);
        assert_eq!(
            validate(output),
            Err(EngineError::Validation(
                "element 1 missing required field 'data'".into()
            ))
        );
    }

    #[test]
    fn test_validate_non_object_element() {
        assert_eq!(
            validate(json!(["customers"])),
            Err(EngineError::Validation(
                "element 0 missing required field 'name'".into()
            ))
        );
    }

    #[test]
    fn test_validate_rejects_falsy_fields() {
        assert_eq!(
            validate(json!([{"name": "", "data": {}}])),
            Err(EngineError::Validation(
                "element 0 missing required field 'name'".into()
            ))
        );
        for data in [json!(0), json!(false), json!("")] {
            assert_eq!(
                validate(json!([{"name": "customers", "data": data}])),
                Err(EngineError::Validation(
                    "element 0 missing required field 'data'".into()
                ))
            );
        }
        assert!(validate(json!([{"name": "customers", "data": []}])).is_ok());
    }

    #[test]
    fn test_unserializable_envelope() {
        let err = serialized_output(&json!({"unserializable": "TypeError: cyclic object value"}))
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(ref m) if m.contains("cyclic")));
        assert_eq!(serialized_output(&json!({"json": null})), Ok(Value::Null));
        assert_eq!(serialized_output(&json!({"json": "[1]"})), Ok(json!([1])));
    }

    #[test]
    fn test_empty_array_is_valid() {
        assert!(validate(json!([])).unwrap().is_empty());
    }
}
