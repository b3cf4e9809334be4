//! Turning extracted source into a callable handler inside a fresh isolate.

use std::fmt;
use std::sync::LazyLock;

use deno_core::{JsRuntime, RuntimeOptions};
use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::extract::ExtractedSource;

/// Name the generated entry point must be bound to
pub const HANDLER_NAME: &str = "handler";

/// Global slot the materialized handler is parked in between materialization and invocation
pub(crate) const HANDLER_SLOT: &str = "__hookshaperHandler";
const FACTORY_SLOT: &str = "__hookshaperFactory";

/// Host globals hidden from generated code
const SHADOWED_GLOBALS: &[&str] = &["Deno"];

static PRELUDE: &str = include_str!("prelude.js");

/// Timestamp utilities every handler may call
pub const HELPERS: &[(&str, &str)] = &[
    (
        "currentTimestampInSeconds",
        "function currentTimestampInSeconds() {\n    return Math.round(Date.now() / 1000);\n}",
    ),
    (
        "parseDateToTimestampInSeconds",
        "function parseDateToTimestampInSeconds(dateStr) {\n    const date = new Date(dateStr);\n    return Math.round(date.getTime() / 1000);\n}",
    ),
];

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("static regex"));

const RESERVED_WORDS: &[&str] = &[
    "arguments", "await", "break", "case", "catch", "class", "const", "continue", "debugger",
    "default", "delete", "do", "else", "enum", "eval", "export", "extends", "false", "finally",
    "for", "function", "if", "implements", "import", "in", "instanceof", "interface", "let", "new",
    "null", "package", "private", "protected", "public", "return", "static", "super", "switch",
    "this", "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MaterializeError {
    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("handler not found: the code does not define a function named '{HANDLER_NAME}'")]
    HandlerNotFound,

    #[error("Top-level code threw while loading: {0}")]
    Initialization(String),

    #[error("Invalid constant name '{0}'")]
    InvalidConstant(String),

    #[error("Internal runtime error: {0}")]
    Internal(String),
}

/// Generated handler bound to its own isolate and constants.
///
/// Consumed by a single [`crate::Engine::run`]; the isolate is dropped with it.
pub struct MaterializedHandler {
    pub(crate) runtime: JsRuntime,
    source: String,
    injected_helpers: Vec<&'static str>,
}

impl fmt::Debug for MaterializedHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaterializedHandler")
            .field("source_length", &self.source.len())
            .field("injected_helpers", &self.injected_helpers)
            .finish_non_exhaustive()
    }
}

impl MaterializedHandler {
    /// Source actually evaluated, including any injected helpers
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Helpers that were prepended because the generated code lacked them
    pub fn injected_helpers(&self) -> &[&'static str] {
        &self.injected_helpers
    }
}

/// Instantiate extracted source as a handler
///
/// Steps:
/// 1. Prepend any timestamp helper the code calls for but does not define
/// 2. Syntax check the result
/// 3. Evaluate it inside a function scope whose only extra bindings are the
///    `constants` (as `const`), with host globals shadowed
/// 4. Check a callable named `handler` exists
///
/// The handler is not invoked.
///
/// # Errors
/// * `MaterializeError::Syntax` - the code does not parse
/// * `MaterializeError::InvalidConstant` - a constant name is not an identifier
/// * `MaterializeError::Initialization` - top-level code threw
/// * `MaterializeError::HandlerNotFound` - no `handler` function is defined
#[tracing::instrument(skip_all, fields(stage = "materialization"))]
pub fn materialize(
    source: &ExtractedSource,
    constants: &IndexMap<String, Value>,
) -> Result<MaterializedHandler, MaterializeError> {
    let (code, injected_helpers) = with_helpers(source.code());
    if !injected_helpers.is_empty() {
        debug!(helpers = ?injected_helpers, "Injected missing helpers");
    }

    hookshaper_syntax::check_script(&code).map_err(|e| {
        warn!(error = %e, "Generated code failed to parse");
        MaterializeError::Syntax(e.to_string())
    })?;

    for name in constants.keys() {
        if !is_identifier(name) {
            return Err(MaterializeError::InvalidConstant(name.clone()));
        }
    }

    let mut runtime = JsRuntime::new(RuntimeOptions::default());
    runtime
        .execute_script("<prelude>", PRELUDE)
        .map_err(|e| MaterializeError::Internal(e.to_string()))?;

    // Compiling the factory surfaces early errors V8 reports but the parser
    // does not, such as redeclaring an injected constant.
    let factory_script = format!(
        "globalThis.{FACTORY_SLOT} = new Function({params}, {body});",
        params = factory_params()?,
        body = js_string(&factory_body(&code, constants))?,
    );
    runtime
        .execute_script("<compile>", factory_script)
        .map_err(|e| {
            warn!(error = %e, "Generated code failed to compile");
            MaterializeError::Syntax(e.to_string())
        })?;

    let bind_script = format!(
        r#"(() => {{
    const factory = globalThis.{FACTORY_SLOT};
    delete globalThis.{FACTORY_SLOT};
    const handler = factory({shadowed}, JSON.parse({constants}));
    if (typeof handler !== "function") {{
        return false;
    }}
    Object.defineProperty(globalThis, "{HANDLER_SLOT}", {{ value: handler, enumerable: false }});
    return true;
}})()"#,
        shadowed = vec!["undefined"; SHADOWED_GLOBALS.len()].join(", "),
        constants = js_string(&serde_json::to_string(constants).map_err(internal)?)?,
    );
    let bound = runtime.execute_script("<bind>", bind_script).map_err(|e| {
        warn!(error = %e, "Generated code threw while loading");
        MaterializeError::Initialization(e.to_string())
    })?;

    if !crate::engine::to_json(&mut runtime, bound)
        .map_err(MaterializeError::Internal)?
        .as_bool()
        .unwrap_or(false)
    {
        warn!("Generated code does not define a handler");
        return Err(MaterializeError::HandlerNotFound);
    }

    debug!(
        source_length = code.len(),
        constant_count = constants.len(),
        "Handler materialized"
    );
    Ok(MaterializedHandler {
        runtime,
        source: code,
        injected_helpers,
    })
}

/// Prepends canonical helpers the code needs but does not define.
/// Code that does not define a handler is returned untouched.
pub fn with_helpers(code: &str) -> (String, Vec<&'static str>) {
    if !defines(code, HANDLER_NAME) {
        return (code.to_string(), Vec::new());
    }

    let missing: Vec<(&'static str, &'static str)> = HELPERS
        .iter()
        .copied()
        .filter(|(name, _)| !defines(code, name))
        .collect();

    if missing.is_empty() {
        return (code.to_string(), Vec::new());
    }

    let mut prepared = missing
        .iter()
        .map(|(_, helper)| *helper)
        .collect::<Vec<_>>()
        .join("\n\n");
    prepared.push_str("\n\n");
    prepared.push_str(code);

    (prepared, missing.into_iter().map(|(name, _)| name).collect())
}

/// Whether `code` declares `name` as a function or variable binding
fn defines(code: &str, name: &str) -> bool {
    let name = regex::escape(name);
    Regex::new(&format!(
        r"\bfunction\s*\*?\s*{name}\s*\(|\b(?:const|let|var)\s+{name}\s*="
    ))
    .is_ok_and(|re| re.is_match(code))
}

fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name) && !RESERVED_WORDS.contains(&name)
}

fn factory_params() -> Result<String, MaterializeError> {
    SHADOWED_GLOBALS
        .iter()
        .copied()
        .chain(["__constants"])
        .map(js_string)
        .collect::<Result<Vec<_>, _>>()
        .map(|params| params.join(", "))
}

fn factory_body(code: &str, constants: &IndexMap<String, Value>) -> String {
    let names = constants
        .keys()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "const {{ {names} }} = __constants;\n{code}\n;return typeof {HANDLER_NAME} === \"function\" ? {HANDLER_NAME} : undefined;"
    )
}

/// JSON string literals are valid JavaScript string literals
pub(crate) fn js_string(text: &str) -> Result<String, MaterializeError> {
    serde_json::to_string(text).map_err(internal)
}

fn internal(e: serde_json::Error) -> MaterializeError {
    MaterializeError::Internal(e.to_string())
}
