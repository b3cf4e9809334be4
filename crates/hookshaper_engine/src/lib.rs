//! # Hookshaper engine
//!
//! Runs model-generated webhook handlers against sample payloads.
//!
//! ## Overview
//!
//! A run goes through four stages, each of which fails closed:
//! - **Extraction**: find handler source in a free-form model response
//!   ([`extract`]), fenced code block first, column-0 functions second
//! - **Materialization**: inject missing timestamp helpers, syntax check, and
//!   evaluate the code in a fresh V8 isolate with the configured constants
//!   bound as read-only names ([`materialize`])
//! - **Execution**: call `handler(payload)` exactly once ([`Engine::run`])
//! - **Validation**: the result must be an array of objects carrying `name`
//!   and `data`
//!
//! Failures map onto a closed set of [`Category`] values through [`report`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hookshaper_engine::{InputKind, Pipeline, normalize};
//! use indexmap::IndexMap;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let input = normalize(r#"{"email": "a@x.com"}"#, InputKind::Json)?;
//! let mut pipeline = Pipeline::new(IndexMap::new());
//!
//! // Responses usually wrap the code in a fenced block; a bare column-0
//! // function is picked up too.
//! let response = r#"Here is your handler:
//! function handler(payload) {
//!     return [{ name: "customers", data: { customer_ids: { registered: payload.email } } }];
//! }
//! "#;
//!
//! let preview = pipeline.run_response(response, &input)?;
//! assert_eq!(preview.events.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Isolation
//!
//! Each materialization builds its own isolate with no Deno extensions, so
//! generated code has no filesystem, network or process access. The prelude
//! deletes the `Deno` global once the runtime is built, so `Deno.core.print`
//! and the raw ops are out of reach, and console output is captured into
//! [`ConsoleOutput`]. This contains mistakes, not attackers.

mod diagnostics;
mod engine;
mod extract;
mod input;
mod materialize;
mod pipeline;
mod session;


pub use diagnostics::{Category, Diagnostic, Report, Stage, report};
pub use engine::{
    ConsoleOutput, Engine, EngineError, EngineState, Outcome, REQUIRED_EVENT_FIELDS, RunOutput,
    validate,
};
pub use extract::{
    ExtractError, ExtractedSource, Provenance, extract, fenced_block, top_level_functions,
};
pub use input::{InputKind, NormalizedInput, ParseError, csv_headers, normalize};
pub use materialize::{
    HANDLER_NAME, HELPERS, MaterializeError, MaterializedHandler, materialize, with_helpers,
};
pub use pipeline::{Pipeline, PipelineError, Preview};
pub use session::{Applied, Message, Role, Session, SessionEvent, SubmissionId};
