//! Outbound collaborators: the language model that writes handlers and the
//! webhook endpoint sample payloads are forwarded to.

pub mod delivery;
pub mod model;
pub mod prompt;

pub use delivery::{Deliverer, DeliveryError, DeliveryReport};
pub use model::{ModelClient, ModelError, OpenAiClient, parse_completion};
pub use prompt::{SampleContext, context_message, system_prompt};
