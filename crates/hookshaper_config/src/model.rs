use serde::{Deserialize, Serialize};

/// Settings for the OpenAI-compatible chat completions endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Base URL of the API, `chat/completions` is joined onto it
    #[serde(default = "crate::defaults::default_model_base_url")]
    pub base_url: url::Url,

    #[serde(default = "crate::defaults::default_model_name")]
    pub model: String,

    #[serde(default = "crate::defaults::default_temperature")]
    pub temperature: f32,

    #[serde(default = "crate::defaults::default_model_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: crate::defaults::default_model_base_url(),
            model: crate::defaults::default_model_name(),
            temperature: crate::defaults::default_temperature(),
            timeout_ms: crate::defaults::default_model_timeout_ms(),
        }
    }
}
