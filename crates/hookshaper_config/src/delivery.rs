use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Webhook endpoint payloads are forwarded to. Commands may override it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<url::Url>,

    #[serde(default = "crate::defaults::default_user_agent")]
    pub user_agent: String,

    #[serde(default = "crate::defaults::default_delivery_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            user_agent: crate::defaults::default_user_agent(),
            timeout_ms: crate::defaults::default_delivery_timeout_ms(),
        }
    }
}
