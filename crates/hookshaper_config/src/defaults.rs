// Various default functions to be used by serde

use indexmap::IndexMap;
use serde_json::json;

pub(crate) fn default_true() -> bool {
    true
}

pub(crate) fn default_model_base_url() -> url::Url {
    url::Url::parse("https://api.openai.com/v1/").expect("static url is valid")
}

pub(crate) fn default_model_name() -> String {
    "gpt-4.1-2025-04-14".into()
}

pub(crate) fn default_temperature() -> f32 {
    0.3
}

pub(crate) fn default_model_timeout_ms() -> u64 {
    60_000
}

pub(crate) fn default_delivery_timeout_ms() -> u64 {
    10_000
}

pub(crate) fn default_user_agent() -> String {
    "Bloomreach-Test-Client/1.0".into()
}

pub(crate) fn default_constants() -> IndexMap<String, serde_json::Value> {
    IndexMap::from([
        ("INTEGRATION_ID".to_string(), json!("test-integration")),
        ("COMPANY_ID".to_string(), json!("test-company")),
        ("INTEGRATION_NAME".to_string(), json!("Test Integration")),
    ])
}
