//! Forwarding sample payloads to a webhook endpoint.

use std::time::Duration;

use chrono::{DateTime, Utc};
use hookshaper_config::delivery::DeliveryConfig;
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Failed building HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Outcome of a single send. Failures are data, not errors, so a batch
/// always yields one report per item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    /// Row index for batch sends, `None` for single payloads
    pub index: Option<usize>,
    pub success: bool,
    /// HTTP status, absent when no response arrived
    pub status: Option<u16>,
    pub status_text: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Deliverer {
    http: reqwest::Client,
}

impl Deliverer {
    /// # Errors
    /// Fails if the HTTP client cannot be built
    pub fn new(config: &DeliveryConfig) -> Result<Self, DeliveryError> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self { http })
    }

    /// POST one JSON payload
    pub async fn deliver(
        &self,
        payload: &Value,
        endpoint: &url::Url,
        index: Option<usize>,
    ) -> DeliveryReport {
        let result = self.http.post(endpoint.clone()).json(payload).send().await;
        let timestamp = Utc::now();

        match result {
            Ok(response) => {
                let status = response.status();
                let success = status.is_success();
                let status_text = format!(
                    "{} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("")
                )
                .trim()
                .to_string();

                if success {
                    debug!(index, status = status.as_u16(), "Payload delivered");
                } else {
                    warn!(index, status = status.as_u16(), "Endpoint rejected payload");
                }

                DeliveryReport {
                    index,
                    success,
                    status: Some(status.as_u16()),
                    status_text,
                    timestamp,
                }
            }
            Err(e) => {
                warn!(index, error = %e, "Delivery failed");
                DeliveryReport {
                    index,
                    success: false,
                    status: None,
                    status_text: format!("Network error: {e}"),
                    timestamp,
                }
            }
        }
    }

    /// Send `items` one at a time in order. A failed item does not stop the batch.
    pub async fn deliver_all(&self, items: &[Value], endpoint: &url::Url) -> Vec<DeliveryReport> {
        let mut reports = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            reports.push(self.deliver(item, endpoint, Some(i)).await);
        }

        let delivered = reports.iter().filter(|r| r.success).count();
        info!(
            delivered,
            failed = reports.len() - delivered,
            "Batch delivery finished"
        );
        reports
    }

    /// Send a `{ "test": true, "timestamp": .. }` probe
    pub async fn test_connection(&self, endpoint: &url::Url) -> DeliveryReport {
        let probe = json!({ "test": true, "timestamp": Utc::now().to_rfc3339() });
        self.deliver(&probe, endpoint, None).await
    }
}
