//! Chat completions client used to generate handlers.

use std::future::Future;
use std::time::Duration;

use hookshaper_config::model::ModelConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("No API key configured, run `hookshaper auth` first")]
    MissingApiKey,

    #[error("Invalid model endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Model returned no content")]
    EmptyResponse,
}

/// One round trip: system prompt plus a single user message in, raw text out
pub trait ModelClient {
    fn send(
        &self,
        system_prompt: &str,
        context_message: &str,
    ) -> impl Future<Output = Result<String, ModelError>> + Send;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Client for OpenAI-compatible `chat/completions` endpoints
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    endpoint: url::Url,
    api_key: String,
    model: String,
    temperature: f32,
}

impl OpenAiClient {
    /// Build a client from configuration and a resolved API key
    ///
    /// # Errors
    /// Fails if the key is empty, the endpoint cannot be formed, or the HTTP
    /// client cannot be built
    pub fn new(config: &ModelConfig, api_key: impl Into<String>) -> Result<Self, ModelError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ModelError::MissingApiKey);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            http,
            endpoint: config.base_url.join("chat/completions")?,
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    pub fn endpoint(&self) -> &url::Url {
        &self.endpoint
    }
}

impl ModelClient for OpenAiClient {
    #[tracing::instrument(skip_all, fields(model = %self.model))]
    async fn send(&self, system_prompt: &str, context_message: &str) -> Result<String, ModelError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: context_message,
                },
            ],
            temperature: self.temperature,
        };

        debug!(
            endpoint = %self.endpoint,
            context_length = context_message.len(),
            "Sending model request"
        );

        let response = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        let text = parse_completion(status, &body)?;

        debug!(response_length = text.len(), "Model responded");
        Ok(text)
    }
}

/// Extract the assistant text from a chat completions response body
///
/// # Errors
/// * `ModelError::Api` - the body reports an error, or the status is not 2xx
/// * `ModelError::EmptyResponse` - no choice carries content
pub fn parse_completion(status: u16, body: &str) -> Result<String, ModelError> {
    let parsed: Option<ChatResponse> = serde_json::from_str(body).ok();

    if let Some(error) = parsed.as_ref().and_then(|r| r.error.as_ref()) {
        warn!(status, message = %error.message, "Model API reported an error");
        return Err(ModelError::Api {
            status,
            message: error.message.clone(),
        });
    }

    if !(200..300).contains(&status) {
        warn!(status, "Model API returned a non-success status");
        return Err(ModelError::Api {
            status,
            message: body.chars().take(200).collect::<String>().trim().to_string(),
        });
    }

    parsed
        .and_then(|r| r.choices.into_iter().next())
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(ModelError::EmptyResponse)
}
