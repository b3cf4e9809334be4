pub mod auth;
pub mod chat;
pub mod generate;
pub mod init;
pub mod preview;
pub mod send;
pub mod test_connection;

use std::fs;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use hookshaper_client::{
    ModelClient, OpenAiClient, SampleContext, context_message, system_prompt,
};
use hookshaper_config::{Config, credentials};
use hookshaper_engine::{InputKind, NormalizedInput, PipelineError, csv_headers, normalize};

use crate::utils::{output::pipeline_failure, spinner::Spinner};

pub(crate) const USER_CANCELLED: &str = "User cancelled";

/// A sample payload as read from disk, kept alongside its parsed form
#[derive(Debug, Clone)]
pub(crate) struct Sample {
    pub(crate) path: Utf8PathBuf,
    pub(crate) raw: String,
    pub(crate) input: NormalizedInput,
}

impl Sample {
    /// Reads and normalizes a sample, CSV for `.csv` files and JSON otherwise
    pub(crate) fn load(path: &Utf8Path) -> Result<Self> {
        let raw = fs::read_to_string(path).context(format!("Failed reading sample: {path}"))?;
        let input = normalize(&raw, InputKind::detect(path.as_std_path()))
            .map_err(|e| pipeline_failure(&PipelineError::from(e), false))
            .context(format!("Invalid sample: {path}"))?;

        Ok(Self {
            path: path.to_path_buf(),
            raw,
            input,
        })
    }

    /// What the model gets told about this sample
    pub(crate) fn context(&self) -> Result<SampleContext> {
        Ok(match self.input.kind() {
            InputKind::Json => SampleContext::Json(self.raw.trim().to_string()),
            InputKind::Csv => SampleContext::Csv(csv_headers(&self.raw)?),
        })
    }
}

/// Model client from config and the stored API key
pub(crate) fn model_client(cfg: &Config) -> Result<OpenAiClient> {
    let key = credentials::load_api_key()?.context(format!(
        "No API key configured, run `hookshaper auth` or set {}",
        credentials::API_KEY_ENV
    ))?;
    Ok(OpenAiClient::new(&cfg.model, key)?)
}

/// One model round trip for `instruction` about `sample`, behind a spinner
pub(crate) async fn request_handler<C: ModelClient>(
    client: &C,
    cfg: &Config,
    sample: &Sample,
    instruction: &str,
) -> Result<String, PipelineError> {
    let system = system_prompt(cfg.constants.keys().map(String::as_str));
    let context = sample
        .context()
        .map_err(|e| PipelineError::Model(format!("{e:#}")))?;
    let message = context_message(&context, instruction);

    let mut sp = Spinner::new("Waiting for the model...");
    match client.send(&system, &message).await {
        Ok(response) => {
            sp.stop_success("Model responded");
            Ok(response)
        }
        Err(e) => {
            sp.stop_error("Model request failed");
            Err(PipelineError::Model(e.to_string()))
        }
    }
}

/// `--endpoint` when given, the configured endpoint otherwise
pub(crate) fn resolve_endpoint(cfg: &Config, endpoint: Option<&url::Url>) -> Result<url::Url> {
    endpoint
        .or(cfg.delivery.endpoint.as_ref())
        .cloned()
        .context(format!(
            "No endpoint given, pass --endpoint or set delivery.endpoint in {}",
            cfg.path()
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write_sample(dir: &tempfile::TempDir, name: &str, contents: &str) -> Utf8PathBuf {
        let path = Utf8PathBuf::from_path_buf(dir.path().join(name)).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_json_sample_context_is_raw_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sample(&dir, "payload.json", "{\n  \"email\": \"a@x.com\"\n}\n");

        let sample = Sample::load(&path).unwrap();
        assert_eq!(sample.input.kind(), InputKind::Json);
        assert_eq!(
            sample.context().unwrap(),
            SampleContext::Json("{\n  \"email\": \"a@x.com\"\n}".into())
        );
    }

    #[test]
    fn test_csv_sample_context_lists_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sample(&dir, "rows.csv", "email,plan\na@x.com,pro\n");

        let sample = Sample::load(&path).unwrap();
        assert_eq!(sample.input.delivery_items(), vec![json!({"email": "a@x.com", "plan": "pro"})]);
        assert_eq!(
            sample.context().unwrap(),
            SampleContext::Csv(vec!["email".into(), "plan".into()])
        );
    }

    #[test]
    fn test_invalid_sample_reports_input_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sample(&dir, "payload.json", "{\"email\": ");

        let err = Sample::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("input_parse"));
    }

    #[test]
    fn test_endpoint_override_wins() {
        let mut cfg = Config::default();
        cfg.delivery.endpoint = Some("https://configured.example.com/".parse().unwrap());
        let flag: url::Url = "https://flag.example.com/".parse().unwrap();

        assert_eq!(resolve_endpoint(&cfg, Some(&flag)).unwrap(), flag);
        assert_eq!(
            resolve_endpoint(&cfg, None).unwrap().as_str(),
            "https://configured.example.com/"
        );

        cfg.delivery.endpoint = None;
        assert!(resolve_endpoint(&cfg, None).is_err());
    }
}
