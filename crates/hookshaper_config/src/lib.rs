use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs;
use tracing::debug;

use crate::{delivery::DeliveryConfig, logger::LoggerConfig, model::ModelConfig};

pub mod credentials;
pub(crate) mod defaults;
pub mod delivery;
pub mod logger;
pub mod model;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip_serializing)]
    path: Option<Utf8PathBuf>,

    /// Language model settings
    #[serde(default)]
    pub model: ModelConfig,

    /// Outbound webhook delivery settings
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Named constants injected into every generated handler, in declaration order
    #[serde(default = "crate::defaults::default_constants")]
    pub constants: IndexMap<String, serde_json::Value>,

    /// CLI logger configuration
    #[serde(default)]
    pub logger: LoggerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: None,
            model: ModelConfig::default(),
            delivery: DeliveryConfig::default(),
            constants: defaults::default_constants(),
            logger: LoggerConfig::default(),
        }
    }
}

impl Config {
    #[must_use]
    pub fn with_path(mut self, path: &Utf8PathBuf) -> Self {
        self.path = Some(path.clone());
        self
    }

    pub fn path(&self) -> Utf8PathBuf {
        self.path.clone().unwrap_or(Self::default_path())
    }

    /// Loads config from json file
    ///
    /// # Errors
    ///
    /// This function will return an error if the config path does not exist or the content is invalid
    pub fn load(path: &Utf8PathBuf) -> Result<Self> {
        debug!("Loading config from {path}");

        if !path.exists() {
            anyhow::bail!("Config file does not exist: {path}");
        }

        let contents =
            fs::read_to_string(path).context(format!("Failed reading config: {path} "))?;

        let mut cfg: Self =
            serde_json::from_str(&contents).context(format!("Failed loading config: {path} "))?;
        cfg.path = Some(path.clone());

        Ok(cfg)
    }

    /// Loads config from json file, or the defaults bound to `path`
    /// when no file exists yet
    ///
    /// # Errors
    ///
    /// This function will return an error if the file exists but cannot be read or parsed
    pub fn load_or_default(path: &Utf8PathBuf) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            debug!("No config at {path}, using defaults");
            Ok(Self::default().with_path(path))
        }
    }

    /// Saves config to json file, falling back on default path if non is provided
    ///
    /// # Errors
    /// This function will error if it fails writing the config
    pub fn save(&self) -> Result<()> {
        let dest = self.path();
        debug!("Saving config to {dest}");
        let contents = serde_json::to_string_pretty(self).unwrap_or(json!(self).to_string());

        fs::write(&dest, contents).context(format!("Failed writing config: {dest}"))?;

        Ok(())
    }

    /// Default config path is ./hookshaper.json
    pub fn default_path() -> Utf8PathBuf {
        Utf8PathBuf::new().join("hookshaper.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(dir: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join("hookshaper.json")).unwrap()
    }

    #[test]
    fn test_default_constants_are_ordered() {
        let cfg = Config::default();
        let names: Vec<&str> = cfg.constants.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["INTEGRATION_ID", "COMPANY_ID", "INTEGRATION_NAME"]);
        assert_eq!(cfg.constants["INTEGRATION_ID"], json!("test-integration"));
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let cfg: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.model.model, "gpt-4.1-2025-04-14");
        assert_eq!(cfg.constants.len(), 3);
        assert!(cfg.delivery.endpoint.is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_path(&dir);

        let mut cfg = Config::default().with_path(&path);
        cfg.constants.insert("INTEGRATION_ID".into(), json!("prod-integration"));
        cfg.delivery.endpoint = Some("https://hooks.example.com/callback".parse().unwrap());
        cfg.save().unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.path(), path);
        assert_eq!(loaded.constants["INTEGRATION_ID"], json!("prod-integration"));
        assert_eq!(
            loaded.delivery.endpoint.unwrap().as_str(),
            "https://hooks.example.com/callback"
        );
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&temp_path(&dir)).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_load_or_default_binds_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_path(&dir);
        let cfg = Config::load_or_default(&path).unwrap();
        assert_eq!(cfg.path(), path);
    }
}
