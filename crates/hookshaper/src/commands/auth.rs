use anyhow::Result;
use clap::Parser;
use hookshaper_config::credentials::{
    API_KEY_ENV, API_KEY_USER, KEYCHAIN_SERVICE, remove_api_key, save_api_key,
};
use tracing::log::{info, warn};

use crate::utils::styles::{fmt_dimmed, fmt_success};

#[derive(Debug, Clone, Parser)]
pub struct AuthCmd {
    /// API key to store, prompted for when omitted
    #[arg(long, env = "HOOKSHAPER_AUTH_KEY", hide_env_values = true)]
    pub key: Option<String>,

    /// Remove the stored key instead
    #[arg(long, conflicts_with = "key")]
    pub remove: bool,
}

impl AuthCmd {
    pub(crate) fn handle(&self) -> Result<()> {
        let location = fmt_dimmed(&format!(
            "(keychain service \"{KEYCHAIN_SERVICE}\", user \"{API_KEY_USER}\")"
        ));

        if self.remove {
            remove_api_key()?;
            info!("{}", fmt_success(&format!("API key removed {location}")));
            return Ok(());
        }

        let key = match &self.key {
            Some(key) => key.clone(),
            None => inquire::Password::new("Model API key:")
                .without_confirmation()
                .with_display_mode(inquire::PasswordDisplayMode::Masked)
                .with_validator(inquire::min_length!(1, "API key cannot be empty"))
                .prompt()?,
        };

        save_api_key(&key)?;
        info!("{}", fmt_success(&format!("API key stored {location}")));

        if std::env::var(API_KEY_ENV).is_ok_and(|v| !v.trim().is_empty()) {
            warn!("{API_KEY_ENV} is set and takes precedence over the stored key");
        }

        Ok(())
    }
}
