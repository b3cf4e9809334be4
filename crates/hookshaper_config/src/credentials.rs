//! Model API key persistence in the system keychain.
//!
//! The key lives under a single fixed entry. It is read at startup when present
//! and only written by an explicit save.

use anyhow::{Context, Result};
use tracing::debug;

pub const KEYCHAIN_SERVICE: &str = "hookshaper";
pub const API_KEY_USER: &str = "model_api_key";

/// Environment variable consulted before the keychain
pub const API_KEY_ENV: &str = "HOOKSHAPER_API_KEY";

fn entry() -> Result<keyring::Entry> {
    keyring::Entry::new(KEYCHAIN_SERVICE, API_KEY_USER).context("Failed to create keychain entry")
}

/// Store the model API key in the system keychain
///
/// # Errors
/// This function fails if keyring is unable to store a password
/// in the local system's keychain
pub fn save_api_key(key: &str) -> Result<()> {
    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("API key cannot be empty");
    }

    entry()?
        .set_password(key)
        .context("Failed to store API key in keychain")?;

    debug!("API key stored in keychain service=\"{KEYCHAIN_SERVICE}\", user=\"{API_KEY_USER}\"");
    Ok(())
}

/// Loads the model API key: environment first, then keychain.
/// A missing entry is `Ok(None)`.
///
/// # Errors
/// This function fails if the keychain itself cannot be queried
pub fn load_api_key() -> Result<Option<String>> {
    if let Ok(key) = std::env::var(API_KEY_ENV)
        && !key.trim().is_empty()
    {
        debug!("Using API key from {API_KEY_ENV}");
        return Ok(Some(key.trim().to_string()));
    }

    match entry()?.get_password() {
        Ok(key) => Ok(Some(key)),
        Err(keyring::Error::NoEntry) => {
            debug!("No API key stored in keychain service=\"{KEYCHAIN_SERVICE}\"");
            Ok(None)
        }
        Err(e) => Err(e).context(format!(
            "Failed to retrieve API key from keychain (service: '{KEYCHAIN_SERVICE}', user: '{API_KEY_USER}')"
        )),
    }
}

/// Removes the stored model API key
///
/// # Errors
/// This function fails if keyring is unable to build the keychain entry
pub fn remove_api_key() -> Result<()> {
    match entry()?.delete_credential() {
        Ok(()) => (),
        Err(keyring::Error::NoEntry) => {
            debug!("No API key stored in keychain service=\"{KEYCHAIN_SERVICE}\"");
        }
        Err(e) => anyhow::bail!(e),
    }

    Ok(())
}
