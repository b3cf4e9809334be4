use anyhow::Result;
use camino::Utf8PathBuf;
use clap::Parser;
use hookshaper_config::Config;
use tracing::log::info;

use crate::{
    commands::USER_CANCELLED,
    utils::styles::{fmt_bold, fmt_dimmed, fmt_success},
};

#[derive(Debug, Clone, Parser)]
pub struct InitCmd {
    /// Overwrite an existing config without asking
    #[arg(long, short)]
    pub yes: bool,
}

impl InitCmd {
    pub(crate) fn handle(&self, path: &Utf8PathBuf) -> Result<()> {
        if path.exists() && !self.yes {
            let overwrite = inquire::Confirm::new(&format!(
                "A hookshaper config already exists at {}, overwrite it?",
                fmt_dimmed(path.as_str())
            ))
            .with_default(false)
            .prompt()?;
            if !overwrite {
                anyhow::bail!(USER_CANCELLED)
            }
        }

        let cfg = Config::default().with_path(path);
        cfg.save()?;

        info!(
            "{}",
            fmt_success(&format!(
                "Config written to {path}",
                path = fmt_dimmed(cfg.path().as_str())
            ))
        );
        info!(
            "Store your model API key next with {}",
            fmt_bold("hookshaper auth")
        );

        Ok(())
    }
}
