use std::fs;

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::Parser;
use hookshaper_config::Config;
use hookshaper_engine::Pipeline;
use tracing::log::{debug, info};

use crate::{
    commands::{Sample, model_client, request_handler},
    utils::{
        output::{pipeline_failure, print_preview},
        styles::{fmt_dimmed, fmt_success},
    },
};

#[derive(Debug, Clone, Parser)]
pub struct GenerateCmd {
    /// Sample payload, `.csv` for tabular samples and JSON otherwise
    pub input: Utf8PathBuf,

    /// What the handler should do, in plain language
    pub instruction: String,

    /// Write the generated handler source to this file
    #[arg(long, short)]
    pub out: Option<Utf8PathBuf>,

    /// Print the preview (or failure report) as JSON
    #[arg(long)]
    pub json: bool,
}

impl GenerateCmd {
    pub(crate) async fn handle(&self, cfg: &Config) -> Result<()> {
        let sample = Sample::load(&self.input)?;
        let client = model_client(cfg)?;

        let response = request_handler(&client, cfg, &sample, &self.instruction)
            .await
            .map_err(|e| pipeline_failure(&e, self.json))?;
        debug!("Model response:\n{response}");

        let mut pipeline = Pipeline::new(cfg.constants.clone());
        let preview = pipeline
            .run_response(&response, &sample.input)
            .map_err(|e| pipeline_failure(&e, self.json))?;

        print_preview(&preview, self.json)?;

        if let Some(out) = &self.out {
            fs::write(out, preview.source.code())
                .context(format!("Failed writing handler: {out}"))?;
            info!(
                "{}",
                fmt_success(&format!("Handler written to {}", fmt_dimmed(out.as_str())))
            );
        }

        Ok(())
    }
}
