use std::fs;

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::{ArgGroup, Parser};
use hookshaper_config::Config;
use hookshaper_engine::{
    ExtractError, ExtractedSource, Pipeline, PipelineError, Preview, Provenance,
};
use tracing::log::debug;

use crate::{
    commands::Sample,
    utils::output::{pipeline_failure, print_preview},
};

#[derive(Debug, Clone, Parser)]
#[command(group(ArgGroup::new("handler").required(true).args(["code", "response"])))]
pub struct PreviewCmd {
    /// Sample payload, `.csv` for tabular samples and JSON otherwise
    pub input: Utf8PathBuf,

    /// File holding handler source, run as-is
    #[arg(long)]
    pub code: Option<Utf8PathBuf>,

    /// File holding a raw model response to extract the handler from
    #[arg(long)]
    pub response: Option<Utf8PathBuf>,

    /// Print the preview (or failure report) as JSON
    #[arg(long)]
    pub json: bool,
}

impl PreviewCmd {
    pub(crate) fn handle(&self, cfg: &Config) -> Result<()> {
        let sample = Sample::load(&self.input)?;
        let mut pipeline = Pipeline::new(cfg.constants.clone());

        let preview = self.run(&mut pipeline, &sample)?;
        print_preview(&preview, self.json)
    }

    fn run(&self, pipeline: &mut Pipeline, sample: &Sample) -> Result<Preview> {
        let result = if let Some(path) = &self.code {
            let code = fs::read_to_string(path).context(format!("Failed reading handler: {path}"))?;
            debug!("Previewing handler source from {path}");
            ExtractedSource::new(code, Provenance::Verbatim)
                .ok_or(PipelineError::Extraction(ExtractError::NotFound))
                .and_then(|source| pipeline.run_source(source, &sample.input))
        } else if let Some(path) = &self.response {
            let response =
                fs::read_to_string(path).context(format!("Failed reading response: {path}"))?;
            debug!("Previewing model response from {path}");
            pipeline.run_response(&response, &sample.input)
        } else {
            anyhow::bail!("Pass either --code or --response")
        };

        result.map_err(|e| pipeline_failure(&e, self.json))
    }
}
