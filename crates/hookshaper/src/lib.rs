pub mod commands;
pub mod utils;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

use crate::{
    commands::{
        auth::AuthCmd, chat::ChatCmd, generate::GenerateCmd, init::InitCmd, preview::PreviewCmd,
        send::SendCmd, test_connection::TestConnectionCmd,
    },
    utils::logger::init_cli_logger,
};
use hookshaper_config::Config;

#[derive(Parser)]
#[command(name = "hookshaper")]
#[command(version)]
#[command(about = "Hookshaper - webhook handlers from plain language")]
#[command(
    long_about = "Hookshaper asks a language model to write a JavaScript handler that turns a sample \
webhook payload into Bloomreach Engagement events, then runs that handler in an isolated V8 sandbox \
against the sample so the result can be checked before it ships."
)]
#[command(after_help = "EXAMPLES:\n  \
    hookshaper init\n  \
    hookshaper auth\n  \
    hookshaper generate payload.json \"track a registration event\"\n  \
    hookshaper preview payload.json --code handler.js\n  \
    hookshaper send rows.csv --endpoint https://hooks.example.com/in\n\
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path, defaults to ./hookshaper.json
    #[arg(long, short = 'c', global = true, default_value_t = Config::default_path())]
    pub config: Utf8PathBuf,

    /// No logging except for warnings and errors
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Verbose logging (-v) or trace logging (-vv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

impl Cli {
    #[allow(clippy::missing_errors_doc)]
    pub async fn handle(&self) -> anyhow::Result<()> {
        let cfg = Config::load_or_default(&self.config);

        // logger comes up before config errors so they still get printed
        let logger = cfg.as_ref().map(|c| c.logger.clone()).unwrap_or_default();
        init_cli_logger(&logger, self.verbose, self.quiet);

        match &self.command {
            Commands::Init(cmd) => cmd.handle(&self.config)?,
            Commands::Auth(cmd) => cmd.handle()?,
            Commands::Preview(cmd) => cmd.handle(&cfg?)?,
            Commands::Generate(cmd) => cmd.handle(&cfg?).await?,
            Commands::Chat(cmd) => cmd.handle(&cfg?).await?,
            Commands::Send(cmd) => cmd.handle(&cfg?).await?,
            Commands::TestConnection(cmd) => cmd.handle(&cfg?).await?,
        }

        Ok(())
    }
}

#[derive(Debug, Subcommand)]
#[command(styles=utils::styles::get_styles())]
pub enum Commands {
    /// Initialize configuration file
    #[command(
        long_about = "Writes hookshaper.json with the default model, delivery and constant settings."
    )]
    Init(InitCmd),

    /// Store the model API key
    #[command(
        long_about = "Stores the model API key in the system keychain. The HOOKSHAPER_API_KEY \
environment variable takes precedence over the stored key when set."
    )]
    Auth(AuthCmd),

    /// Run a handler against a sample payload
    #[command(
        long_about = "Runs handler source, or a saved model response, against a JSON or CSV sample \
without calling the model, and prints the events it produces."
    )]
    Preview(PreviewCmd),

    /// Generate a handler from an instruction and preview it
    #[command(
        long_about = "Sends the sample and an instruction to the model, extracts the handler from the \
response and runs it against the sample."
    )]
    Generate(GenerateCmd),

    /// Iterate on a handler interactively
    #[command(
        long_about = "Reads instructions one at a time, regenerating and previewing the handler after \
each. Only one model request is outstanding at any time."
    )]
    Chat(ChatCmd),

    /// Deliver the sample payload to a webhook endpoint
    #[command(
        long_about = "POSTs the sample to the endpoint, once per row for CSV samples. Every payload gets \
a delivery report, failures do not stop the batch."
    )]
    Send(SendCmd),

    /// Check that a webhook endpoint accepts requests
    #[command(
        long_about = "POSTs a small {\"test\": true, \"timestamp\": ...} payload to the endpoint."
    )]
    TestConnection(TestConnectionCmd),
}
