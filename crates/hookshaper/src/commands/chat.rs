use std::fs;

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::Parser;
use hookshaper_config::Config;
use hookshaper_engine::{Pipeline, Session, SessionEvent};
use tracing::log::{debug, error, info, warn};

use crate::{
    commands::{Sample, model_client, request_handler},
    utils::{
        output::print_preview,
        styles::{fmt_bold, fmt_dimmed, fmt_error, fmt_success},
    },
};

#[derive(Debug, Clone, Parser)]
pub struct ChatCmd {
    /// Sample payload, `.csv` for tabular samples and JSON otherwise
    pub input: Utf8PathBuf,

    /// Write the latest working handler to this file on exit
    #[arg(long, short)]
    pub out: Option<Utf8PathBuf>,
}

/// One line typed at the chat prompt
#[derive(Debug, PartialEq, Eq)]
enum ChatInput<'a> {
    Empty,
    Quit,
    Code,
    Events,
    Reload,
    Unknown(&'a str),
    Instruction(&'a str),
}

impl<'a> ChatInput<'a> {
    fn parse(line: &'a str) -> Self {
        let line = line.trim();
        match line {
            "" => ChatInput::Empty,
            "/quit" | "/exit" => ChatInput::Quit,
            "/code" => ChatInput::Code,
            "/events" => ChatInput::Events,
            "/reload" => ChatInput::Reload,
            cmd if cmd.starts_with('/') => ChatInput::Unknown(cmd),
            instruction => ChatInput::Instruction(instruction),
        }
    }
}

impl ChatCmd {
    pub(crate) async fn handle(&self, cfg: &Config) -> Result<()> {
        let client = model_client(cfg)?;
        let mut sample = Sample::load(&self.input)?;
        let mut pipeline = Pipeline::new(cfg.constants.clone());
        let mut session = Session::new();

        info!(
            "{}",
            fmt_dimmed(
                "Describe the handler you want. /code shows it, /events shows its output, \
                 /reload re-reads the sample, /quit exits."
            )
        );

        while let Some(line) = inquire::Text::new(">").prompt_skippable()? {
            match ChatInput::parse(&line) {
                ChatInput::Empty => {}
                ChatInput::Quit => break,
                ChatInput::Code => match session.generated_code() {
                    Some(code) => println!("{code}"),
                    None => info!("No handler generated yet"),
                },
                ChatInput::Events => match session.events() {
                    Some(events) => println!("{}", serde_json::to_string_pretty(events)?),
                    None => info!("No events for the current sample yet"),
                },
                ChatInput::Reload => match Sample::load(&sample.path) {
                    Ok(reloaded) => {
                        sample = reloaded;
                        session.reset_results();
                        info!(
                            "{}",
                            fmt_success(&format!("Reloaded {}", fmt_dimmed(sample.path.as_str())))
                        );
                    }
                    Err(e) => warn!("{e:#}"),
                },
                ChatInput::Unknown(cmd) => warn!("Unknown command {}", fmt_bold(cmd)),
                ChatInput::Instruction(instruction) => {
                    // awaited inline, so at most one request is ever outstanding
                    let id = session.submit(instruction);

                    let response = request_handler(&client, cfg, &sample, instruction).await;
                    session.apply(SessionEvent::ModelResponded {
                        id,
                        result: response.as_ref().cloned().map_err(ToString::to_string),
                    });

                    let response = match response {
                        Ok(response) => response,
                        Err(e) => {
                            let report = e.report();
                            error!("{}", fmt_error(&report.display_message));
                            session.fail(report);
                            continue;
                        }
                    };
                    debug!("Model response:\n{response}");

                    let result = pipeline.run_response(&response, &sample.input);
                    match &result {
                        Ok(preview) => print_preview(preview, false)?,
                        Err(e) => error!("{}", fmt_error(&e.report().display_message)),
                    }
                    session.apply(SessionEvent::PreviewCompleted {
                        id,
                        result: result.map_err(|e| e.report()),
                    });
                }
            }
        }

        if let Some(out) = &self.out
            && let Some(code) = session.generated_code()
        {
            fs::write(out, code).context(format!("Failed writing handler: {out}"))?;
            info!(
                "{}",
                fmt_success(&format!("Handler written to {}", fmt_dimmed(out.as_str())))
            );
        }

        Ok(())
    }
}
