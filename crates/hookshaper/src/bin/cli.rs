use clap::Parser;
use hookshaper::Cli;
use tracing::log::error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = cli.handle().await {
        error!("{e:#}");
        std::process::exit(1);
    }
}
