use anyhow::Result;
use camino::Utf8PathBuf;
use clap::Parser;
use hookshaper_client::Deliverer;
use hookshaper_config::Config;
use hookshaper_engine::InputKind;
use tracing::log::info;

use crate::{
    commands::{Sample, resolve_endpoint},
    utils::{output::print_deliveries, spinner::Spinner, styles::fmt_dimmed},
};

#[derive(Debug, Clone, Parser)]
pub struct SendCmd {
    /// Sample payload, one request per row for `.csv` files
    pub input: Utf8PathBuf,

    /// Webhook endpoint, overrides `delivery.endpoint` from config
    #[arg(long, short)]
    pub endpoint: Option<url::Url>,

    /// Print delivery reports as JSON
    #[arg(long)]
    pub json: bool,
}

impl SendCmd {
    pub(crate) async fn handle(&self, cfg: &Config) -> Result<()> {
        let endpoint = resolve_endpoint(cfg, self.endpoint.as_ref())?;
        let sample = Sample::load(&self.input)?;
        let items = sample.input.delivery_items();
        let deliverer = Deliverer::new(&cfg.delivery)?;

        info!(
            "Sending {} payload(s) from {} to {}",
            items.len(),
            fmt_dimmed(sample.path.as_str()),
            fmt_dimmed(endpoint.as_str())
        );

        let mut sp = Spinner::new("Delivering...");
        let reports = match (sample.input.kind(), items.as_slice()) {
            (InputKind::Json, [payload]) => vec![deliverer.deliver(payload, &endpoint, None).await],
            _ => deliverer.deliver_all(&items, &endpoint).await,
        };
        let delivered = reports.iter().filter(|r| r.success).count();
        if delivered == reports.len() {
            sp.stop_success(format!("{delivered} payload(s) delivered"));
        } else {
            sp.stop_error(format!("{delivered} of {} payload(s) delivered", reports.len()));
        }

        print_deliveries(&reports, self.json)
    }
}
