use anyhow::Result;
use clap::Parser;
use hookshaper_client::Deliverer;
use hookshaper_config::Config;

use crate::{
    commands::resolve_endpoint,
    utils::{output::print_deliveries, spinner::Spinner},
};

#[derive(Debug, Clone, Parser)]
pub struct TestConnectionCmd {
    /// Webhook endpoint, overrides `delivery.endpoint` from config
    #[arg(long, short)]
    pub endpoint: Option<url::Url>,
}

impl TestConnectionCmd {
    pub(crate) async fn handle(&self, cfg: &Config) -> Result<()> {
        let endpoint = resolve_endpoint(cfg, self.endpoint.as_ref())?;
        let deliverer = Deliverer::new(&cfg.delivery)?;

        let mut sp = Spinner::new(format!("Testing connection to {endpoint}..."));
        let report = deliverer.test_connection(&endpoint).await;
        if report.success {
            sp.stop_success("Endpoint accepted the test payload");
        } else {
            sp.stop_error("Endpoint did not accept the test payload");
        }

        print_deliveries(&[report], false)
    }
}
