use anyhow::{Result, anyhow};
use hookshaper_client::DeliveryReport;
use hookshaper_engine::{PipelineError, Preview};
use tracing::log::{debug, info, warn};

use crate::utils::styles::{fmt_bold, fmt_dimmed, fmt_error, fmt_success, fmt_yellow};

/// Print a successful preview. Handler source and events go to stdout so
/// they can be piped, status lines go through the logger.
pub(crate) fn print_preview(preview: &Preview, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(preview)?);
        return Ok(());
    }

    if !preview.injected_helpers.is_empty() {
        info!(
            "{}",
            fmt_dimmed(&format!(
                "Injected helpers: {}",
                preview.injected_helpers.join(", ")
            ))
        );
    }

    info!("{}", fmt_bold("Handler"));
    println!("{}", preview.source.code());

    info!("{}", fmt_bold("Events"));
    println!("{}", serde_json::to_string_pretty(&preview.events)?);

    if !preview.console.is_empty() {
        info!("{}", fmt_bold("Console"));
    }
    for line in &preview.console.stdout {
        info!("{} {line}", fmt_dimmed("console:"));
    }
    for line in &preview.console.stderr {
        warn!("{} {line}", fmt_yellow("console:"));
    }

    info!(
        "{}",
        fmt_success(&format!(
            "Handler produced {} event(s)",
            preview.events.len()
        ))
    );
    Ok(())
}

/// Turn a pipeline failure into the command's error, printing the report
/// as JSON first when requested
pub(crate) fn pipeline_failure(err: &PipelineError, json: bool) -> anyhow::Error {
    let report = err.report();
    if let Some(diagnostic) = err.diagnostic() {
        debug!("{diagnostic}");
    }

    if json && let Ok(body) = serde_json::to_string_pretty(&report) {
        println!("{body}");
    }

    anyhow!(
        "{} {}",
        report.display_message,
        fmt_dimmed(&format!("({})", report.category))
    )
}

/// Print one line per delivery, failing the command if any delivery failed
pub(crate) fn print_deliveries(reports: &[DeliveryReport], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(reports)?);
    } else {
        for report in reports {
            let label = match report.index {
                Some(i) => format!("Row {}", i + 1),
                None => "Payload".to_string(),
            };
            let msg = format!(
                "{label}: {} {}",
                report.status_text,
                fmt_dimmed(&report.timestamp.to_rfc3339())
            );
            if report.success {
                info!("{}", fmt_success(&msg));
            } else {
                warn!("{}", fmt_error(&msg));
            }
        }
    }

    let failed = reports.iter().filter(|r| !r.success).count();
    if failed > 0 {
        let err = PipelineError::Delivery(format!(
            "{failed} of {} deliveries failed",
            reports.len()
        ));
        return Err(pipeline_failure(&err, false));
    }

    Ok(())
}
