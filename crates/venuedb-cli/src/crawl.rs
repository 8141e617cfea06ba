//! Command handlers for the CLI.
//!
//! Called from `main` once configuration and logging are set up.

use std::path::Path;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use venuedb_core::{load_selectors, AppConfig, CrawlRequest, Selectors, VenueRecord};
use venuedb_crawler::{ChromeSession, CrawlSettings, Crawler, IndexDocument, VenueRow};

use crate::OutputFormat;

/// Built-in selectors, or the YAML override when `YMAPS_SELECTORS_PATH` is set.
pub(crate) fn effective_selectors(config: &AppConfig) -> anyhow::Result<Selectors> {
    match &config.selectors_path {
        Some(path) => Ok(load_selectors(path)?),
        None => Ok(Selectors::default()),
    }
}

/// Run one crawl and write the result as JSON.
///
/// Ctrl-C stops the crawl at the current venue, which is dropped; every
/// venue captured before it is still written.
///
/// # Errors
///
/// Returns an error if selectors cannot be loaded, the browser cannot be
/// started, the search fails, or the output cannot be written.
pub(crate) async fn run_crawl(
    config: &AppConfig,
    request: &CrawlRequest,
    output: Option<&Path>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let selectors = effective_selectors(config)?;
    let settings = CrawlSettings::from_config(config, selectors);
    let session = ChromeSession::start(&config.browser).await?;

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, stopping crawl");
                cancel.cancel();
            }
        })
    };

    let report = Crawler::new(session, settings)
        .with_cancellation(cancel)
        .run(request)
        .await;
    interrupt.abort();
    let report = report?;

    if let Some(reason) = report.aborted() {
        tracing::warn!(?reason, records = report.records.len(), "crawl ended early");
    }
    for item in &report.skipped {
        tracing::debug!(
            index = item.index,
            url = item.url.as_str(),
            reason = item.reason.as_str(),
            "skipped"
        );
    }

    let json = render(&report.records, format)?;
    write_output(output, &json)?;

    tracing::info!(
        city = request.city.as_str(),
        category = request.category.as_str(),
        records = report.records.len(),
        skipped = report.skipped.len(),
        "crawl complete"
    );
    Ok(())
}

/// Serialize `records` in the requested shape as pretty JSON.
pub(crate) fn render(records: &[VenueRecord], format: OutputFormat) -> anyhow::Result<String> {
    let json = match format {
        OutputFormat::Records => serde_json::to_string_pretty(records)?,
        OutputFormat::Index => {
            let docs: Vec<IndexDocument> = records.iter().map(IndexDocument::from).collect();
            serde_json::to_string_pretty(&docs)?
        }
        OutputFormat::Rows => {
            let rows = records
                .iter()
                .map(VenueRow::from_record)
                .collect::<Result<Vec<_>, _>>()?;
            serde_json::to_string_pretty(&rows)?
        }
    };
    Ok(json)
}

fn write_output(output: Option<&Path>, json: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "records written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Print the selectors the crawler would use.
///
/// # Errors
///
/// Returns an error if the override file cannot be loaded.
pub(crate) fn print_selectors(config: &AppConfig) -> anyhow::Result<()> {
    let selectors = effective_selectors(config)?;
    print!("{}", serde_yaml::to_string(&selectors)?);
    Ok(())
}
