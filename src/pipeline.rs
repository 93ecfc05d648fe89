// src/pipeline.rs
//! One-run orchestration: source adapter → per-item enrichment → renderer →
//! delivery → cleanup.
//!
//! A run either completes or fails outright; there is no partial-run
//! resumption and no retry. Cleanup always executes after delivery has been
//! attempted, never before delivery starts reading image files.

use anyhow::Result;
use chrono::Utc;

use crate::config::MailConfig;
use crate::deliver::{self, Mailer, OutgoingMessage};
use crate::enrich::{EnrichedItem, Enricher};
use crate::render;
use crate::source::SourceAdapter;
use crate::workdir::RunWorkdir;

/// Aggregate and enrich: fetch raw items from the adapter, then enrich each
/// sequentially. Items are independent; only adapter-level errors propagate
/// (fatal for the search variant, already swallowed per source by the feed
/// variant).
pub async fn collect_items(
    adapter: &dyn SourceAdapter,
    workdir: &RunWorkdir,
) -> Result<Vec<EnrichedItem>> {
    let raw = adapter.fetch_items().await?;
    tracing::info!(adapter = adapter.name(), items = raw.len(), "items aggregated");

    let enricher = Enricher::new(workdir.clone());
    let mut items = Vec::with_capacity(raw.len());
    for r in raw {
        items.push(enricher.enrich(r).await);
    }
    Ok(items)
}

/// Render and assemble the outgoing message for today's date.
pub fn compose(
    topic: &str,
    cfg: &MailConfig,
    recipients: Vec<String>,
    items: &[EnrichedItem],
) -> OutgoingMessage {
    let today = Utc::now().date_naive();
    let html = render::render(topic, today, items);
    let subject = format!("{topic} Newsletter - {}", today.format("%B %d, %Y"));
    deliver::assemble(subject, cfg.sender.clone(), recipients, html, items)
}

/// Deliver the enriched items, then clean the workdir regardless of the
/// delivery outcome. Assembly reads every attachment before any submission
/// starts, and cleanup runs strictly after the attempt, so image files are
/// never removed out from under the delivery step. A delivery error is still
/// the run's result.
pub async fn deliver_and_cleanup(
    topic: &str,
    cfg: &MailConfig,
    recipients: Vec<String>,
    items: &[EnrichedItem],
    workdir: &RunWorkdir,
) -> Result<()> {
    let message = compose(topic, cfg, recipients, items);
    let result = match Mailer::new(cfg) {
        Ok(mailer) => mailer.send(&message).await,
        Err(e) => Err(e),
    };
    workdir.cleanup();
    result
}

/// Run the whole pipeline once: aggregate, enrich, render, deliver, clean up.
pub async fn run(
    adapter: &dyn SourceAdapter,
    topic: &str,
    cfg: &MailConfig,
    recipients: Vec<String>,
) -> Result<()> {
    let workdir = RunWorkdir::create()?;
    let items = match collect_items(adapter, &workdir).await {
        Ok(items) => items,
        Err(e) => {
            workdir.cleanup();
            return Err(e);
        }
    };
    deliver_and_cleanup(topic, cfg, recipients, &items, &workdir).await
}
