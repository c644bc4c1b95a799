use anyhow::{Context, Result};
use std::io::Write;
use tracing::{info, instrument};

use crate::completion::TextCompleter;
use crate::prompt::PromptVariant;
use crate::store::RecordStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub fetched: usize,
    pub updated: usize,
}

/// Render `text` into the configured template and return the model output
/// unmodified.
pub async fn transform(
    completer: &dyn TextCompleter,
    variant: PromptVariant,
    text: &str,
) -> Result<String> {
    let prompt = variant.render(text);
    completer.complete(&prompt).await
}

/// Fetch every unprocessed row once, then transform and write each row in
/// fetch order. The first failure aborts the run; rows written before it stay
/// written. One `Updated row <id>: <value>` line goes to `out` per write.
#[instrument(skip_all, fields(variant = %variant))]
pub async fn run<W: Write>(
    store: &dyn RecordStore,
    completer: &dyn TextCompleter,
    variant: PromptVariant,
    out: &mut W,
) -> Result<RunSummary> {
    let records = store
        .fetch_unprocessed()
        .await
        .context("failed to fetch unprocessed rows")?;
    info!(count = records.len(), "fetched unprocessed rows");

    let mut summary = RunSummary {
        fetched: records.len(),
        updated: 0,
    };

    for record in records {
        let processed = transform(completer, variant, &record.body)
            .await
            .with_context(|| format!("failed to transform row {}", record.id))?;
        store
            .update_processed(&record.id, &processed)
            .await
            .with_context(|| format!("failed to update row {}", record.id))?;
        writeln!(out, "Updated row {}: {}", record.id, processed)?;
        summary.updated += 1;
    }

    info!(updated = summary.updated, "run complete");
    Ok(summary)
}
