use std::sync::Arc;

use super::batch::BatchProcessor;
use super::cancel::ScanGuard;
use super::link::link_prefix;
use super::score::ReactionScorer;
use super::source::{normalize_reference, MessageSource, SourceHandle};
use super::{ProgressSink, RankedResultSet, ScanError, ScanOutcome, ScanProgress, ScanReport};
use crate::config::ScanSettings;
use crate::session::DisplayContext;

/// Drives a message source through the batch processor and ranks the result.
pub struct ScanPipeline {
    source: Arc<dyn MessageSource>,
    processor: BatchProcessor,
    settings: ScanSettings,
}

impl ScanPipeline {
    pub fn new(source: Arc<dyn MessageSource>, settings: ScanSettings) -> Self {
        let scorer = Arc::new(ReactionScorer::new(settings.selector()));
        let processor = BatchProcessor::new(scorer, settings.concurrency);
        Self {
            source,
            processor,
            settings,
        }
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    /// Scan up to `limit` messages of `reference`.
    ///
    /// Cancellation is checked only at batch boundaries; a batch already
    /// being read or scored is finished first.
    pub async fn scan(
        &self,
        reference: &str,
        limit: usize,
        guard: &ScanGuard,
        progress: &dyn ProgressSink,
    ) -> Result<ScanOutcome, ScanError> {
        let requester = guard.requester();
        let name = normalize_reference(reference);

        let handle = self
            .source
            .resolve(name)
            .await
            .map_err(|e| ScanError::from_source(reference, e))?;
        if !handle.kind.is_scannable() {
            return Err(ScanError::NotEligible(reference.to_string()));
        }

        let total = self
            .source
            .estimate_total(&handle)
            .await
            .map_err(|e| ScanError::from_source(reference, e))?;
        let target = limit.min(total);
        log::info!(
            "Scanning {} for requester {}: target {} of {} messages",
            reference,
            requester,
            target,
            total
        );

        let mut stream = self
            .source
            .iterate(&handle, target)
            .await
            .map_err(|e| ScanError::from_source(reference, e))?;

        let batch_size = self.settings.batch_size.max(1);
        let progress_every = self.settings.progress_every_batches.max(1);
        let mut scored = Vec::new();
        let mut scanned = 0usize;
        let mut batches = 0usize;
        let mut failures = 0usize;
        let mut exhausted = false;

        loop {
            // Every batch boundary, including the one after the final batch.
            if guard.is_cancelled() {
                log::info!(
                    "Scan of {} cancelled for requester {} after {} messages",
                    reference,
                    requester,
                    scanned
                );
                return Ok(ScanOutcome::Cancelled { scanned });
            }
            if exhausted || scanned >= target {
                break;
            }

            let want = batch_size.min(target - scanned);
            let mut batch = Vec::with_capacity(want);
            while batch.len() < want {
                match stream
                    .next()
                    .await
                    .map_err(|e| ScanError::from_source(reference, e))?
                {
                    Some(msg) => batch.push(msg),
                    None => {
                        exhausted = true;
                        break;
                    }
                }
            }
            if batch.is_empty() {
                break;
            }

            let first_position = scanned;
            scanned += batch.len();
            let output = self.processor.process(first_position, batch).await;
            failures += output.failures;
            scored.extend(output.items);
            batches += 1;

            if batches % progress_every == 0 && !exhausted && scanned < target {
                progress
                    .report(ScanProgress {
                        processed: scanned,
                        target,
                        qualifying: scored.len(),
                    })
                    .await;
                tokio::time::sleep(self.settings.progress_pause()).await;
            }
        }

        let qualifying = scored.len();
        let ranked = RankedResultSet::from_unsorted(scored, self.settings.top_n);
        log::info!(
            "Scan of {} finished for requester {}: {} scanned, {} qualifying, {} scoring failures",
            reference,
            requester,
            scanned,
            qualifying,
            failures
        );

        Ok(ScanOutcome::Completed(ScanReport {
            ranked,
            context: display_context(&handle, reference, scanned),
            scanned,
            target,
            scoring_failures: failures,
        }))
    }
}

fn display_context(handle: &SourceHandle, reference: &str, scanned: usize) -> DisplayContext {
    let channel_label = match handle.username.as_deref() {
        Some(u) if !u.is_empty() => format!("@{}", u),
        _ if !handle.title.is_empty() => handle.title.clone(),
        _ => reference.to_string(),
    };
    DisplayContext {
        channel_label,
        link_prefix: link_prefix(handle.chat_id, handle.username.as_deref()),
        total_scanned: scanned,
    }
}
