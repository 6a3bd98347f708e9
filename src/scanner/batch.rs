use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::score::{preview, ReactionScorer};
use super::source::SourceMessage;
use super::ScoredItem;

/// Result of scoring one batch.
#[derive(Debug, Default)]
pub struct BatchOutput {
    /// Qualifying items, in completion order.
    pub items: Vec<ScoredItem>,
    /// Messages whose scoring task failed and were counted as zero.
    pub failures: usize,
    /// Highest number of scoring operations observed in flight at once.
    pub peak_in_flight: usize,
}

/// Scores a batch of messages with at most `concurrency` operations in flight.
pub struct BatchProcessor {
    scorer: Arc<ReactionScorer>,
    concurrency: usize,
}

impl BatchProcessor {
    pub fn new(scorer: Arc<ReactionScorer>, concurrency: usize) -> Self {
        Self {
            scorer,
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Score `batch`, whose first message sits at scan position `first_position`.
    /// Zero-score messages are dropped. A failed task never aborts the batch.
    pub async fn process(&self, first_position: usize, batch: Vec<SourceMessage>) -> BatchOutput {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut join_set = JoinSet::new();

        for (offset, message) in batch.into_iter().enumerate() {
            let sem = Arc::clone(&semaphore);
            let scorer = Arc::clone(&self.scorer);
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            let position = first_position + offset;

            join_set.spawn(async move {
                let _permit = sem.acquire_owned().await.ok()?;
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);

                let score = scorer.score(&message);
                let item = (score > 0).then(|| ScoredItem {
                    score,
                    message_id: message.id,
                    preview: preview(&message),
                    position,
                });

                in_flight.fetch_sub(1, Ordering::SeqCst);
                Some(item)
            });
        }

        let mut output = BatchOutput::default();

        while let Some(join_result) = join_set.join_next().await {
            match join_result {
                Ok(Some(Some(item))) => output.items.push(item),
                Ok(Some(None)) => {}
                Ok(None) => {
                    log::warn!("Scoring task could not acquire a permit, counted as 0");
                    output.failures += 1;
                }
                Err(e) => {
                    log::warn!("Scoring task failed, counted as 0: {}", e);
                    output.failures += 1;
                }
            }
        }

        output.peak_in_flight = peak.load(Ordering::SeqCst);
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::score::ReactionSelector;
    use crate::testing::message_with_score;

    fn processor(concurrency: usize) -> BatchProcessor {
        BatchProcessor::new(
            Arc::new(ReactionScorer::new(ReactionSelector::All)),
            concurrency,
        )
    }

    #[tokio::test]
    async fn test_filters_zero_scores() {
        let batch = vec![
            message_with_score(1, 5),
            message_with_score(2, 0),
            message_with_score(3, 2),
        ];
        let out = processor(4).process(0, batch).await;
        let mut ids: Vec<i64> = out.items.iter().map(|i| i.message_id).collect();
        ids.sort();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(out.failures, 0);
    }

    #[tokio::test]
    async fn test_positions_follow_batch_offset() {
        let batch = vec![message_with_score(10, 1), message_with_score(11, 1)];
        let out = processor(2).process(100, batch).await;
        let mut positions: Vec<(i64, usize)> =
            out.items.iter().map(|i| (i.message_id, i.position)).collect();
        positions.sort();
        assert_eq!(positions, vec![(10, 100), (11, 101)]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_in_flight_never_exceeds_cap() {
        let batch: Vec<_> = (0..200).map(|i| message_with_score(i, 1)).collect();
        let out = processor(3).process(0, batch).await;
        assert_eq!(out.items.len(), 200);
        assert!(out.peak_in_flight >= 1);
        assert!(out.peak_in_flight <= 3);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let out = processor(20).process(0, vec![]).await;
        assert!(out.items.is_empty());
        assert_eq!(out.peak_in_flight, 0);
    }

    #[test]
    fn test_zero_concurrency_is_raised_to_one() {
        assert_eq!(processor(0).concurrency(), 1);
    }
}
