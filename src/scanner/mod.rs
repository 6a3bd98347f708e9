pub mod batch;
pub mod cancel;
pub mod link;
pub mod pipeline;
pub mod score;
pub mod source;

use async_trait::async_trait;

use crate::session::DisplayContext;
use source::SourceError;

/// One qualifying message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredItem {
    pub score: u64,
    pub message_id: i64,
    pub preview: String,
    /// 0-based encounter index in source order; breaks score ties.
    pub position: usize,
}

/// Top items of a scan, highest score first. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankedResultSet {
    items: Vec<ScoredItem>,
}

impl RankedResultSet {
    /// Order by score descending, then by scan position ascending, and keep `top_n`.
    pub fn from_unsorted(mut items: Vec<ScoredItem>, top_n: usize) -> Self {
        items.sort_by(|a, b| b.score.cmp(&a.score).then(a.position.cmp(&b.position)));
        items.truncate(top_n);
        Self { items }
    }

    pub fn items(&self) -> &[ScoredItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Periodic progress of a running scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanProgress {
    pub processed: usize,
    pub target: usize,
    pub qualifying: usize,
}

/// Receives progress updates. Implementations swallow their own delivery failures.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn report(&self, progress: ScanProgress);
}

/// Discards progress.
pub struct NoProgress;

#[async_trait]
impl ProgressSink for NoProgress {
    async fn report(&self, _progress: ScanProgress) {}
}

#[derive(Debug, Clone)]
pub struct ScanReport {
    pub ranked: RankedResultSet,
    pub context: DisplayContext,
    /// Messages actually read from the source.
    pub scanned: usize,
    /// Effective scan count: min(requested limit, source total).
    pub target: usize,
    /// Messages whose scoring failed and were counted as zero.
    pub scoring_failures: usize,
}

#[derive(Debug, Clone)]
pub enum ScanOutcome {
    Completed(ScanReport),
    Cancelled { scanned: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    NotFound(String),
    NotEligible(String),
    AccessDenied(String),
    Failed(String),
}

impl ScanError {
    pub(crate) fn from_source(reference: &str, e: SourceError) -> Self {
        match e {
            SourceError::NotFound(_) => ScanError::NotFound(reference.to_string()),
            SourceError::NotEligible(_) => ScanError::NotEligible(reference.to_string()),
            SourceError::AccessDenied(_) => ScanError::AccessDenied(reference.to_string()),
            SourceError::Api(detail) => ScanError::Failed(detail),
        }
    }
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanError::NotFound(r) => write!(f, "no channel or user named {}", r),
            ScanError::NotEligible(r) => write!(f, "{} is not a public channel or group", r),
            ScanError::AccessDenied(r) => write!(f, "history of {} is not readable", r),
            ScanError::Failed(e) => write!(f, "scan failed: {}", e),
        }
    }
}

impl std::error::Error for ScanError {}
