use async_trait::async_trait;

/// Identifies a reaction on a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReactionKind {
    Emoji(String),
    CustomEmoji(i64),
    Paid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionCount {
    pub kind: ReactionKind,
    pub count: i64,
}

/// A message read from a source. Never mutated after it is yielded.
#[derive(Debug, Clone, Default)]
pub struct SourceMessage {
    pub id: i64,
    pub text: Option<String>,
    pub has_media: bool,
    pub reactions: Vec<ReactionCount>,
}

/// What a resolved reference turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Channel,
    Supergroup,
    Group,
    User,
}

impl SourceKind {
    /// Broadcast and group-like peers have a readable, linkable history.
    pub fn is_scannable(self) -> bool {
        matches!(self, SourceKind::Channel | SourceKind::Supergroup)
    }
}

/// A resolved source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceHandle {
    /// Bot API dialog id (`-100…` for channels).
    pub chat_id: i64,
    pub title: String,
    pub username: Option<String>,
    pub kind: SourceKind,
    pub access_hash: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    NotFound(String),
    NotEligible(String),
    AccessDenied(String),
    Api(String),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::NotFound(r) => write!(f, "source not found: {}", r),
            SourceError::NotEligible(r) => write!(f, "source not eligible: {}", r),
            SourceError::AccessDenied(r) => write!(f, "history not readable: {}", r),
            SourceError::Api(e) => write!(f, "API error: {}", e),
        }
    }
}

impl std::error::Error for SourceError {}

/// Lazy, finite, non-restartable stream of messages in the source's native order.
#[async_trait]
pub trait MessageStream: Send {
    async fn next(&mut self) -> Result<Option<SourceMessage>, SourceError>;
}

/// The transport that resolves sources and reads their history.
#[async_trait]
pub trait MessageSource: Send + Sync {
    async fn resolve(&self, reference: &str) -> Result<SourceHandle, SourceError>;

    /// Total number of messages the source currently holds, or a best estimate.
    async fn estimate_total(&self, source: &SourceHandle) -> Result<usize, SourceError>;

    async fn iterate(
        &self,
        source: &SourceHandle,
        limit: usize,
    ) -> Result<Box<dyn MessageStream>, SourceError>;
}

/// Strip a leading `@` or a `t.me` URL down to the bare username.
pub fn normalize_reference(reference: &str) -> &str {
    let trimmed = reference.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    let bare = without_scheme
        .strip_prefix("t.me/")
        .or_else(|| without_scheme.strip_prefix("telegram.me/"))
        .unwrap_or(without_scheme);
    let bare = bare.strip_prefix('@').unwrap_or(bare);
    bare.split('/').next().unwrap_or(bare)
}
