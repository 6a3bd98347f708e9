use async_trait::async_trait;

use crate::paging::render::Control;
use crate::session::RequesterId;

/// An outbound message the bot can later edit or delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageHandle {
    pub chat_id: RequesterId,
    pub message_id: i64,
}

/// Identifies a button press so the client can stop its spinner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventAck {
    pub query_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Edited,
    /// The message already showed this content.
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponderError {
    Api(String),
}

impl std::fmt::Display for ResponderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponderError::Api(e) => write!(f, "responder error: {}", e),
        }
    }
}

impl std::error::Error for ResponderError {}

/// The outbound messaging channel. Texts are Markdown.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn send(&self, chat: RequesterId, text: &str) -> Result<MessageHandle, ResponderError>;

    async fn edit(
        &self,
        handle: MessageHandle,
        text: &str,
        controls: &[Control],
    ) -> Result<EditOutcome, ResponderError>;

    async fn delete(&self, handle: MessageHandle) -> Result<(), ResponderError>;

    /// Complete a button press, optionally showing `notice` to the user.
    async fn acknowledge(&self, ack: EventAck, notice: Option<&str>)
        -> Result<(), ResponderError>;
}
