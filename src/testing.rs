//! In-memory collaborators shared by the unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::bot::responder::{EditOutcome, EventAck, MessageHandle, Responder, ResponderError};
use crate::paging::render::Control;
use crate::scanner::cancel::CancellationRegistry;
use crate::scanner::source::{
    MessageSource, MessageStream, ReactionCount, ReactionKind, SourceError, SourceHandle,
    SourceKind, SourceMessage,
};
use crate::scanner::{ProgressSink, RankedResultSet, ScanProgress, ScoredItem};
use crate::session::{DisplayContext, RequesterId};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn channel(username: &str) -> SourceHandle {
    SourceHandle {
        chat_id: -1001234567890,
        title: format!("{} title", username),
        username: Some(username.to_string()),
        kind: SourceKind::Channel,
        access_hash: Some(12345),
    }
}

/// A text message carrying `score` heart reactions.
pub fn message_with_score(id: i64, score: i64) -> SourceMessage {
    let reactions = if score == 0 {
        vec![]
    } else {
        vec![ReactionCount {
            kind: ReactionKind::Emoji("❤".to_string()),
            count: score,
        }]
    };
    SourceMessage {
        id,
        text: Some(format!("post {}", id)),
        has_media: false,
        reactions,
    }
}

/// `n` items with strictly decreasing scores and message ids 1000, 999, ...
pub fn ranked(n: usize) -> RankedResultSet {
    let items = (0..n)
        .map(|i| ScoredItem {
            score: (n - i) as u64,
            message_id: 1000 - i as i64,
            preview: format!("post {}", 1000 - i as i64),
            position: i,
        })
        .collect();
    RankedResultSet::from_unsorted(items, n.max(1))
}

pub fn context(total_scanned: usize) -> DisplayContext {
    DisplayContext {
        channel_label: "@durov".to_string(),
        link_prefix: "https://t.me/durov/".to_string(),
        total_scanned,
    }
}

pub struct FakeSource {
    name: String,
    handle: SourceHandle,
    messages: Vec<SourceMessage>,
    failure: Option<(usize, SourceError)>,
    gate: Option<(usize, Arc<Notify>)>,
    estimate_failure: Option<SourceError>,
    iterate_failure: Option<SourceError>,
}

impl FakeSource {
    pub fn new(handle: SourceHandle, messages: Vec<SourceMessage>) -> Self {
        Self {
            name: handle.username.clone().unwrap_or_default(),
            handle,
            messages,
            failure: None,
            gate: None,
            estimate_failure: None,
            iterate_failure: None,
        }
    }

    /// Resolve under `name` instead of the handle's username.
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Fail the stream once `count` messages have been yielded.
    pub fn fail_after(mut self, count: usize, error: SourceError) -> Self {
        self.failure = Some((count, error));
        self
    }

    pub fn failing_estimate(mut self, error: SourceError) -> Self {
        self.estimate_failure = Some(error);
        self
    }

    pub fn failing_iterate(mut self, error: SourceError) -> Self {
        self.iterate_failure = Some(error);
        self
    }

    /// Block the stream before message `index` until `gate` is notified.
    pub fn pause_at(mut self, index: usize, gate: Arc<Notify>) -> Self {
        self.gate = Some((index, gate));
        self
    }
}

#[async_trait]
impl MessageSource for FakeSource {
    async fn resolve(&self, reference: &str) -> Result<SourceHandle, SourceError> {
        if reference == self.name {
            Ok(self.handle.clone())
        } else {
            Err(SourceError::NotFound(reference.to_string()))
        }
    }

    async fn estimate_total(&self, _source: &SourceHandle) -> Result<usize, SourceError> {
        if let Some(error) = &self.estimate_failure {
            return Err(error.clone());
        }
        Ok(self.messages.len())
    }

    async fn iterate(
        &self,
        _source: &SourceHandle,
        limit: usize,
    ) -> Result<Box<dyn MessageStream>, SourceError> {
        if let Some(error) = &self.iterate_failure {
            return Err(error.clone());
        }
        Ok(Box::new(FakeStream {
            messages: self.messages.iter().take(limit).cloned().collect(),
            yielded: 0,
            failure: self.failure.clone(),
            gate: self.gate.clone(),
        }))
    }
}

struct FakeStream {
    messages: VecDeque<SourceMessage>,
    yielded: usize,
    failure: Option<(usize, SourceError)>,
    gate: Option<(usize, Arc<Notify>)>,
}

#[async_trait]
impl MessageStream for FakeStream {
    async fn next(&mut self) -> Result<Option<SourceMessage>, SourceError> {
        if let Some((count, error)) = &self.failure {
            if self.yielded == *count {
                return Err(error.clone());
            }
        }
        if self.gate.as_ref().map(|(index, _)| *index) == Some(self.yielded) {
            if let Some((_, gate)) = self.gate.take() {
                gate.notified().await;
            }
        }
        let next = self.messages.pop_front();
        if next.is_some() {
            self.yielded += 1;
        }
        Ok(next)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Send {
        chat: RequesterId,
        text: String,
        message_id: i64,
    },
    Edit {
        handle: MessageHandle,
        text: String,
        controls: Vec<Control>,
    },
    Delete {
        handle: MessageHandle,
    },
    Ack {
        query_id: i64,
        notice: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum EditMode {
    #[default]
    Edited,
    Unchanged,
    Fail,
}

/// Records every call; sent messages get ids 1, 2, 3, ...
#[derive(Default)]
pub struct RecordingResponder {
    log: Mutex<Vec<Recorded>>,
    next_id: AtomicI64,
    edit_mode: EditMode,
    failures_left: AtomicUsize,
}

impl RecordingResponder {
    pub fn unchanged_edits(mut self) -> Self {
        self.edit_mode = EditMode::Unchanged;
        self
    }

    pub fn failing_edits(mut self) -> Self {
        self.edit_mode = EditMode::Fail;
        self
    }

    /// Fail only the first `count` edits.
    pub fn failing_first_edits(self, count: usize) -> Self {
        self.failures_left.store(count, Ordering::SeqCst);
        self
    }

    fn record(&self, entry: Recorded) {
        self.log.lock().unwrap().push(entry);
    }

    pub fn log(&self) -> Vec<Recorded> {
        self.log.lock().unwrap().clone()
    }

    pub fn sends(&self) -> Vec<(RequesterId, String)> {
        self.log()
            .into_iter()
            .filter_map(|r| match r {
                Recorded::Send { chat, text, .. } => Some((chat, text)),
                _ => None,
            })
            .collect()
    }

    pub fn edits(&self) -> Vec<(MessageHandle, String, Vec<Control>)> {
        self.log()
            .into_iter()
            .filter_map(|r| match r {
                Recorded::Edit {
                    handle,
                    text,
                    controls,
                } => Some((handle, text, controls)),
                _ => None,
            })
            .collect()
    }

    pub fn acks(&self) -> Vec<(i64, Option<String>)> {
        self.log()
            .into_iter()
            .filter_map(|r| match r {
                Recorded::Ack { query_id, notice } => Some((query_id, notice)),
                _ => None,
            })
            .collect()
    }

    /// Text of the last send or edit.
    pub fn last_text(&self) -> Option<String> {
        self.log().into_iter().rev().find_map(|r| match r {
            Recorded::Send { text, .. } | Recorded::Edit { text, .. } => Some(text),
            _ => None,
        })
    }
}

#[async_trait]
impl Responder for RecordingResponder {
    async fn send(&self, chat: RequesterId, text: &str) -> Result<MessageHandle, ResponderError> {
        let message_id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.record(Recorded::Send {
            chat,
            text: text.to_string(),
            message_id,
        });
        Ok(MessageHandle {
            chat_id: chat,
            message_id,
        })
    }

    async fn edit(
        &self,
        handle: MessageHandle,
        text: &str,
        controls: &[Control],
    ) -> Result<EditOutcome, ResponderError> {
        self.record(Recorded::Edit {
            handle,
            text: text.to_string(),
            controls: controls.to_vec(),
        });
        let fail_now = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if fail_now {
            return Err(ResponderError::Api("MESSAGE_ID_INVALID".to_string()));
        }
        match self.edit_mode {
            EditMode::Edited => Ok(EditOutcome::Edited),
            EditMode::Unchanged => Ok(EditOutcome::Unchanged),
            EditMode::Fail => Err(ResponderError::Api("MESSAGE_ID_INVALID".to_string())),
        }
    }

    async fn delete(&self, handle: MessageHandle) -> Result<(), ResponderError> {
        self.record(Recorded::Delete { handle });
        Ok(())
    }

    async fn acknowledge(
        &self,
        ack: EventAck,
        notice: Option<&str>,
    ) -> Result<(), ResponderError> {
        self.record(Recorded::Ack {
            query_id: ack.query_id,
            notice: notice.map(str::to_string),
        });
        Ok(())
    }
}

/// Collects progress; optionally cancels a scan on the first report.
#[derive(Default)]
pub struct RecordingProgress {
    reports: Mutex<Vec<ScanProgress>>,
    cancel: Option<(Arc<CancellationRegistry>, RequesterId)>,
}

impl RecordingProgress {
    pub fn cancelling(registry: Arc<CancellationRegistry>, requester: RequesterId) -> Self {
        Self {
            reports: Mutex::new(Vec::new()),
            cancel: Some((registry, requester)),
        }
    }

    pub fn reports(&self) -> Vec<ScanProgress> {
        self.reports.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProgressSink for RecordingProgress {
    async fn report(&self, progress: ScanProgress) {
        self.reports.lock().unwrap().push(progress);
        if let Some((registry, requester)) = &self.cancel {
            registry.cancel(*requester);
        }
    }
}
