use std::sync::Arc;

use async_trait::async_trait;

use super::command::{self, Command, TopRequest, USAGE};
use super::responder::{EditOutcome, MessageHandle, Responder, ResponderError};
use crate::config::{PagingSettings, ScanSettings};
use crate::paging::nav::{NavOutcome, NavigationController, NavigationEvent};
use crate::paging::render::{inline_code, no_results_text, render};
use crate::scanner::cancel::CancellationRegistry;
use crate::scanner::pipeline::ScanPipeline;
use crate::scanner::source::MessageSource;
use crate::scanner::{ProgressSink, ScanError, ScanOutcome, ScanProgress};
use crate::session::{RequesterId, Session, SessionStore};

/// Routes chat commands and button presses for every requester.
pub struct Bot {
    pipeline: ScanPipeline,
    sessions: Arc<SessionStore>,
    cancellations: Arc<CancellationRegistry>,
    navigation: NavigationController,
    responder: Arc<dyn Responder>,
    page_size: usize,
}

impl Bot {
    pub fn new(
        source: Arc<dyn MessageSource>,
        responder: Arc<dyn Responder>,
        scan: ScanSettings,
        paging: &PagingSettings,
    ) -> Self {
        let sessions = Arc::new(SessionStore::from_settings(paging));
        Self {
            pipeline: ScanPipeline::new(source, scan),
            navigation: NavigationController::new(Arc::clone(&sessions)),
            sessions,
            cancellations: Arc::new(CancellationRegistry::new()),
            responder,
            page_size: paging.page_size,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn cancellations(&self) -> &CancellationRegistry {
        &self.cancellations
    }

    /// Handle a text message from `requester`. Non-commands are ignored.
    pub async fn handle_text(&self, requester: RequesterId, text: &str) -> Result<(), ResponderError> {
        let Some(command) = command::parse(text, self.pipeline.settings()) else {
            return Ok(());
        };
        log::info!("Command from {}: {}", requester, text.trim());

        match command {
            Command::Top(request) => self.run_top(requester, request).await,
            Command::Cancel => {
                let reply = if self.cancellations.cancel(requester) {
                    "🛑 Stopping the scan…"
                } else {
                    "No scan is running."
                };
                self.responder.send(requester, reply).await.map(|_| ())
            }
            Command::Help | Command::BadTop => {
                self.responder.send(requester, USAGE).await.map(|_| ())
            }
        }
    }

    pub async fn handle_navigation(&self, event: NavigationEvent) -> Result<NavOutcome, ResponderError> {
        self.navigation.handle(&event, self.responder.as_ref()).await
    }

    async fn run_top(&self, requester: RequesterId, request: TopRequest) -> Result<(), ResponderError> {
        let Ok(guard) = self.cancellations.register(requester) else {
            self.responder
                .send(
                    requester,
                    "⏳ A scan is already running. Wait for it to finish or send /cancel.",
                )
                .await?;
            return Ok(());
        };

        let settings = self.pipeline.settings();
        if request.clamped {
            self.responder
                .send(
                    requester,
                    &format!(
                        "😅 To prevent abuse, scans are limited to **{}** messages.",
                        settings.max_limit
                    ),
                )
                .await?;
        }

        let status = self
            .responder
            .send(
                requester,
                &format!(
                    "OK, scanning the latest **{}** messages of {}, please wait…",
                    request.limit,
                    inline_code(&request.reference)
                ),
            )
            .await
            .map_err(|e| {
                log::error!("Failed to send status message to {}: {}", requester, e);
                e
            })?;

        let progress = EditProgress {
            responder: Arc::clone(&self.responder),
            handle: status,
            reference: request.reference.clone(),
        };
        let outcome = self
            .pipeline
            .scan(&request.reference, request.limit, &guard, &progress)
            .await;

        match outcome {
            Ok(ScanOutcome::Completed(report)) if report.ranked.is_empty() => {
                self.show(status, &no_results_text(&report.context)).await
            }
            Ok(ScanOutcome::Completed(report)) => {
                let session = Session::new(
                    report.ranked,
                    report.context,
                    self.page_size,
                    status.message_id,
                );
                let page = render(&session);
                // Stored only once the bound message carries its controls.
                self.responder
                    .edit(status, &page.text, &page.controls)
                    .await?;
                self.sessions.put(requester, session);
                Ok(())
            }
            Ok(ScanOutcome::Cancelled { scanned }) => {
                if let Err(e) = self.responder.delete(status).await {
                    log::warn!("Failed to delete status message for {}: {}", requester, e);
                }
                self.responder
                    .send(
                        requester,
                        &format!(
                            "🛑 Scan of {} cancelled after {} messages.",
                            inline_code(&request.reference),
                            scanned
                        ),
                    )
                    .await
                    .map(|_| ())
            }
            Err(e) => {
                match &e {
                    ScanError::Failed(detail) => log::error!(
                        "Scan of {} for requester {} failed: {}",
                        request.reference,
                        requester,
                        detail
                    ),
                    other => log::info!(
                        "Scan of {} for requester {} rejected: {}",
                        request.reference,
                        requester,
                        other
                    ),
                }
                self.show(status, &error_text(&e)).await
            }
        }
    }

    async fn show(&self, handle: MessageHandle, text: &str) -> Result<(), ResponderError> {
        self.responder.edit(handle, text, &[]).await.map(|_| ())
    }
}

/// User-facing text for a failed scan.
pub fn error_text(error: &ScanError) -> String {
    match error {
        ScanError::NotFound(r) => format!(
            "❌ **Error**: no channel or user named {} was found. Check the spelling.",
            inline_code(r)
        ),
        ScanError::AccessDenied(r) => format!(
            "❌ **Error**: I can't read the message history of {}. It may be private.",
            inline_code(r)
        ),
        ScanError::NotEligible(r) => format!(
            "❌ **Error**: {} doesn't look like a public channel, or I can't access it.",
            inline_code(r)
        ),
        ScanError::Failed(detail) => {
            format!("Something went wrong!\nError: {}", inline_code(detail))
        }
    }
}

/// Shows scan progress by editing the status message.
struct EditProgress {
    responder: Arc<dyn Responder>,
    handle: MessageHandle,
    reference: String,
}

#[async_trait]
impl ProgressSink for EditProgress {
    async fn report(&self, progress: ScanProgress) {
        let text = format!(
            "⏳ Scanning {}: **{}** / **{}** messages, **{}** with reactions so far…",
            inline_code(&self.reference),
            progress.processed,
            progress.target,
            progress.qualifying
        );
        match self.responder.edit(self.handle, &text, &[]).await {
            Ok(EditOutcome::Edited) | Ok(EditOutcome::Unchanged) => {}
            Err(e) => log::warn!("Failed to update progress for {}: {}", self.reference, e),
        }
    }
}
