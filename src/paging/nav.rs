use std::sync::Arc;

use crate::bot::responder::{EditOutcome, EventAck, MessageHandle, Responder, ResponderError};
use crate::session::{RequesterId, SessionStore};

use super::render::render;
use super::token::ActionToken;

pub const EXPIRED_NOTICE: &str = "These results have expired. Run /top again.";
pub const STALE_NOTICE: &str = "These results are out of date. Use the latest result message.";

/// A button press on a rendered page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationEvent {
    pub requester: RequesterId,
    pub token: ActionToken,
    /// Message the pressed button was attached to.
    pub message_id: i64,
    pub ack: EventAck,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavOutcome {
    /// No session for the requester.
    Expired,
    /// The event came from a message that no longer shows the session.
    Stale,
    Rendered { page: usize },
    /// The target page was already displayed.
    Unchanged { page: usize },
}

/// Turns button presses into page renders.
pub struct NavigationController {
    sessions: Arc<SessionStore>,
}

impl NavigationController {
    pub fn new(sessions: Arc<SessionStore>) -> Self {
        Self { sessions }
    }

    /// Apply `event` to the requester's session and edit the bound message.
    ///
    /// The session stays locked until the edit has completed, so presses for
    /// one requester are applied one at a time. The cursor only moves if the
    /// edit succeeded.
    pub async fn handle(
        &self,
        event: &NavigationEvent,
        responder: &dyn Responder,
    ) -> Result<NavOutcome, ResponderError> {
        let Some(mut session) = self.sessions.lock(event.requester).await else {
            log::debug!("Navigation from {} without a session", event.requester);
            responder.acknowledge(event.ack, Some(EXPIRED_NOTICE)).await?;
            return Ok(NavOutcome::Expired);
        };

        if session.bound_message_id != event.message_id {
            log::debug!(
                "Stale navigation from {}: message {} is not bound message {}",
                event.requester,
                event.message_id,
                session.bound_message_id
            );
            responder.acknowledge(event.ack, Some(STALE_NOTICE)).await?;
            return Ok(NavOutcome::Stale);
        }

        if event.token.page != session.current_page {
            log::debug!(
                "Navigation token page {} differs from current page {} for {}",
                event.token.page,
                session.current_page,
                event.requester
            );
        }

        let mut next = session.clone();
        next.current_page = session
            .current_page
            .saturating_add_signed(event.token.direction.delta())
            .min(session.max_page());
        let page = render(&next);

        let handle = MessageHandle {
            chat_id: event.requester,
            message_id: session.bound_message_id,
        };
        let edited = responder.edit(handle, &page.text, &page.controls).await;
        if let Err(e) = responder.acknowledge(event.ack, None).await {
            log::warn!("Failed to acknowledge navigation from {}: {}", event.requester, e);
        }

        let outcome = match edited? {
            EditOutcome::Edited => NavOutcome::Rendered { page: page.page },
            EditOutcome::Unchanged => NavOutcome::Unchanged { page: page.page },
        };
        session.current_page = page.page;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paging::token::Direction;
    use crate::session::Session;
    use crate::testing::{context, ranked, Recorded, RecordingResponder};
    use std::time::Duration;

    const REQUESTER: RequesterId = 42;
    const BOUND: i64 = 500;

    fn setup(items: usize) -> (Arc<SessionStore>, NavigationController) {
        let store = Arc::new(SessionStore::new(10, Duration::from_secs(3600)));
        store.put(REQUESTER, Session::new(ranked(items), context(300), 10, BOUND));
        let controller = NavigationController::new(Arc::clone(&store));
        (store, controller)
    }

    fn event(direction: Direction, page: usize, message_id: i64) -> NavigationEvent {
        NavigationEvent {
            requester: REQUESTER,
            token: ActionToken::new(direction, page),
            message_id,
            ack: EventAck { query_id: 7 },
        }
    }

    #[tokio::test]
    async fn test_next_advances_and_edits() {
        let (store, controller) = setup(25);
        let responder = RecordingResponder::default();

        let outcome = controller
            .handle(&event(Direction::Next, 0, BOUND), &responder)
            .await
            .unwrap();

        assert_eq!(outcome, NavOutcome::Rendered { page: 1 });
        assert_eq!(store.get(REQUESTER).await.unwrap().current_page, 1);
        let edits = responder.edits();
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].0.message_id, BOUND);
        assert!(edits[0].1.contains("Page 2 of 3"));
        assert_eq!(responder.acks(), vec![(7, None)]);
    }

    #[tokio::test]
    async fn test_prev_goes_back() {
        let (store, controller) = setup(25);
        store.mutate_page(REQUESTER, 2).await.unwrap();
        let responder = RecordingResponder::default();

        let outcome = controller
            .handle(&event(Direction::Prev, 2, BOUND), &responder)
            .await
            .unwrap();
        assert_eq!(outcome, NavOutcome::Rendered { page: 1 });
    }

    #[tokio::test]
    async fn test_expired_without_session() {
        let store = Arc::new(SessionStore::new(10, Duration::from_secs(3600)));
        let controller = NavigationController::new(store);
        let responder = RecordingResponder::default();

        let outcome = controller
            .handle(&event(Direction::Next, 0, BOUND), &responder)
            .await
            .unwrap();
        assert_eq!(outcome, NavOutcome::Expired);
        assert_eq!(responder.acks(), vec![(7, Some(EXPIRED_NOTICE.to_string()))]);
        assert!(responder.edits().is_empty());
    }

    #[tokio::test]
    async fn test_stale_message_leaves_session_untouched() {
        let (store, controller) = setup(25);
        let responder = RecordingResponder::default();
        let before = store.get(REQUESTER).await.unwrap();

        let outcome = controller
            .handle(&event(Direction::Next, 0, BOUND - 1), &responder)
            .await
            .unwrap();

        assert_eq!(outcome, NavOutcome::Stale);
        assert_eq!(store.get(REQUESTER).await.unwrap(), before);
        assert_eq!(responder.acks(), vec![(7, Some(STALE_NOTICE.to_string()))]);
        assert!(responder.edits().is_empty());
    }

    #[tokio::test]
    async fn test_next_past_end_is_clamped() {
        let (store, controller) = setup(25);
        store.mutate_page(REQUESTER, 2).await.unwrap();
        let responder = RecordingResponder::default().unchanged_edits();

        let outcome = controller
            .handle(&event(Direction::Next, 2, BOUND), &responder)
            .await
            .unwrap();
        assert_eq!(outcome, NavOutcome::Unchanged { page: 2 });
        assert_eq!(store.get(REQUESTER).await.unwrap().current_page, 2);
    }

    #[tokio::test]
    async fn test_prev_on_first_page_is_clamped() {
        let (store, controller) = setup(25);
        let responder = RecordingResponder::default();

        let outcome = controller
            .handle(&event(Direction::Prev, 0, BOUND), &responder)
            .await
            .unwrap();
        assert_eq!(outcome, NavOutcome::Rendered { page: 0 });
        assert_eq!(store.get(REQUESTER).await.unwrap().current_page, 0);
    }

    #[tokio::test]
    async fn test_failed_edit_keeps_cursor() {
        let (store, controller) = setup(25);
        let responder = RecordingResponder::default().failing_edits();

        let result = controller
            .handle(&event(Direction::Next, 0, BOUND), &responder)
            .await;
        assert!(result.is_err());
        assert_eq!(store.get(REQUESTER).await.unwrap().current_page, 0);
        // The press is still acknowledged.
        assert_eq!(responder.acks(), vec![(7, None)]);
        assert!(matches!(responder.log()[0], Recorded::Edit { .. }));
    }
}
