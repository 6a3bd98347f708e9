use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::time::Instant;

use crate::config::PagingSettings;
use crate::scanner::RankedResultSet;

/// Chat or user on whose behalf scans and navigation happen.
pub type RequesterId = i64;

/// Describes where a result set came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayContext {
    pub channel_label: String,
    pub link_prefix: String,
    pub total_scanned: usize,
}

/// One requester's browsable result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub results: Arc<RankedResultSet>,
    pub current_page: usize,
    pub page_size: usize,
    pub context: DisplayContext,
    /// Outbound message currently showing this session.
    pub bound_message_id: i64,
}

impl Session {
    pub fn new(
        results: RankedResultSet,
        context: DisplayContext,
        page_size: usize,
        bound_message_id: i64,
    ) -> Self {
        Self {
            results: Arc::new(results),
            current_page: 0,
            page_size: page_size.max(1),
            context,
            bound_message_id,
        }
    }

    /// Never less than 1, even for an empty result set.
    pub fn total_pages(&self) -> usize {
        self.results.len().div_ceil(self.page_size).max(1)
    }

    pub fn max_page(&self) -> usize {
        self.total_pages() - 1
    }
}

struct Slot {
    session: Arc<AsyncMutex<Session>>,
    last_used: Instant,
}

/// Process-wide sessions keyed by requester.
///
/// Each session sits behind its own async lock so concurrent events for one
/// requester are serialized without blocking other requesters. Holds at most
/// `max_sessions` entries (least recently used is evicted) and drops entries
/// idle for longer than `ttl`.
pub struct SessionStore {
    slots: Mutex<HashMap<RequesterId, Slot>>,
    max_sessions: usize,
    ttl: Duration,
}

/// Exclusive access to one requester's session.
pub type SessionLock = OwnedMutexGuard<Session>;

impl SessionStore {
    pub fn new(max_sessions: usize, ttl: Duration) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            max_sessions: max_sessions.max(1),
            ttl,
        }
    }

    pub fn from_settings(settings: &PagingSettings) -> Self {
        Self::new(settings.max_sessions, settings.session_ttl())
    }

    fn lock_slots(&self) -> MutexGuard<'_, HashMap<RequesterId, Slot>> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the requester's session. The previous one is discarded.
    pub fn put(&self, requester: RequesterId, session: Session) {
        let now = Instant::now();
        let mut slots = self.lock_slots();
        slots.retain(|_, slot| now.duration_since(slot.last_used) <= self.ttl);

        if !slots.contains_key(&requester) && slots.len() >= self.max_sessions {
            let oldest = slots
                .iter()
                .min_by_key(|(_, slot)| slot.last_used)
                .map(|(id, _)| *id);
            if let Some(id) = oldest {
                log::debug!("Evicting session of requester {}", id);
                slots.remove(&id);
            }
        }

        slots.insert(
            requester,
            Slot {
                session: Arc::new(AsyncMutex::new(session)),
                last_used: now,
            },
        );
    }

    fn slot(&self, requester: RequesterId) -> Option<Arc<AsyncMutex<Session>>> {
        let now = Instant::now();
        let mut slots = self.lock_slots();
        match slots.get_mut(&requester) {
            None => return None,
            Some(slot) if now.duration_since(slot.last_used) <= self.ttl => {
                slot.last_used = now;
                return Some(Arc::clone(&slot.session));
            }
            Some(_) => {}
        }
        log::debug!("Session of requester {} expired", requester);
        slots.remove(&requester);
        None
    }

    pub async fn get(&self, requester: RequesterId) -> Option<Session> {
        let session = self.slot(requester)?;
        let guard = session.lock().await;
        Some(guard.clone())
    }

    /// Hold the requester's session exclusively until the guard is dropped.
    pub async fn lock(&self, requester: RequesterId) -> Option<SessionLock> {
        let session = self.slot(requester)?;
        Some(session.lock_owned().await)
    }

    /// Move the cursor by `delta` pages. Bounds are the caller's concern;
    /// only the floor at page 0 is implied by the index type.
    pub async fn mutate_page(&self, requester: RequesterId, delta: isize) -> Option<Session> {
        let mut guard = self.lock(requester).await?;
        guard.current_page = guard.current_page.saturating_add_signed(delta);
        Some(guard.clone())
    }

    pub fn remove(&self, requester: RequesterId) -> bool {
        self.lock_slots().remove(&requester).is_some()
    }

    pub fn contains(&self, requester: RequesterId) -> bool {
        self.lock_slots().contains_key(&requester)
    }

    pub fn len(&self) -> usize {
        self.lock_slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
