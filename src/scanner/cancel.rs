use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::session::RequesterId;

/// Per-requester cancellation flags for in-flight scans.
///
/// A flag exists only while its [`ScanGuard`] is alive, so every exit path of a
/// scan (success, cancellation, error, panic) removes it.
#[derive(Default)]
pub struct CancellationRegistry {
    flags: Mutex<HashMap<RequesterId, Arc<AtomicBool>>>,
}

/// Returned by [`CancellationRegistry::register`] when a scan is already running.
#[derive(Debug, PartialEq, Eq)]
pub struct ScanInProgress;

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<RequesterId, Arc<AtomicBool>>> {
        // A poisoned map still holds valid flags.
        self.flags.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start tracking a scan for `requester`. At most one scan per requester.
    pub fn register(self: &Arc<Self>, requester: RequesterId) -> Result<ScanGuard, ScanInProgress> {
        let mut flags = self.lock();
        if flags.contains_key(&requester) {
            return Err(ScanInProgress);
        }
        let flag = Arc::new(AtomicBool::new(false));
        flags.insert(requester, Arc::clone(&flag));
        Ok(ScanGuard {
            registry: Arc::clone(self),
            requester,
            flag,
        })
    }

    /// Signal the requester's running scan to stop. Returns false if none runs.
    pub fn cancel(&self, requester: RequesterId) -> bool {
        match self.lock().get(&requester) {
            Some(flag) => {
                flag.store(true, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self, requester: RequesterId) -> bool {
        self.lock().contains_key(&requester)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Ownership of one requester's cancellation flag for the duration of a scan.
pub struct ScanGuard {
    registry: Arc<CancellationRegistry>,
    requester: RequesterId,
    flag: Arc<AtomicBool>,
}

impl ScanGuard {
    pub fn requester(&self) -> RequesterId {
        self.requester
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

impl Drop for ScanGuard {
    fn drop(&mut self) {
        let mut flags = self.registry.lock();
        if let Some(current) = flags.get(&self.requester) {
            if Arc::ptr_eq(current, &self.flag) {
                flags.remove(&self.requester);
            }
        }
    }
}
