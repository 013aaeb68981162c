//! Per-session mutual exclusion.
//!
//! Messages for one session are processed one at a time; different
//! sessions never block each other. Locks are created on first use and
//! swept periodically once idle and unheld.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::domain::foundation::SessionKey;

const SWEEP_EVERY_ACQUISITIONS: u64 = 256;

struct LockEntry {
    mutex: Arc<Mutex<()>>,
    last_used: Instant,
}

/// Registry of per-session locks.
pub struct SessionLocks {
    entries: DashMap<SessionKey, LockEntry>,
    idle_ttl: Duration,
    acquisitions: AtomicU64,
}

/// Held lock for one session. Released on drop.
pub struct SessionGuard {
    _guard: OwnedMutexGuard<()>,
}

impl SessionLocks {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            idle_ttl,
            acquisitions: AtomicU64::new(0),
        }
    }

    /// Waits for exclusive access to a session.
    ///
    /// Waiters are served in the order they called `acquire`.
    pub async fn acquire(&self, key: &SessionKey) -> SessionGuard {
        self.sweep_if_due();

        let mutex = {
            let mut entry = self.entries.entry(key.clone()).or_insert_with(|| LockEntry {
                mutex: Arc::new(Mutex::new(())),
                last_used: Instant::now(),
            });
            entry.last_used = Instant::now();
            Arc::clone(&entry.mutex)
        };

        SessionGuard {
            _guard: mutex.lock_owned().await,
        }
    }

    /// Drops locks idle longer than the idle TTL that nobody holds or awaits.
    ///
    /// Returns the number of locks removed.
    pub fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| {
            Arc::strong_count(&entry.mutex) > 1 || now.duration_since(entry.last_used) < self.idle_ttl
        });
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, remaining = self.entries.len(), "evicted idle session locks");
        }
        removed
    }

    /// Number of registered locks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn sweep_if_due(&self) {
        let seen = self.acquisitions.fetch_add(1, Ordering::Relaxed) + 1;
        if seen % SWEEP_EVERY_ACQUISITIONS == 0 {
            self.evict_idle();
        }
    }
}

impl std::fmt::Debug for SessionLocks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLocks")
            .field("locks", &self.entries.len())
            .field("idle_ttl", &self.idle_ttl)
            .finish()
    }
}
