//! # Dirty Tracker
//!
//! Records "local state has mutations the remote has not confirmed".
//!
//! ```text
//!   mutator ─► mark_dirty() ──┬─► dirty = true, last_mutation_at = now
//!                             └─► generation += 1 ──watch──► scheduler
//!                                                           (re-arms debounce)
//!   push ok  ─► clear() + record_push()
//!   forced / clean pull ─► clear()
//! ```
//!
//! Not persisted: a fresh process starts clean.

use chrono::{DateTime, Utc};
use std::sync::Mutex;
use tokio::sync::watch;

/// Point-in-time view of the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirtyStatus {
    pub dirty: bool,
    pub last_mutation_at: Option<DateTime<Utc>>,
    pub last_push_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct DirtyTracker {
    status: Mutex<DirtyStatus>,
    generation: watch::Sender<u64>,
}

impl Default for DirtyTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl DirtyTracker {
    pub fn new() -> Self {
        let (generation, _) = watch::channel(0);
        DirtyTracker {
            status: Mutex::new(DirtyStatus::default()),
            generation,
        }
    }

    /// Flags pending local changes. Called last by every mutator, even when
    /// the mutation changed nothing.
    pub fn mark_dirty(&self) {
        {
            let mut status = self.lock();
            status.dirty = true;
            status.last_mutation_at = Some(Utc::now());
        }
        self.generation.send_modify(|g| *g = g.wrapping_add(1));
    }

    /// Resets the flag after a confirmed push or an overriding pull.
    pub fn clear(&self) {
        self.lock().dirty = false;
    }

    /// Stores the time of the last successful push.
    pub fn record_push(&self, at: DateTime<Utc>) {
        self.lock().last_push_at = Some(at);
    }

    pub fn is_dirty(&self) -> bool {
        self.lock().dirty
    }

    pub fn snapshot(&self) -> DirtyStatus {
        *self.lock()
    }

    /// Number of `mark_dirty` calls so far.
    pub fn generation(&self) -> u64 {
        *self.generation.borrow()
    }

    /// Receiver that wakes on every `mark_dirty`.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DirtyStatus> {
        // The guarded data is plain Copy fields; a poisoned lock is still usable.
        self.status.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_clean() {
        let tracker = DirtyTracker::new();
        assert_eq!(tracker.snapshot(), DirtyStatus::default());
        assert_eq!(tracker.generation(), 0);
    }

    #[test]
    fn test_mark_clear_and_push_time() {
        let tracker = DirtyTracker::new();
        tracker.mark_dirty();
        let status = tracker.snapshot();
        assert!(status.dirty);
        assert!(status.last_mutation_at.is_some());

        let now = Utc::now();
        tracker.clear();
        tracker.record_push(now);
        let status = tracker.snapshot();
        assert!(!status.dirty);
        assert_eq!(status.last_push_at, Some(now));
        assert!(status.last_mutation_at.is_some());
    }

    #[tokio::test]
    async fn test_subscribers_see_every_mark() {
        let tracker = DirtyTracker::new();
        let mut rx = tracker.subscribe();

        tracker.mark_dirty();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), 1);

        tracker.mark_dirty();
        tracker.mark_dirty();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), 3);
    }
}
