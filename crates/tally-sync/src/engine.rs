//! # Reconciliation Engine
//!
//! Pushes the local dataset to the remote snapshot store and pulls it back,
//! deciding which side wins.
//!
//! ## Phase Machine
//! ```text
//!            push()                         pull()
//!   ┌──────┐ ─────► ┌─────────┐    ┌──────┐ ─────► ┌─────────┐
//!   │ Idle │        │ Pushing │    │ Idle │        │ Pulling │
//!   └──────┘ ◄───── └─────────┘    └──────┘ ◄───── └─────────┘
//!            done / failed                 done / failed
//!
//!   Any request while not Idle returns Busy immediately (never queued).
//! ```
//!
//! ## Arbitration
//! ```text
//!   pull(force = false) while dirty ──► push()        local wins
//!   pull(force = true)               ──► replace       remote wins
//!   push() on an emptied dataset     ──► SafetyBlocked unless manual/force
//! ```
//!
//! Failures leave the dataset and the dirty flag as they were, raise an
//! error notification and come back as [`crate::SyncError`]. The next scheduled
//! cycle retries.

use chrono::{Duration as ChronoDuration, Utc};
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex};
use tally_core::Collection;
use tracing::{debug, info, warn};

use crate::error::SyncResult;
use crate::notify::{NotificationSink, Severity};
use crate::remote::{RemoteEndpoint, RemoteTransport};
use crate::state::AppState;

/// Ten years; keeps a misconfigured window inside chrono's range.
const MAX_WINDOW_HOURS: i64 = 24 * 365 * 10;

// =============================================================================
// Requests and Outcomes
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Pushing,
    Pulling,
}

/// Options of one push.
#[derive(Debug, Clone, Default)]
pub struct PushRequest {
    /// Top-level snapshot fields replaced just before sending.
    pub overrides: Option<Map<String, Value>>,
    /// Started by the user ("sync now"); skips the safety check.
    pub manual: bool,
    /// Explicit override; skips the safety check.
    pub force: bool,
}

impl PushRequest {
    pub fn manual() -> Self {
        PushRequest {
            manual: true,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PushOutcome {
    Pushed,
    /// Another push or pull is in flight.
    Busy,
    /// The dataset looks wiped; sending it could erase the remote copy.
    SafetyBlocked,
    /// Cloud sync is off or has no URL.
    Disabled,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PullOutcome {
    /// Remote snapshot applied; lists the collections it replaced.
    Pulled { applied: Vec<Collection> },
    /// The remote holds nothing; local state unchanged.
    RemoteEmpty,
    /// Local changes were pending, so a push ran instead.
    Redirected(PushOutcome),
    Busy,
    Disabled,
}

// =============================================================================
// Single-Flight Guard
// =============================================================================

/// Holds the phase for the duration of one operation; resets to Idle on drop.
struct FlightGuard<'a> {
    phase: &'a Mutex<Phase>,
}

impl<'a> FlightGuard<'a> {
    fn try_begin(phase: &'a Mutex<Phase>, next: Phase) -> Option<Self> {
        let mut current = phase.lock().unwrap_or_else(|e| e.into_inner());
        if *current != Phase::Idle {
            return None;
        }
        *current = next;
        Some(FlightGuard { phase })
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        *self.phase.lock().unwrap_or_else(|e| e.into_inner()) = Phase::Idle;
    }
}

// =============================================================================
// Engine
// =============================================================================

pub struct ReconciliationEngine {
    state: Arc<AppState>,
    transport: Arc<dyn RemoteTransport>,
    notifier: Arc<dyn NotificationSink>,
    phase: Mutex<Phase>,
}

impl ReconciliationEngine {
    pub fn new(
        state: Arc<AppState>,
        transport: Arc<dyn RemoteTransport>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        ReconciliationEngine {
            state,
            transport,
            notifier,
            phase: Mutex::new(Phase::Idle),
        }
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        *self.phase.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Remote endpoint from `Settings.cloudSync`, or `None` when sync is off.
    pub fn endpoint(&self) -> Option<RemoteEndpoint> {
        self.state.read(|ds| {
            ds.settings
                .cloud_sync
                .endpoint()
                .map(|(url, secret)| RemoteEndpoint::new(url, secret.map(str::to_string)))
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.endpoint().is_some()
    }

    // -------------------------------------------------------------------------
    // Push
    // -------------------------------------------------------------------------

    /// Sends the full local snapshot to the remote store.
    pub async fn push(&self, request: PushRequest) -> SyncResult<PushOutcome> {
        let Some(endpoint) = self.endpoint() else {
            debug!("Push skipped, cloud sync disabled");
            return Ok(PushOutcome::Disabled);
        };
        let Some(_guard) = FlightGuard::try_begin(&self.phase, Phase::Pushing) else {
            debug!("Push skipped, reconciliation in flight");
            return Ok(PushOutcome::Busy);
        };

        if !request.manual && !request.force && self.looks_wiped() {
            warn!("Push blocked: no products, no customers and no recent activity");
            self.notifier.notify(
                "Sync paused",
                "The local data looks empty. Upload was skipped to protect the cloud copy; sync manually to override.",
                Severity::Warning,
            );
            return Ok(PushOutcome::SafetyBlocked);
        }

        let mut snapshot = self.state.snapshot_value()?;
        if let (Some(overrides), Value::Object(fields)) = (request.overrides, &mut snapshot) {
            fields.extend(overrides);
        }

        if let Err(e) = self.transport.push_snapshot(&endpoint, &snapshot).await {
            warn!(error = %e, retryable = e.is_retryable(), "Push failed");
            self.notifier
                .notify("Cloud upload failed", &e.to_string(), Severity::Error);
            return Err(e);
        }

        let now = Utc::now();
        self.state.dirty().clear();
        self.state.dirty().record_push(now);
        info!(manual = request.manual, forced = request.force, "Snapshot pushed");
        Ok(PushOutcome::Pushed)
    }

    /// Zero products, zero customers and no activity inside the window.
    fn looks_wiped(&self) -> bool {
        self.state.read(|ds| {
            if !ds.looks_empty() {
                return false;
            }
            let hours = ds.settings.safety.recent_activity_window_hours.clamp(0, MAX_WINDOW_HOURS);
            let window = ChronoDuration::hours(hours);
            let cutoff = Utc::now() - window;
            !ds.activity_logs.iter().any(|log| log.created_at >= cutoff)
        })
    }

    // -------------------------------------------------------------------------
    // Pull
    // -------------------------------------------------------------------------

    /// Fetches the remote snapshot and applies it.
    ///
    /// Without `force`, pending local changes win and a push runs instead.
    pub async fn pull(&self, force: bool) -> SyncResult<PullOutcome> {
        let Some(endpoint) = self.endpoint() else {
            debug!("Pull skipped, cloud sync disabled");
            return Ok(PullOutcome::Disabled);
        };

        if !force && self.state.dirty().is_dirty() {
            debug!("Local changes pending, pushing instead of pulling");
            let outcome = self.push(PushRequest::default()).await?;
            return Ok(PullOutcome::Redirected(outcome));
        }

        let Some(_guard) = FlightGuard::try_begin(&self.phase, Phase::Pulling) else {
            debug!("Pull skipped, reconciliation in flight");
            return Ok(PullOutcome::Busy);
        };

        let remote = match self.transport.pull_snapshot(&endpoint).await {
            Ok(remote) => remote,
            Err(e) => {
                warn!(error = %e, retryable = e.is_retryable(), "Pull failed");
                self.notifier
                    .notify("Cloud download failed", &e.to_string(), Severity::Error);
                return Err(e);
            }
        };

        let Some(remote) = remote else {
            debug!("Remote store is empty");
            return Ok(PullOutcome::RemoteEmpty);
        };

        let applied = self.state.apply_remote(&remote);
        self.state.dirty().clear();
        info!(forced = force, collections = applied.len(), "Remote snapshot applied");
        Ok(PullOutcome::Pulled { applied })
    }

    /// One interval cycle: push when dirty, pull otherwise.
    pub async fn sync_cycle(&self) -> SyncResult<()> {
        if self.state.dirty().is_dirty() {
            self.push(PushRequest::default()).await?;
        } else {
            self.pull(false).await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for ReconciliationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationEngine")
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
