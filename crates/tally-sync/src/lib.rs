//! # tally-sync: State Owner and Sync Engine for Tally POS
//!
//! Owns a station's in-memory dataset, writes it behind to the durable
//! store and reconciles it with the remote snapshot store.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Station Runtime                                 │
//! │                                                                         │
//! │  caller ──► AppState ──────────────┬──► PersistenceWriter ──► SQLite   │
//! │             (dataset + ledger)     │    (coalesced, per collection)     │
//! │                  │                 │                                    │
//! │                  │ mark_dirty      └──► DirtyTracker ──watch──┐         │
//! │                  ▼                                           ▼         │
//! │          ReconciliationEngine ◄──────────────────────── SyncScheduler  │
//! │          push / pull / arbitration                      interval +     │
//! │                  │                                      debounce       │
//! │                  ▼                                                      │
//! │          RemoteTransport (HttpRemote)   NotificationSink (tracing)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`state`] - `AppState`, the single source of truth and its mutators
//! - [`dirty`] - Pending-changes flag with a watch channel
//! - [`persist`] - Debounced write-behind to the durable store
//! - [`engine`] - Push/pull with single-flight guard and safety check
//! - [`scheduler`] - Interval and debounce triggers
//! - [`remote`] - Snapshot transport trait and HTTP implementation
//! - [`notify`] - User-facing notices
//! - [`config`] - Station configuration (TOML + environment)
//! - [`error`] - Sync error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tally_sync::{persist, AppState, HttpRemote, ReconciliationEngine, SyncConfig, SyncScheduler, TracingNotifier};
//!
//! let config = SyncConfig::load_or_default(None);
//! let (handle, writer) = persist::channel(db.store(), config.sync.persist_debounce());
//! tokio::spawn(writer.run());
//!
//! let dataset = AppState::load_from_store(&db.store()).await;
//! let state = Arc::new(AppState::with_persistence(dataset, handle));
//! let engine = Arc::new(ReconciliationEngine::new(
//!     state.clone(),
//!     Arc::new(HttpRemote::new(config.sync.request_timeout())?),
//!     Arc::new(TracingNotifier),
//! ));
//! let scheduler = SyncScheduler::from_settings(engine, &config.sync).spawn();
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod dirty;
pub mod engine;
pub mod error;
pub mod notify;
pub mod persist;
pub mod remote;
pub mod scheduler;
pub mod state;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{DeviceConfig, StorageSettings, SyncConfig, SyncSettings};
pub use dirty::{DirtyStatus, DirtyTracker};
pub use engine::{Phase, PullOutcome, PushOutcome, PushRequest, ReconciliationEngine};
pub use error::{SyncError, SyncResult};
pub use notify::{NoOpNotifier, NotificationSink, Severity, TracingNotifier};
pub use persist::{PersistHandle, PersistenceWriter};
pub use remote::{HttpRemote, RemoteEndpoint, RemoteTransport};
pub use scheduler::{SchedulerHandle, SyncScheduler};
pub use state::AppState;
