//! # Tally Station
//!
//! Headless runtime of one point-of-sale station.
//!
//! ## Module Organization
//! ```text
//! tally_station/
//! ├── lib.rs      ◄─── You are here (startup, shutdown)
//! ├── main.rs     ◄─── Binary entry point
//! └── error.rs    ◄─── Startup error type
//! ```

pub mod error;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tally_db::{Database, DbConfig};
use tally_sync::{
    persist, AppState, HttpRemote, NotificationSink, ReconciliationEngine, RemoteTransport,
    SchedulerHandle, SyncConfig, SyncScheduler, TracingNotifier,
};

pub use error::{StationError, StationResult};

const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// A running station: state, writer task and (optionally) the scheduler.
pub struct Station {
    db: Database,
    state: Arc<AppState>,
    engine: Arc<ReconciliationEngine>,
    scheduler: Option<SchedulerHandle>,
    writer: JoinHandle<()>,
}

impl Station {
    /// Loads the dataset from `db` and starts the background tasks.
    pub async fn start(
        config: &SyncConfig,
        db: Database,
        transport: Arc<dyn RemoteTransport>,
        notifier: Arc<dyn NotificationSink>,
    ) -> StationResult<Station> {
        let store = db.store();
        let dataset = AppState::load_from_store(&store).await;

        let (handle, writer) = persist::channel(store, config.sync.persist_debounce());
        let writer = tokio::spawn(writer.run());

        let state = Arc::new(AppState::with_persistence(dataset, handle));
        let engine = Arc::new(ReconciliationEngine::new(state.clone(), transport, notifier));

        let scheduler = if config.sync.enabled {
            Some(SyncScheduler::from_settings(engine.clone(), &config.sync).spawn())
        } else {
            info!("Sync disabled in station config, scheduler not started");
            None
        };

        info!(device_id = %config.device_id(), "Station started");
        Ok(Station {
            db,
            state,
            engine,
            scheduler,
            writer,
        })
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    pub fn engine(&self) -> &Arc<ReconciliationEngine> {
        &self.engine
    }

    pub fn scheduler(&self) -> Option<&SchedulerHandle> {
        self.scheduler.as_ref()
    }

    /// Stops the scheduler, writes every pending collection and closes the
    /// database.
    pub async fn stop(self) {
        if let Some(scheduler) = self.scheduler {
            scheduler.shutdown().await;
        }
        self.state.flush().await;

        // The writer exits once the last state reference is gone. Spawned
        // reconciliation runs may still hold one, so the wait is bounded.
        drop(self.engine);
        drop(self.state);
        if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, self.writer).await.is_err() {
            warn!("Persistence writer still referenced by in-flight runs");
        }

        self.db.close().await;
        info!("Station stopped");
    }
}

/// Runs the station until Ctrl+C or SIGTERM.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  1. Logging        EnvFilter, RUST_LOG or "info,tally=debug,sqlx=warn" │
/// │  2. Config         station.toml → TALLY_* env → validation              │
/// │  3. Database       SQLite (WAL), migrations                             │
/// │  4. State          every collection loaded, defaults for the rest       │
/// │  5. Background     persistence writer, sync scheduler                   │
/// │  6. First pull     local wins if anything is pending                    │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub async fn run(config_path: Option<PathBuf>) -> StationResult<()> {
    init_tracing();
    info!(version = env!("CARGO_PKG_VERSION"), "Starting Tally station");

    let config = SyncConfig::load_or_create(config_path)?;
    let db_path = config.database_path();
    info!(?db_path, "Database path determined");
    let db = Database::new(DbConfig::new(db_path)).await?;
    if !db.health_check().await {
        warn!("Station database opened but does not answer queries");
    }

    let transport = Arc::new(HttpRemote::new(config.sync.request_timeout())?);
    let station = Station::start(&config, db, transport, Arc::new(TracingNotifier)).await?;

    if station.engine().is_enabled() {
        match station.engine().pull(false).await {
            Ok(outcome) => info!(?outcome, "Startup reconciliation finished"),
            Err(e) => warn!(error = %e, "Startup reconciliation failed"),
        }
    }

    shutdown_signal().await;
    station.stop().await;
    Ok(())
}

/// Initializes the tracing subscriber.
///
/// `RUST_LOG` overrides the default filter, e.g. `RUST_LOG=tally_sync=trace`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tally=debug,sqlx=warn"));

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use tally_core::ledger::CashAffect;
    use tally_core::{LineItem, Money, Product, Transaction};
    use tally_sync::NoOpNotifier;

    async fn start(config: &SyncConfig, db: Database) -> Station {
        let transport = Arc::new(HttpRemote::new(config.sync.request_timeout()).unwrap());
        Station::start(config, db, transport, Arc::new(NoOpNotifier))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_station_persists_mutations_on_stop() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store = db.store();
        let mut config = SyncConfig::default();
        config.sync.enabled = false;

        let station = start(&config, db).await;
        assert!(station.scheduler().is_none());

        station
            .state()
            .upsert(Product::new("Soap", Money::from_cents(900), 4, Utc::now()))
            .unwrap();
        let mut tx = Transaction::from_items(
            vec![LineItem::new("1", 1, Money::from_cents(900))],
            Utc::now(),
        );
        tx.amount_paid = tx.total;
        station.state().record_sale(tx, CashAffect::Auto).unwrap();

        station.state().flush().await;
        let stored = AppState::load_from_store(&store).await;
        assert_eq!(stored.products[0].stock, 3);
        assert_eq!(stored.transactions.len(), 1);
        assert_eq!(stored.cash_movements.len(), 1);

        station.stop().await;
    }

    #[tokio::test]
    async fn test_station_loads_existing_data() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.store()
            .save("categories", &json!(["Cleaning"]))
            .await
            .unwrap();

        let config = SyncConfig::default();
        let station = start(&config, db).await;
        assert!(station.scheduler().is_some());
        assert_eq!(station.state().read(|ds| ds.categories.clone()), vec!["Cleaning"]);
        assert!(!station.engine().is_enabled());

        station.stop().await;
    }
}
