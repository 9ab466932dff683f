//! # Sync Scheduler
//!
//! Decides *when* to reconcile. Two independent triggers feed one loop:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   interval tick ───────────► dirty ? push() : pull(false)              │
//! │                                                                         │
//! │   mark_dirty() ──watch──► (re)arm deadline = now + debounce             │
//! │                              │                                          │
//! │                              ▼  quiet window elapsed                    │
//! │                           push()                                        │
//! │                                                                         │
//! │   SchedulerHandle ──mpsc──► sync_now (manual push) / shutdown           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Runs are spawned so the loop keeps ticking while one is in flight. The
//! triggers can overlap; the engine's single-flight guard turns the extra
//! ones into `Busy`.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::SyncSettings;
use crate::engine::{PushOutcome, PushRequest, ReconciliationEngine};
use crate::error::{SyncError, SyncResult};

enum Command {
    SyncNow(oneshot::Sender<SyncResult<PushOutcome>>),
    Shutdown,
}

pub struct SyncScheduler {
    engine: Arc<ReconciliationEngine>,
    interval: Duration,
    debounce: Duration,
}

impl SyncScheduler {
    pub fn new(engine: Arc<ReconciliationEngine>, interval: Duration, debounce: Duration) -> Self {
        SyncScheduler {
            engine,
            interval,
            debounce,
        }
    }

    pub fn from_settings(engine: Arc<ReconciliationEngine>, settings: &SyncSettings) -> Self {
        Self::new(engine, settings.interval(), settings.debounce())
    }

    /// Starts the loop on the current runtime.
    pub fn spawn(self) -> SchedulerHandle {
        let (tx, rx) = mpsc::channel(8);
        let task = tokio::spawn(self.run(rx));
        SchedulerHandle { tx, task }
    }

    async fn run(self, mut commands: mpsc::Receiver<Command>) {
        info!(
            interval_secs = self.interval.as_secs(),
            debounce_ms = self.debounce.as_millis() as u64,
            "Sync scheduler started"
        );

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut mutations = self.engine.state().dirty().subscribe();
        mutations.borrow_and_update();
        let mut deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.engine.is_enabled() {
                        self.spawn_cycle();
                    } else {
                        debug!("Interval tick skipped, cloud sync disabled");
                    }
                }

                changed = mutations.changed() => {
                    if changed.is_err() {
                        warn!("Dirty tracker dropped, stopping scheduler");
                        break;
                    }
                    mutations.borrow_and_update();
                    deadline = Some(Instant::now() + self.debounce);
                }

                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    deadline = None;
                    self.spawn_push();
                }

                cmd = commands.recv() => match cmd {
                    Some(Command::SyncNow(reply)) => {
                        let engine = self.engine.clone();
                        tokio::spawn(async move {
                            let _ = reply.send(engine.push(PushRequest::manual()).await);
                        });
                    }
                    Some(Command::Shutdown) | None => break,
                },
            }
        }

        info!("Sync scheduler stopped");
    }

    fn spawn_cycle(&self) {
        let engine = self.engine.clone();
        tokio::spawn(async move {
            if let Err(e) = engine.sync_cycle().await {
                debug!(error = %e, "Interval sync failed, retrying next tick");
            }
        });
    }

    fn spawn_push(&self) {
        let engine = self.engine.clone();
        tokio::spawn(async move {
            match engine.push(PushRequest::default()).await {
                Ok(outcome) => debug!(?outcome, "Debounced push finished"),
                Err(e) => debug!(error = %e, "Debounced push failed, retrying next tick"),
            }
        });
    }
}

/// Control side of a running [`SyncScheduler`].
pub struct SchedulerHandle {
    tx: mpsc::Sender<Command>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Manual push; skips the empty-dataset safety check.
    pub async fn sync_now(&self) -> SyncResult<PushOutcome> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::SyncNow(reply))
            .await
            .map_err(|_| SyncError::ShuttingDown)?;
        rx.await.map_err(|_| SyncError::ShuttingDown)?
    }

    /// Stops the loop. Runs already in flight are left to finish.
    pub async fn shutdown(self) {
        let _ = self.tx.send(Command::Shutdown).await;
        if let Err(e) = self.task.await {
            warn!(error = %e, "Sync scheduler task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tests::{synced_dataset, MockRemote};
    use crate::notify::NoOpNotifier;
    use crate::state::AppState;
    use serde_json::json;
    use tally_core::Dataset;

    fn engine(ds: Dataset, remote: Arc<MockRemote>) -> Arc<ReconciliationEngine> {
        Arc::new(ReconciliationEngine::new(
            Arc::new(AppState::new(ds)),
            remote,
            Arc::new(NoOpNotifier),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_pushes_once_after_quiet_window() {
        let remote = Arc::new(MockRemote::default());
        let engine = engine(synced_dataset(), remote.clone());
        let handle =
            SyncScheduler::new(engine.clone(), Duration::from_secs(3600), Duration::from_secs(3))
                .spawn();
        tokio::task::yield_now().await;

        engine.state().set_categories(vec!["A".into()]);
        tokio::time::sleep(Duration::from_secs(2)).await;
        engine.state().set_categories(vec!["A".into(), "B".into()]);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(remote.pushes(), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(remote.pushes(), 1);
        assert!(!engine.state().dirty().is_dirty());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(remote.pushes(), 1);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_pulls_when_clean() {
        let remote = Arc::new(MockRemote::holding(json!({ "categories": ["Remote"] })));
        let engine = engine(synced_dataset(), remote.clone());
        let handle =
            SyncScheduler::new(engine.clone(), Duration::from_secs(10), Duration::from_secs(3))
                .spawn();

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(remote.pulls(), 2);
        assert_eq!(remote.pushes(), 0);
        assert_eq!(engine.state().read(|ds| ds.categories.clone()), vec!["Remote"]);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_skipped_when_disabled() {
        let remote = Arc::new(MockRemote::default());
        let engine = engine(Dataset::new(), remote.clone());
        let handle =
            SyncScheduler::new(engine, Duration::from_secs(5), Duration::from_secs(1)).spawn();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(remote.pulls() + remote.pushes(), 0);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_now_is_a_manual_push() {
        let mut ds = synced_dataset();
        ds.products.clear();
        let remote = Arc::new(MockRemote::default());
        let engine = engine(ds, remote.clone());
        let handle =
            SyncScheduler::new(engine, Duration::from_secs(3600), Duration::from_secs(3)).spawn();

        // An empty dataset would be safety-blocked on an automatic push.
        assert_eq!(handle.sync_now().await.unwrap(), PushOutcome::Pushed);
        assert_eq!(remote.pushes(), 1);

        handle.shutdown().await;
    }
}
