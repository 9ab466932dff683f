//! # Persistence Writer
//!
//! Debounced, coalesced write-behind of dataset collections.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  AppState mutator                                                      │
//! │       │  queue(Products, [..v1..])                                     │
//! │       │  queue(Products, [..v2..])   ◄── replaces v1 (same key)        │
//! │       │  queue(CashMovements, [..])                                    │
//! │       ▼                                                                 │
//! │  ┌──────────────┐    window elapsed     ┌──────────────────────────┐   │
//! │  │ pending map  │ ─────────────────────►│ DurableStore::save        │   │
//! │  │ key → latest │    or flush()         │ one write per key         │   │
//! │  └──────────────┘                       └──────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A single task owns all writes, so writes to one key are serialized and
//! the last queued value wins. Write failures are logged and dropped; the
//! in-memory dataset stays authoritative and the next mutation rewrites the
//! whole collection.

use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tally_core::Collection;
use tally_db::DurableStore;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

enum Command {
    Write(Collection, Value),
    Flush(oneshot::Sender<()>),
}

/// Sending side, held by [`crate::AppState`].
#[derive(Debug, Clone)]
pub struct PersistHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Write(c, _) => write!(f, "Write({c})"),
            Command::Flush(_) => write!(f, "Flush"),
        }
    }
}

impl PersistHandle {
    /// Queues the latest value of a collection. Never blocks.
    pub fn queue(&self, collection: Collection, value: Value) {
        if self.tx.send(Command::Write(collection, value)).is_err() {
            warn!(collection = %collection, "Persistence writer stopped, write dropped");
        }
    }

    /// Waits until everything queued so far is written.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.tx.send(Command::Flush(ack)).is_err() {
            return;
        }
        let _ = done.await;
    }
}

/// The writer task. Create with [`channel`], then spawn [`PersistenceWriter::run`].
pub struct PersistenceWriter {
    store: DurableStore,
    rx: mpsc::UnboundedReceiver<Command>,
    window: Duration,
    pending: BTreeMap<Collection, Value>,
}

/// Creates a connected handle/writer pair.
pub fn channel(store: DurableStore, window: Duration) -> (PersistHandle, PersistenceWriter) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        PersistHandle { tx },
        PersistenceWriter {
            store,
            rx,
            window,
            pending: BTreeMap::new(),
        },
    )
}

impl PersistenceWriter {
    /// Runs until every handle is dropped, then writes what is left.
    pub async fn run(mut self) {
        info!(window_ms = self.window.as_millis() as u64, "Persistence writer started");
        let mut deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                cmd = self.rx.recv() => match cmd {
                    Some(Command::Write(collection, value)) => {
                        self.pending.insert(collection, value);
                        if deadline.is_none() {
                            deadline = Some(Instant::now() + self.window);
                        }
                    }
                    Some(Command::Flush(ack)) => {
                        let mut acks = vec![ack];
                        self.drain_queue(&mut acks);
                        self.write_pending().await;
                        deadline = None;
                        for ack in acks {
                            let _ = ack.send(());
                        }
                    }
                    None => {
                        self.write_pending().await;
                        break;
                    }
                },

                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.write_pending().await;
                    deadline = None;
                }
            }
        }

        info!("Persistence writer stopped");
    }

    /// Pulls writes already sitting in the channel into the pending map.
    /// Flush requests found on the way are answered after the write.
    fn drain_queue(&mut self, acks: &mut Vec<oneshot::Sender<()>>) {
        while let Ok(cmd) = self.rx.try_recv() {
            match cmd {
                Command::Write(collection, value) => {
                    self.pending.insert(collection, value);
                }
                Command::Flush(ack) => acks.push(ack),
            }
        }
    }

    async fn write_pending(&mut self) {
        for (collection, value) in std::mem::take(&mut self.pending) {
            match self.store.save(collection.key(), &value).await {
                Ok(()) => debug!(collection = %collection, "Collection persisted"),
                Err(e) => warn!(collection = %collection, error = %e, "Failed to persist collection"),
            }
        }
    }
}
