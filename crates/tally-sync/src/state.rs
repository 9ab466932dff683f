//! # Application State
//!
//! The single owner of a station's in-memory dataset. Every mutation goes
//! through here so the ordering below always holds.
//!
//! ## Mutation Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  mutator(..)                                                           │
//! │     │                                                                   │
//! │     ├─ 1. validate, write lock, allocate id if absent                  │
//! │     ├─ 2. update the dataset (source of truth)                          │
//! │     ├─ 3. queue touched collections ──► PersistenceWriter               │
//! │     ├─    release lock                                                  │
//! │     └─ 4. dirty.mark_dirty()  ──watch──► SyncScheduler                   │
//! │                                                                         │
//! │  snapshot() / read(..) always see every completed mutation, so a push   │
//! │  issued right after a mutation carries it.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde_json::Value;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tally_core::ledger::{self, CashAffect, PaymentOutcome, ReversalOutcome, SaleOutcome};
use tally_core::{
    ActivityLog, Collection, CoreError, Dataset, Entity, Money, PaymentMethod,
    PhysicallyDeletable, Transaction,
};
use tally_db::DurableStore;
use tracing::{debug, info, warn};

use crate::dirty::DirtyTracker;
use crate::error::SyncResult;
use crate::persist::PersistHandle;

/// Collections a sale or its reversal may touch.
const LEDGER_COLLECTIONS: [Collection; 4] = [
    Collection::Transactions,
    Collection::CashMovements,
    Collection::Products,
    Collection::Customers,
];

#[derive(Debug, Default)]
pub struct AppState {
    dataset: RwLock<Dataset>,
    dirty: DirtyTracker,
    persist: Option<PersistHandle>,
}

impl AppState {
    /// In-memory only; nothing is written.
    pub fn new(dataset: Dataset) -> Self {
        AppState {
            dataset: RwLock::new(dataset),
            dirty: DirtyTracker::new(),
            persist: None,
        }
    }

    pub fn with_persistence(dataset: Dataset, persist: PersistHandle) -> Self {
        AppState {
            dataset: RwLock::new(dataset),
            dirty: DirtyTracker::new(),
            persist: Some(persist),
        }
    }

    pub fn dirty(&self) -> &DirtyTracker {
        &self.dirty
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Runs `f` against the current dataset.
    pub fn read<R>(&self, f: impl FnOnce(&Dataset) -> R) -> R {
        f(&self.read_lock())
    }

    /// Owned copy of the current dataset.
    pub fn snapshot(&self) -> Dataset {
        self.read_lock().clone()
    }

    /// Full JSON snapshot, as sent to the remote store.
    pub fn snapshot_value(&self) -> SyncResult<Value> {
        Ok(self.read_lock().to_snapshot()?)
    }

    pub fn find<E: Entity>(&self, id: &str) -> Option<E> {
        self.read_lock().find::<E>(id).cloned()
    }

    // =========================================================================
    // Generic Mutators
    // =========================================================================

    /// Inserts or replaces an entity; returns its (possibly new) id.
    ///
    /// Rejected entities leave the dataset and the dirty flag untouched.
    pub fn upsert<E: Entity>(&self, entity: E) -> SyncResult<String> {
        entity.validate().map_err(CoreError::from)?;
        self.mutate(&[E::COLLECTION], |ds| Ok(ds.upsert(entity)))
    }

    /// Edits an existing entity. The edit is applied to a copy and only
    /// stored once the result validates.
    pub fn update<E: Entity>(&self, id: &str, edit: impl FnOnce(&mut E)) -> SyncResult<()> {
        self.mutate(&[E::COLLECTION], |ds| {
            let entity = ds
                .find_mut::<E>(id)
                .ok_or_else(|| CoreError::EntityNotFound {
                    collection: E::COLLECTION.key(),
                    id: id.to_string(),
                })?;
            let mut edited = entity.clone();
            edit(&mut edited);
            edited.validate()?;
            *entity = edited;
            Ok(())
        })
    }

    /// Physically removes an entity. Transactions are cancelled instead,
    /// see [`AppState::cancel_sale`].
    pub fn delete<E: PhysicallyDeletable>(&self, id: &str) -> Option<E> {
        self.mutate(&[E::COLLECTION], |ds| Ok(ds.remove::<E>(id)))
            .ok()
            .flatten()
    }

    pub fn set_categories(&self, categories: Vec<String>) {
        let _ = self.mutate(&[Collection::Categories], |ds| {
            ds.categories = categories;
            Ok(())
        });
    }

    /// Merges a partial settings object over the current settings.
    pub fn update_settings(&self, overlay: &Value) {
        let _ = self.mutate(&[Collection::Settings], |ds| {
            ds.settings = ds.settings.merge(overlay);
            Ok(())
        });
    }

    /// Appends an activity log entry.
    pub fn log_activity(
        &self,
        action: impl Into<String>,
        details: Option<String>,
        user_id: Option<String>,
    ) -> SyncResult<String> {
        self.upsert(ActivityLog {
            id: String::new(),
            user_id,
            action: action.into(),
            details,
            created_at: Utc::now(),
        })
    }

    // =========================================================================
    // Ledger
    // =========================================================================

    pub fn record_sale(&self, tx: Transaction, policy: CashAffect) -> SyncResult<SaleOutcome> {
        let outcome = self.mutate(&LEDGER_COLLECTIONS, |ds| {
            ledger::record_sale(ds, tx, policy, Utc::now())
        })?;
        info!(
            transaction_id = %outcome.transaction_id,
            cash = %outcome.cash_amount,
            debt = %outcome.debt_delta,
            "Sale recorded"
        );
        if !outcome.low_stock.is_empty() {
            warn!(products = ?outcome.low_stock, "Stock at or below minimum");
        }
        Ok(outcome)
    }

    /// Cancels a sale, restoring the stock of its own line items.
    pub fn cancel_sale(&self, transaction_id: &str) -> SyncResult<ReversalOutcome> {
        let outcome = self.mutate(&LEDGER_COLLECTIONS, |ds| {
            let items = ds
                .find::<Transaction>(transaction_id)
                .map(|tx| tx.items.clone())
                .ok_or_else(|| CoreError::TransactionNotFound(transaction_id.to_string()))?;
            ledger::reverse_sale(ds, transaction_id, &items, Utc::now())
        })?;
        info!(
            transaction_id,
            movement_removed = outcome.movement_removed,
            debt_released = %outcome.debt_released,
            "Sale cancelled"
        );
        Ok(outcome)
    }

    pub fn register_payment(
        &self,
        transaction_id: &str,
        amount: Money,
        method: PaymentMethod,
    ) -> SyncResult<PaymentOutcome> {
        let outcome = self.mutate(
            &[
                Collection::Transactions,
                Collection::CashMovements,
                Collection::Customers,
            ],
            |ds| ledger::register_payment(ds, transaction_id, amount, method, Utc::now()),
        )?;
        info!(transaction_id, %amount, status = ?outcome.payment_status, "Payment registered");
        Ok(outcome)
    }

    pub fn receive_purchase(&self, purchase_id: &str) -> SyncResult<()> {
        self.mutate(&[Collection::Purchases, Collection::Products], |ds| {
            ledger::receive_purchase(ds, purchase_id)
        })?;
        info!(purchase_id, "Purchase received");
        Ok(())
    }

    // =========================================================================
    // Remote and Storage
    // =========================================================================

    /// Replaces local collections from a remote snapshot and persists every
    /// collection. Does not touch the dirty flag; the engine decides that.
    pub fn apply_remote(&self, remote: &Value) -> Vec<Collection> {
        let mut ds = self.write_lock();
        let applied = ds.apply_remote(remote);
        self.queue_collections(&ds, &Collection::ALL);
        drop(ds);

        for collection in Collection::ALL {
            if remote.get(collection.key()).is_some() && !applied.contains(&collection) {
                warn!(collection = %collection, "Remote field rejected, keeping local value");
            }
        }
        applied
    }

    /// Queues every collection for writing.
    pub fn persist_all(&self) {
        let ds = self.read_lock();
        self.queue_collections(&ds, &Collection::ALL);
    }

    /// Waits until queued writes hit the store.
    pub async fn flush(&self) {
        if let Some(persist) = &self.persist {
            persist.flush().await;
        }
    }

    /// Rebuilds a dataset from the durable store.
    ///
    /// Missing or unreadable keys keep their defaults; a store that cannot
    /// be read at all yields an empty dataset.
    pub async fn load_from_store(store: &DurableStore) -> Dataset {
        let mut dataset = Dataset::new();
        let mut restored = 0usize;

        for collection in Collection::ALL {
            match store.load::<Value>(collection.key()).await {
                Ok(Some(value)) => {
                    if dataset.restore_collection(collection, &value) {
                        restored += 1;
                    } else {
                        warn!(collection = %collection, "Stored collection has the wrong shape, using default");
                    }
                }
                Ok(None) => debug!(collection = %collection, "Nothing stored"),
                Err(e) => {
                    warn!(collection = %collection, error = %e, "Failed to load collection, using default")
                }
            }
        }

        info!(
            restored,
            products = dataset.products.len(),
            transactions = dataset.transactions.len(),
            "Dataset loaded"
        );
        dataset
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Applies `f` under the write lock, queues `touched` for persistence
    /// and marks dirty. Nothing is queued or marked when `f` fails.
    fn mutate<R>(
        &self,
        touched: &[Collection],
        f: impl FnOnce(&mut Dataset) -> Result<R, CoreError>,
    ) -> SyncResult<R> {
        let result = {
            let mut ds = self.write_lock();
            let result = f(&mut ds)?;
            self.queue_collections(&ds, touched);
            result
        };
        self.dirty.mark_dirty();
        Ok(result)
    }

    fn queue_collections(&self, ds: &Dataset, collections: &[Collection]) {
        let Some(persist) = &self.persist else {
            return;
        };
        for &collection in collections {
            match ds.collection_value(collection) {
                Ok(value) => persist.queue(collection, value),
                Err(e) => warn!(collection = %collection, error = %e, "Failed to serialize collection"),
            }
        }
    }

    // The dataset has no cross-field invariant a panicking writer could break
    // halfway that a reader would trip over, so poisoning is ignored.
    fn read_lock(&self) -> RwLockReadGuard<'_, Dataset> {
        self.dataset.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_lock(&self) -> RwLockWriteGuard<'_, Dataset> {
        self.dataset.write().unwrap_or_else(|e| e.into_inner())
    }
}
