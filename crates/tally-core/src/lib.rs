//! # tally-core: Pure Business Logic for Tally POS
//!
//! Entity types, the in-memory dataset, sequence ids and the ledger
//! cascade. Nothing in this crate touches a database, the network or the
//! file system.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              apps/station (headless station binary)             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │        tally-sync: AppState, dirty tracking, reconciliation     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  dataset  │  │ sequence  │  │  ledger   │  │   │
//! │  │   │ entities  │  │ snapshot  │  │  next_id  │  │ sale/undo │  │   │
//! │  │   │   Money   │  │ settings  │  │           │  │ payments  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • "now" IS A PARAMETER      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 tally-db (Durable Store)                        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entities (Transaction, CashMovement, Customer, ...)
//! - [`money`] - Integer-cent money with a one-cent tolerance
//! - [`settings`] - Settings record and its merge over defaults
//! - [`dataset`] - All collections, snapshot export/import
//! - [`sequence`] - Sequence id allocation
//! - [`ledger`] - Sale → cash movement → customer debt cascade
//! - [`validation`] - Input checks
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::Utc;
//! use tally_core::ledger::{record_sale, CashAffect};
//! use tally_core::{Dataset, LineItem, Money, Product, Transaction};
//!
//! let mut ds = Dataset::new();
//! ds.upsert(Product::new("Cola", Money::from_cents(2_500), 10, Utc::now()));
//!
//! let mut tx = Transaction::from_items(vec![LineItem::new("1", 4, Money::from_cents(2_500))], Utc::now());
//! tx.amount_paid = tx.total;
//!
//! let out = record_sale(&mut ds, tx, CashAffect::Auto, Utc::now()).unwrap();
//! assert_eq!(out.movement_id.as_deref(), Some("mv_1"));
//! assert_eq!(ds.products[0].stock, 6);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod dataset;
pub mod error;
pub mod ledger;
pub mod money;
pub mod sequence;
pub mod settings;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use dataset::{Collection, Dataset, Entity, IdKind, PhysicallyDeletable};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, MONEY_EPSILON};
pub use settings::Settings;
pub use types::*;
