//! # tally-db: Durable Store for Tally POS
//!
//! Persists each dataset collection as one encoded row of a local SQLite
//! key-value table.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally POS Data Flow                              │
//! │                                                                         │
//! │  tally-sync persistence writer                                         │
//! │       │  save("transactions", &[...])                                  │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tally-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │ DurableStore  │    │ KvRepository  │    │  Migrations  │  │   │
//! │  │   │  (store.rs)   │───►│   (kv.rs)     │    │  (embedded)  │  │   │
//! │  │   │ codec.rs      │    │               │    │              │  │   │
//! │  │   │ tally:v1:...  │    │ kv_store rows │    │ 001_kv.sql   │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`repository`] - Raw key-value rows
//! - [`codec`] - Versioned, obfuscated payload encoding
//! - [`store`] - Typed save/load with fallback
//! - [`error`] - Storage error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/tally.db")).await?;
//! let store = db.store();
//!
//! store.save("categories", &vec!["Drinks"]).await?;
//! let categories: Vec<String> = store.load_or("categories", Vec::new()).await;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod codec;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{CodecError, DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::kv::{KvEntry, KvRepository};
pub use store::DurableStore;
