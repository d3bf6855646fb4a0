//! # lane-db: Local Store for Lane POS
//!
//! SQLite-backed storage for the terminal: catalog, sales log and sync
//! metadata. The single source of truth while the terminal is offline.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Lane POS Data Flow                               │
//! │                                                                         │
//! │  Page layer            lane-sync (catalog puller, outbox, status)       │
//! │       │                       │                                         │
//! │       ▼                       ▼                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     lane-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌─────────────────┐   ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories   │   │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │◄───│ ProductRepo     │   │  (embedded)  │  │   │
//! │  │   │               │    │ OperatorRepo    │   │ 001_init.sql │  │   │
//! │  │   │ SqlitePool    │    │ TransactionRepo │   │              │  │   │
//! │  │   │               │    │ SyncStatusRepo  │   │              │  │   │
//! │  │   └───────────────┘    └─────────────────┘   └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (WAL)                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - One repository per table family
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lane_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("lane.db")).await?;
//! let product = db.products().get_by_upc("012345678905").await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::operator::OperatorRepository;
pub use repository::product::ProductRepository;
pub use repository::sync_status::SyncStatusRepository;
pub use repository::transaction::TransactionRepository;
