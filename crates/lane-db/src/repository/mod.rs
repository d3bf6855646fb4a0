//! # Repository Module
//!
//! One repository per table family of the Local Store.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Who writes what                                      │
//! │                                                                         │
//! │  ProductRepository      ◄── catalog puller (replace_all)               │
//! │  OperatorRepository     ◄── catalog puller (replace_all)               │
//! │  TransactionRepository  ◄── checkout (create), outbox (mark_synced)    │
//! │  SyncStatusRepository   ◄── catalog puller (last_product_sync)         │
//! │                                                                         │
//! │  Catalog and sales tables are disjoint: a replace_all never contends   │
//! │  with an outbox update beyond SQLite's own write lock.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Lookup, search, replace-all
//! - [`operator::OperatorRepository`] - PIN validation, replace-all
//! - [`transaction::TransactionRepository`] - Append-only sales log
//! - [`sync_status::SyncStatusRepository`] - Sync metadata key/value

pub mod operator;
pub mod product;
pub mod sync_status;
pub mod transaction;
