//! # lane-core: Domain Types for Lane POS
//!
//! Pure types describing what a terminal stores and what it exchanges with
//! the central service. Nothing in this crate performs I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Lane POS Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            Page layer (external: search, cart, checkout)        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │   lane-sync: connectivity monitor, catalog puller, outbox       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │   lane-db: SQLite Local Store                                   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ lane-core (THIS CRATE) ★                        │   │
//! │  │   Product • Operator • Transaction • LineItem • validation      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Catalog and transaction types (also the JSON wire format)
//! - [`error`] - Domain error types
//! - [`validation`] - Checks applied to catalog payloads and checkout input
//!
//! ## Money and Tax
//!
//! All monetary values are integer minor units (cents). Tax rates are integer
//! fixed-point values: 8.25% is stored as `82500`.
//!
//! ```rust
//! use lane_core::TaxRate;
//!
//! let rate = TaxRate::from_scaled(82500);
//! assert!((rate.percentage() - 8.25).abs() < 1e-9);
//! ```

pub mod error;
pub mod types;
pub mod validation;

pub use error::{CoreError, ValidationError};
pub use types::*;

/// Sync-status key written after every catalog pull attempt.
///
/// The value is an RFC 3339 timestamp. It marks the last *attempt*, not the
/// last success.
pub const LAST_PRODUCT_SYNC: &str = "last_product_sync";
