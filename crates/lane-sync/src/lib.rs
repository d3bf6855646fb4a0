//! # lane-sync: Sync Engine for Lane POS
//!
//! Keeps a terminal's Local Store in step with the central service while
//! letting the terminal sell through any outage.
//!
//! ## Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Lane POS Sync Flow                              │
//! │                                                                         │
//! │   Central service                              Terminal                 │
//! │   ───────────────                              ────────                 │
//! │                                                                         │
//! │   GET /health        ◄──── every 30s ────  ConnectivityMonitor          │
//! │                                                  │ offline → online     │
//! │                                                  ▼                      │
//! │   POST /api/transactions ◄── pending sales ─ TransactionOutbox          │
//! │                                                  │ mark synced          │
//! │                                                  ▼                      │
//! │   GET /api/products  ────► replace catalog ─► Local Store (lane-db)     │
//! │   GET /api/operators ────► replace roster  ─►    ▲                      │
//! │          ▲                                       │                      │
//! │          └──── startup + every 4h ─── CatalogPuller                     │
//! │                                                                         │
//! │   SyncOrchestrator: start / status / shutdown                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Checkout never waits on this crate. Sales land in the Local Store first;
//! the outbox delivers them whenever the central service is reachable.
//!
//! ## Modules
//!
//! - [`config`] - Layered settings (defaults, TOML file, environment)
//! - [`client`] - HTTP calls to the central service
//! - [`connectivity`] - Health probing and the shared online flag
//! - [`catalog`] - Product and operator catalog pull
//! - [`outbox`] - Delivery of pending transactions
//! - [`orchestrator`] - Task lifecycle and status snapshot
//! - [`error`] - Sync error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lane_db::{Database, DbConfig};
//! use lane_sync::{SyncConfig, SyncOrchestrator};
//!
//! let config = SyncConfig::load(None)?;
//! let db = Database::new(DbConfig::new("lane.db")).await?;
//!
//! let mut sync = SyncOrchestrator::new(config, db)?;
//! sync.start()?;
//! println!("{:?}", sync.status().await?);
//! sync.shutdown().await;
//! ```

pub mod catalog;
pub mod client;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod orchestrator;
pub mod outbox;

#[cfg(test)]
pub(crate) mod test_support;

pub use catalog::{CatalogPuller, CatalogSyncReport, StepOutcome};
pub use client::CentralClient;
pub use config::{CentralSettings, ScheduleSettings, StoreSettings, SyncConfig, CONFIG_PATH_ENV};
pub use connectivity::{ConnectivityMonitor, ConnectivityState, Transition};
pub use error::{SyncError, SyncResult};
pub use orchestrator::{StatusSnapshot, SyncHandle, SyncOrchestrator, SyncTimings};
pub use outbox::{OutboxReport, OutboxTrigger, OutboxWorker, TransactionOutbox};
