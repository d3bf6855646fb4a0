//! # Catalog Puller
//!
//! Pulls the authoritative product and operator lists from the central
//! service and replaces the local copies.
//!
//! ## Pull Cycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    sync_catalog()                                       │
//! │                                                                         │
//! │  offline? ──yes──► no-op (nothing fetched, marker untouched)           │
//! │     │no                                                                 │
//! │     ▼                                                                   │
//! │  1. GET /api/products  → validate → products.replace_all()             │
//! │       failure: log, keep old products, continue                        │
//! │  2. GET /api/operators → validate → operators.replace_all()            │
//! │       failure: log, keep old operators, continue                       │
//! │  3. sync_status["last_product_sync"] = now   (always, once online)     │
//! │                                                                         │
//! │  The marker records that a pull was attempted, not that it succeeded.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Schedule
//! Once at startup (after the first connectivity probe has reported), then
//! every `catalog_interval_secs`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use lane_core::validation::{validate_catalog_operators, validate_catalog_products};
use lane_core::LAST_PRODUCT_SYNC;
use lane_db::Database;

use crate::client::CentralClient;
use crate::config::clamp_period;
use crate::connectivity::ConnectivityState;
use crate::error::SyncResult;

// =============================================================================
// Report
// =============================================================================

/// Result of one catalog step (products or operators).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StepOutcome {
    /// Not attempted (terminal offline).
    #[default]
    Skipped,
    /// Table replaced with this many rows.
    Replaced(u64),
    /// Fetch, decode, validation or store failure; table untouched.
    Failed(String),
}

impl StepOutcome {
    pub fn is_replaced(&self) -> bool {
        matches!(self, StepOutcome::Replaced(_))
    }

    fn from_result(step: &'static str, result: SyncResult<u64>) -> Self {
        match result {
            Ok(count) => {
                info!(step, count, "Catalog step replaced local table");
                StepOutcome::Replaced(count)
            }
            Err(e) if e.is_store_error() => {
                error!(step, error = %e, "Catalog step failed in local store");
                StepOutcome::Failed(e.to_string())
            }
            Err(e) => {
                warn!(step, error = %e, "Catalog step failed, keeping local table");
                StepOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Outcome of one `sync_catalog()` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogSyncReport {
    pub products: StepOutcome,
    pub operators: StepOutcome,
    /// Value written to `last_product_sync`, if it was written.
    pub marked_at: Option<DateTime<Utc>>,
}

impl CatalogSyncReport {
    /// True when the tick did nothing because the terminal was offline.
    pub fn skipped(&self) -> bool {
        self.products == StepOutcome::Skipped && self.operators == StepOutcome::Skipped
    }
}

// =============================================================================
// Catalog Puller
// =============================================================================

pub struct CatalogPuller {
    client: CentralClient,
    db: Database,
    state: Arc<ConnectivityState>,
}

impl CatalogPuller {
    pub fn new(client: CentralClient, db: Database, state: Arc<ConnectivityState>) -> Self {
        CatalogPuller { client, db, state }
    }

    /// Runs one pull cycle. Never fails: each step reports its own outcome.
    pub async fn sync_catalog(&self) -> CatalogSyncReport {
        if !self.state.is_online() {
            debug!("Offline, skipping catalog sync");
            return CatalogSyncReport::default();
        }

        info!("Starting catalog sync");

        let products = StepOutcome::from_result("products", self.sync_products().await);
        let operators = StepOutcome::from_result("operators", self.sync_operators().await);

        let now = Utc::now();
        let marked_at = match self
            .db
            .sync_status()
            .set(LAST_PRODUCT_SYNC, &now.to_rfc3339())
            .await
        {
            Ok(()) => Some(now),
            Err(e) => {
                error!(error = %e, "Failed to record last catalog sync");
                None
            }
        };

        CatalogSyncReport {
            products,
            operators,
            marked_at,
        }
    }

    async fn sync_products(&self) -> SyncResult<u64> {
        let products = self.client.fetch_products().await?;
        validate_catalog_products(&products)?;
        Ok(self.db.products().replace_all(&products).await?)
    }

    async fn sync_operators(&self) -> SyncResult<u64> {
        let operators = self.client.fetch_operators().await?;
        validate_catalog_operators(&operators)?;
        Ok(self.db.operators().replace_all(&operators).await?)
    }

    /// Pulls once after the first probe, then every `period`, until
    /// `shutdown` flips to true.
    ///
    /// Waiting for the first probe (its outcome, not its success) keeps the
    /// startup pull from always seeing the initial offline state.
    pub async fn run(self, period: Duration, mut shutdown: watch::Receiver<bool>) {
        let period = clamp_period(period);
        info!(interval = ?period, "Catalog puller starting");

        let mut probes = self.state.subscribe_probes();
        tokio::select! {
            probed = async { probes.wait_for(|count| *count > 0).await.map(|_| ()) } => {
                if probed.is_err() {
                    info!("Connectivity state dropped, catalog puller stopping");
                    return;
                }
            }
            _ = shutdown.changed() => {
                info!("Catalog puller stopped before first pull");
                return;
            }
        }

        self.sync_catalog().await;

        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {
                    self.sync_catalog().await;
                }

                _ = shutdown.changed() => {
                    info!("Catalog puller shutting down");
                    break;
                }
            }
        }

        info!("Catalog puller stopped");
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
