//! # Sync Orchestrator
//!
//! Owns the sync loops and answers status queries.
//!
//! ## Task Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        SyncOrchestrator                                 │
//! │                                                                         │
//! │   Arc<ConnectivityState>  (atomics, shared by every task)              │
//! │   watch<bool> shutdown    (one sender, a receiver per task)            │
//! │                                                                         │
//! │   start() spawns:                                                      │
//! │   ┌────────────────────┐  request()  ┌────────────────────┐            │
//! │   │ ConnectivityMonitor│ ──────────► │ OutboxWorker       │            │
//! │   │ every 30s          │  (cap. 1)   │ one run at a time  │            │
//! │   └────────────────────┘             └────────────────────┘            │
//! │   ┌────────────────────┐                                               │
//! │   │ CatalogPuller      │  after first probe, then every 4h             │
//! │   └────────────────────┘                                               │
//! │                                                                         │
//! │   status(): atomics + two Local Store reads, no network                │
//! │   shutdown(): signal, then join all three tasks                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use lane_core::LAST_PRODUCT_SYNC;
use lane_db::Database;

use crate::catalog::CatalogPuller;
use crate::client::CentralClient;
use crate::config::SyncConfig;
use crate::connectivity::{ConnectivityMonitor, ConnectivityState};
use crate::error::{SyncError, SyncResult};
use crate::outbox::{OutboxTrigger, OutboxWorker, TransactionOutbox};

// =============================================================================
// Status Snapshot
// =============================================================================

/// Point-in-time view of the sync engine for the rest of the terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub online: bool,
    /// Last offline → online edge; `None` if never online.
    pub last_online: Option<DateTime<Utc>>,
    pub pending_transactions: i64,
    /// `last_product_sync` marker; empty if no pull has run yet.
    pub last_catalog_sync: String,
}

async fn read_status(state: &ConnectivityState, db: &Database) -> SyncResult<StatusSnapshot> {
    let pending_transactions = db.transactions().count_pending().await?;
    let last_catalog_sync = db
        .sync_status()
        .get(LAST_PRODUCT_SYNC)
        .await?
        .unwrap_or_default();

    Ok(StatusSnapshot {
        online: state.is_online(),
        last_online: state.last_online(),
        pending_transactions,
        last_catalog_sync,
    })
}

// =============================================================================
// Timings
// =============================================================================

/// Loop periods, taken from config unless overridden.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncTimings {
    pub connectivity_interval: Duration,
    pub catalog_interval: Duration,
}

impl SyncTimings {
    pub fn from_config(config: &SyncConfig) -> Self {
        SyncTimings {
            connectivity_interval: config.connectivity_interval(),
            catalog_interval: config.catalog_interval(),
        }
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

pub struct SyncOrchestrator {
    config: Arc<SyncConfig>,
    db: Database,
    client: CentralClient,
    state: Arc<ConnectivityState>,
    timings: SyncTimings,
    shutdown_tx: Arc<watch::Sender<bool>>,
    trigger: Option<OutboxTrigger>,
    tasks: Vec<JoinHandle<()>>,
}

impl SyncOrchestrator {
    /// Creates an orchestrator. Nothing runs until [`start`](Self::start).
    ///
    /// ## Returns
    /// * `Err(SyncError)` - Config failed validation or the HTTP client
    ///   could not be built
    pub fn new(config: SyncConfig, db: Database) -> SyncResult<Self> {
        config.validate()?;
        let client = CentralClient::new(&config.central)?;
        let timings = SyncTimings::from_config(&config);
        let (shutdown_tx, _) = watch::channel(false);

        Ok(SyncOrchestrator {
            config: Arc::new(config),
            db,
            client,
            state: Arc::new(ConnectivityState::new()),
            timings,
            shutdown_tx: Arc::new(shutdown_tx),
            trigger: None,
            tasks: Vec::new(),
        })
    }

    /// Overrides the loop periods from config.
    pub fn with_timings(mut self, timings: SyncTimings) -> Self {
        self.timings = timings;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Shared connectivity state.
    pub fn connectivity(&self) -> Arc<ConnectivityState> {
        Arc::clone(&self.state)
    }

    /// Spawns the connectivity, catalog and outbox tasks and returns
    /// immediately.
    pub fn start(&mut self) -> SyncResult<()> {
        if self.trigger.is_some() {
            return Err(SyncError::AlreadyStarted);
        }
        if *self.shutdown_tx.borrow() {
            return Err(SyncError::Internal("orchestrator was shut down".into()));
        }

        info!(
            central = %self.client.base_url(),
            connectivity_interval = ?self.timings.connectivity_interval,
            catalog_interval = ?self.timings.catalog_interval,
            "Starting sync orchestrator"
        );

        let outbox = TransactionOutbox::new(
            self.client.clone(),
            self.db.clone(),
            Arc::clone(&self.state),
        );
        let (worker, trigger) = OutboxWorker::new(outbox);

        let monitor = ConnectivityMonitor::new(
            self.client.clone(),
            Arc::clone(&self.state),
            trigger.clone(),
        );
        let puller = CatalogPuller::new(
            self.client.clone(),
            self.db.clone(),
            Arc::clone(&self.state),
        );

        self.tasks.push(tokio::spawn(worker.run(self.shutdown_tx.subscribe())));
        self.tasks.push(tokio::spawn(monitor.run(
            self.timings.connectivity_interval,
            self.shutdown_tx.subscribe(),
        )));
        self.tasks.push(tokio::spawn(puller.run(
            self.timings.catalog_interval,
            self.shutdown_tx.subscribe(),
        )));

        self.trigger = Some(trigger);
        Ok(())
    }

    /// Current status. Never touches the network.
    pub async fn status(&self) -> SyncResult<StatusSnapshot> {
        read_status(&self.state, &self.db).await
    }

    /// Requests an outbox run. Returns false if one is already queued or
    /// the orchestrator is not running.
    pub fn trigger_outbox(&self) -> bool {
        self.trigger.as_ref().is_some_and(OutboxTrigger::request)
    }

    /// Cloneable handle for other parts of the terminal.
    ///
    /// Take it after [`start`](Self::start); a handle taken before has no
    /// outbox to trigger.
    pub fn handle(&self) -> SyncHandle {
        SyncHandle {
            db: self.db.clone(),
            state: Arc::clone(&self.state),
            trigger: self.trigger.clone(),
            shutdown_tx: Arc::clone(&self.shutdown_tx),
        }
    }

    /// Signals every loop to stop and waits for them.
    ///
    /// Requests already in progress finish or time out on their own
    /// deadline.
    pub async fn shutdown(&mut self) {
        info!("Shutting down sync orchestrator");
        self.shutdown_tx.send_replace(true);

        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                warn!(error = %e, "Sync task ended abnormally");
            }
        }
        self.trigger = None;

        info!("Sync orchestrator stopped");
    }
}

// =============================================================================
// Handle
// =============================================================================

/// Handle for querying and controlling a running orchestrator.
#[derive(Clone)]
pub struct SyncHandle {
    db: Database,
    state: Arc<ConnectivityState>,
    trigger: Option<OutboxTrigger>,
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl SyncHandle {
    pub async fn status(&self) -> SyncResult<StatusSnapshot> {
        read_status(&self.state, &self.db).await
    }

    pub fn is_online(&self) -> bool {
        self.state.is_online()
    }

    pub fn trigger_outbox(&self) -> bool {
        self.trigger.as_ref().is_some_and(OutboxTrigger::request)
    }

    /// Signals the loops to stop without waiting for them.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{eventually, memory_db, new_sale, sample_products, FakeCentral};
    use lane_core::TransactionStatus;

    fn fast() -> SyncTimings {
        SyncTimings {
            connectivity_interval: Duration::from_millis(30),
            catalog_interval: Duration::from_secs(3600),
        }
    }

    async fn stop(mut orchestrator: SyncOrchestrator) {
        tokio::time::timeout(Duration::from_secs(3), orchestrator.shutdown())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_initial_status_is_offline_and_empty() {
        let central = FakeCentral::start().await;
        let db = memory_db().await;
        let orchestrator = SyncOrchestrator::new(central.config(), db).unwrap();

        let status = orchestrator.status().await.unwrap();
        assert_eq!(
            status,
            StatusSnapshot {
                online: false,
                last_online: None,
                pending_transactions: 0,
                last_catalog_sync: String::new(),
            }
        );
        assert!(!orchestrator.trigger_outbox());
    }

    #[tokio::test]
    async fn test_rejects_invalid_config() {
        let mut config = SyncConfig::default();
        config.central.base_url = "ftp://central".into();
        let result = SyncOrchestrator::new(config, memory_db().await);
        assert!(matches!(result, Err(SyncError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_start_twice_fails() {
        let central = FakeCentral::start().await;
        let mut orchestrator = SyncOrchestrator::new(central.config(), memory_db().await)
            .unwrap()
            .with_timings(fast());

        orchestrator.start().unwrap();
        assert!(matches!(orchestrator.start(), Err(SyncError::AlreadyStarted)));
        stop(orchestrator).await;
    }

    #[tokio::test]
    async fn test_unhealthy_central_keeps_terminal_offline() {
        let central = FakeCentral::start().await;
        central.set_health(500);
        central.set_products(sample_products());
        let db = memory_db().await;
        db.transactions().create(&new_sale("1", "A", 100)).await.unwrap();

        let mut orchestrator = SyncOrchestrator::new(central.config(), db.clone())
            .unwrap()
            .with_timings(fast());
        let state = orchestrator.connectivity();
        orchestrator.start().unwrap();

        let mut probes = state.subscribe_probes();
        probes.wait_for(|n| *n >= 3).await.unwrap();

        let status = orchestrator.status().await.unwrap();
        assert!(!status.online);
        assert_eq!(status.pending_transactions, 1);
        assert_eq!(status.last_catalog_sync, "");
        assert_eq!(central.products_hits(), 0);
        assert!(central.received().is_empty());

        stop(orchestrator).await;
    }

    #[tokio::test]
    async fn test_recovery_after_failed_probes_uploads_backlog() {
        let central = FakeCentral::start().await;
        central.set_health(503);
        let db = memory_db().await;
        let a = db.transactions().create(&new_sale("1", "A", 100)).await.unwrap();
        let b = db.transactions().create(&new_sale("1", "B", 200)).await.unwrap();
        let c = db.transactions().create(&new_sale("1", "C", 300)).await.unwrap();
        central.fail_push_for(&b.id);

        let mut orchestrator = SyncOrchestrator::new(central.config(), db.clone())
            .unwrap()
            .with_timings(fast());
        let state = orchestrator.connectivity();
        orchestrator.start().unwrap();

        let mut probes = state.subscribe_probes();
        probes.wait_for(|n| *n >= 3).await.unwrap();
        assert!(!state.is_online());
        assert!(state.last_online().is_none());

        central.set_health(200);
        let handle = orchestrator.handle();
        assert!(
            eventually(Duration::from_secs(3), || {
                let handle = handle.clone();
                async move { handle.status().await.unwrap().pending_transactions == 1 }
            })
            .await
        );

        let status = orchestrator.status().await.unwrap();
        assert!(status.online);
        assert!(status.last_online.is_some());
        assert_eq!(central.received(), vec![a.id.clone(), b.id.clone(), c.id.clone()]);

        let left = db.transactions().delivery_state(&b.id).await.unwrap().unwrap();
        assert_eq!(left.status, TransactionStatus::Pending);
        assert_eq!(left.attempts, 1);
        for id in [&a.id, &c.id] {
            let done = db.transactions().get_by_id(id).await.unwrap().unwrap();
            assert_eq!(done.status, TransactionStatus::Synced);
        }

        // Further online probes do not re-run the outbox
        let seen = state.probe_count();
        probes.wait_for(|n| *n >= seen + 3).await.unwrap();
        assert_eq!(central.received().len(), 3);

        stop(orchestrator).await;
    }

    #[tokio::test]
    async fn test_offline_sales_delivered_in_order_on_reconnect() {
        let central = FakeCentral::start().await;
        central.stop();
        let db = memory_db().await;

        // Central unreachable at boot: the client points at a dead port
        let mut orchestrator = SyncOrchestrator::new(central.config(), db.clone())
            .unwrap()
            .with_timings(fast());
        let state = orchestrator.connectivity();
        orchestrator.start().unwrap();
        state.subscribe_probes().wait_for(|n| *n >= 1).await.unwrap();

        let first = db.transactions().create(&new_sale("1", "A", 100)).await.unwrap();
        let second = db.transactions().create(&new_sale("2", "B", 200)).await.unwrap();
        stop(orchestrator).await;

        // Connectivity returns: a fresh central on a new port
        let central = FakeCentral::start().await;
        let mut orchestrator = SyncOrchestrator::new(central.config(), db.clone())
            .unwrap()
            .with_timings(fast());
        orchestrator.start().unwrap();
        let handle = orchestrator.handle();

        assert!(
            eventually(Duration::from_secs(3), || {
                let handle = handle.clone();
                async move { handle.status().await.unwrap().pending_transactions == 0 }
            })
            .await
        );
        assert_eq!(central.received(), vec![first.id.clone(), second.id.clone()]);
        for id in [&first.id, &second.id] {
            let txn = db.transactions().get_by_id(id).await.unwrap().unwrap();
            assert_eq!(txn.status, TransactionStatus::Synced);
        }

        stop(orchestrator).await;
    }

    #[tokio::test]
    async fn test_startup_catalog_pull_and_status() {
        let central = FakeCentral::start().await;
        central.set_products(sample_products());
        let db = memory_db().await;

        let mut orchestrator = SyncOrchestrator::new(central.config(), db.clone())
            .unwrap()
            .with_timings(fast());
        orchestrator.start().unwrap();
        let handle = orchestrator.handle();

        assert!(
            eventually(Duration::from_secs(3), || {
                let handle = handle.clone();
                async move { !handle.status().await.unwrap().last_catalog_sync.is_empty() }
            })
            .await
        );
        assert_eq!(db.products().count().await.unwrap(), 2);

        stop(orchestrator).await;
    }

    #[tokio::test]
    async fn test_status_not_blocked_by_stalled_upload() {
        let central = FakeCentral::start().await;
        central.set_push_delay(Duration::from_secs(2));
        let db = memory_db().await;
        db.transactions().create(&new_sale("1", "A", 100)).await.unwrap();

        let mut orchestrator = SyncOrchestrator::new(central.config(), db.clone())
            .unwrap()
            .with_timings(fast());
        let state = orchestrator.connectivity();
        orchestrator.start().unwrap();
        let handle = orchestrator.handle();

        assert!(
            eventually(Duration::from_secs(2), || {
                let online = state.is_online();
                async move { online }
            })
            .await
        );
        // Let the outbox reach the stalled POST
        tokio::time::sleep(Duration::from_millis(100)).await;

        let status = tokio::time::timeout(Duration::from_millis(200), handle.status())
            .await
            .expect("status waited on the upload")
            .unwrap();
        assert!(status.online);
        assert_eq!(status.pending_transactions, 1);
        assert!(central.received().is_empty(), "upload should still be in flight");

        stop(orchestrator).await;
    }

    #[tokio::test]
    async fn test_handle_shutdown_stops_loops() {
        let central = FakeCentral::start().await;
        let mut orchestrator = SyncOrchestrator::new(central.config(), memory_db().await)
            .unwrap()
            .with_timings(fast());
        orchestrator.start().unwrap();
        let handle = orchestrator.handle();
        assert!(
            eventually(Duration::from_secs(2), || {
                let online = handle.is_online();
                async move { online }
            })
            .await
        );

        handle.shutdown();
        stop(orchestrator).await;

        let hits = central.health_hits();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(central.health_hits(), hits);
        assert!(!handle.trigger_outbox());
    }
}
