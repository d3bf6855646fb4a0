//! # Transaction Outbox
//!
//! Uploads pending transactions to the central service and marks them
//! synced.
//!
//! ## Outbox Processing Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Outbox Flow                                          │
//! │                                                                         │
//! │  ConnectivityMonitor ── online edge ──► OutboxTrigger::request()       │
//! │  SyncHandle::trigger_outbox() ────────►        │                       │
//! │                                                │ mpsc, capacity 1      │
//! │                                                ▼ (full = coalesced)    │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    OutboxWorker (one run at a time)             │   │
//! │  │                                                                 │   │
//! │  │  TransactionOutbox::sync_transactions()                         │   │
//! │  │   0. offline? → no-op                                           │   │
//! │  │   1. list_pending()            (creation order)                 │   │
//! │  │   2. for each transaction:                                      │   │
//! │  │        in-flight elsewhere? → skip                              │   │
//! │  │        POST /api/transactions                                   │   │
//! │  │          ok   → mark_synced()  (compare-and-set)                │   │
//! │  │          fail → record_failure(), continue with the next        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  DELIVERY: at-least-once. A crash between POST and mark_synced means   │
//! │  the next run posts the same transaction again; the central service    │
//! │  deduplicates on the transaction id.                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, watch};
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};

use lane_db::Database;

use crate::client::CentralClient;
use crate::connectivity::ConnectivityState;
use crate::error::SyncResult;

// =============================================================================
// Report
// =============================================================================

/// Outcome of one outbox run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutboxReport {
    /// The run was skipped because the terminal was offline.
    pub skipped_offline: bool,
    /// Pending transactions found at the start of the run.
    pub pending: usize,
    /// Accepted by the central service and marked synced by this run.
    pub delivered: usize,
    /// Accepted, but another run had already marked them synced.
    pub already_synced: usize,
    /// Rejected or unreachable; left pending.
    pub failed: usize,
    /// Being uploaded by a concurrent run; not touched.
    pub in_flight_elsewhere: usize,
}

impl OutboxReport {
    fn offline() -> Self {
        OutboxReport {
            skipped_offline: true,
            ..Default::default()
        }
    }
}

// =============================================================================
// In-Flight Guard
// =============================================================================

type InFlight = Arc<Mutex<HashSet<String>>>;

/// Holds a transaction id in the in-flight set until dropped.
struct InFlightGuard {
    set: InFlight,
    id: String,
}

impl InFlightGuard {
    /// Claims `id`, or returns `None` if another run holds it.
    fn acquire(set: &InFlight, id: &str) -> Option<Self> {
        let mut ids = set.lock().unwrap_or_else(PoisonError::into_inner);
        if !ids.insert(id.to_string()) {
            return None;
        }
        Some(InFlightGuard {
            set: Arc::clone(set),
            id: id.to_string(),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

// =============================================================================
// Transaction Outbox
// =============================================================================

/// Delivers pending transactions. Clones share the in-flight set.
#[derive(Clone)]
pub struct TransactionOutbox {
    client: CentralClient,
    db: Database,
    state: Arc<ConnectivityState>,
    in_flight: InFlight,
}

impl TransactionOutbox {
    pub fn new(client: CentralClient, db: Database, state: Arc<ConnectivityState>) -> Self {
        TransactionOutbox {
            client,
            db,
            state,
            in_flight: InFlight::default(),
        }
    }

    /// Uploads every pending transaction once, oldest first.
    ///
    /// Checks the online flag once at entry and does nothing when offline.
    /// A failed upload is recorded and the run moves on to the next
    /// transaction. Nothing is retried within a run.
    ///
    /// ## Returns
    /// * `Ok(OutboxReport)` - Per-run counters
    /// * `Err(SyncError::Database)` - The Local Store failed; remaining
    ///   transactions stay pending for the next run
    pub async fn sync_transactions(&self) -> SyncResult<OutboxReport> {
        if !self.state.is_online() {
            debug!("Offline, skipping outbox run");
            return Ok(OutboxReport::offline());
        }

        let transactions = self.db.transactions();
        let pending = transactions.list_pending().await?;

        let mut report = OutboxReport {
            pending: pending.len(),
            ..Default::default()
        };

        if pending.is_empty() {
            debug!("No pending transactions");
            return Ok(report);
        }

        info!(count = pending.len(), "Uploading pending transactions");

        for txn in &pending {
            let Some(_guard) = InFlightGuard::acquire(&self.in_flight, &txn.id) else {
                debug!(id = %txn.id, "Transaction already in flight, skipping");
                report.in_flight_elsewhere += 1;
                continue;
            };

            match self.client.push_transaction(txn).await {
                Ok(()) => {
                    if transactions.mark_synced(&txn.id).await? {
                        report.delivered += 1;
                    } else {
                        report.already_synced += 1;
                    }
                }
                Err(e) => {
                    warn!(id = %txn.id, error = %e, "Transaction upload failed, leaving pending");
                    report.failed += 1;
                    if let Err(db_err) = transactions.record_failure(&txn.id, &e.to_string()).await {
                        error!(id = %txn.id, error = %db_err, "Failed to record upload failure");
                    }
                }
            }
        }

        info!(
            delivered = report.delivered,
            failed = report.failed,
            skipped = report.in_flight_elsewhere,
            "Outbox run complete"
        );
        Ok(report)
    }
}

// =============================================================================
// Trigger + Worker
// =============================================================================

/// Requests an outbox run without waiting for it.
#[derive(Debug, Clone)]
pub struct OutboxTrigger {
    tx: mpsc::Sender<()>,
}

impl OutboxTrigger {
    /// Queues a run.
    ///
    /// ## Returns
    /// * `true` - A new run was queued
    /// * `false` - A run was already queued (coalesced), or the worker is gone
    pub fn request(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) => false,
            Err(TrySendError::Closed(())) => {
                debug!("Outbox worker stopped, dropping request");
                false
            }
        }
    }
}

/// Creates a trigger and the receiving end a worker drains.
pub(crate) fn trigger_channel() -> (OutboxTrigger, mpsc::Receiver<()>) {
    let (tx, rx) = mpsc::channel(1);
    (OutboxTrigger { tx }, rx)
}

/// Runs the outbox whenever a request arrives, one run at a time.
///
/// Requests arriving during a run collapse into a single follow-up run.
pub struct OutboxWorker {
    outbox: TransactionOutbox,
    requests: mpsc::Receiver<()>,
}

impl OutboxWorker {
    /// Creates the worker and the trigger that feeds it.
    pub fn new(outbox: TransactionOutbox) -> (Self, OutboxTrigger) {
        let (trigger, requests) = trigger_channel();
        (OutboxWorker { outbox, requests }, trigger)
    }

    /// Serves requests until shutdown or until every trigger is dropped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("Outbox worker starting");

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                request = self.requests.recv() => {
                    if request.is_none() {
                        break;
                    }
                    if let Err(e) = self.outbox.sync_transactions().await {
                        error!(error = %e, "Outbox run failed");
                    }
                }

                _ = shutdown.changed() => {
                    info!("Outbox worker shutting down");
                    break;
                }
            }
        }

        info!("Outbox worker stopped");
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
