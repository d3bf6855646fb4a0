//! # Connectivity Monitor
//!
//! Probes the central service on a fixed interval and keeps the shared
//! online flag.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Connectivity State Machine                           │
//! │                                                                         │
//! │                     probe ok                                            │
//! │            ┌──────────────────────────────┐                             │
//! │            │                              ▼                             │
//! │      ┌───────────┐                  ┌───────────┐                       │
//! │ ───► │  Offline  │                  │  Online   │                       │
//! │ init └───────────┘                  └───────────┘                       │
//! │         ▲     │ probe failed             │     │ probe ok               │
//! │         │     └──(no effect)             │     └──(no effect)           │
//! │         └────────────────────────────────┘                              │
//! │                    probe failed                                         │
//! │                                                                         │
//! │  Offline → Online: stamp last_online, request one outbox run           │
//! │  Online → Offline: flip the flag, nothing else                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The flag always equals the outcome of the most recent probe. There is no
//! hysteresis and no retry inside a probe; the next tick is the retry.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::client::CentralClient;
use crate::config::clamp_period;
use crate::outbox::OutboxTrigger;

// =============================================================================
// Shared State
// =============================================================================

/// Effect of one probe on the online flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Offline → Online.
    WentOnline,
    /// Online → Offline.
    WentOffline,
    /// Flag unchanged.
    Unchanged,
}

/// Connectivity state shared by every sync loop.
///
/// Written only by the connectivity monitor, read from anywhere without
/// locking. Starts offline until the first probe completes.
#[derive(Debug)]
pub struct ConnectivityState {
    online: AtomicBool,
    /// Epoch millis of the last offline → online edge; 0 = never.
    last_online_ms: AtomicI64,
    /// Number of completed probes.
    probes: watch::Sender<u64>,
}

impl Default for ConnectivityState {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectivityState {
    pub fn new() -> Self {
        let (probes, _) = watch::channel(0);
        ConnectivityState {
            online: AtomicBool::new(false),
            last_online_ms: AtomicI64::new(0),
            probes,
        }
    }

    /// Current online flag.
    #[inline]
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Time of the most recent offline → online edge.
    pub fn last_online(&self) -> Option<DateTime<Utc>> {
        match self.last_online_ms.load(Ordering::SeqCst) {
            0 => None,
            ms => Utc.timestamp_millis_opt(ms).single(),
        }
    }

    /// Number of probes recorded so far.
    pub fn probe_count(&self) -> u64 {
        *self.probes.borrow()
    }

    /// Subscribes to the probe counter.
    pub fn subscribe_probes(&self) -> watch::Receiver<u64> {
        self.probes.subscribe()
    }

    /// Records a probe outcome and reports the resulting transition.
    ///
    /// ## Arguments
    /// * `ok` - Whether the probe succeeded
    /// * `now` - Probe completion time, stored on an offline → online edge
    pub fn record_probe(&self, ok: bool, now: DateTime<Utc>) -> Transition {
        let was_online = self.online.swap(ok, Ordering::SeqCst);

        let transition = match (was_online, ok) {
            (false, true) => {
                self.last_online_ms
                    .store(now.timestamp_millis(), Ordering::SeqCst);
                Transition::WentOnline
            }
            (true, false) => Transition::WentOffline,
            _ => Transition::Unchanged,
        };

        self.probes.send_modify(|count| *count += 1);
        transition
    }
}

// =============================================================================
// Monitor
// =============================================================================

/// Periodic health prober.
pub struct ConnectivityMonitor {
    client: CentralClient,
    state: Arc<ConnectivityState>,
    outbox: OutboxTrigger,
}

impl ConnectivityMonitor {
    pub fn new(client: CentralClient, state: Arc<ConnectivityState>, outbox: OutboxTrigger) -> Self {
        ConnectivityMonitor {
            client,
            state,
            outbox,
        }
    }

    /// Runs one probe and updates the shared state.
    ///
    /// On an offline → online edge an outbox run is requested without
    /// waiting for it.
    ///
    /// ## Returns
    /// The probe outcome (the new value of the online flag).
    pub async fn check_connectivity(&self) -> bool {
        let ok = match self.client.health().await {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "Health probe failed");
                false
            }
        };

        match self.state.record_probe(ok, Utc::now()) {
            Transition::WentOnline => {
                info!(central = %self.client.base_url(), "Central service reachable, going online");
                if !self.outbox.request() {
                    debug!("Outbox run already queued");
                }
            }
            Transition::WentOffline => {
                warn!(central = %self.client.base_url(), "Central service unreachable, going offline");
            }
            Transition::Unchanged => {}
        }

        ok
    }

    /// Probes every `period` until `shutdown` flips to true.
    ///
    /// The first probe runs immediately. A probe in progress when shutdown
    /// is signalled is allowed to finish.
    pub async fn run(self, period: Duration, mut shutdown: watch::Receiver<bool>) {
        let period = clamp_period(period);
        info!(interval = ?period, "Connectivity monitor starting");

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {
                    self.check_connectivity().await;
                }

                _ = shutdown.changed() => {
                    info!("Connectivity monitor shutting down");
                    break;
                }
            }
        }

        info!("Connectivity monitor stopped");
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
