//! # Central Service Client
//!
//! HTTP calls the terminal makes to the central service.
//!
//! ```text
//! ┌───────────────────────┬────────┬────────────────────┬──────────────────┐
//! │ Call                  │ Method │ Path               │ Accepted status  │
//! ├───────────────────────┼────────┼────────────────────┼──────────────────┤
//! │ health()              │ GET    │ /health            │ exactly 200      │
//! │ fetch_products()      │ GET    │ /api/products      │ exactly 200      │
//! │ fetch_operators()     │ GET    │ /api/operators     │ exactly 200      │
//! │ push_transaction()    │ POST   │ /api/transactions  │ < 400            │
//! └───────────────────────┴────────┴────────────────────┴──────────────────┘
//! ```
//!
//! Every call carries its own deadline. There are no retries here; the
//! calling loop's next tick is the retry.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use lane_core::{Operator, Product, Transaction};

use crate::config::CentralSettings;
use crate::error::{SyncError, SyncResult};

const HEALTH_PATH: &str = "health";
const PRODUCTS_PATH: &str = "api/products";
const OPERATORS_PATH: &str = "api/operators";
const TRANSACTIONS_PATH: &str = "api/transactions";

/// Client for the central service. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CentralClient {
    http: Client,
    base_url: Url,
    health_timeout: Duration,
    fetch_timeout: Duration,
    push_timeout: Duration,
}

impl CentralClient {
    /// Creates a client from the `[central]` settings.
    pub fn new(settings: &CentralSettings) -> SyncResult<Self> {
        let mut base_url = Url::parse(&settings.base_url)?;
        // Relative joins replace the last path segment unless it ends in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = Client::builder()
            .build()
            .map_err(|e| SyncError::InvalidConfig(e.to_string()))?;

        Ok(CentralClient {
            http,
            base_url,
            health_timeout: settings.health_timeout(),
            fetch_timeout: settings.fetch_timeout(),
            push_timeout: settings.push_timeout(),
        })
    }

    /// Base URL every endpoint is joined onto.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> SyncResult<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// Probes `GET /health`.
    ///
    /// ## Returns
    /// * `Ok(())` - Transport succeeded and the status was exactly 200
    /// * `Err(_)` - Anything else (refused, timeout, 204, 503, ...)
    pub async fn health(&self) -> SyncResult<()> {
        let url = self.endpoint(HEALTH_PATH)?;
        let response = self
            .http
            .get(url)
            .timeout(self.health_timeout)
            .send()
            .await?;

        expect_ok(HEALTH_PATH, response.status())
    }

    /// Downloads the full product catalog.
    pub async fn fetch_products(&self) -> SyncResult<Vec<Product>> {
        self.fetch_list(PRODUCTS_PATH).await
    }

    /// Downloads the full operator list.
    pub async fn fetch_operators(&self) -> SyncResult<Vec<Operator>> {
        self.fetch_list(OPERATORS_PATH).await
    }

    async fn fetch_list<T: DeserializeOwned>(&self, path: &str) -> SyncResult<Vec<T>> {
        let url = self.endpoint(path)?;
        let response = self
            .http
            .get(url)
            .timeout(self.fetch_timeout)
            .send()
            .await?;

        expect_ok(path, response.status())?;

        let body = response.bytes().await?;
        let records: Vec<T> = serde_json::from_slice(&body)
            .map_err(|e| SyncError::DeserializationFailed(format!("/{path}: {e}")))?;

        debug!(path = %path, count = records.len(), "Fetched catalog list");
        Ok(records)
    }

    /// Uploads one transaction with its line items.
    ///
    /// Any status below 400 counts as accepted. The central service is
    /// expected to deduplicate on `Transaction::id`.
    pub async fn push_transaction(&self, txn: &Transaction) -> SyncResult<()> {
        let url = self.endpoint(TRANSACTIONS_PATH)?;
        let response = self
            .http
            .post(url)
            .timeout(self.push_timeout)
            .json(txn)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(SyncError::UnexpectedStatus {
                path: format!("/{TRANSACTIONS_PATH}"),
                status: status.as_u16(),
            });
        }

        debug!(id = %txn.id, status = status.as_u16(), "Transaction accepted");
        Ok(())
    }
}

fn expect_ok(path: &str, status: StatusCode) -> SyncResult<()> {
    if status != StatusCode::OK {
        return Err(SyncError::UnexpectedStatus {
            path: format!("/{path}"),
            status: status.as_u16(),
        });
    }
    Ok(())
}
