//! Fake central service and fixtures for the sync engine tests.
//!
//! [`FakeCentral`] serves the four central endpoints from an `axum` router
//! on an ephemeral loopback port. Every response is switchable at runtime.

use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicU16, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use lane_core::{LineItem, NewTransaction, Operator, Product, Transaction, TransactionStatus};
use lane_db::{Database, DbConfig};

use crate::client::CentralClient;
use crate::config::{CentralSettings, SyncConfig};

#[derive(Debug, Clone)]
enum Reply {
    Json(serde_json::Value),
    Status(u16),
    Malformed,
}

impl Reply {
    fn into_response(self) -> Response {
        match self {
            Reply::Json(body) => (StatusCode::OK, Json(body)).into_response(),
            Reply::Status(code) => status(code).into_response(),
            Reply::Malformed => (StatusCode::OK, "[{\"upc\": ").into_response(),
        }
    }
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

#[derive(Clone)]
struct FakeState {
    health: Arc<AtomicU16>,
    health_hits: Arc<AtomicUsize>,
    products: Arc<Mutex<Reply>>,
    products_hits: Arc<AtomicUsize>,
    operators: Arc<Mutex<Reply>>,
    operators_hits: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<String>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    push_delay_ms: Arc<AtomicU64>,
}

async fn health(State(s): State<FakeState>) -> StatusCode {
    s.health_hits.fetch_add(1, Ordering::SeqCst);
    status(s.health.load(Ordering::SeqCst))
}

async fn products(State(s): State<FakeState>) -> Response {
    s.products_hits.fetch_add(1, Ordering::SeqCst);
    let reply = s.products.lock().unwrap().clone();
    reply.into_response()
}

async fn operators(State(s): State<FakeState>) -> Response {
    s.operators_hits.fetch_add(1, Ordering::SeqCst);
    let reply = s.operators.lock().unwrap().clone();
    reply.into_response()
}

async fn push(State(s): State<FakeState>, Json(txn): Json<Transaction>) -> StatusCode {
    let delay = s.push_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    s.received.lock().unwrap().push(txn.id.clone());
    if s.failing.lock().unwrap().contains(&txn.id) {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::CREATED
    }
}

/// In-process stand-in for the central service.
pub(crate) struct FakeCentral {
    pub base_url: String,
    state: FakeState,
    server: JoinHandle<()>,
}

impl FakeCentral {
    /// Starts serving on `127.0.0.1:0`. Healthy, empty catalog by default.
    pub async fn start() -> Self {
        let state = FakeState {
            health: Arc::new(AtomicU16::new(200)),
            health_hits: Arc::default(),
            products: Arc::new(Mutex::new(Reply::Json(serde_json::json!([])))),
            products_hits: Arc::default(),
            operators: Arc::new(Mutex::new(Reply::Json(serde_json::json!([])))),
            operators_hits: Arc::default(),
            received: Arc::default(),
            failing: Arc::default(),
            push_delay_ms: Arc::default(),
        };

        let app = Router::new()
            .route("/health", get(health))
            .route("/api/products", get(products))
            .route("/api/operators", get(operators))
            .route("/api/transactions", post(push))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        FakeCentral {
            base_url: format!("http://{addr}"),
            state,
            server,
        }
    }

    pub fn settings(&self) -> CentralSettings {
        CentralSettings {
            base_url: self.base_url.clone(),
            health_timeout_secs: 2,
            fetch_timeout_secs: 2,
            push_timeout_secs: 2,
        }
    }

    pub fn config(&self) -> SyncConfig {
        SyncConfig {
            central: self.settings(),
            ..SyncConfig::default()
        }
    }

    pub fn client(&self) -> CentralClient {
        CentralClient::new(&self.settings()).unwrap()
    }

    /// Stops accepting connections.
    pub fn stop(&self) {
        self.server.abort();
    }

    pub fn set_health(&self, code: u16) {
        self.state.health.store(code, Ordering::SeqCst);
    }

    pub fn health_hits(&self) -> usize {
        self.state.health_hits.load(Ordering::SeqCst)
    }

    pub fn set_products(&self, products: Vec<Product>) {
        *self.state.products.lock().unwrap() = Reply::Json(serde_json::to_value(products).unwrap());
    }

    pub fn products_status(&self, code: u16) {
        *self.state.products.lock().unwrap() = Reply::Status(code);
    }

    pub fn products_malformed(&self) {
        *self.state.products.lock().unwrap() = Reply::Malformed;
    }

    pub fn products_hits(&self) -> usize {
        self.state.products_hits.load(Ordering::SeqCst)
    }

    pub fn set_operators(&self, operators: Vec<Operator>) {
        *self.state.operators.lock().unwrap() =
            Reply::Json(serde_json::to_value(operators).unwrap());
    }

    pub fn operators_status(&self, code: u16) {
        *self.state.operators.lock().unwrap() = Reply::Status(code);
    }

    pub fn operators_hits(&self) -> usize {
        self.state.operators_hits.load(Ordering::SeqCst)
    }

    /// Makes `POST /api/transactions` answer 500 for this id.
    pub fn fail_push_for(&self, id: &str) {
        self.state.failing.lock().unwrap().insert(id.to_string());
    }

    pub fn set_push_delay(&self, delay: Duration) {
        self.state
            .push_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Transaction ids received so far, in arrival order (failures included).
    pub fn received(&self) -> Vec<String> {
        self.state.received.lock().unwrap().clone()
    }
}

impl Drop for FakeCentral {
    fn drop(&mut self) {
        self.server.abort();
    }
}

// =============================================================================
// Fixtures
// =============================================================================

pub(crate) async fn memory_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

pub(crate) fn product(upc: &str, name: &str, price_cents: i64) -> Product {
    Product {
        upc: upc.into(),
        sku: format!("SKU-{upc}"),
        name: name.into(),
        price_cents,
        department: "Grocery".into(),
        tax_rate: 82500,
    }
}

pub(crate) fn sample_products() -> Vec<Product> {
    vec![
        product("012345678905", "Cola 330ml", 199),
        product("098765432109", "Sea Salt Chips", 349),
    ]
}

pub(crate) fn operator(pin: &str, name: &str) -> Operator {
    Operator {
        pin: pin.into(),
        name: name.into(),
        employee_id: format!("E-{pin}"),
        is_manager: false,
    }
}

pub(crate) fn new_sale(pin: &str, upc: &str, price_cents: i64) -> NewTransaction {
    NewTransaction {
        operator_pin: pin.into(),
        items: vec![LineItem {
            upc: upc.into(),
            name: format!("Item {upc}"),
            price_cents,
            quantity: 1,
            is_manual: false,
        }],
        subtotal_cents: price_cents,
        tax_cents: 0,
        total_cents: price_cents,
        payment_method: "cash".into(),
        payment_ref: String::new(),
        customer_email: None,
        customer_phone: None,
    }
}

/// A standalone transaction value (not stored).
pub(crate) fn transaction(id: &str) -> Transaction {
    let sale = new_sale("1234", "012345678905", 199);
    Transaction {
        id: id.into(),
        operator_pin: sale.operator_pin,
        items: sale.items,
        subtotal_cents: sale.subtotal_cents,
        tax_cents: sale.tax_cents,
        total_cents: sale.total_cents,
        payment_method: sale.payment_method,
        payment_ref: sale.payment_ref,
        customer_email: None,
        customer_phone: None,
        status: TransactionStatus::Pending,
        created_at: Utc::now(),
        synced_at: None,
    }
}

/// Polls `check` every 10ms until it returns true or `timeout` elapses.
pub(crate) async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
