//! # Transaction Repository
//!
//! The terminal's append-only sales log, and the outbox the sync engine
//! drains.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Transaction Lifecycle                                │
//! │                                                                         │
//! │  checkout ──► create()                                                 │
//! │                 │  BEGIN                                               │
//! │                 │    INSERT transactions (status = 'pending')          │
//! │                 │    INSERT transaction_items (position 0..n)          │
//! │                 │  COMMIT                                              │
//! │                 ▼                                                       │
//! │             ┌─────────┐   push ok    ┌─────────┐                        │
//! │             │ pending │ ───────────► │ synced  │                        │
//! │             └─────────┘ mark_synced  └─────────┘                        │
//! │                 │  ▲                                                    │
//! │    push failed  └──┘ record_failure (attempts + 1, last_error)          │
//! │                                                                         │
//! │  mark_synced is a compare-and-set:                                     │
//! │    UPDATE ... SET status = 'synced' WHERE id = ? AND status = 'pending'│
//! │  Exactly one caller observes `true`; a concurrent duplicate gets       │
//! │  `false` and does nothing.                                             │
//! │                                                                         │
//! │  Triggers reject: synced → pending, edits to the snapshot columns,     │
//! │  edits to line items, deletes.                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DbResult;
use lane_core::validation::validate_new_transaction;
use lane_core::{LineItem, NewTransaction, Transaction, TransactionStatus};

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, FromRow)]
struct TransactionRow {
    id: String,
    operator_pin: String,
    subtotal_cents: i64,
    tax_cents: i64,
    total_cents: i64,
    payment_method: String,
    payment_ref: String,
    customer_email: Option<String>,
    customer_phone: Option<String>,
    status: TransactionStatus,
    created_at: DateTime<Utc>,
    synced_at: Option<DateTime<Utc>>,
}

impl TransactionRow {
    fn into_transaction(self, items: Vec<LineItem>) -> Transaction {
        Transaction {
            id: self.id,
            operator_pin: self.operator_pin,
            items,
            subtotal_cents: self.subtotal_cents,
            tax_cents: self.tax_cents,
            total_cents: self.total_cents,
            payment_method: self.payment_method,
            payment_ref: self.payment_ref,
            customer_email: self.customer_email,
            customer_phone: self.customer_phone,
            status: self.status,
            created_at: self.created_at,
            synced_at: self.synced_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ItemRow {
    transaction_id: String,
    upc: String,
    name: String,
    price_cents: i64,
    quantity: i64,
    is_manual: bool,
}

impl From<ItemRow> for LineItem {
    fn from(row: ItemRow) -> Self {
        LineItem {
            upc: row.upc,
            name: row.name,
            price_cents: row.price_cents,
            quantity: row.quantity,
            is_manual: row.is_manual,
        }
    }
}

/// Delivery bookkeeping for one transaction.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct DeliveryState {
    pub status: TransactionStatus,
    /// Failed push attempts so far.
    pub attempts: i64,
    /// Error text of the most recent failed attempt.
    pub last_error: Option<String>,
}

const TRANSACTION_COLUMNS: &str = r#"
    id, operator_pin, subtotal_cents, tax_cents, total_cents,
    payment_method, payment_ref, customer_email, customer_phone,
    status, created_at, synced_at
"#;

const ITEM_COLUMNS: &str = "transaction_id, upc, name, price_cents, quantity, is_manual";

// =============================================================================
// Repository
// =============================================================================

/// Repository for the sales log.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Records a completed sale.
    ///
    /// Assigns a UUID v4 identifier, status `pending` and `created_at = now`.
    /// Header and line items are written in one SQLite transaction.
    ///
    /// ## Returns
    /// * `Ok(Transaction)` - The stored transaction
    /// * `Err(DbError::Validation)` - Input rejected before touching SQLite
    pub async fn create(&self, new: &NewTransaction) -> DbResult<Transaction> {
        validate_new_transaction(new)?;

        let txn = Transaction {
            id: Uuid::new_v4().to_string(),
            operator_pin: new.operator_pin.clone(),
            items: new.items.clone(),
            subtotal_cents: new.subtotal_cents,
            tax_cents: new.tax_cents,
            total_cents: new.total_cents,
            payment_method: new.payment_method.clone(),
            payment_ref: new.payment_ref.clone(),
            customer_email: new.customer_email.clone(),
            customer_phone: new.customer_phone.clone(),
            status: TransactionStatus::Pending,
            created_at: Utc::now(),
            synced_at: None,
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, operator_pin, subtotal_cents, tax_cents, total_cents,
                payment_method, payment_ref, customer_email, customer_phone,
                status, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&txn.id)
        .bind(&txn.operator_pin)
        .bind(txn.subtotal_cents)
        .bind(txn.tax_cents)
        .bind(txn.total_cents)
        .bind(&txn.payment_method)
        .bind(&txn.payment_ref)
        .bind(&txn.customer_email)
        .bind(&txn.customer_phone)
        .bind(txn.status)
        .bind(txn.created_at)
        .execute(&mut *tx)
        .await?;

        for (position, item) in txn.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO transaction_items (
                    transaction_id, position, upc, name, price_cents, quantity, is_manual
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(&txn.id)
            .bind(position as i64)
            .bind(&item.upc)
            .bind(&item.name)
            .bind(item.price_cents)
            .bind(item.quantity)
            .bind(item.is_manual)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            id = %txn.id,
            items = txn.items.len(),
            total_cents = txn.total_cents,
            "Transaction recorded"
        );
        Ok(txn)
    }

    /// Gets a transaction, including its line items.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Transaction>> {
        let mut conn = self.pool.begin().await?;

        let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?1");
        let Some(row) = sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
        else {
            return Ok(None);
        };

        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM transaction_items WHERE transaction_id = ?1 ORDER BY position"
        );
        let items = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(id)
            .fetch_all(&mut *conn)
            .await?
            .into_iter()
            .map(LineItem::from)
            .collect();

        conn.commit().await?;

        Ok(Some(row.into_transaction(items)))
    }

    /// Lists pending transactions in creation order, oldest first.
    ///
    /// Headers and items are read inside one transaction so every returned
    /// transaction carries its full item list.
    pub async fn list_pending(&self) -> DbResult<Vec<Transaction>> {
        let mut conn = self.pool.begin().await?;

        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions
             WHERE status = 'pending'
             ORDER BY created_at ASC, rowid ASC"
        );
        let rows = sqlx::query_as::<_, TransactionRow>(&sql)
            .fetch_all(&mut *conn)
            .await?;

        if rows.is_empty() {
            conn.commit().await?;
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM transaction_items
             WHERE transaction_id IN (SELECT id FROM transactions WHERE status = 'pending')
             ORDER BY transaction_id, position"
        );
        let item_rows = sqlx::query_as::<_, ItemRow>(&sql)
            .fetch_all(&mut *conn)
            .await?;

        conn.commit().await?;

        let mut items_by_txn: HashMap<String, Vec<LineItem>> = HashMap::new();
        for row in item_rows {
            items_by_txn
                .entry(row.transaction_id.clone())
                .or_default()
                .push(row.into());
        }

        let pending: Vec<Transaction> = rows
            .into_iter()
            .map(|row| {
                let items = items_by_txn.remove(&row.id).unwrap_or_default();
                row.into_transaction(items)
            })
            .collect();

        debug!(count = pending.len(), "Loaded pending transactions");
        Ok(pending)
    }

    /// Counts transactions still waiting for delivery.
    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE status = 'pending'")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Marks a pending transaction as synced, stamping `synced_at`.
    ///
    /// ## Returns
    /// * `Ok(true)` - This call moved the transaction from pending to synced
    /// * `Ok(false)` - Already synced (or unknown ID); nothing changed
    pub async fn mark_synced(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE transactions SET
                status = 'synced',
                synced_at = ?2
            WHERE id = ?1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Records a failed delivery attempt. Status stays pending.
    pub async fn record_failure(&self, id: &str, error: &str) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE transactions SET
                attempts = attempts + 1,
                last_error = ?2
            WHERE id = ?1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Returns status, attempt count and last error for a transaction.
    pub async fn delivery_state(&self, id: &str) -> DbResult<Option<DeliveryState>> {
        let state = sqlx::query_as::<_, DeliveryState>(
            "SELECT status, attempts, last_error FROM transactions WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(state)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};

    fn sale(pin: &str, items: Vec<LineItem>) -> NewTransaction {
        let subtotal: i64 = items.iter().map(LineItem::line_total_cents).sum();
        NewTransaction {
            operator_pin: pin.into(),
            items,
            subtotal_cents: subtotal,
            tax_cents: 0,
            total_cents: subtotal,
            payment_method: "cash".into(),
            payment_ref: String::new(),
            customer_email: Some("a@example.com".into()),
            customer_phone: None,
        }
    }

    fn item(upc: &str, price_cents: i64, quantity: i64) -> LineItem {
        LineItem {
            upc: upc.into(),
            name: format!("Item {upc}"),
            price_cents,
            quantity,
            is_manual: upc.starts_with('M'),
        }
    }

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get_round_trip() {
        let db = setup().await;
        let repo = db.transactions();

        let created = repo
            .create(&sale("1234", vec![item("A", 100, 2), item("M1", 50, 1)]))
            .await
            .unwrap();
        assert!(created.is_pending());
        assert!(Uuid::parse_str(&created.id).is_ok());

        let loaded = repo.get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(loaded.items.len(), 2);
        assert_eq!(loaded.items[0].upc, "A");
        assert!(loaded.items[1].is_manual);
        assert_eq!(loaded.total_cents, 250);
        assert_eq!(loaded.customer_email.as_deref(), Some("a@example.com"));
        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_rejects_empty_sale() {
        let db = setup().await;
        let err = db.transactions().create(&sale("1234", vec![])).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
    }

    #[tokio::test]
    async fn test_pending_listing_in_creation_order() {
        let db = setup().await;
        let repo = db.transactions();

        let first = repo.create(&sale("1", vec![item("A", 1, 1)])).await.unwrap();
        let second = repo.create(&sale("2", vec![item("B", 2, 1)])).await.unwrap();
        let third = repo.create(&sale("3", vec![item("C", 3, 1)])).await.unwrap();

        let ids: Vec<String> = repo
            .list_pending()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![first.id, second.id, third.id]);
        assert_eq!(repo.count_pending().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_pending_stays_pending_until_marked() {
        let db = setup().await;
        let repo = db.transactions();
        let txn = repo.create(&sale("1", vec![item("A", 1, 1)])).await.unwrap();

        for _ in 0..3 {
            assert_eq!(repo.list_pending().await.unwrap().len(), 1);
        }

        assert!(repo.mark_synced(&txn.id).await.unwrap());
        assert!(repo.list_pending().await.unwrap().is_empty());
        assert_eq!(repo.count_pending().await.unwrap(), 0);

        let synced = repo.get_by_id(&txn.id).await.unwrap().unwrap();
        assert_eq!(synced.status, TransactionStatus::Synced);
        assert!(synced.synced_at.is_some());
        assert_eq!(synced.items.len(), 1);
    }

    #[tokio::test]
    async fn test_mark_synced_is_compare_and_set() {
        let db = setup().await;
        let repo = db.transactions();
        let txn = repo.create(&sale("1", vec![item("A", 1, 1)])).await.unwrap();

        assert!(repo.mark_synced(&txn.id).await.unwrap());
        assert!(!repo.mark_synced(&txn.id).await.unwrap());
        assert!(!repo.mark_synced("unknown").await.unwrap());
    }

    #[tokio::test]
    async fn test_record_failure_keeps_pending() {
        let db = setup().await;
        let repo = db.transactions();
        let txn = repo.create(&sale("1", vec![item("A", 1, 1)])).await.unwrap();

        repo.record_failure(&txn.id, "HTTP 500").await.unwrap();
        repo.record_failure(&txn.id, "timeout").await.unwrap();

        let state = repo.delivery_state(&txn.id).await.unwrap().unwrap();
        assert_eq!(state.status, TransactionStatus::Pending);
        assert_eq!(state.attempts, 2);
        assert_eq!(state.last_error.as_deref(), Some("timeout"));
    }

    #[tokio::test]
    async fn test_synced_cannot_revert() {
        let db = setup().await;
        let repo = db.transactions();
        let txn = repo.create(&sale("1", vec![item("A", 1, 1)])).await.unwrap();
        repo.mark_synced(&txn.id).await.unwrap();

        let err = sqlx::query("UPDATE transactions SET status = 'pending' WHERE id = ?1")
            .bind(&txn.id)
            .execute(db.pool())
            .await
            .map_err(DbError::from)
            .unwrap_err();
        assert!(matches!(err, DbError::ConstraintViolation(_)));
    }

    #[tokio::test]
    async fn test_snapshot_is_immutable() {
        let db = setup().await;
        let repo = db.transactions();
        let txn = repo.create(&sale("1", vec![item("A", 100, 1)])).await.unwrap();

        let header = sqlx::query("UPDATE transactions SET total_cents = 1 WHERE id = ?1")
            .bind(&txn.id)
            .execute(db.pool())
            .await;
        assert!(header.is_err());

        let items = sqlx::query("UPDATE transaction_items SET price_cents = 1 WHERE transaction_id = ?1")
            .bind(&txn.id)
            .execute(db.pool())
            .await;
        assert!(items.is_err());

        let delete = sqlx::query("DELETE FROM transactions WHERE id = ?1")
            .bind(&txn.id)
            .execute(db.pool())
            .await;
        assert!(delete.is_err());

        let loaded = repo.get_by_id(&txn.id).await.unwrap().unwrap();
        assert_eq!(loaded.total_cents, 100);
        assert_eq!(loaded.items[0].price_cents, 100);
    }
}
