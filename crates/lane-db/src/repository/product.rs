//! # Product Repository
//!
//! Database operations for the product catalog.
//!
//! ## Key Operations
//! - Lookup by UPC (scanner path)
//! - Substring search over name, UPC and SKU (keyboard path)
//! - Atomic replace-all (catalog puller)
//!
//! ## Replace-All
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Catalog Replace-All                                  │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    DELETE FROM products                                                │
//! │    INSERT product 1                                                    │
//! │    INSERT product 2                                                    │
//! │    ...            ── any failure ──► ROLLBACK (old rows untouched)     │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Concurrent readers (WAL) keep seeing the old table until COMMIT;      │
//! │  an empty intermediate table is never visible.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use lane_core::Product;

const PRODUCT_COLUMNS: &str = "upc, sku, name, price_cents, department, tax_rate";

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its UPC.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Unknown UPC
    pub async fn get_by_upc(&self, upc: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE upc = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(upc)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Searches products by case-insensitive substring of name, UPC or SKU.
    ///
    /// ## Arguments
    /// * `query` - Search term; surrounding whitespace is ignored
    /// * `limit` - Maximum results to return
    ///
    /// ## Behavior
    /// - Blank query returns an empty list
    /// - `%` and `_` in the query match themselves, not wildcards
    /// - Results are ordered by name, then UPC
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Product>> {
        let query = query.trim();

        debug!(query = %query, limit = %limit, "Searching products");

        if query.is_empty() {
            return Ok(Vec::new());
        }

        let pattern = format!("%{}%", escape_like(&query.to_lowercase()));

        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE lower(name) LIKE ?1 ESCAPE '\'
               OR lower(upc)  LIKE ?1 ESCAPE '\'
               OR lower(sku)  LIKE ?1 ESCAPE '\'
            ORDER BY name, upc
            LIMIT ?2
            "#
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(&pattern)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    /// Lists every product, ordered by UPC.
    pub async fn list_all(&self) -> DbResult<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY upc");
        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Counts products in the catalog.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Replaces the whole product table with `products`.
    ///
    /// Runs delete-then-insert in one SQLite transaction. If any insert
    /// fails (duplicate UPC, negative price) the transaction is rolled back
    /// and the previous catalog stays in place.
    ///
    /// ## Returns
    /// Number of products now in the table.
    pub async fn replace_all(&self, products: &[Product]) -> DbResult<u64> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM products")
            .execute(&mut *tx)
            .await?
            .rows_affected();

        for product in products {
            sqlx::query(
                r#"
                INSERT INTO products (upc, sku, name, price_cents, department, tax_rate)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(&product.upc)
            .bind(&product.sku)
            .bind(&product.name)
            .bind(product.price_cents)
            .bind(&product.department)
            .bind(product.tax_rate)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(removed, inserted = products.len(), "Product catalog replaced");
        Ok(products.len() as u64)
    }
}

/// Escapes LIKE metacharacters using `\` as the escape character.
pub(crate) fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// =============================================================================
// Unit Tests
// =============================================================================
