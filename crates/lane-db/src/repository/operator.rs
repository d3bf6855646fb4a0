//! # Operator Repository
//!
//! PIN lookup and catalog replace-all for operators. Same all-or-nothing
//! replace discipline as [`super::product::ProductRepository`].

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use lane_core::Operator;

/// Repository for operator database operations.
#[derive(Debug, Clone)]
pub struct OperatorRepository {
    pool: SqlitePool,
}

impl OperatorRepository {
    /// Creates a new OperatorRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OperatorRepository { pool }
    }

    /// Looks up the operator owning `pin`.
    ///
    /// ## Returns
    /// * `Ok(Some(Operator))` - PIN is valid on this terminal
    /// * `Ok(None)` - Unknown PIN
    pub async fn validate_pin(&self, pin: &str) -> DbResult<Option<Operator>> {
        let operator = sqlx::query_as::<_, Operator>(
            "SELECT pin, name, employee_id, is_manager FROM operators WHERE pin = ?1",
        )
        .bind(pin)
        .fetch_optional(&self.pool)
        .await?;

        Ok(operator)
    }

    /// Lists every operator, ordered by name.
    pub async fn list_all(&self) -> DbResult<Vec<Operator>> {
        let operators = sqlx::query_as::<_, Operator>(
            "SELECT pin, name, employee_id, is_manager FROM operators ORDER BY name, pin",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(operators)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM operators")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Replaces the whole operator table inside one transaction.
    ///
    /// ## Returns
    /// Number of operators now in the table.
    pub async fn replace_all(&self, operators: &[Operator]) -> DbResult<u64> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM operators").execute(&mut *tx).await?;

        for operator in operators {
            sqlx::query(
                r#"
                INSERT INTO operators (pin, name, employee_id, is_manager)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )
            .bind(&operator.pin)
            .bind(&operator.name)
            .bind(&operator.employee_id)
            .bind(operator.is_manager)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(inserted = operators.len(), "Operator list replaced");
        Ok(operators.len() as u64)
    }
}
