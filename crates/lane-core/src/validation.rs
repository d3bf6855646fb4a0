//! # Validation Module
//!
//! Checks applied before data enters the Local Store.
//!
//! ## Where Validation Happens
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Catalog pull (lane-sync)                                              │
//! │  ├── serde decode of the JSON array                                    │
//! │  └── THIS MODULE: validate_catalog_products / operators                │
//! │           │   (a bad record fails the whole fetch step)                │
//! │           ▼                                                             │
//! │  Checkout (page layer)                                                 │
//! │  └── THIS MODULE: validate_new_transaction                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  SQLite                                                                 │
//! │  ├── PRIMARY KEY (upc, pin, id)                                        │
//! │  └── CHECK (price_cents >= 0, tax_rate >= 0)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{CoreError, ValidationError};
use crate::types::{LineItem, NewTransaction, Operator, Product};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

fn require(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::required(field));
    }
    Ok(())
}

fn non_negative(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::negative(field, value));
    }
    Ok(())
}

// =============================================================================
// Catalog
// =============================================================================

/// Validates a product received from the central service.
///
/// ## Rules
/// - `upc` and `name` must not be blank
/// - `price_cents` and `tax_rate` must not be negative
///
/// ## Example
/// ```rust
/// use lane_core::{validation::validate_product, Product};
///
/// let p = Product {
///     upc: "012345678905".into(),
///     sku: "COLA-330".into(),
///     name: "Cola 330ml".into(),
///     price_cents: 199,
///     department: "Drinks".into(),
///     tax_rate: 82500,
/// };
/// assert!(validate_product(&p).is_ok());
/// ```
pub fn validate_product(product: &Product) -> ValidationResult<()> {
    require("upc", &product.upc)?;
    require("name", &product.name)?;
    non_negative("price_cents", product.price_cents)?;
    non_negative("tax_rate", product.tax_rate)?;
    Ok(())
}

/// Validates an operator received from the central service.
pub fn validate_operator(operator: &Operator) -> ValidationResult<()> {
    require("pin", &operator.pin)?;
    require("name", &operator.name)?;
    Ok(())
}

/// Validates every product of a catalog payload.
///
/// Stops at the first bad record. Duplicate UPCs are not checked here; the
/// store's primary key rejects them inside the replace transaction.
pub fn validate_catalog_products(products: &[Product]) -> Result<(), CoreError> {
    for product in products {
        validate_product(product).map_err(|source| CoreError::InvalidCatalogRecord {
            entity: "product",
            key: product.upc.clone(),
            source,
        })?;
    }
    Ok(())
}

/// Validates every operator of a catalog payload.
pub fn validate_catalog_operators(operators: &[Operator]) -> Result<(), CoreError> {
    for operator in operators {
        validate_operator(operator).map_err(|source| CoreError::InvalidCatalogRecord {
            entity: "operator",
            key: operator.employee_id.clone(),
            source,
        })?;
    }
    Ok(())
}

// =============================================================================
// Checkout
// =============================================================================

/// Validates a line item.
pub fn validate_line_item(item: &LineItem) -> ValidationResult<()> {
    require("items.upc", &item.upc)?;
    non_negative("items.price_cents", item.price_cents)?;
    if item.quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "items.quantity".to_string(),
        });
    }
    Ok(())
}

/// Validates checkout input before a transaction is created.
///
/// ## Rules
/// - operator PIN and payment method must not be blank
/// - at least one line item, each with a positive quantity
/// - subtotal, tax and total must not be negative
pub fn validate_new_transaction(txn: &NewTransaction) -> ValidationResult<()> {
    require("operator_pin", &txn.operator_pin)?;
    require("payment_method", &txn.payment_method)?;

    if txn.items.is_empty() {
        return Err(ValidationError::Empty {
            field: "items".to_string(),
        });
    }
    for item in &txn.items {
        validate_line_item(item)?;
    }

    non_negative("subtotal_cents", txn.subtotal_cents)?;
    non_negative("tax_cents", txn.tax_cents)?;
    non_negative("total_cents", txn.total_cents)?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
