//! # Domain Types
//!
//! Catalog and transaction types used throughout Lane POS.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  CATALOG (replace-all from central)     SALES (created on terminal)    │
//! │  ──────────────────────────────────     ────────────────────────────   │
//! │  ┌─────────────────┐ ┌──────────────┐   ┌─────────────────────────┐    │
//! │  │    Product      │ │   Operator   │   │      Transaction        │    │
//! │  │  upc (key)      │ │  pin (key)   │   │  id (UUID v4)           │    │
//! │  │  sku, name      │ │  name        │   │  operator_pin           │    │
//! │  │  price_cents    │ │  employee_id │   │  items: [LineItem]      │    │
//! │  │  department     │ │  is_manager  │   │  subtotal/tax/total     │    │
//! │  │  tax_rate       │ └──────────────┘   │  status: pending|synced │    │
//! │  └─────────────────┘                    └─────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The serde representation of each type is the JSON exchanged with the
//! central service. Field names are used as-is (snake_case).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate as an integer fixed-point value.
///
/// ## Representation
/// The percentage multiplied by [`TaxRate::SCALE`]:
/// `82500` = 8.25%, `100000` = 10%, `0` = tax exempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(i64);

impl TaxRate {
    /// Fixed-point scale applied to a percentage.
    pub const SCALE: i64 = 10_000;

    /// Creates a tax rate from its scaled representation.
    #[inline]
    pub const fn from_scaled(scaled: i64) -> Self {
        TaxRate(scaled)
    }

    /// Returns the scaled representation.
    #[inline]
    pub const fn scaled(&self) -> i64 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product in the terminal's catalog.
///
/// Products are only ever written by a catalog replace-all. The UPC is the
/// identity of a product and never changes once assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Universal product code (unique key).
    pub upc: String,

    /// Stock-keeping code.
    #[serde(default)]
    pub sku: String,

    /// Display name shown to the cashier and on receipts.
    pub name: String,

    /// Price in cents.
    pub price_cents: i64,

    /// Department label.
    #[serde(default)]
    pub department: String,

    /// Tax rate, scaled by [`TaxRate::SCALE`].
    #[serde(default)]
    pub tax_rate: i64,
}

impl Product {
    /// Returns the tax rate.
    #[inline]
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_scaled(self.tax_rate)
    }
}

// =============================================================================
// Operator
// =============================================================================

/// A person allowed to sign in on the terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Operator {
    /// Terminal-local credential (unique key).
    pub pin: String,

    pub name: String,

    #[serde(default)]
    pub employee_id: String,

    #[serde(default)]
    pub is_manager: bool,
}

// =============================================================================
// Line Item
// =============================================================================

/// One line of a completed sale.
///
/// Name and price are snapshots taken at checkout; later catalog changes do
/// not affect them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItem {
    pub upc: String,

    /// Product name at time of sale (frozen).
    pub name: String,

    /// Unit price in cents at time of sale (frozen).
    pub price_cents: i64,

    pub quantity: i64,

    /// Keyed in by hand rather than scanned.
    #[serde(default)]
    pub is_manual: bool,
}

impl LineItem {
    /// Unit price × quantity, in cents.
    #[inline]
    pub fn line_total_cents(&self) -> i64 {
        self.price_cents * self.quantity
    }
}

// =============================================================================
// Transaction Status
// =============================================================================

/// Delivery state of a transaction.
///
/// ```text
///   create ──► Pending ──(central accepted)──► Synced
///                 ▲                              │
///                 └────────── never ─────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Stored locally, not yet accepted by the central service.
    Pending,
    /// Accepted by the central service.
    Synced,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Synced => "synced",
        }
    }

    /// Whether a transaction may move from `self` to `next`.
    ///
    /// Only `Pending → Synced` is allowed; `Synced` is final.
    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        matches!(
            (self, next),
            (TransactionStatus::Pending, TransactionStatus::Synced)
        )
    }
}

impl Default for TransactionStatus {
    fn default() -> Self {
        TransactionStatus::Pending
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// A completed sale, as stored locally and as uploaded to the central
/// service.
///
/// Transactions are append-only. Apart from `status` (pending → synced) and
/// `synced_at`, nothing changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Transaction {
    /// Generated on the terminal (UUID v4). The central service deduplicates
    /// on this value.
    pub id: String,

    /// PIN of the operator who rang the sale. Not enforced as a reference.
    pub operator_pin: String,

    /// Line items in scan order.
    pub items: Vec<LineItem>,

    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,

    pub payment_method: String,
    #[serde(default)]
    pub payment_ref: String,

    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,

    pub status: TransactionStatus,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "Option<String>")]
    pub synced_at: Option<DateTime<Utc>>,
}

impl Transaction {
    #[inline]
    pub fn is_pending(&self) -> bool {
        self.status == TransactionStatus::Pending
    }
}

// =============================================================================
// New Transaction
// =============================================================================

/// Checkout input used to create a [`Transaction`].
///
/// Totals are computed by the caller (cart/pricing logic); the store records
/// them verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewTransaction {
    pub operator_pin: String,
    pub items: Vec<LineItem>,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub payment_method: String,
    #[serde(default)]
    pub payment_ref: String,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_scale() {
        let rate = TaxRate::from_scaled(82500);
        assert_eq!(rate.scaled(), 82500);
        assert!((rate.percentage() - 8.25).abs() < 1e-9);
        assert!(TaxRate::default().is_zero());
    }

    #[test]
    fn test_line_total() {
        let item = LineItem {
            upc: "012345678905".into(),
            name: "Cola 330ml".into(),
            price_cents: 199,
            quantity: 3,
            is_manual: false,
        };
        assert_eq!(item.line_total_cents(), 597);
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&TransactionStatus::Pending).unwrap();
        assert_eq!(json, "\"pending\"");
        let parsed: TransactionStatus = serde_json::from_str("\"synced\"").unwrap();
        assert_eq!(parsed, TransactionStatus::Synced);
    }

    #[test]
    fn test_status_only_moves_forward() {
        use TransactionStatus::*;
        assert!(Pending.can_transition_to(Synced));
        assert!(!Synced.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Pending));
        assert!(!Synced.can_transition_to(Synced));
    }

    #[test]
    fn test_product_defaults_optional_fields() {
        let product: Product =
            serde_json::from_str(r#"{"upc":"1","name":"Gum","price_cents":99}"#).unwrap();
        assert_eq!(product.sku, "");
        assert_eq!(product.department, "");
        assert!(product.tax_rate().is_zero());
    }

    #[test]
    fn test_operator_decodes_manager_flag() {
        let op: Operator = serde_json::from_str(
            r#"{"pin":"1234","name":"Ada","employee_id":"E1","is_manager":true}"#,
        )
        .unwrap();
        assert!(op.is_manager);
    }
}
