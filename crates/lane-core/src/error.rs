//! # Error Types
//!
//! Domain-specific error types for lane-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  lane-core errors (this file)                                          │
//! │  ├── CoreError        - Domain rule violations                         │
//! │  └── ValidationError  - Field-level validation failures                │
//! │                                                                         │
//! │  lane-db errors                                                        │
//! │  └── DbError          - Local Store failures                           │
//! │                                                                         │
//! │  lane-sync errors                                                      │
//! │  └── SyncError        - Transport / protocol / store failures          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Domain rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A catalog record from the central service is unusable.
    ///
    /// ## When This Occurs
    /// - Product without a UPC or with a negative price
    /// - Operator without a PIN
    #[error("Invalid {entity} '{key}': {source}")]
    InvalidCatalogRecord {
        entity: &'static str,
        key: String,
        #[source]
        source: ValidationError,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative (got {value})")]
    Negative { field: String, value: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// A collection that must have at least one element is empty.
    #[error("{field} must not be empty")]
    Empty { field: String },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    pub fn negative(field: impl Into<String>, value: i64) -> Self {
        ValidationError::Negative {
            field: field.into(),
            value,
        }
    }
}
