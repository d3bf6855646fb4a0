//! # Sync Error Types
//!
//! Error types for sync operations.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     Protocol            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Connection     │  │  UnexpectedStatus       │ │
//! │  │  InvalidUrl     │  │  Timeout        │  │  DeserializationFailed  │ │
//! │  │  ConfigLoad     │  │                 │  │  InvalidPayload         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐                              │
//! │  │  Local Store    │  │    Internal     │                              │
//! │  │                 │  │                 │                              │
//! │  │  Database       │  │  AlreadyStarted │                              │
//! │  └─────────────────┘  └─────────────────┘                              │
//! │                                                                         │
//! │  Transport and Protocol failures are never fatal: the step is logged   │
//! │  and the next scheduled tick starts over.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering all possible sync failures.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid sync configuration.
    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),

    /// Invalid central service URL.
    #[error("Invalid central URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// Could not reach the central service.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Request exceeded its deadline.
    #[error("Request timed out: {0}")]
    Timeout(String),

    // =========================================================================
    // Protocol Errors
    // =========================================================================
    /// Central service answered with a status we do not accept.
    #[error("Unexpected status {status} from {path}")]
    UnexpectedStatus { path: String, status: u16 },

    /// Response body could not be decoded.
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    /// Payload decoded but contains unusable records.
    #[error("Invalid payload: {0}")]
    InvalidPayload(#[from] lane_core::CoreError),

    // =========================================================================
    // Local Store Errors
    // =========================================================================
    /// Local Store operation failed.
    #[error("Database error: {0}")]
    Database(#[from] lane_db::DbError),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// `start()` called on a running orchestrator.
    #[error("Sync orchestrator already started")]
    AlreadyStarted,

    /// Internal sync error.
    #[error("Internal error: {0}")]
    Internal(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SyncError::Timeout(err.to_string())
        } else if err.is_decode() {
            SyncError::DeserializationFailed(err.to_string())
        } else if err.is_builder() {
            SyncError::InvalidConfig(err.to_string())
        } else {
            SyncError::ConnectionFailed(err.to_string())
        }
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SyncError {
    /// Returns true if the central service could not be reached in time.
    pub fn is_transport_error(&self) -> bool {
        matches!(self, SyncError::ConnectionFailed(_) | SyncError::Timeout(_))
    }

    /// Returns true if the central service answered but the answer was
    /// unusable.
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            SyncError::UnexpectedStatus { .. }
                | SyncError::DeserializationFailed(_)
                | SyncError::InvalidPayload(_)
        )
    }

    /// Returns true if a later attempt may succeed.
    ///
    /// Transport and protocol failures are retried by the next scheduled
    /// tick; everything else needs intervention.
    pub fn is_retryable(&self) -> bool {
        self.is_transport_error() || self.is_protocol_error()
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_) | SyncError::InvalidUrl(_) | SyncError::ConfigLoadFailed(_)
        )
    }

    /// Returns true if the Local Store rejected the operation.
    pub fn is_store_error(&self) -> bool {
        matches!(self, SyncError::Database(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert!(SyncError::ConnectionFailed("refused".into()).is_transport_error());
        assert!(SyncError::Timeout("GET /health".into()).is_retryable());

        let status = SyncError::UnexpectedStatus {
            path: "/api/products".into(),
            status: 500,
        };
        assert!(status.is_protocol_error());
        assert!(status.is_retryable());
        assert!(!status.is_transport_error());

        assert!(SyncError::InvalidUrl("ftp://x".into()).is_config_error());
        assert!(!SyncError::InvalidConfig("zero interval".into()).is_retryable());

        let store = SyncError::from(lane_db::DbError::PoolExhausted);
        assert!(store.is_store_error());
        assert!(!store.is_retryable());
    }

    #[test]
    fn test_status_error_display() {
        let err = SyncError::UnexpectedStatus {
            path: "/api/operators".into(),
            status: 503,
        };
        let msg = err.to_string();
        assert!(msg.contains("503"));
        assert!(msg.contains("/api/operators"));
    }
}
