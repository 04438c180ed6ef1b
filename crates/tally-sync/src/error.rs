//! # Sync Error Types
//!
//! Error types for reconciliation, scheduling and configuration.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │  Reconciliation │  │     Internal            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  CustomerNot    │  │  Internal               │ │
//! │  │  ConfigLoad/    │  │    Found        │  │  ShuttingDown           │ │
//! │  │    SaveFailed   │  │  Persistence    │  │                         │ │
//! │  │  InvalidSchedule│  │  Ledger         │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tally_core::CoreError;
use tally_db::DbError;
use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors raised while reconciling statements.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    /// A schedule entry is not a valid `HH:MM` time.
    #[error("Invalid schedule time '{0}', expected HH:MM")]
    InvalidSchedule(String),

    // =========================================================================
    // Reconciliation Errors
    // =========================================================================
    /// The customer being reconciled does not exist.
    #[error("Customer not found: {0}")]
    CustomerNotFound(i64),

    /// Reading sources or writing the ledger failed.
    #[error("Persistence error: {0}")]
    Persistence(#[from] DbError),

    /// A source row could not be turned into a ledger line.
    #[error("Ledger error: {0}")]
    Ledger(#[from] CoreError),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// A background task failed unexpectedly.
    #[error("Internal error: {0}")]
    Internal(String),

    /// The orchestrator is shutting down.
    #[error("Reconciliation is shutting down")]
    ShuttingDown,
}

// =============================================================================
// Error Conversions
// =============================================================================

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

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

impl From<tokio::task::JoinError> for SyncError {
    fn from(err: tokio::task::JoinError) -> Self {
        SyncError::Internal(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SyncError {
    /// Returns true if a later attempt could succeed.
    ///
    /// Only connection-level persistence failures qualify. Reconciliation
    /// itself never retries; this is for callers deciding what to report.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Persistence(db) => db.is_transient(),
            _ => false,
        }
    }

    /// Returns true if the customer (or a row it needs) does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SyncError::CustomerNotFound(_) | SyncError::Persistence(DbError::NotFound { .. })
        )
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
                | SyncError::InvalidSchedule(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(SyncError::Persistence(DbError::PoolExhausted).is_retryable());
        assert!(SyncError::Persistence(DbError::ConnectionFailed("gone".into())).is_retryable());

        assert!(!SyncError::CustomerNotFound(7).is_retryable());
        assert!(!SyncError::Persistence(DbError::QueryFailed("syntax".into())).is_retryable());
        assert!(!SyncError::InvalidConfig("bad".into()).is_retryable());
    }

    #[test]
    fn test_not_found() {
        assert!(SyncError::CustomerNotFound(7).is_not_found());
        assert!(SyncError::Persistence(DbError::not_found("Customer", 7)).is_not_found());
        assert!(!SyncError::ShuttingDown.is_not_found());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(SyncError::CustomerNotFound(42).to_string(), "Customer not found: 42");
        assert!(SyncError::InvalidSchedule("25:00".into()).is_config_error());
    }
}
