//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Ledger mapping failures                        │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tally-db errors                                                       │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  tally-sync errors                                                     │
//! │  └── SyncError        - Reconciliation / config failures               │
//! │                                                                         │
//! │  tally-server                                                          │
//! │  └── ApiError         - What HTTP clients see (serialized)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Ledger logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A source transaction was handed to the ledger of another customer.
    ///
    /// ## When This Occurs
    /// - A persistence adapter returns rows outside the requested customer
    /// - A sale order or payment was moved between customers mid-read
    #[error("{source_type} {source_id} belongs to customer {found}, not {expected}")]
    CustomerMismatch {
        source_type: String,
        source_id: i64,
        expected: i64,
        found: i64,
    },

    /// The running balance left the `i64` cents range at this line.
    #[error("Balance of customer {customer_id} overflows at {source_type} {source_id}")]
    BalanceOverflow {
        customer_id: i64,
        source_type: String,
        source_id: i64,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised by the API layer before anything reaches the database.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g. a date that does not parse).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A range whose start lies after its end.
    #[error("{start_field} must not be after {end_field}")]
    InvertedRange {
        start_field: String,
        end_field: String,
    },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::CustomerMismatch {
            source_type: "sale_order".to_string(),
            source_id: 12,
            expected: 1,
            found: 2,
        };
        assert_eq!(
            err.to_string(),
            "sale_order 12 belongs to customer 2, not 1"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "code".to_string(),
        };
        assert_eq!(err.to_string(), "code is required");

        let err = ValidationError::InvertedRange {
            start_field: "startTime".to_string(),
            end_field: "endTime".to_string(),
        };
        assert_eq!(err.to_string(), "startTime must not be after endTime");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustNotBeNegative {
            field: "amount".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
