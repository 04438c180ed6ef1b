//! # Validation Module
//!
//! Input validation for the API layer.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP extraction (axum)                                       │
//! │  └── Type validation (deserialization)                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Required fields, lengths                                          │
//! │  ├── Amounts within 0 ..= MAX_AMOUNT                                   │
//! │  └── Statement query bounds (page, page size, date range)              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  ├── UNIQUE (source_type, source_id)                                   │
//! │  └── Foreign keys to customers                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The reconciler never validates: by the time a row is stored it has been
//! through this module and the schema.

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{CustomerInput, PaymentInput, SaleOrderInput, StatementQuery};
use crate::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted code (customer, sale order or payment).
pub const MAX_CODE_LEN: usize = 50;

/// Longest accepted name.
pub const MAX_NAME_LEN: usize = 200;

/// Longest accepted remark.
pub const MAX_REMARK_LEN: usize = 500;

/// Largest accepted amount: 10^15 cents.
///
/// Keeps any realistic customer history far from `i64` overflow when the
/// running balance is summed.
pub const MAX_AMOUNT: Money = Money::from_cents(1_000_000_000_000_000);

// =============================================================================
// Field Validators
// =============================================================================

/// Validates a required, bounded text field.
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_required;
///
/// assert!(validate_required("code", "C001", 50).is_ok());
/// assert!(validate_required("code", "   ", 50).is_err());
/// ```
pub fn validate_required(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    validate_max_len(field, value, max)
}

fn validate_max_len(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

fn validate_optional(field: &str, value: Option<&str>, max: usize) -> ValidationResult<()> {
    match value {
        Some(v) => validate_max_len(field, v, max),
        None => Ok(()),
    }
}

/// Validates a ledger amount.
///
/// ## Rules
/// - Must be non-negative; zero is allowed
/// - Must not exceed [`MAX_AMOUNT`]
///
/// Refunds are not modeled as negative sales, so a negative amount is always
/// an input error.
pub fn validate_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    if amount > MAX_AMOUNT {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT.cents(),
        });
    }
    Ok(())
}

/// Validates an entity id supplied by a client.
pub fn validate_id(field: &str, id: i64) -> ValidationResult<()> {
    if id <= 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Parses a `YYYY-MM-DD` query parameter.
///
/// ## Example
/// ```rust
/// use tally_core::validation::parse_date;
///
/// assert!(parse_date("startTime", "2024-01-10").is_ok());
/// assert!(parse_date("startTime", "10/01/2024").is_err());
/// ```
pub fn parse_date(field: &str, value: &str) -> ValidationResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|e| {
        ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: format!("expected YYYY-MM-DD ({})", e),
        }
    })
}

// =============================================================================
// Entity Validators
// =============================================================================

/// Validates a customer create/update body.
pub fn validate_customer(input: &CustomerInput) -> ValidationResult<()> {
    validate_required("code", &input.code, MAX_CODE_LEN)?;
    validate_required("name", &input.name, MAX_NAME_LEN)?;
    validate_optional("remark", input.remark.as_deref(), MAX_REMARK_LEN)?;
    Ok(())
}

/// Validates a sale order create/update body.
pub fn validate_sale_order(input: &SaleOrderInput) -> ValidationResult<()> {
    if let Some(code) = input.code.as_deref() {
        validate_required("code", code, MAX_CODE_LEN)?;
    }
    validate_id("customerId", input.customer_id)?;
    validate_amount("orderAmount", input.order_amount)?;
    validate_optional("remark", input.remark.as_deref(), MAX_REMARK_LEN)?;
    Ok(())
}

/// Validates a payment create/update body.
pub fn validate_payment(input: &PaymentInput) -> ValidationResult<()> {
    if let Some(code) = input.code.as_deref() {
        validate_required("code", code, MAX_CODE_LEN)?;
    }
    validate_id("customerId", input.customer_id)?;
    validate_amount("amount", input.amount)?;
    validate_optional("remark", input.remark.as_deref(), MAX_REMARK_LEN)?;
    Ok(())
}

// =============================================================================
// Statement Query
// =============================================================================

/// Builds a [`StatementQuery`] from raw listing parameters.
///
/// ## Rules
/// - A `customer_id` of zero or below means every customer
/// - `page` defaults to 1 and must be at least 1
/// - `page_size` defaults to 100 and must be within 1..=1000
/// - Dates are `YYYY-MM-DD`; when both are present start must not follow end
///
/// ## Example
/// ```rust
/// use tally_core::validation::statement_query;
///
/// let q = statement_query(Some(3), Some("2024-01-01"), None, None, None).unwrap();
/// assert_eq!(q.page, 1);
/// assert_eq!(q.page_size, 100);
///
/// assert!(statement_query(None, Some("2024-02-01"), Some("2024-01-01"), None, None).is_err());
/// ```
pub fn statement_query(
    customer_id: Option<i64>,
    start: Option<&str>,
    end: Option<&str>,
    page: Option<u32>,
    page_size: Option<u32>,
) -> ValidationResult<StatementQuery> {
    let customer_id = customer_id.filter(|id| *id > 0);

    let start_date = non_blank(start).map(|s| parse_date("startTime", s)).transpose()?;
    let end_date = non_blank(end).map(|s| parse_date("endTime", s)).transpose()?;

    if let (Some(start), Some(end)) = (start_date, end_date) {
        if start > end {
            return Err(ValidationError::InvertedRange {
                start_field: "startTime".to_string(),
                end_field: "endTime".to_string(),
            });
        }
    }

    let page = page.unwrap_or(1);
    if page == 0 {
        return Err(ValidationError::OutOfRange {
            field: "page".to_string(),
            min: 1,
            max: i64::from(u32::MAX),
        });
    }

    let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        return Err(ValidationError::OutOfRange {
            field: "pageSize".to_string(),
            min: 1,
            max: i64::from(MAX_PAGE_SIZE),
        });
    }

    Ok(StatementQuery {
        customer_id,
        start_date,
        end_date,
        page,
        page_size,
    })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

// =============================================================================
// Unit Tests
// =============================================================================
