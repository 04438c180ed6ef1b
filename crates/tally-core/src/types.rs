//! # Domain Types
//!
//! Core domain types used throughout Tally.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Customer     │   │   SaleOrder     │   │    Payment      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │◄──│  customer_id    │   │  customer_id ──►│       │
//! │  │  code           │   │  create_time    │   │  payment_date   │       │
//! │  │  name           │   │  order_amount   │   │  amount         │       │
//! │  └────────┬────────┘   └────────┬────────┘   └────────┬────────┘       │
//! │           │ snapshot            │ sale_amount         │ payment_amount │
//! │           ▼                     ▼                     ▼                │
//! │  ┌──────────────────────────────────────────────────────────────────┐ │
//! │  │                       StatementRecord                            │ │
//! │  │  customer_code/name • date • amounts • balance • source_type/id  │ │
//! │  └──────────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Every entity has an integer `id` assigned by storage plus a human-readable
//! `code` (customer code, `S2401100001`, `D000042`, ...).
//!
//! All API-facing types serialize with camelCase field names.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Customer
// =============================================================================

/// A customer; the ledger is keyed by customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Customer {
    pub id: i64,

    /// Business identifier, copied into every ledger row.
    pub code: String,

    /// Display name, copied into every ledger row.
    pub name: String,

    pub phone: Option<String>,
    pub province: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub address: Option<String>,
    pub company: Option<String>,

    /// Inactive customers are kept for history and still reconciled.
    pub is_active: bool,

    pub remark: Option<String>,
}

/// Fields accepted when creating or updating a customer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CustomerInput {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub remark: Option<String>,
}

fn default_true() -> bool {
    true
}

// =============================================================================
// Sale Order
// =============================================================================

/// A sale order; contributes a debit line to its customer's ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleOrder {
    pub id: i64,

    /// `S` + YYMMDD + 4-digit daily sequence unless supplied.
    pub code: String,

    pub customer_id: i64,

    /// When the order was placed; the ledger uses its calendar day.
    #[ts(as = "String")]
    pub create_time: NaiveDateTime,

    /// Order total in cents.
    pub order_amount: Money,

    pub remark: Option<String>,
}

/// Fields accepted when creating or updating a sale order.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleOrderInput {
    /// Generated when absent.
    #[serde(default)]
    pub code: Option<String>,

    pub customer_id: i64,

    /// Defaults to the current time when absent.
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub create_time: Option<NaiveDateTime>,

    pub order_amount: Money,

    #[serde(default)]
    pub remark: Option<String>,
}

// =============================================================================
// Payment
// =============================================================================

/// A payment received from a customer; contributes a credit line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Payment {
    pub id: i64,

    /// `D` + 6-digit sequence unless supplied.
    pub code: String,

    #[ts(as = "String")]
    pub payment_date: NaiveDate,

    pub customer_id: i64,

    /// Amount received in cents.
    pub amount: Money,

    pub payment_method: Option<String>,
    pub account: Option<String>,
    pub payer_company: Option<String>,

    /// Sale orders this payment settles. Informational only; the ledger
    /// credits the full amount on the payment date.
    pub sale_order_ids: Vec<i64>,

    pub remark: Option<String>,
}

/// Fields accepted when creating or updating a payment.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PaymentInput {
    /// Generated when absent.
    #[serde(default)]
    pub code: Option<String>,

    #[ts(as = "String")]
    pub payment_date: NaiveDate,

    pub customer_id: i64,

    pub amount: Money,

    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub payer_company: Option<String>,
    #[serde(default)]
    pub sale_order_ids: Vec<i64>,
    #[serde(default)]
    pub remark: Option<String>,
}

/// Decodes the stored `sale_order_ids` JSON column.
///
/// Rows written by older clients hold `NULL`, an empty string or the literal
/// `null`; all of those, and anything that fails to parse, mean "no linked
/// orders".
///
/// ## Example
/// ```rust
/// use tally_core::types::parse_sale_order_ids;
///
/// assert_eq!(parse_sale_order_ids(Some("[3, 5]")), vec![3, 5]);
/// assert!(parse_sale_order_ids(Some("null")).is_empty());
/// assert!(parse_sale_order_ids(None).is_empty());
/// ```
pub fn parse_sale_order_ids(raw: Option<&str>) -> Vec<i64> {
    match raw.map(str::trim) {
        None | Some("") | Some("null") => Vec::new(),
        Some(json) => serde_json::from_str::<Vec<i64>>(json).unwrap_or_default(),
    }
}

// =============================================================================
// Source Type
// =============================================================================

/// Which stream a ledger line came from.
///
/// Variant order is the same-day tie-break: sale orders sort before payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum SourceType {
    SaleOrder,
    Payment,
}

impl SourceType {
    /// Storage and wire spelling.
    pub const fn as_str(&self) -> &'static str {
        match self {
            SourceType::SaleOrder => "sale_order",
            SourceType::Payment => "payment",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Statement Record
// =============================================================================

/// One line of a customer's statement ledger.
///
/// Records are produced only by reconciliation and replaced as a whole set
/// per customer; nothing edits a single row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StatementRecord {
    /// Storage identity; 0 until the row is persisted.
    pub id: i64,

    pub customer_id: i64,

    /// Customer code at reconciliation time.
    pub customer_code: String,

    /// Customer name at reconciliation time.
    pub customer_name: String,

    #[ts(as = "String")]
    pub date: NaiveDate,

    /// Non-zero only for sale order lines.
    pub sale_amount: Money,

    /// Non-zero only for payment lines.
    pub payment_amount: Money,

    /// Running balance after this line, oldest first.
    pub balance: Money,

    pub source_type: SourceType,

    pub source_id: i64,

    pub remark: Option<String>,
}

impl StatementRecord {
    /// Creates an unpersisted line with a zero balance and no customer snapshot.
    pub fn new(
        customer_id: i64,
        source_type: SourceType,
        source_id: i64,
        date: NaiveDate,
        sale_amount: Money,
        payment_amount: Money,
    ) -> Self {
        StatementRecord {
            id: 0,
            customer_id,
            customer_code: String::new(),
            customer_name: String::new(),
            date,
            sale_amount,
            payment_amount,
            balance: Money::zero(),
            source_type,
            source_id,
            remark: None,
        }
    }

    /// What this line adds to the balance: sale minus payment.
    #[inline]
    pub fn delta(&self) -> Money {
        self.sale_amount - self.payment_amount
    }
}

// =============================================================================
// Statement Query
// =============================================================================

/// Filters and paging for the statement listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementQuery {
    pub customer_id: Option<i64>,

    /// Inclusive lower bound on `date`.
    pub start_date: Option<NaiveDate>,

    /// Inclusive upper bound on `date`.
    pub end_date: Option<NaiveDate>,

    /// 1-based page number.
    pub page: u32,

    pub page_size: u32,
}

impl Default for StatementQuery {
    fn default() -> Self {
        StatementQuery {
            customer_id: None,
            start_date: None,
            end_date: None,
            page: 1,
            page_size: crate::DEFAULT_PAGE_SIZE,
        }
    }
}

impl StatementQuery {
    /// Query for one customer's full first page.
    pub fn for_customer(customer_id: i64) -> Self {
        StatementQuery {
            customer_id: Some(customer_id),
            ..Self::default()
        }
    }

    /// Rows to skip for the requested page.
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.page_size)
    }
}

/// One page of statement rows plus the unpaged match count.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StatementPage {
    pub total: i64,
    pub records: Vec<StatementRecord>,
}

// =============================================================================
// Unit Tests
// =============================================================================
