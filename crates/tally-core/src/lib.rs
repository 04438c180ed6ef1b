//! # tally-core: Pure Business Logic for Tally
//!
//! This crate holds the statement logic of Tally as pure functions with zero
//! I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Tally Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    apps/server (axum)                           │   │
//! │  │   /api/sale-orders  /api/payments  /api/statements  /health     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ schedule_customer / reconcile_all      │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            tally-sync (Reconciler, Orchestrator)                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │ statement │  │ validation│  │   │
//! │  │   │ Customer  │  │   Money   │  │  records  │  │   rules   │  │   │
//! │  │   │ SaleOrder │  │  (cents)  │  │  balances │  │  + codes  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-db (Database Layer)                    │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Customer, SaleOrder, Payment, StatementRecord)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`statement`] - Ledger record mapping and the running balance calculator
//! - [`codes`] - Sale order and payment code sequencing
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation for the API layer
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::NaiveDate;
//! use tally_core::{compute_balances, Money, SourceType, StatementRecord};
//!
//! let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
//! let records = vec![
//!     StatementRecord::new(1, SourceType::Payment, 7, day(15), Money::zero(), Money::from_cents(40_000)),
//!     StatementRecord::new(1, SourceType::SaleOrder, 3, day(10), Money::from_cents(100_000), Money::zero()),
//! ];
//!
//! let ledger = compute_balances(records).unwrap();
//! assert_eq!(ledger[0].balance, Money::from_cents(60_000));
//! assert_eq!(ledger[1].balance, Money::from_cents(100_000));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod codes;
pub mod error;
pub mod money;
pub mod statement;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use statement::compute_balances;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default page size for the statement listing.
///
/// Matches what the statement screen requests when it omits `pageSize`.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Largest page the statement listing will return in one request.
pub const MAX_PAGE_SIZE: u32 = 1000;
