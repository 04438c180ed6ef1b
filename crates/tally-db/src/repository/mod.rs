//! # Repository Module
//!
//! Database repository implementations for Tally.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Source Tables vs Derived Ledger                      │
//! │                                                                         │
//! │  HTTP handlers                          Reconciler                      │
//! │       │                                     │                           │
//! │       │ db.sale_orders().insert(..)         │ db.statements()           │
//! │       ▼                                     ▼   .replace_for_customer() │
//! │  CustomerRepository                    StatementRepository              │
//! │  SaleOrderRepository                   ├── replace_for_customer         │
//! │  PaymentRepository                     ├── list (filters + paging)      │
//! │  ├── list / get_by_id                  └── count_for_customer           │
//! │  ├── insert (code generated in tx)                                      │
//! │  ├── update                                                             │
//! │  └── delete                                                             │
//! │       │                                     │                           │
//! │       ▼                                     ▼                           │
//! │  customers, sale_orders, payments      statement_records                │
//! │                                                                         │
//! │  Only the reconciler writes statement_records.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CustomerRepository`](customer::CustomerRepository) - Customer master data
//! - [`SaleOrderRepository`](sale_order::SaleOrderRepository) - Sale orders
//! - [`PaymentRepository`](payment::PaymentRepository) - Payments received
//! - [`StatementRepository`](statement::StatementRepository) - Derived ledger

pub mod customer;
pub mod payment;
pub mod sale_order;
pub mod statement;

use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::error::{DbError, DbResult};

/// Opens a transaction holding SQLite's write lock from `BEGIN`.
///
/// A deferred transaction that reads first cannot upgrade to a writer under
/// WAL; it fails with `SQLITE_BUSY` instead of waiting on the busy timeout.
pub(crate) async fn begin_write(pool: &SqlitePool) -> DbResult<Transaction<'static, Sqlite>> {
    pool.begin_with("BEGIN IMMEDIATE")
        .await
        .map_err(DbError::transaction)
}

/// Result of an update that may have moved a row to another customer.
///
/// Both the previous and the current owner need their ledger rebuilt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Updated<T> {
    pub previous_customer_id: i64,
    pub current: T,
}
