//! # tally-server: REST API for Tally
//!
//! HTTP surface over the statement ledger and its source tables.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  axum Router (CORS + TraceLayer)                                        │
//! │       │                                                                 │
//! │       ├── /health                     ──► Database::health_check        │
//! │       ├── /api/statements             ──► StatementRepository::list     │
//! │       ├── /api/statements/sync        ──► SyncOrchestrator::reconcile_all
//! │       ├── /api/customers/...          ──► CustomerRepository            │
//! │       ├── /api/sale-orders/...        ──► SaleOrderRepository ─┐        │
//! │       └── /api/payments/...           ──► PaymentRepository ───┤        │
//! │                                                                │        │
//! │                         schedule_customer(s) after commit ◄────┘        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Mutations commit first and schedule reconciliation afterwards, so a failed
//! rebuild never rolls back a stored order or payment.

pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::router;
pub use state::AppState;
