//! # tally-sync: Statement Reconciliation for Tally
//!
//! Rebuilds each customer's derived statement ledger from its sale orders
//! and payments, on demand, after every mutation and on a daily schedule.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Reconciliation Architecture                         │
//! │                                                                         │
//! │  HTTP mutation      GET /statements/sync       Scheduler (05:00/17:00)  │
//! │       │                    │                          │                 │
//! │       │ schedule_customer  │ reconcile_all            │ reconcile_all   │
//! │       ▼                    ▼                          ▼                 │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                      SyncOrchestrator                            │  │
//! │  │  per-customer locks • worker semaphore • coalescing • wait_idle │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               ▼                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                         Reconciler                               │  │
//! │  │  fetch customer + history → build_statement → replace ledger     │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               ▼                                         │
//! │                  Arc<dyn LedgerStore>  (tally_db::Database)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`config`] - `TallyConfig` (TOML file + environment)
//! - [`error`] - Sync error types
//! - [`orchestrator`] - Scheduling, locking and batch passes
//! - [`reconciler`] - One customer's rebuild
//! - [`scheduler`] - Daily fixed-time runner
//! - [`store`] - The persistence port
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tally_sync::{Scheduler, SyncOrchestrator, TallyConfig};
//!
//! let config = TallyConfig::load_or_default(None);
//! let orchestrator = SyncOrchestrator::new(Arc::new(db), config.sync.max_concurrent_reconciles);
//!
//! // After creating a sale order for customer 42
//! orchestrator.schedule_customer(42);
//!
//! let (scheduler, handle) = Scheduler::new(orchestrator.clone(), config.sync.schedule_times()?);
//! tokio::spawn(scheduler.run());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod reconciler;
pub mod scheduler;
pub mod store;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{DatabaseSettings, ServerSettings, SyncSettings, TallyConfig};
pub use error::{SyncError, SyncResult};
pub use orchestrator::{BatchSummary, SyncOrchestrator};
pub use reconciler::{ReconcileSummary, Reconciler};
pub use scheduler::{next_fire_after, Scheduler, SchedulerHandle};
pub use store::LedgerStore;
