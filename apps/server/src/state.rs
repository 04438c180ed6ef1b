//! Shared handler state.

use std::sync::Arc;

use tally_db::Database;
use tally_sync::SyncOrchestrator;

/// Handles every request needs: the database and the reconciliation engine.
///
/// Both fields are cheap to clone, so axum clones the state per request.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub orchestrator: SyncOrchestrator,
}

impl AppState {
    /// Builds the state with an orchestrator reading from `db`.
    pub fn new(db: Database, max_concurrent_reconciles: usize) -> Self {
        let orchestrator = SyncOrchestrator::new(Arc::new(db.clone()), max_concurrent_reconciles);
        AppState { db, orchestrator }
    }
}
