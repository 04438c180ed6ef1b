//! # Sync Orchestrator
//!
//! Decides when reconciliations run and keeps them from stepping on each
//! other.
//!
//! ## Execution Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  HTTP mutation ──► schedule_customer(7) ──► pending {7}? ──yes──► done  │
//! │                          │ no                                (coalesced)│
//! │                          ▼                                              │
//! │                    tokio::spawn                                         │
//! │                          │                                              │
//! │                          ▼                                              │
//! │                 lock customer 7 ──► worker permit ──► leave pending     │
//! │                          │                                              │
//! │                          ▼                                              │
//! │                 Reconciler::reconcile(7)   errors are logged only       │
//! │                                                                         │
//! │  /statements/sync ──► reconcile_all() ──► for each customer, in order:  │
//! │                          reconcile_customer(id)   (same customer lock)  │
//! │                          first error stops the pass                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Runs for one customer never overlap. Runs for different customers proceed
//! in parallel, at most `max_concurrent_reconciles` of the background ones at
//! a time.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::sync::{watch, OwnedMutexGuard, Semaphore};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::{SyncError, SyncResult};
use crate::reconciler::{ReconcileSummary, Reconciler};
use crate::store::LedgerStore;

/// Std mutexes here only guard short map updates, never an `.await`.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// Per-Customer Locks
// =============================================================================

type LockMap = Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>;

/// Keyed async mutexes, one per customer with a run in progress or waiting.
#[derive(Clone, Default)]
struct CustomerLocks {
    map: Arc<LockMap>,
}

impl CustomerLocks {
    async fn acquire(&self, customer_id: i64) -> CustomerGuard {
        let mutex = lock(&self.map).entry(customer_id).or_default().clone();
        let guard = mutex.lock_owned().await;

        CustomerGuard {
            customer_id,
            map: self.map.clone(),
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        lock(&self.map).len()
    }
}

/// Holds a customer's lock; drops the map entry when nobody else wants it.
struct CustomerGuard {
    customer_id: i64,
    map: Arc<LockMap>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for CustomerGuard {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut map = lock(&self.map);
        // Only the map's own reference left: no holder, no waiter
        if map
            .get(&self.customer_id)
            .is_some_and(|m| Arc::strong_count(m) == 1)
        {
            map.remove(&self.customer_id);
        }
    }
}

// =============================================================================
// Batch Summary
// =============================================================================

/// Outcome of a completed `reconcile_all` pass.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub run_id: Uuid,
    /// Customers reconciled.
    pub customers: usize,
    /// Ledger rows written across all customers.
    pub records: usize,
    pub duration_ms: u64,
}

// =============================================================================
// Sync Orchestrator
// =============================================================================

struct Inner {
    reconciler: Reconciler,
    locks: CustomerLocks,
    workers: Arc<Semaphore>,
    /// Customers with a spawned run that has not started reading yet.
    pending: Mutex<HashSet<i64>>,
    /// Spawned runs not yet finished.
    in_flight: watch::Sender<usize>,
    shutting_down: AtomicBool,
}

/// Entry point for every reconciliation: per mutation, manual and scheduled.
///
/// Cheap to clone; clones share locks, workers and pending state.
#[derive(Clone)]
pub struct SyncOrchestrator {
    inner: Arc<Inner>,
}

impl SyncOrchestrator {
    /// Creates an orchestrator running at most `max_concurrent` background
    /// reconciliations at once.
    pub fn new(store: Arc<dyn LedgerStore>, max_concurrent: usize) -> Self {
        let (in_flight, _) = watch::channel(0);

        SyncOrchestrator {
            inner: Arc::new(Inner {
                reconciler: Reconciler::new(store),
                locks: CustomerLocks::default(),
                workers: Arc::new(Semaphore::new(max_concurrent.max(1))),
                pending: Mutex::new(HashSet::new()),
                in_flight,
                shutting_down: AtomicBool::new(false),
            }),
        }
    }

    /// Reconciles one customer now and returns the outcome.
    ///
    /// Waits for any run already in progress for the same customer.
    pub async fn reconcile_customer(&self, customer_id: i64) -> SyncResult<ReconcileSummary> {
        if self.is_shutting_down() {
            return Err(SyncError::ShuttingDown);
        }

        let _guard = self.inner.locks.acquire(customer_id).await;
        self.inner.reconciler.reconcile(customer_id).await
    }

    /// Queues a background reconciliation and returns immediately.
    ///
    /// A customer that already has a queued run that has not started is not
    /// queued twice; the queued run reads fresh data when it starts. Failures
    /// are logged, never returned.
    pub fn schedule_customer(&self, customer_id: i64) {
        if self.is_shutting_down() {
            warn!(customer_id, "Ignoring reconciliation request during shutdown");
            return;
        }

        if !lock(&self.inner.pending).insert(customer_id) {
            debug!(customer_id, "Reconciliation already queued");
            return;
        }

        self.inner.in_flight.send_modify(|n| *n += 1);
        let inner = self.inner.clone();

        tokio::spawn(async move {
            let _in_flight = InFlight(inner.clone());

            let _guard = inner.locks.acquire(customer_id).await;
            let Ok(_permit) = inner.workers.clone().acquire_owned().await else {
                lock(&inner.pending).remove(&customer_id);
                return;
            };
            lock(&inner.pending).remove(&customer_id);

            if let Err(e) = inner.reconciler.reconcile(customer_id).await {
                error!(customer_id, error = %e, retryable = e.is_retryable(), "Background reconciliation failed");
            }
        });
    }

    /// Schedules several customers, each once.
    pub fn schedule_customers(&self, customer_ids: impl IntoIterator<Item = i64>) {
        let unique: HashSet<i64> = customer_ids.into_iter().collect();
        for customer_id in unique {
            self.schedule_customer(customer_id);
        }
    }

    /// Reconciles every customer in storage order.
    ///
    /// Stops at the first failure and returns it; customers after it are not
    /// touched.
    pub async fn reconcile_all(&self) -> SyncResult<BatchSummary> {
        let run_id = Uuid::new_v4();

        async move {
            let started = Instant::now();
            let customers = self.inner.reconciler.store().list_customers().await?;

            info!(customers = customers.len(), "Reconciling all customers");

            let mut records = 0;
            for customer in &customers {
                match self.reconcile_customer(customer.id).await {
                    Ok(summary) => records += summary.records,
                    Err(e) => {
                        error!(customer_id = customer.id, error = %e, "Reconciliation pass aborted");
                        return Err(e);
                    }
                }
            }

            let summary = BatchSummary {
                run_id,
                customers: customers.len(),
                records,
                duration_ms: started.elapsed().as_millis() as u64,
            };

            info!(
                customers = summary.customers,
                records = summary.records,
                duration_ms = summary.duration_ms,
                "Reconciliation pass complete"
            );

            Ok(summary)
        }
        .instrument(info_span!("reconcile_all", %run_id))
        .await
    }

    /// Resolves once no background run is queued or running.
    pub async fn wait_idle(&self) {
        let mut rx = self.inner.in_flight.subscribe();
        // The sender lives in `inner`, which `self` keeps alive
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    /// Rejects new work, then waits for background runs to drain.
    pub async fn shutdown(&self) {
        info!("Stopping reconciliation orchestrator");
        self.inner.shutting_down.store(true, Ordering::SeqCst);
        self.wait_idle().await;
        info!("Reconciliation orchestrator stopped");
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.shutting_down.load(Ordering::SeqCst)
    }
}

/// Counts a spawned run until it finishes, panics included.
struct InFlight(Arc<Inner>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.in_flight.send_modify(|n| *n = n.saturating_sub(1));
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
