//! # Per-Customer Reconciler
//!
//! Rebuilds one customer's statement from its full source history.
//!
//! ## Reconciliation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  reconcile(customer_id)                                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  get_customer ──── None ──► CustomerNotFound (nothing written)         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  list_sale_orders + list_payments   (full history, no paging)          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  build_statement   one line per order / payment                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  compute_balances  running balance, newest first                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  replace_statement_records   delete + insert in one transaction        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Any error aborts before or inside the replace transaction, so the prior
//! ledger survives.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use tally_core::statement::build_statement;
use tally_core::Money;

use crate::error::{SyncError, SyncResult};
use crate::store::LedgerStore;

/// Outcome of one successful reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileSummary {
    pub customer_id: i64,
    pub sale_orders: usize,
    pub payments: usize,
    /// Ledger rows written; always `sale_orders + payments`.
    pub records: usize,
    /// Balance after the newest line; zero for an empty ledger.
    pub closing_balance: Money,
}

/// Rebuilds statements through a [`LedgerStore`].
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn LedgerStore>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Reconciler { store }
    }

    /// The store this reconciler reads and writes.
    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    /// Rebuilds and persists one customer's statement.
    pub async fn reconcile(&self, customer_id: i64) -> SyncResult<ReconcileSummary> {
        let customer = self
            .store
            .get_customer(customer_id)
            .await?
            .ok_or(SyncError::CustomerNotFound(customer_id))?;

        let orders = self.store.list_sale_orders(customer_id).await?;
        let payments = self.store.list_payments(customer_id).await?;

        debug!(
            customer_id,
            sale_orders = orders.len(),
            payments = payments.len(),
            "Fetched statement sources"
        );

        // Lines come back balanced and newest first
        let records = build_statement(&customer, &orders, &payments)?;
        let closing_balance = records.first().map_or(Money::zero(), |r| r.balance);

        self.store
            .replace_statement_records(customer_id, &records)
            .await?;

        let summary = ReconcileSummary {
            customer_id,
            sale_orders: orders.len(),
            payments: payments.len(),
            records: records.len(),
            closing_balance,
        };

        info!(
            customer_id,
            records = summary.records,
            closing_balance = %summary.closing_balance,
            "Statement reconciled"
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;
    use tally_core::SourceType;

    #[tokio::test]
    async fn test_missing_customer_writes_nothing() {
        let store = Arc::new(MemoryStore::default());
        let reconciler = Reconciler::new(store.clone());

        let err = reconciler.reconcile(99).await.unwrap_err();

        assert!(matches!(err, SyncError::CustomerNotFound(99)));
        assert_eq!(store.replace_calls(), 0);
    }

    #[tokio::test]
    async fn test_sale_then_payment() {
        let store = Arc::new(MemoryStore::default());
        let c = store.add_customer("C001", "Acme");
        store.add_order(c, 1, (2024, 1, 10), 100_000);
        store.add_payment(c, 1, (2024, 1, 15), 40_000);

        let summary = Reconciler::new(store.clone()).reconcile(c).await.unwrap();

        assert_eq!(summary.records, 2);
        assert_eq!(summary.closing_balance, Money::from_cents(60_000));

        let ledger = store.ledger(c);
        assert_eq!(ledger[0].source_type, SourceType::Payment);
        assert_eq!(ledger[0].balance, Money::from_cents(60_000));
        assert_eq!(ledger[1].balance, Money::from_cents(100_000));
        assert_eq!(ledger[1].customer_name, "Acme");
    }

    #[tokio::test]
    async fn test_empty_history_clears_ledger() {
        let store = Arc::new(MemoryStore::default());
        let c = store.add_customer("C001", "Acme");
        store.add_order(c, 1, (2024, 1, 10), 500);
        let reconciler = Reconciler::new(store.clone());
        reconciler.reconcile(c).await.unwrap();

        store.remove_order(1);
        let summary = reconciler.reconcile(c).await.unwrap();

        assert_eq!(summary.records, 0);
        assert_eq!(summary.closing_balance, Money::zero());
        assert!(store.ledger(c).is_empty());
        assert_eq!(store.replace_calls(), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_prior_ledger() {
        let store = Arc::new(MemoryStore::default());
        let c = store.add_customer("C001", "Acme");
        store.add_order(c, 1, (2024, 1, 10), 500);
        let reconciler = Reconciler::new(store.clone());
        reconciler.reconcile(c).await.unwrap();

        store.add_order(c, 2, (2024, 1, 11), 700);
        store.fail_for(c);

        assert!(reconciler.reconcile(c).await.is_err());
        assert_eq!(store.ledger(c).len(), 1);
    }

    #[tokio::test]
    async fn test_overflowing_balance_writes_nothing() {
        let store = Arc::new(MemoryStore::default());
        let c = store.add_customer("C001", "Acme");
        store.add_order(c, 1, (2024, 1, 10), i64::MAX / 2 + 1);
        store.add_order(c, 2, (2024, 1, 11), i64::MAX / 2 + 1);

        let err = Reconciler::new(store.clone()).reconcile(c).await.unwrap_err();

        assert!(matches!(
            err,
            SyncError::Ledger(tally_core::CoreError::BalanceOverflow { source_id: 2, .. })
        ));
        assert_eq!(store.replace_calls(), 0);
        assert!(store.ledger(c).is_empty());
    }
}
