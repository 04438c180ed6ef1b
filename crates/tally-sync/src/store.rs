//! # Ledger Store
//!
//! The persistence port the reconciler reads sources from and writes the
//! ledger through.
//!
//! ```text
//! ┌──────────────────┐        ┌──────────────────────┐
//! │   Reconciler     │───────►│ Arc<dyn LedgerStore> │
//! │   Orchestrator   │        └──────────┬───────────┘
//! └──────────────────┘                   │
//!                            ┌───────────┴────────────┐
//!                            ▼                        ▼
//!                   tally_db::Database        in-memory fakes (tests)
//! ```

use async_trait::async_trait;

use tally_core::{Customer, Payment, SaleOrder, StatementRecord};
use tally_db::Database;

use crate::error::SyncResult;

/// Storage operations needed to rebuild one customer's statement.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Looks up a customer by id.
    async fn get_customer(&self, customer_id: i64) -> SyncResult<Option<Customer>>;

    /// All customers in storage order.
    async fn list_customers(&self) -> SyncResult<Vec<Customer>>;

    /// Full sale order history of one customer.
    async fn list_sale_orders(&self, customer_id: i64) -> SyncResult<Vec<SaleOrder>>;

    /// Full payment history of one customer.
    async fn list_payments(&self, customer_id: i64) -> SyncResult<Vec<Payment>>;

    /// Atomically swaps the customer's ledger rows for `records`.
    async fn replace_statement_records(
        &self,
        customer_id: i64,
        records: &[StatementRecord],
    ) -> SyncResult<()>;
}

#[async_trait]
impl LedgerStore for Database {
    async fn get_customer(&self, customer_id: i64) -> SyncResult<Option<Customer>> {
        Ok(self.customers().get_by_id(customer_id).await?)
    }

    async fn list_customers(&self) -> SyncResult<Vec<Customer>> {
        Ok(self.customers().list().await?)
    }

    async fn list_sale_orders(&self, customer_id: i64) -> SyncResult<Vec<SaleOrder>> {
        Ok(self.sale_orders().list_for_customer(customer_id).await?)
    }

    async fn list_payments(&self, customer_id: i64) -> SyncResult<Vec<Payment>> {
        Ok(self.payments().list_for_customer(customer_id).await?)
    }

    async fn replace_statement_records(
        &self,
        customer_id: i64,
        records: &[StatementRecord],
    ) -> SyncResult<()> {
        self.statements()
            .replace_for_customer(customer_id, records)
            .await?;
        Ok(())
    }
}
