//! In-memory [`LedgerStore`] for orchestrator and reconciler tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use tally_core::{Customer, Money, Payment, SaleOrder, StatementRecord};
use tally_db::DbError;

use crate::error::{SyncError, SyncResult};
use crate::store::LedgerStore;

#[derive(Default)]
struct State {
    customers: Vec<Customer>,
    orders: Vec<SaleOrder>,
    payments: Vec<Payment>,
    ledgers: HashMap<i64, Vec<StatementRecord>>,
    failing: HashSet<i64>,
    replace_calls: usize,
    replace_delay: Option<Duration>,
    active: HashMap<i64, usize>,
    active_total: usize,
    max_per_customer: usize,
    max_total: usize,
}

#[derive(Default)]
pub(crate) struct MemoryStore {
    state: Mutex<State>,
}

fn date((y, m, d): (i32, u32, u32)) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

impl MemoryStore {
    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn add_customer(&self, code: &str, name: &str) -> i64 {
        let mut state = self.state();
        let id = state.customers.len() as i64 + 1;
        state.customers.push(Customer {
            id,
            code: code.to_string(),
            name: name.to_string(),
            phone: None,
            province: None,
            city: None,
            district: None,
            address: None,
            company: None,
            is_active: true,
            remark: None,
        });
        id
    }

    pub fn add_order(&self, customer_id: i64, id: i64, ymd: (i32, u32, u32), cents: i64) {
        self.state().orders.push(SaleOrder {
            id,
            code: format!("S{id}"),
            customer_id,
            create_time: date(ymd).and_hms_opt(10, 0, 0).unwrap(),
            order_amount: Money::from_cents(cents),
            remark: None,
        });
    }

    pub fn add_payment(&self, customer_id: i64, id: i64, ymd: (i32, u32, u32), cents: i64) {
        self.state().payments.push(Payment {
            id,
            code: format!("D{id}"),
            payment_date: date(ymd),
            customer_id,
            amount: Money::from_cents(cents),
            payment_method: None,
            account: None,
            payer_company: None,
            sale_order_ids: Vec::new(),
            remark: None,
        });
    }

    pub fn remove_order(&self, id: i64) {
        self.state().orders.retain(|o| o.id != id);
    }

    /// Makes source reads for this customer fail.
    pub fn fail_for(&self, customer_id: i64) {
        self.state().failing.insert(customer_id);
    }

    /// Stretches every ledger write so overlapping runs become observable.
    pub fn set_replace_delay(&self, delay: Duration) {
        self.state().replace_delay = Some(delay);
    }

    pub fn ledger(&self, customer_id: i64) -> Vec<StatementRecord> {
        self.state()
            .ledgers
            .get(&customer_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn replace_calls(&self) -> usize {
        self.state().replace_calls
    }

    pub fn max_overlap_per_customer(&self) -> usize {
        self.state().max_per_customer
    }

    pub fn max_overlap_total(&self) -> usize {
        self.state().max_total
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn get_customer(&self, customer_id: i64) -> SyncResult<Option<Customer>> {
        Ok(self
            .state()
            .customers
            .iter()
            .find(|c| c.id == customer_id)
            .cloned())
    }

    async fn list_customers(&self) -> SyncResult<Vec<Customer>> {
        Ok(self.state().customers.clone())
    }

    async fn list_sale_orders(&self, customer_id: i64) -> SyncResult<Vec<SaleOrder>> {
        let state = self.state();
        if state.failing.contains(&customer_id) {
            return Err(SyncError::Persistence(DbError::QueryFailed(
                "injected failure".to_string(),
            )));
        }
        Ok(state
            .orders
            .iter()
            .filter(|o| o.customer_id == customer_id)
            .cloned()
            .collect())
    }

    async fn list_payments(&self, customer_id: i64) -> SyncResult<Vec<Payment>> {
        Ok(self
            .state()
            .payments
            .iter()
            .filter(|p| p.customer_id == customer_id)
            .cloned()
            .collect())
    }

    async fn replace_statement_records(
        &self,
        customer_id: i64,
        records: &[StatementRecord],
    ) -> SyncResult<()> {
        let delay = {
            let mut state = self.state();
            let active = state.active.entry(customer_id).or_default();
            *active += 1;
            let per_customer = *active;
            state.active_total += 1;
            state.max_per_customer = state.max_per_customer.max(per_customer);
            state.max_total = state.max_total.max(state.active_total);
            state.replace_delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        state.ledgers.insert(customer_id, records.to_vec());
        state.replace_calls += 1;
        state.active_total -= 1;
        if let Some(active) = state.active.get_mut(&customer_id) {
            *active -= 1;
        }
        Ok(())
    }
}
