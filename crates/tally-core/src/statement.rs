//! # Statement Module
//!
//! Turns a customer's sale orders and payments into ledger lines and computes
//! the running balance over them.
//!
//! ## Ledger Construction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Building a Statement                               │
//! │                                                                         │
//! │  SaleOrder { create_time: 2024-01-10 09:30, order_amount: 1000.00 }    │
//! │       │  from_sale_order()                                              │
//! │       ▼                                                                 │
//! │  StatementRecord { date: 2024-01-10, sale: 1000.00, payment: 0 }       │
//! │                                                                         │
//! │  Payment { payment_date: 2024-01-15, amount: 400.00 }                  │
//! │       │  from_payment()                                                 │
//! │       ▼                                                                 │
//! │  StatementRecord { date: 2024-01-15, sale: 0, payment: 400.00 }        │
//! │                                                                         │
//! │  compute_balances()                                                    │
//! │       │  1. sort ascending by (date, source_type, source_id)            │
//! │       │  2. balance += sale - payment                                   │
//! │       │  3. reverse → newest first                                      │
//! │       ▼                                                                 │
//! │  2024-01-15  payment  400.00   balance  600.00                         │
//! │  2024-01-10  sale    1000.00   balance 1000.00                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::cmp::Ordering;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Customer, Payment, SaleOrder, SourceType, StatementRecord};

// =============================================================================
// Record Mapping
// =============================================================================

impl StatementRecord {
    /// Maps a sale order to its ledger line.
    ///
    /// The line is dated on the calendar day of `create_time`; the time of day
    /// is dropped.
    pub fn from_sale_order(customer: &Customer, order: &SaleOrder) -> CoreResult<Self> {
        ensure_same_customer(customer, SourceType::SaleOrder, order.id, order.customer_id)?;

        Ok(StatementRecord {
            id: 0,
            customer_id: customer.id,
            customer_code: customer.code.clone(),
            customer_name: customer.name.clone(),
            date: order.create_time.date(),
            sale_amount: order.order_amount,
            payment_amount: Money::zero(),
            balance: Money::zero(),
            source_type: SourceType::SaleOrder,
            source_id: order.id,
            remark: order.remark.clone(),
        })
    }

    /// Maps a payment to its ledger line, dated on the payment date.
    pub fn from_payment(customer: &Customer, payment: &Payment) -> CoreResult<Self> {
        ensure_same_customer(customer, SourceType::Payment, payment.id, payment.customer_id)?;

        Ok(StatementRecord {
            id: 0,
            customer_id: customer.id,
            customer_code: customer.code.clone(),
            customer_name: customer.name.clone(),
            date: payment.payment_date,
            sale_amount: Money::zero(),
            payment_amount: payment.amount,
            balance: Money::zero(),
            source_type: SourceType::Payment,
            source_id: payment.id,
            remark: payment.remark.clone(),
        })
    }
}

fn ensure_same_customer(
    customer: &Customer,
    source_type: SourceType,
    source_id: i64,
    owner: i64,
) -> CoreResult<()> {
    if owner != customer.id {
        return Err(CoreError::CustomerMismatch {
            source_type: source_type.to_string(),
            source_id,
            expected: customer.id,
            found: owner,
        });
    }
    Ok(())
}

/// Builds a customer's complete statement from its full history.
///
/// Every order and every payment yields exactly one line; the result carries
/// balances and is ordered newest first.
pub fn build_statement(
    customer: &Customer,
    orders: &[SaleOrder],
    payments: &[Payment],
) -> CoreResult<Vec<StatementRecord>> {
    let mut records = Vec::with_capacity(orders.len() + payments.len());

    for order in orders {
        records.push(StatementRecord::from_sale_order(customer, order)?);
    }
    for payment in payments {
        records.push(StatementRecord::from_payment(customer, payment)?);
    }

    compute_balances(records)
}

// =============================================================================
// Balance Calculator
// =============================================================================

/// Chronological order of ledger lines.
///
/// Same-day lines fall back to `(source_type, source_id)` so the running
/// balance never depends on the order rows came out of storage.
pub fn chronological(a: &StatementRecord, b: &StatementRecord) -> Ordering {
    a.date
        .cmp(&b.date)
        .then(a.source_type.cmp(&b.source_type))
        .then(a.source_id.cmp(&b.source_id))
}

/// Computes running balances and returns the records newest first.
///
/// Incoming `balance` values are ignored and overwritten. A running balance
/// that leaves the `i64` range fails with [`CoreError::BalanceOverflow`]
/// naming the first line that could not be summed.
///
/// ## Algorithm
/// 1. Sort ascending with [`chronological`]
/// 2. `balance += sale_amount - payment_amount` for each record in turn
/// 3. Reverse, giving descending order under the same key
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use tally_core::{compute_balances, Money, SourceType, StatementRecord};
///
/// assert!(compute_balances(Vec::new()).unwrap().is_empty());
///
/// let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
/// let only = StatementRecord::new(1, SourceType::SaleOrder, 1, date, Money::from_cents(250), Money::zero());
/// assert_eq!(compute_balances(vec![only]).unwrap()[0].balance.cents(), 250);
/// ```
pub fn compute_balances(mut records: Vec<StatementRecord>) -> CoreResult<Vec<StatementRecord>> {
    records.sort_by(chronological);

    let mut balance = Money::zero();
    for record in records.iter_mut() {
        balance = balance
            .checked_add(record.sale_amount)
            .and_then(|b| b.checked_sub(record.payment_amount))
            .ok_or_else(|| CoreError::BalanceOverflow {
                customer_id: record.customer_id,
                source_type: record.source_type.to_string(),
                source_id: record.source_id,
            })?;
        record.balance = balance;
    }

    records.reverse();
    Ok(records)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(month: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, d).unwrap()
    }

    fn customer() -> Customer {
        Customer {
            id: 1,
            code: "C001".to_string(),
            name: "Harbor Trading".to_string(),
            phone: None,
            province: None,
            city: None,
            district: None,
            address: None,
            company: None,
            is_active: true,
            remark: None,
        }
    }

    fn order(id: i64, date: NaiveDate, cents: i64) -> SaleOrder {
        SaleOrder {
            id,
            code: format!("S{:010}", id),
            customer_id: 1,
            create_time: date.and_hms_opt(16, 45, 12).unwrap(),
            order_amount: Money::from_cents(cents),
            remark: Some(format!("order {}", id)),
        }
    }

    fn payment(id: i64, date: NaiveDate, cents: i64) -> Payment {
        Payment {
            id,
            code: format!("D{:06}", id),
            payment_date: date,
            customer_id: 1,
            amount: Money::from_cents(cents),
            payment_method: Some("transfer".to_string()),
            account: None,
            payer_company: None,
            sale_order_ids: vec![],
            remark: None,
        }
    }

    fn sale_line(id: i64, date: NaiveDate, cents: i64) -> StatementRecord {
        StatementRecord::new(1, SourceType::SaleOrder, id, date, Money::from_cents(cents), Money::zero())
    }

    fn payment_line(id: i64, date: NaiveDate, cents: i64) -> StatementRecord {
        StatementRecord::new(1, SourceType::Payment, id, date, Money::zero(), Money::from_cents(cents))
    }

    #[test]
    fn test_empty_input_stays_empty() {
        assert!(compute_balances(Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn test_sale_then_payment_scenario() {
        let ledger = build_statement(
            &customer(),
            &[order(10, day(1, 10), 100_000)],
            &[payment(20, day(1, 15), 40_000)],
        )
        .unwrap();

        assert_eq!(ledger.len(), 2);

        // Newest first: the payment row leads
        assert_eq!(ledger[0].source_type, SourceType::Payment);
        assert_eq!(ledger[0].date, day(1, 15));
        assert_eq!(ledger[0].balance.to_string(), "600.00");

        assert_eq!(ledger[1].source_type, SourceType::SaleOrder);
        assert_eq!(ledger[1].date, day(1, 10));
        assert_eq!(ledger[1].balance.to_string(), "1000.00");
    }

    #[test]
    fn test_sale_order_date_drops_time_of_day() {
        let record = StatementRecord::from_sale_order(&customer(), &order(3, day(2, 29), 1)).unwrap();
        assert_eq!(record.date, day(2, 29));
        assert_eq!(record.customer_code, "C001");
        assert_eq!(record.customer_name, "Harbor Trading");
        assert_eq!(record.remark.as_deref(), Some("order 3"));
    }

    #[test]
    fn test_foreign_source_is_rejected() {
        let mut stray = payment(5, day(1, 1), 100);
        stray.customer_id = 2;

        let err = StatementRecord::from_payment(&customer(), &stray).unwrap_err();
        assert!(matches!(
            err,
            CoreError::CustomerMismatch { expected: 1, found: 2, source_id: 5, .. }
        ));
    }

    #[test]
    fn test_telescoping_sum() {
        let records = vec![
            payment_line(1, day(3, 2), 7_500),
            sale_line(2, day(1, 5), 12_000),
            sale_line(3, day(2, 1), 300),
            payment_line(4, day(1, 5), 2_000),
            sale_line(5, day(3, 2), 0),
        ];
        let total: Money = records.iter().map(StatementRecord::delta).sum();

        let ledger = compute_balances(records).unwrap();
        let oldest_first: Vec<_> = ledger.iter().rev().collect();

        assert_eq!(oldest_first.last().unwrap().balance, total);
        // Each step adds exactly its own delta
        let mut previous = Money::zero();
        for record in oldest_first {
            assert_eq!(record.balance - previous, record.delta());
            previous = record.balance;
        }
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let first = compute_balances(vec![
            sale_line(1, day(1, 1), 1_000),
            payment_line(1, day(1, 1), 400),
            sale_line(2, day(1, 3), 250),
            payment_line(2, day(1, 2), 900),
        ]).unwrap();

        let mut reset = first.clone();
        for record in reset.iter_mut() {
            record.balance = Money::from_cents(-999_999);
        }
        let second = compute_balances(reset).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_same_day_tie_break_is_fixed() {
        let shuffled = vec![
            payment_line(2, day(5, 5), 100),
            sale_line(9, day(5, 5), 1_000),
            payment_line(1, day(5, 5), 50),
            sale_line(4, day(5, 5), 10),
        ];

        let ledger = compute_balances(shuffled).unwrap();
        let order: Vec<_> = ledger.iter().map(|r| (r.source_type, r.source_id)).collect();

        // Descending: payments (high id first) then sale orders (high id first)
        assert_eq!(
            order,
            vec![
                (SourceType::Payment, 2),
                (SourceType::Payment, 1),
                (SourceType::SaleOrder, 9),
                (SourceType::SaleOrder, 4),
            ]
        );
        let balances: Vec<_> = ledger.iter().map(|r| r.balance.cents()).collect();
        assert_eq!(balances, vec![860, 960, 1_010, 10]);
    }

    #[test]
    fn test_zero_amount_lines_carry_balance_forward() {
        let ledger = compute_balances(vec![
            sale_line(1, day(1, 1), 500),
            sale_line(2, day(1, 2), 0),
            payment_line(3, day(1, 3), 0),
        ]).unwrap();

        assert!(ledger.iter().all(|r| r.balance.cents() == 500));
    }

    #[test]
    fn test_balance_goes_negative_on_prepayment() {
        let ledger = compute_balances(vec![
            payment_line(1, day(1, 1), 3_000),
            sale_line(1, day(1, 9), 1_000),
        ]).unwrap();

        assert_eq!(ledger[1].balance.cents(), -3_000);
        assert_eq!(ledger[0].balance.cents(), -2_000);
    }

    #[test]
    fn test_overflowing_balance_is_an_error() {
        let huge = i64::MAX / 2 + 1;

        let err = compute_balances(vec![sale_line(1, day(1, 1), huge), sale_line(2, day(1, 2), huge)])
            .unwrap_err();

        assert!(matches!(
            err,
            CoreError::BalanceOverflow { customer_id: 1, source_id: 2, .. }
        ));
    }

    #[test]
    fn test_build_statement_yields_one_line_per_source() {
        let orders = [order(1, day(1, 1), 100), order(2, day(1, 2), 200)];
        let payments = [payment(1, day(1, 3), 50)];

        let ledger = build_statement(&customer(), &orders, &payments).unwrap();

        assert_eq!(ledger.len(), orders.len() + payments.len());
        let mut keys: Vec<_> = ledger.iter().map(|r| (r.source_type, r.source_id)).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), 3);
    }
}
