//! # Sale Order Repository
//!
//! Database operations for sale orders.
//!
//! ## Code Generation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  insert(input) with no code                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN IMMEDIATE                                                       │
//! │  highest numeric sequence under 'S240110'      → 'S2401100041'          │
//! │  next_sale_order_code(date, max)               → 'S2401100042'          │
//! │  INSERT ... RETURNING                                                  │
//! │  COMMIT                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! The write lock is taken at `BEGIN`, so two inserts cannot read the same
//! maximum. Sequences past 9999 widen to five digits and still sort first.

use chrono::Local;
use sqlx::SqlitePool;
use tracing::debug;

use super::{begin_write, Updated};
use crate::error::{DbError, DbResult};
use tally_core::codes::{next_sale_order_code, sale_order_day_prefix};
use tally_core::{SaleOrder, SaleOrderInput};

const SALE_ORDER_COLUMNS: &str = "id, code, customer_id, create_time, order_amount, remark";

/// Repository for sale order database operations.
#[derive(Debug, Clone)]
pub struct SaleOrderRepository {
    pool: SqlitePool,
}

impl SaleOrderRepository {
    /// Creates a new SaleOrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleOrderRepository { pool }
    }

    /// Lists sale orders, newest first, optionally for one customer.
    pub async fn list(&self, customer_id: Option<i64>) -> DbResult<Vec<SaleOrder>> {
        let sql = format!(
            r#"
            SELECT {SALE_ORDER_COLUMNS}
            FROM sale_orders
            WHERE (?1 IS NULL OR customer_id = ?1)
            ORDER BY create_time DESC, id DESC
            "#
        );

        let orders = sqlx::query_as::<_, SaleOrder>(&sql)
            .bind(customer_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(orders)
    }

    /// All of one customer's sale orders in creation order.
    pub async fn list_for_customer(&self, customer_id: i64) -> DbResult<Vec<SaleOrder>> {
        let sql = format!(
            r#"
            SELECT {SALE_ORDER_COLUMNS}
            FROM sale_orders
            WHERE customer_id = ?1
            ORDER BY create_time, id
            "#
        );

        let orders = sqlx::query_as::<_, SaleOrder>(&sql)
            .bind(customer_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(orders)
    }

    /// Gets a sale order by ID.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<SaleOrder>> {
        let sql = format!("SELECT {SALE_ORDER_COLUMNS} FROM sale_orders WHERE id = ?1");

        let order = sqlx::query_as::<_, SaleOrder>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(order)
    }

    /// Inserts a sale order.
    ///
    /// `create_time` defaults to the local wall clock. A missing or blank code
    /// gets the next `S` + YYMMDD + sequence code for that day.
    pub async fn insert(&self, input: &SaleOrderInput) -> DbResult<SaleOrder> {
        let create_time = input
            .create_time
            .unwrap_or_else(|| Local::now().naive_local());

        let mut tx = begin_write(&self.pool).await?;

        let code = match input.code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => code.to_string(),
            _ => {
                let prefix = sale_order_day_prefix(create_time.date());
                let current_max: Option<String> = sqlx::query_scalar(
                    r#"
                    SELECT code FROM sale_orders
                    WHERE code LIKE ?1
                      AND substr(code, ?2) <> ''
                      AND substr(code, ?2) NOT GLOB '*[^0-9]*'
                    ORDER BY CAST(substr(code, ?2) AS INTEGER) DESC
                    LIMIT 1
                    "#,
                )
                .bind(format!("{prefix}%"))
                .bind(prefix.len() as i64 + 1)
                .fetch_optional(&mut *tx)
                .await?;

                next_sale_order_code(create_time.date(), current_max.as_deref())
            }
        };

        debug!(code = %code, customer_id = input.customer_id, "Inserting sale order");

        let sql = format!(
            r#"
            INSERT INTO sale_orders (code, customer_id, create_time, order_amount, remark)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING {SALE_ORDER_COLUMNS}
            "#
        );

        let order = sqlx::query_as::<_, SaleOrder>(&sql)
            .bind(&code)
            .bind(input.customer_id)
            .bind(create_time)
            .bind(input.order_amount)
            .bind(&input.remark)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await.map_err(DbError::transaction)?;

        Ok(order)
    }

    /// Updates a sale order. Omitted code and create time keep their values.
    ///
    /// Returns `None` when no sale order has this id.
    pub async fn update(
        &self,
        id: i64,
        input: &SaleOrderInput,
    ) -> DbResult<Option<Updated<SaleOrder>>> {
        let mut tx = begin_write(&self.pool).await?;

        let previous: Option<i64> =
            sqlx::query_scalar("SELECT customer_id FROM sale_orders WHERE id = ?1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(previous_customer_id) = previous else {
            return Ok(None);
        };

        debug!(id, previous_customer_id, customer_id = input.customer_id, "Updating sale order");

        let sql = format!(
            r#"
            UPDATE sale_orders SET
                code = COALESCE(NULLIF(TRIM(?2), ''), code),
                customer_id = ?3,
                create_time = COALESCE(?4, create_time),
                order_amount = ?5,
                remark = ?6,
                updated_at = datetime('now')
            WHERE id = ?1
            RETURNING {SALE_ORDER_COLUMNS}
            "#
        );

        let current = sqlx::query_as::<_, SaleOrder>(&sql)
            .bind(id)
            .bind(&input.code)
            .bind(input.customer_id)
            .bind(input.create_time)
            .bind(input.order_amount)
            .bind(&input.remark)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await.map_err(DbError::transaction)?;

        Ok(Some(Updated {
            previous_customer_id,
            current,
        }))
    }

    /// Deletes a sale order and returns the customer it belonged to.
    pub async fn delete(&self, id: i64) -> DbResult<Option<i64>> {
        debug!(id, "Deleting sale order");

        let customer_id: Option<i64> =
            sqlx::query_scalar("DELETE FROM sale_orders WHERE id = ?1 RETURNING customer_id")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(customer_id)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::{Database, DbConfig, DbError};
    use tally_core::{CustomerInput, Money, SaleOrderInput};

    async fn setup() -> (Database, i64, i64) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut ids = Vec::new();
        for code in ["C001", "C002"] {
            let customer = db
                .customers()
                .insert(&CustomerInput {
                    code: code.to_string(),
                    name: code.to_string(),
                    is_active: true,
                    ..Default::default()
                })
                .await
                .unwrap();
            ids.push(customer.id);
        }
        (db, ids[0], ids[1])
    }

    fn order_on(customer_id: i64, day: u32, cents: i64) -> SaleOrderInput {
        SaleOrderInput {
            code: None,
            customer_id,
            create_time: NaiveDate::from_ymd_opt(2024, 1, day)
                .unwrap()
                .and_hms_opt(9, 30, 0),
            order_amount: Money::from_cents(cents),
            remark: None,
        }
    }

    #[tokio::test]
    async fn test_generated_codes_follow_daily_sequence() {
        let (db, a, _) = setup().await;
        let repo = db.sale_orders();

        let first = repo.insert(&order_on(a, 10, 100)).await.unwrap();
        let second = repo.insert(&order_on(a, 10, 200)).await.unwrap();
        let next_day = repo.insert(&order_on(a, 11, 300)).await.unwrap();

        assert_eq!(first.code, "S2401100001");
        assert_eq!(second.code, "S2401100002");
        assert_eq!(next_day.code, "S2401110001");
    }

    #[tokio::test]
    async fn test_sequence_continues_past_four_digits() {
        let (db, a, _) = setup().await;
        let repo = db.sale_orders();

        let mut manual = order_on(a, 10, 100);
        manual.code = Some("S2401109999".to_string());
        repo.insert(&manual).await.unwrap();

        let widened = repo.insert(&order_on(a, 10, 100)).await.unwrap();
        let after = repo.insert(&order_on(a, 10, 100)).await.unwrap();

        assert_eq!(widened.code, "S24011010000");
        assert_eq!(after.code, "S24011010001");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_writers_on_shared_file() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("tally.db")).max_connections(8))
            .await
            .unwrap();
        let customer = db
            .customers()
            .insert(&CustomerInput {
                code: "C001".to_string(),
                name: "Acme".to_string(),
                is_active: true,
                ..Default::default()
            })
            .await
            .unwrap();
        let seeded = db.sale_orders().insert(&order_on(customer.id, 9, 1)).await.unwrap();

        let mut tasks = Vec::new();
        for i in 0..32 {
            let repo = db.sale_orders();
            let id = customer.id;
            let seeded_id = seeded.id;
            tasks.push(tokio::spawn(async move {
                if i % 4 == 0 {
                    repo.update(seeded_id, &order_on(id, 9, i)).await.map(|_| None)
                } else {
                    repo.insert(&order_on(id, 10, 100)).await.map(|o| Some(o.code))
                }
            }));
        }

        let mut codes = std::collections::HashSet::new();
        for task in tasks {
            if let Some(code) = task.await.unwrap().unwrap() {
                codes.insert(code);
            }
        }

        assert_eq!(codes.len(), 24);
        assert!(codes.contains("S2401100001"));
        assert!(codes.contains("S2401100024"));
        db.close().await;
    }

    #[tokio::test]
    async fn test_explicit_code_is_kept() {
        let (db, a, _) = setup().await;

        let mut input = order_on(a, 10, 100);
        input.code = Some("MANUAL-1".to_string());
        let order = db.sale_orders().insert(&input).await.unwrap();

        assert_eq!(order.code, "MANUAL-1");
    }

    #[tokio::test]
    async fn test_unknown_customer_rejected() {
        let (db, _, _) = setup().await;

        let err = db.sale_orders().insert(&order_on(999, 10, 100)).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_update_reports_previous_customer() {
        let (db, a, b) = setup().await;
        let repo = db.sale_orders();

        let order = repo.insert(&order_on(a, 10, 100)).await.unwrap();

        let moved = repo
            .update(order.id, &order_on(b, 12, 250))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(moved.previous_customer_id, a);
        assert_eq!(moved.current.customer_id, b);
        assert_eq!(moved.current.code, order.code);
        assert_eq!(moved.current.order_amount, Money::from_cents(250));

        assert!(repo.update(999, &order_on(a, 10, 1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_and_list() {
        let (db, a, b) = setup().await;
        let repo = db.sale_orders();

        let early = repo.insert(&order_on(a, 3, 100)).await.unwrap();
        let late = repo.insert(&order_on(a, 9, 100)).await.unwrap();
        repo.insert(&order_on(b, 5, 100)).await.unwrap();

        let for_a = repo.list_for_customer(a).await.unwrap();
        assert_eq!(
            for_a.iter().map(|o| o.id).collect::<Vec<_>>(),
            vec![early.id, late.id]
        );

        let newest_first = repo.list(None).await.unwrap();
        assert_eq!(newest_first.len(), 3);
        assert_eq!(newest_first[0].id, late.id);

        assert_eq!(repo.delete(early.id).await.unwrap(), Some(a));
        assert_eq!(repo.delete(early.id).await.unwrap(), None);
        assert_eq!(repo.list(Some(a)).await.unwrap().len(), 1);
    }
}
