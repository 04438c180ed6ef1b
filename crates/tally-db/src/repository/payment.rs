//! # Payment Repository
//!
//! Database operations for payments received from customers.
//!
//! `sale_order_ids` is stored as a JSON array in a TEXT column. Reads go
//! through [`parse_sale_order_ids`], which treats NULL and unreadable values
//! as "no linked orders".

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::{begin_write, Updated};
use crate::error::{DbError, DbResult};
use tally_core::codes::next_payment_code;
use tally_core::types::parse_sale_order_ids;
use tally_core::{Money, Payment, PaymentInput};

const PAYMENT_COLUMNS: &str = r#"
    id, code, payment_date, customer_id, amount, payment_method, account,
    payer_company, sale_order_ids, remark
"#;

/// Raw row; `sale_order_ids` is still JSON text.
#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: i64,
    code: String,
    payment_date: chrono::NaiveDate,
    customer_id: i64,
    amount: Money,
    payment_method: Option<String>,
    account: Option<String>,
    payer_company: Option<String>,
    sale_order_ids: Option<String>,
    remark: Option<String>,
}

impl From<PaymentRow> for Payment {
    fn from(row: PaymentRow) -> Self {
        Payment {
            id: row.id,
            code: row.code,
            payment_date: row.payment_date,
            customer_id: row.customer_id,
            amount: row.amount,
            payment_method: row.payment_method,
            account: row.account,
            payer_company: row.payer_company,
            sale_order_ids: parse_sale_order_ids(row.sale_order_ids.as_deref()),
            remark: row.remark,
        }
    }
}

/// Encodes linked order ids; an empty list is stored as NULL.
fn encode_sale_order_ids(ids: &[i64]) -> DbResult<Option<String>> {
    if ids.is_empty() {
        return Ok(None);
    }
    serde_json::to_string(ids)
        .map(Some)
        .map_err(|e| DbError::Internal(format!("Failed to encode sale_order_ids: {e}")))
}

/// Repository for payment database operations.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    /// Creates a new PaymentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    /// Lists payments, newest first, optionally for one customer.
    pub async fn list(&self, customer_id: Option<i64>) -> DbResult<Vec<Payment>> {
        let sql = format!(
            r#"
            SELECT {PAYMENT_COLUMNS}
            FROM payments
            WHERE (?1 IS NULL OR customer_id = ?1)
            ORDER BY payment_date DESC, id DESC
            "#
        );

        let rows = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(customer_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Payment::from).collect())
    }

    /// All of one customer's payments in date order.
    pub async fn list_for_customer(&self, customer_id: i64) -> DbResult<Vec<Payment>> {
        let sql = format!(
            r#"
            SELECT {PAYMENT_COLUMNS}
            FROM payments
            WHERE customer_id = ?1
            ORDER BY payment_date, id
            "#
        );

        let rows = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(customer_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Payment::from).collect())
    }

    /// Gets a payment by ID.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Payment>> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = ?1");

        let row = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Payment::from))
    }

    /// Inserts a payment. A missing or blank code gets the next `D` code.
    pub async fn insert(&self, input: &PaymentInput) -> DbResult<Payment> {
        let mut tx = begin_write(&self.pool).await?;

        let payment = insert_with(&mut *tx, input).await?;

        tx.commit().await.map_err(DbError::transaction)?;

        Ok(payment)
    }

    /// Inserts several payments in one transaction.
    ///
    /// Either every payment is stored or none is.
    pub async fn insert_batch(&self, inputs: &[PaymentInput]) -> DbResult<Vec<Payment>> {
        let mut tx = begin_write(&self.pool).await?;

        let mut payments = Vec::with_capacity(inputs.len());
        for input in inputs {
            payments.push(insert_with(&mut *tx, input).await?);
        }

        tx.commit().await.map_err(DbError::transaction)?;

        info!(count = payments.len(), "Inserted payment batch");
        Ok(payments)
    }

    /// Updates a payment. An omitted code keeps the stored one.
    ///
    /// Returns `None` when no payment has this id.
    pub async fn update(
        &self,
        id: i64,
        input: &PaymentInput,
    ) -> DbResult<Option<Updated<Payment>>> {
        let sale_order_ids = encode_sale_order_ids(&input.sale_order_ids)?;

        let mut tx = begin_write(&self.pool).await?;

        let previous: Option<i64> =
            sqlx::query_scalar("SELECT customer_id FROM payments WHERE id = ?1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(previous_customer_id) = previous else {
            return Ok(None);
        };

        debug!(id, previous_customer_id, customer_id = input.customer_id, "Updating payment");

        let sql = format!(
            r#"
            UPDATE payments SET
                code = COALESCE(NULLIF(TRIM(?2), ''), code),
                payment_date = ?3,
                customer_id = ?4,
                amount = ?5,
                payment_method = ?6,
                account = ?7,
                payer_company = ?8,
                sale_order_ids = ?9,
                remark = ?10,
                updated_at = datetime('now')
            WHERE id = ?1
            RETURNING {PAYMENT_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(id)
            .bind(&input.code)
            .bind(input.payment_date)
            .bind(input.customer_id)
            .bind(input.amount)
            .bind(&input.payment_method)
            .bind(&input.account)
            .bind(&input.payer_company)
            .bind(sale_order_ids)
            .bind(&input.remark)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await.map_err(DbError::transaction)?;

        Ok(Some(Updated {
            previous_customer_id,
            current: row.into(),
        }))
    }

    /// Deletes a payment and returns the customer it belonged to.
    pub async fn delete(&self, id: i64) -> DbResult<Option<i64>> {
        debug!(id, "Deleting payment");

        let customer_id: Option<i64> =
            sqlx::query_scalar("DELETE FROM payments WHERE id = ?1 RETURNING customer_id")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(customer_id)
    }
}

/// Inserts one payment on an open transaction, generating its code there.
async fn insert_with(conn: &mut SqliteConnection, input: &PaymentInput) -> DbResult<Payment> {
    let code = match input.code.as_deref().map(str::trim) {
        Some(code) if !code.is_empty() => code.to_string(),
        _ => {
            let current_max: Option<String> = sqlx::query_scalar(
                r#"
                SELECT code FROM payments
                WHERE code GLOB 'D[0-9]*' AND substr(code, 2) NOT GLOB '*[^0-9]*'
                ORDER BY CAST(substr(code, 2) AS INTEGER) DESC
                LIMIT 1
                "#,
            )
            .fetch_optional(&mut *conn)
            .await?;

            next_payment_code(current_max.as_deref())
        }
    };

    debug!(code = %code, customer_id = input.customer_id, amount = %input.amount, "Inserting payment");

    let sql = format!(
        r#"
        INSERT INTO payments (
            code, payment_date, customer_id, amount, payment_method, account,
            payer_company, sale_order_ids, remark
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        RETURNING {PAYMENT_COLUMNS}
        "#
    );

    let row = sqlx::query_as::<_, PaymentRow>(&sql)
        .bind(&code)
        .bind(input.payment_date)
        .bind(input.customer_id)
        .bind(input.amount)
        .bind(&input.payment_method)
        .bind(&input.account)
        .bind(&input.payer_company)
        .bind(encode_sale_order_ids(&input.sale_order_ids)?)
        .bind(&input.remark)
        .fetch_one(&mut *conn)
        .await?;

    Ok(row.into())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::{Database, DbConfig};
    use tally_core::{CustomerInput, Money, PaymentInput};

    async fn setup() -> (Database, i64) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
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
        (db, customer.id)
    }

    fn payment(customer_id: i64, cents: i64) -> PaymentInput {
        PaymentInput {
            code: None,
            payment_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            customer_id,
            amount: Money::from_cents(cents),
            payment_method: Some("transfer".to_string()),
            account: None,
            payer_company: None,
            sale_order_ids: Vec::new(),
            remark: None,
        }
    }

    #[tokio::test]
    async fn test_insert_generates_codes_and_keeps_links() {
        let (db, c) = setup().await;
        let repo = db.payments();

        let mut linked = payment(c, 40_000);
        linked.sale_order_ids = vec![3, 5];

        let first = repo.insert(&linked).await.unwrap();
        let second = repo.insert(&payment(c, 100)).await.unwrap();

        assert_eq!(first.code, "D000001");
        assert_eq!(second.code, "D000002");
        assert_eq!(first.sale_order_ids, vec![3, 5]);
        assert!(second.sale_order_ids.is_empty());

        let fetched = repo.get_by_id(first.id).await.unwrap().unwrap();
        assert_eq!(fetched, first);
    }

    #[tokio::test]
    async fn test_legacy_sale_order_ids_read_as_empty() {
        let (db, c) = setup().await;
        let created = db.payments().insert(&payment(c, 100)).await.unwrap();

        sqlx::query("UPDATE payments SET sale_order_ids = 'null' WHERE id = ?1")
            .bind(created.id)
            .execute(db.pool())
            .await
            .unwrap();

        let fetched = db.payments().get_by_id(created.id).await.unwrap().unwrap();
        assert!(fetched.sale_order_ids.is_empty());
    }

    #[tokio::test]
    async fn test_batch_is_all_or_nothing() {
        let (db, c) = setup().await;
        let repo = db.payments();

        let stored = repo
            .insert_batch(&[payment(c, 100), payment(c, 200)])
            .await
            .unwrap();
        assert_eq!(
            stored.iter().map(|p| p.code.as_str()).collect::<Vec<_>>(),
            vec!["D000001", "D000002"]
        );

        // Second entry references a missing customer
        let result = repo.insert_batch(&[payment(c, 300), payment(999, 400)]).await;
        assert!(result.is_err());
        assert_eq!(repo.list(Some(c)).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_sequence_continues_past_six_digits() {
        let (db, c) = setup().await;
        let repo = db.payments();

        let mut manual = payment(c, 100);
        manual.code = Some("D999999".to_string());
        repo.insert(&manual).await.unwrap();

        let widened = repo.insert(&payment(c, 100)).await.unwrap();
        let after = repo.insert(&payment(c, 100)).await.unwrap();

        assert_eq!(widened.code, "D1000000");
        assert_eq!(after.code, "D1000001");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_inserts_and_batches() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("tally.db")).max_connections(8))
            .await
            .unwrap();
        let c = db
            .customers()
            .insert(&CustomerInput {
                code: "C001".to_string(),
                name: "Acme".to_string(),
                is_active: true,
                ..Default::default()
            })
            .await
            .unwrap()
            .id;

        let mut tasks = Vec::new();
        for i in 0..24 {
            let repo = db.payments();
            tasks.push(tokio::spawn(async move {
                if i % 3 == 0 {
                    repo.insert_batch(&[payment(c, 10), payment(c, 20)]).await
                } else {
                    repo.insert(&payment(c, 30)).await.map(|p| vec![p])
                }
            }));
        }

        let mut codes = std::collections::HashSet::new();
        for task in tasks {
            for stored in task.await.unwrap().unwrap() {
                codes.insert(stored.code);
            }
        }

        assert_eq!(codes.len(), 32);
        assert!(codes.contains("D000032"));
        db.close().await;
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (db, c) = setup().await;
        let repo = db.payments();

        let created = repo.insert(&payment(c, 100)).await.unwrap();

        let mut changed = payment(c, 150);
        changed.remark = Some("corrected".to_string());
        let updated = repo.update(created.id, &changed).await.unwrap().unwrap();
        assert_eq!(updated.previous_customer_id, c);
        assert_eq!(updated.current.amount, Money::from_cents(150));
        assert_eq!(updated.current.code, created.code);

        assert_eq!(repo.delete(created.id).await.unwrap(), Some(c));
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
        assert!(repo.list_for_customer(c).await.unwrap().is_empty());
    }
}
