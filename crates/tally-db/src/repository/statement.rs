//! # Statement Repository
//!
//! The derived ledger (`statement_records`).
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  replace_for_customer(42, records)                                     │
//! │                                                                         │
//! │  BEGIN                                                                 │
//! │    DELETE FROM statement_records WHERE customer_id = 42                │
//! │    INSERT ... (one per record)                                         │
//! │  COMMIT          ← readers see the old ledger or the new one, never    │
//! │                    a mix                                                │
//! │                                                                         │
//! │  Any error → transaction dropped → ROLLBACK → prior ledger intact      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Read Path
//! `list` filters by customer and inclusive date range, newest first, with
//! `LIMIT/OFFSET` paging and an unpaged total.

use sqlx::SqlitePool;
use tracing::debug;

use super::begin_write;
use crate::error::{DbError, DbResult};
use tally_core::{StatementPage, StatementQuery, StatementRecord};

const STATEMENT_COLUMNS: &str = r#"
    id, customer_id, customer_code, customer_name, date, sale_amount,
    payment_amount, balance, source_type, source_id, remark
"#;

// Shared by the page query and the count query; ?1..?3 are the filters.
const STATEMENT_FILTER: &str = r#"
    WHERE (?1 IS NULL OR customer_id = ?1)
      AND (?2 IS NULL OR date >= ?2)
      AND (?3 IS NULL OR date <= ?3)
"#;

/// Repository for the derived statement ledger.
#[derive(Debug, Clone)]
pub struct StatementRepository {
    pool: SqlitePool,
}

impl StatementRepository {
    /// Creates a new StatementRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StatementRepository { pool }
    }

    /// Atomically replaces every ledger row of one customer.
    ///
    /// The delete always runs, so an empty `records` slice clears the
    /// customer's ledger. Returns the number of rows written.
    pub async fn replace_for_customer(
        &self,
        customer_id: i64,
        records: &[StatementRecord],
    ) -> DbResult<usize> {
        let mut tx = begin_write(&self.pool).await?;

        let removed = sqlx::query("DELETE FROM statement_records WHERE customer_id = ?1")
            .bind(customer_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        for record in records {
            sqlx::query(
                r#"
                INSERT INTO statement_records (
                    customer_id, customer_code, customer_name, date,
                    sale_amount, payment_amount, balance, remark,
                    source_type, source_id
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
            )
            .bind(customer_id)
            .bind(&record.customer_code)
            .bind(&record.customer_name)
            .bind(record.date)
            .bind(record.sale_amount)
            .bind(record.payment_amount)
            .bind(record.balance)
            .bind(&record.remark)
            .bind(record.source_type)
            .bind(record.source_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await.map_err(DbError::transaction)?;

        debug!(customer_id, removed, written = records.len(), "Replaced statement records");
        Ok(records.len())
    }

    /// One page of ledger rows matching the query, newest first.
    pub async fn list(&self, query: &StatementQuery) -> DbResult<StatementPage> {
        let count_sql = format!("SELECT COUNT(*) FROM statement_records {STATEMENT_FILTER}");

        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(query.customer_id)
            .bind(query.start_date)
            .bind(query.end_date)
            .fetch_one(&self.pool)
            .await?;

        let page_sql = format!(
            r#"
            SELECT {STATEMENT_COLUMNS}
            FROM statement_records
            {STATEMENT_FILTER}
            ORDER BY date DESC, id DESC
            LIMIT ?4 OFFSET ?5
            "#
        );

        let records = sqlx::query_as::<_, StatementRecord>(&page_sql)
            .bind(query.customer_id)
            .bind(query.start_date)
            .bind(query.end_date)
            .bind(i64::from(query.page_size))
            .bind(query.offset())
            .fetch_all(&self.pool)
            .await?;

        debug!(
            customer_id = ?query.customer_id,
            page = query.page,
            total,
            returned = records.len(),
            "Listed statement records"
        );

        Ok(StatementPage { total, records })
    }

    /// Number of ledger rows held for one customer.
    pub async fn count_for_customer(&self, customer_id: i64) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM statement_records WHERE customer_id = ?1")
                .bind(customer_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::{Database, DbConfig, DbError};
    use tally_core::{
        compute_balances, CustomerInput, Money, SourceType, StatementQuery, StatementRecord,
    };

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

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

    fn ledger(customer_id: i64) -> Vec<StatementRecord> {
        compute_balances(vec![
            StatementRecord::new(customer_id, SourceType::SaleOrder, 1, day(10), Money::from_cents(100_000), Money::zero()),
            StatementRecord::new(customer_id, SourceType::Payment, 1, day(15), Money::zero(), Money::from_cents(40_000)),
            StatementRecord::new(customer_id, SourceType::SaleOrder, 2, day(20), Money::from_cents(5_000), Money::zero()),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn test_replace_then_list_newest_first() {
        let (db, c) = setup().await;
        let repo = db.statements();

        assert_eq!(repo.replace_for_customer(c, &ledger(c)).await.unwrap(), 3);

        let page = repo.list(&StatementQuery::for_customer(c)).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(
            page.records.iter().map(|r| r.date).collect::<Vec<_>>(),
            vec![day(20), day(15), day(10)]
        );
        assert_eq!(page.records[0].balance, Money::from_cents(65_000));
        assert_eq!(page.records[1].source_type, SourceType::Payment);
    }

    #[tokio::test]
    async fn test_replace_is_not_additive() {
        let (db, c) = setup().await;
        let repo = db.statements();

        repo.replace_for_customer(c, &ledger(c)).await.unwrap();
        repo.replace_for_customer(c, &ledger(c)).await.unwrap();
        assert_eq!(repo.count_for_customer(c).await.unwrap(), 3);

        // Empty set clears the ledger
        repo.replace_for_customer(c, &[]).await.unwrap();
        assert_eq!(repo.count_for_customer(c).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_replace_keeps_prior_ledger() {
        let (db, c) = setup().await;
        let repo = db.statements();
        repo.replace_for_customer(c, &ledger(c)).await.unwrap();

        let mut duplicated = ledger(c);
        duplicated.push(duplicated[0].clone());

        assert!(repo.replace_for_customer(c, &duplicated).await.is_err());
        assert_eq!(repo.count_for_customer(c).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_date_filter_and_paging() {
        let (db, c) = setup().await;
        let repo = db.statements();
        repo.replace_for_customer(c, &ledger(c)).await.unwrap();

        let ranged = StatementQuery {
            start_date: Some(day(15)),
            end_date: Some(day(20)),
            ..StatementQuery::for_customer(c)
        };
        let page = repo.list(&ranged).await.unwrap();
        assert_eq!(page.total, 2);

        let second_page = StatementQuery {
            page: 2,
            page_size: 2,
            ..StatementQuery::default()
        };
        let page = repo.list(&second_page).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].date, day(10));
    }

    #[tokio::test]
    async fn test_customer_with_ledger_cannot_be_removed() {
        let (db, c) = setup().await;
        db.statements().replace_for_customer(c, &ledger(c)).await.unwrap();

        let err = sqlx::query("DELETE FROM customers WHERE id = ?")
            .bind(c)
            .execute(db.pool())
            .await
            .map_err(DbError::from)
            .unwrap_err();

        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
        let page = db.statements().list(&StatementQuery::for_customer(c)).await.unwrap();
        assert_eq!(page.total, 3);
    }
}
