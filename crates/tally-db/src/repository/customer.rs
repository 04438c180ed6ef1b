//! # Customer Repository
//!
//! Customer master data. Statement rows snapshot a customer's code and name,
//! so renames show up in the ledger after the next reconciliation.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use tally_core::{Customer, CustomerInput};

const CUSTOMER_COLUMNS: &str = r#"
    id, code, name, phone, province, city, district, address, company,
    is_active, remark
"#;

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Lists all customers ordered by id.
    pub async fn list(&self) -> DbResult<Vec<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY id");

        let customers = sqlx::query_as::<_, Customer>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(customers)
    }

    /// Gets a customer by ID.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1");

        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(customer)
    }

    /// Inserts a customer and returns the stored row.
    pub async fn insert(&self, input: &CustomerInput) -> DbResult<Customer> {
        debug!(code = %input.code, "Inserting customer");

        let sql = format!(
            r#"
            INSERT INTO customers (
                code, name, phone, province, city, district, address, company,
                is_active, remark
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            RETURNING {CUSTOMER_COLUMNS}
            "#
        );

        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(&input.code)
            .bind(&input.name)
            .bind(&input.phone)
            .bind(&input.province)
            .bind(&input.city)
            .bind(&input.district)
            .bind(&input.address)
            .bind(&input.company)
            .bind(input.is_active)
            .bind(&input.remark)
            .fetch_one(&self.pool)
            .await?;

        Ok(customer)
    }

    /// Replaces a customer's fields.
    ///
    /// Returns `None` when no customer has this id.
    pub async fn update(&self, id: i64, input: &CustomerInput) -> DbResult<Option<Customer>> {
        debug!(id, code = %input.code, "Updating customer");

        let sql = format!(
            r#"
            UPDATE customers SET
                code = ?2,
                name = ?3,
                phone = ?4,
                province = ?5,
                city = ?6,
                district = ?7,
                address = ?8,
                company = ?9,
                is_active = ?10,
                remark = ?11,
                updated_at = datetime('now')
            WHERE id = ?1
            RETURNING {CUSTOMER_COLUMNS}
            "#
        );

        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(id)
            .bind(&input.code)
            .bind(&input.name)
            .bind(&input.phone)
            .bind(&input.province)
            .bind(&input.city)
            .bind(&input.district)
            .bind(&input.address)
            .bind(&input.company)
            .bind(input.is_active)
            .bind(&input.remark)
            .fetch_optional(&self.pool)
            .await?;

        Ok(customer)
    }

    /// Number of customers.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
