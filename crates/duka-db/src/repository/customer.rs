//! # Customer Repository
//!
//! Customers, their debt balances and the record of which payment rows
//! have already been applied to those balances.
//!
//! ## Versioned Balance Write
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    UPDATE customers SET outstanding_debt_cents = ?,                     │
//! │                         sync_version = sync_version + 1                 │
//! │     WHERE id = ? AND sync_version = ?   ← 0 rows ⇒ VersionConflict      │
//! │    INSERT INTO applied_payments (identity_key, …)  × N                  │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! The balance and its applied markers land together or not at all.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use duka_core::Customer;

/// Marks one identity key of a payment row as included in a balance write.
///
/// A row with several keys gets one marker per key, all sharing `row_key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedPayment {
    /// Rendered [`IdentityKey`](duka_core::IdentityKey), e.g. `split:s1:cash`.
    pub identity_key: String,
    /// First key of the row the marker belongs to.
    pub row_key: String,
    /// The row's contribution to the balance.
    pub amount_cents: i64,
}

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

    /// Inserts a customer as-is.
    pub async fn insert(&self, customer: &Customer) -> DbResult<()> {
        debug!(id = %customer.id, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, name, phone, outstanding_debt_cents, last_purchase_date,
                created_at, updated_at, sync_version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(customer.outstanding_debt_cents)
        .bind(customer.last_purchase_date)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .bind(customer.sync_version)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Creates a customer with a fresh id and the given opening debt.
    pub async fn create(
        &self,
        name: &str,
        phone: Option<&str>,
        opening_debt_cents: i64,
    ) -> DbResult<Customer> {
        let now = Utc::now();
        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            phone: phone.map(str::to_string),
            outstanding_debt_cents: opening_debt_cents.max(0),
            last_purchase_date: None,
            created_at: now,
            updated_at: now,
            sync_version: 0,
        };

        self.insert(&customer).await?;
        Ok(customer)
    }

    /// Gets a customer by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer: Option<Customer> = sqlx::query_as(
            r#"
            SELECT
                id, name, phone, outstanding_debt_cents, last_purchase_date,
                created_at, updated_at, sync_version
            FROM customers
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Lists customers by name.
    pub async fn list(&self) -> DbResult<Vec<Customer>> {
        let customers: Vec<Customer> = sqlx::query_as(
            r#"
            SELECT
                id, name, phone, outstanding_debt_cents, last_purchase_date,
                created_at, updated_at, sync_version
            FROM customers
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    /// Identity keys of payment rows already applied to this customer's
    /// balance.
    pub async fn applied_keys(&self, customer_id: &str) -> DbResult<HashSet<String>> {
        let keys: Vec<String> = sqlx::query_scalar(
            "SELECT identity_key FROM applied_payments WHERE customer_id = ?1",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(keys.into_iter().collect())
    }

    /// Writes a new balance conditional on `expected_version`, together with
    /// the applied markers for the payment rows it includes.
    ///
    /// ## Errors
    /// - `VersionConflict` if the customer changed since it was read
    /// - `UniqueViolation` if an identity key was already marked applied
    ///
    /// Returns the new `sync_version`.
    pub async fn apply_balance(
        &self,
        customer_id: &str,
        expected_version: i64,
        new_balance_cents: i64,
        last_purchase_date: DateTime<Utc>,
        applied: &[AppliedPayment],
    ) -> DbResult<i64> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE customers SET
                outstanding_debt_cents = ?3,
                last_purchase_date = ?4,
                updated_at = ?5,
                sync_version = sync_version + 1
            WHERE id = ?1 AND sync_version = ?2
            "#,
        )
        .bind(customer_id)
        .bind(expected_version)
        .bind(new_balance_cents.max(0))
        .bind(last_purchase_date)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::VersionConflict {
                entity: "Customer".to_string(),
                id: customer_id.to_string(),
                expected: expected_version,
            });
        }

        for marker in applied {
            sqlx::query(
                r#"
                INSERT INTO applied_payments (
                    customer_id, identity_key, row_key, amount_cents, applied_at
                ) VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(customer_id)
            .bind(&marker.identity_key)
            .bind(&marker.row_key)
            .bind(marker.amount_cents)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(
            customer_id = %customer_id,
            new_balance_cents,
            markers = applied.len(),
            "Balance written"
        );
        Ok(expected_version + 1)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
