//! # Sale Record Repository
//!
//! Append-only storage for sale records.
//!
//! ## Storage Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Record Storage                               │
//! │                                                                         │
//! │  offline capture  ──► row 1 { offline_id, synced = 0 }                  │
//! │  remote returns   ──► row 2 { id = "srv…", synced = 1 }                 │
//! │                                                                         │
//! │  Rows are never updated. Readers call reconcile() to fold row 1         │
//! │  into row 2.                                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use duka_core::{reconcile, PaymentDetails, PaymentMethod, SaleRecord, PAYMENT_PRODUCT_ID};

const SELECT_COLUMNS: &str = r#"
    SELECT
        row_id, id, client_sale_id, offline_id, product_id, product_name,
        customer_id, quantity, unit_price_cents, total_amount_cents,
        cost_price_cents, profit_cents, payment_method, payment_details,
        timestamp, synced
    FROM sale_records
"#;

/// Raw `sale_records` row.
///
/// `payment_details` is stored as JSON text; see [`SaleRecordRow::into_record`].
#[derive(Debug, sqlx::FromRow)]
struct SaleRecordRow {
    row_id: i64,
    id: Option<String>,
    client_sale_id: Option<String>,
    offline_id: Option<String>,
    product_id: Option<String>,
    product_name: String,
    customer_id: Option<String>,
    quantity: i64,
    unit_price_cents: i64,
    total_amount_cents: i64,
    cost_price_cents: i64,
    profit_cents: i64,
    payment_method: Option<PaymentMethod>,
    payment_details: String,
    timestamp: DateTime<Utc>,
    synced: bool,
}

impl SaleRecordRow {
    /// Unreadable details degrade to the default rather than failing the read.
    fn into_record(self) -> SaleRecord {
        let payment_details = serde_json::from_str::<PaymentDetails>(&self.payment_details)
            .unwrap_or_else(|e| {
                warn!(row_id = self.row_id, error = %e, "Unreadable payment_details, using defaults");
                PaymentDetails::default()
            });

        SaleRecord {
            id: self.id,
            client_sale_id: self.client_sale_id,
            offline_id: self.offline_id,
            product_id: self.product_id,
            product_name: self.product_name,
            customer_id: self.customer_id,
            quantity: self.quantity,
            unit_price_cents: self.unit_price_cents,
            total_amount_cents: self.total_amount_cents,
            cost_price_cents: self.cost_price_cents,
            profit_cents: self.profit_cents,
            payment_method: self.payment_method,
            payment_details,
            timestamp: self.timestamp,
            synced: self.synced,
        }
    }
}

/// Repository for sale record operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Appends one record. Returns its surrogate `row_id`.
    pub async fn insert(&self, record: &SaleRecord) -> DbResult<i64> {
        insert_record(&self.pool, record).await
    }

    /// Appends several records in one transaction (all or nothing).
    pub async fn insert_many(&self, records: &[SaleRecord]) -> DbResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        for record in records {
            insert_record(&mut *tx, record).await?;
        }
        tx.commit().await?;

        debug!(count = records.len(), "Inserted sale records");
        Ok(records.len())
    }

    /// Every stored row, in insertion order.
    pub async fn list_all(&self) -> DbResult<Vec<SaleRecord>> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY row_id");
        let rows: Vec<SaleRecordRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(SaleRecordRow::into_record).collect())
    }

    /// Every stored row attributed to `customer_id`, in insertion order.
    pub async fn list_for_customer(&self, customer_id: &str) -> DbResult<Vec<SaleRecord>> {
        let sql = format!("{SELECT_COLUMNS} WHERE customer_id = ?1 ORDER BY row_id");
        let rows: Vec<SaleRecordRow> = sqlx::query_as(&sql)
            .bind(customer_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(SaleRecordRow::into_record).collect())
    }

    /// Payment rows (the payment pseudo-product) for `customer_id`.
    pub async fn payments_for_customer(&self, customer_id: &str) -> DbResult<Vec<SaleRecord>> {
        let sql = format!(
            "{SELECT_COLUMNS} WHERE customer_id = ?1 AND product_id = ?2 ORDER BY row_id"
        );
        let rows: Vec<SaleRecordRow> = sqlx::query_as(&sql)
            .bind(customer_id)
            .bind(PAYMENT_PRODUCT_ID)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(SaleRecordRow::into_record).collect())
    }

    /// All copies of one logical capture, including split siblings.
    pub async fn by_client_sale_id(&self, client_sale_id: &str) -> DbResult<Vec<SaleRecord>> {
        let sql = format!("{SELECT_COLUMNS} WHERE client_sale_id = ?1 ORDER BY row_id");
        let rows: Vec<SaleRecordRow> = sqlx::query_as(&sql)
            .bind(client_sale_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(SaleRecordRow::into_record).collect())
    }

    /// Stored rows, optionally for one customer, with provenance duplicates
    /// folded. Newest first.
    pub async fn reconciled(&self, customer_id: Option<&str>) -> DbResult<Vec<SaleRecord>> {
        let raw = match customer_id {
            Some(id) => self.list_for_customer(id).await?,
            None => self.list_all().await?,
        };
        Ok(reconcile(&raw))
    }

    /// Number of stored rows (raw, before reconciliation).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sale_records")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

async fn insert_record<'e, E>(executor: E, record: &SaleRecord) -> DbResult<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let details = serde_json::to_string(&record.payment_details)
        .map_err(|e| DbError::Internal(e.to_string()))?;

    let result = sqlx::query(
        r#"
        INSERT INTO sale_records (
            id, client_sale_id, offline_id, product_id, product_name,
            customer_id, quantity, unit_price_cents, total_amount_cents,
            cost_price_cents, profit_cents, payment_method, payment_details,
            timestamp, synced, recorded_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5,
            ?6, ?7, ?8, ?9,
            ?10, ?11, ?12, ?13,
            ?14, ?15, ?16
        )
        "#,
    )
    .bind(&record.id)
    .bind(&record.client_sale_id)
    .bind(&record.offline_id)
    .bind(&record.product_id)
    .bind(&record.product_name)
    .bind(&record.customer_id)
    .bind(record.quantity)
    .bind(record.unit_price_cents)
    .bind(record.total_amount_cents)
    .bind(record.cost_price_cents)
    .bind(record.profit_cents)
    .bind(record.payment_method)
    .bind(details)
    .bind(record.timestamp)
    .bind(record.synced)
    .bind(Utc::now())
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};
    use duka_core::{Money, PaymentMethod, SaleRecord, PAYMENT_PRODUCT_ID};
    use chrono::{Duration, Utc};

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let db = setup().await;
        let record = SaleRecord::new(PAYMENT_PRODUCT_ID, Utc::now())
            .with_client_sale_id("c1")
            .with_customer("cust-1")
            .with_method(PaymentMethod::Mpesa)
            .with_split_reference("split_c1")
            .with_total(Money::from_cents(-300));

        db.sales().insert(&record).await.unwrap();

        let stored = db.sales().by_client_sale_id("c1").await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].payment_method, Some(PaymentMethod::Mpesa));
        assert_eq!(stored[0].payment_details, record.payment_details);
        assert_eq!(stored[0].total_amount_cents, -300);
        assert!(!stored[0].synced);
    }

    #[tokio::test]
    async fn test_synced_copy_is_a_second_row() {
        let db = setup().await;
        let offline = SaleRecord::new("p1", Utc::now())
            .with_client_sale_id("A")
            .with_offline_id("offline_1")
            .with_total(Money::from_cents(500));
        let synced = offline.clone().with_id("srv1").synced();

        db.sales().insert_many(&[offline, synced]).await.unwrap();

        assert_eq!(db.sales().count().await.unwrap(), 2);
        let reconciled = db.sales().reconciled(None).await.unwrap();
        assert_eq!(reconciled.len(), 1);
        assert_eq!(reconciled[0].id.as_deref(), Some("srv1"));
    }

    #[tokio::test]
    async fn test_payments_for_customer_filters_products() {
        let db = setup().await;
        let now = Utc::now();
        let sale = SaleRecord::new("p1", now)
            .with_customer("cust-1")
            .with_total(Money::from_cents(900));
        let payment = SaleRecord::new(PAYMENT_PRODUCT_ID, now + Duration::seconds(1))
            .with_customer("cust-1")
            .with_method(PaymentMethod::Cash)
            .with_total(Money::from_cents(-400));
        let elsewhere = payment.clone().with_customer("cust-2");

        db.sales().insert_many(&[sale, payment, elsewhere]).await.unwrap();

        assert_eq!(db.sales().list_for_customer("cust-1").await.unwrap().len(), 2);
        let payments = db.sales().payments_for_customer("cust-1").await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].total_amount_cents, -400);
    }

    #[tokio::test]
    async fn test_unreadable_details_degrade_to_default() {
        let db = setup().await;
        sqlx::query(
            "INSERT INTO sale_records (product_name, payment_details, timestamp, recorded_at)
             VALUES ('legacy', 'not json', ?1, ?1)",
        )
        .bind(Utc::now())
        .execute(db.pool())
        .await
        .unwrap();

        let records = db.sales().list_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(!records[0].payment_details.split_payment);
        assert_eq!(records[0].product_id, None);
    }

    #[tokio::test]
    async fn test_insert_many_empty() {
        let db = setup().await;
        assert_eq!(db.sales().insert_many(&[]).await.unwrap(), 0);
    }
}
