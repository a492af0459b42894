//! # Domain Types
//!
//! Core domain types used throughout Duka.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────────┐   ┌─────────────────┐   ┌─────────────────┐   │
//! │  │    SaleRecord       │   │    Customer     │   │ PaymentMethod   │   │
//! │  │  ─────────────────  │   │  ─────────────  │   │  ─────────────  │   │
//! │  │  id (remote)        │   │  id             │   │  Cash           │   │
//! │  │  client_sale_id     │   │  outstanding_   │   │  Mpesa          │   │
//! │  │  offline_id         │   │    debt_cents   │   │  Debt           │   │
//! │  │  product_id         │   │  last_purchase_ │   │  Split (marker) │   │
//! │  │  payment_details    │   │    date         │   └─────────────────┘   │
//! │  │  timestamp, synced  │   │  sync_version   │                          │
//! │  └─────────────────────┘   └─────────────────┘                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Provenance
//! A sale record is never edited. When the remote store confirms an offline
//! capture it hands back a second, `synced` copy of the same logical
//! transaction; both copies sit in the working set until
//! [`reconcile`](crate::reconcile::reconcile) folds them together.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::PAYMENT_PRODUCT_ID;

// =============================================================================
// Payment Method
// =============================================================================

/// How a sale record was tendered.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash.
    Cash,
    /// Mobile money (M-Pesa).
    #[serde(alias = "mobile_money")]
    Mpesa,
    /// Added to the customer's tab.
    Debt,
    /// Marker for a split-tender transaction.
    Split,
}

impl PaymentMethod {
    /// Wire name, as stored in the database and used in identity keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Mpesa => "mpesa",
            PaymentMethod::Debt => "debt",
            PaymentMethod::Split => "split",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "mpesa" | "m-pesa" | "mobile_money" | "mobile-money" => Ok(PaymentMethod::Mpesa),
            "debt" | "credit" => Ok(PaymentMethod::Debt),
            "split" => Ok(PaymentMethod::Split),
            _ => Err(ValidationError::NotAllowed {
                field: "payment_method".to_string(),
                allowed: vec![
                    "cash".to_string(),
                    "mpesa".to_string(),
                    "debt".to_string(),
                    "split".to_string(),
                ],
            }),
        }
    }
}

// =============================================================================
// Payment Details
// =============================================================================

/// Structured payload attached to a sale record.
///
/// The remote store treats this as opaque JSON. Only the fields below are
/// read here; unknown keys are ignored on deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentDetails {
    /// Set on every row of a split-tender transaction.
    pub split_payment: bool,

    /// Correlates the sibling rows of one split-tender transaction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_reference: Option<String>,

    /// External reference (M-Pesa confirmation code, etc.).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

// =============================================================================
// Provenance
// =============================================================================

/// Where a sale record copy came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Captured without connectivity, not yet confirmed.
    Offline,
    /// Captured online, not yet confirmed.
    Local,
    /// Confirmed and returned by the remote store.
    Synced,
}

// =============================================================================
// Sale Record
// =============================================================================

/// One financial line item: a product sale or a payment against debt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleRecord {
    /// Remote store id; absent before sync.
    #[serde(default)]
    pub id: Option<String>,

    /// Assigned on the originating device at capture, never reassigned.
    #[serde(default)]
    pub client_sale_id: Option<String>,

    /// Assigned only while offline.
    #[serde(default)]
    pub offline_id: Option<String>,

    /// Product or line type; [`PAYMENT_PRODUCT_ID`] marks a payment.
    #[serde(default)]
    pub product_id: Option<String>,

    /// Product name at time of sale (frozen).
    #[serde(default)]
    pub product_name: String,

    #[serde(default)]
    pub customer_id: Option<String>,

    #[serde(default)]
    pub quantity: i64,

    /// Negative for payment rows.
    #[serde(default)]
    pub unit_price_cents: i64,

    /// Negative for payment rows.
    #[serde(default)]
    pub total_amount_cents: i64,

    #[serde(default)]
    pub cost_price_cents: i64,

    #[serde(default)]
    pub profit_cents: i64,

    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,

    #[serde(default)]
    pub payment_details: PaymentDetails,

    /// When the transaction occurred. Authoritative for ordering.
    #[ts(as = "String")]
    pub timestamp: DateTime<Utc>,

    /// True once the remote store has confirmed and returned this copy.
    #[serde(default)]
    pub synced: bool,
}

impl SaleRecord {
    /// Creates an empty, unsynced record at `timestamp` with no identifiers.
    pub fn at(timestamp: DateTime<Utc>) -> Self {
        SaleRecord {
            id: None,
            client_sale_id: None,
            offline_id: None,
            product_id: None,
            product_name: String::new(),
            customer_id: None,
            quantity: 1,
            unit_price_cents: 0,
            total_amount_cents: 0,
            cost_price_cents: 0,
            profit_cents: 0,
            payment_method: None,
            payment_details: PaymentDetails::default(),
            timestamp,
            synced: false,
        }
    }

    /// Creates an unsynced record for `product_id` at `timestamp`.
    pub fn new(product_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        let mut record = SaleRecord::at(timestamp);
        record.product_id = Some(product_id.into());
        record
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_client_sale_id(mut self, client_sale_id: impl Into<String>) -> Self {
        self.client_sale_id = Some(client_sale_id.into());
        self
    }

    pub fn with_offline_id(mut self, offline_id: impl Into<String>) -> Self {
        self.offline_id = Some(offline_id.into());
        self
    }

    pub fn with_customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    pub fn with_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = Some(method);
        self
    }

    /// Marks the record as one row of the split-tender transaction `reference`.
    pub fn with_split_reference(mut self, reference: impl Into<String>) -> Self {
        self.payment_details.split_payment = true;
        self.payment_details.split_reference = Some(reference.into());
        self
    }

    /// Sets a single-unit line of `total` (unit price equals total).
    pub fn with_total(mut self, total: Money) -> Self {
        self.quantity = 1;
        self.unit_price_cents = total.cents();
        self.total_amount_cents = total.cents();
        self
    }

    /// Marks this copy as confirmed by the remote store.
    pub fn synced(mut self) -> Self {
        self.synced = true;
        self
    }

    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }

    #[inline]
    pub fn profit(&self) -> Money {
        Money::from_cents(self.profit_cents)
    }

    /// True for debt repayment rows (the payment pseudo-product).
    pub fn is_payment(&self) -> bool {
        self.product_id.as_deref() == Some(PAYMENT_PRODUCT_ID)
    }

    pub fn provenance(&self) -> Provenance {
        if self.synced {
            Provenance::Synced
        } else if self.offline_id.is_some() {
            Provenance::Offline
        } else {
            Provenance::Local
        }
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer with a running debt balance.
///
/// Only the balance ledger mutates `outstanding_debt_cents` and
/// `last_purchase_date`; the reconciler never touches customers.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    /// Never negative.
    pub outstanding_debt_cents: i64,
    #[ts(as = "Option<String>")]
    pub last_purchase_date: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    /// Bumped on every balance write; used for optimistic concurrency.
    pub sync_version: i64,
}

impl Customer {
    #[inline]
    pub fn outstanding_debt(&self) -> Money {
        Money::from_cents(self.outstanding_debt_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_method_parsing() {
        assert_eq!("cash".parse::<PaymentMethod>().unwrap(), PaymentMethod::Cash);
        assert_eq!("M-Pesa".parse::<PaymentMethod>().unwrap(), PaymentMethod::Mpesa);
        assert_eq!(
            "mobile-money".parse::<PaymentMethod>().unwrap(),
            PaymentMethod::Mpesa
        );
        assert_eq!("split".parse::<PaymentMethod>().unwrap(), PaymentMethod::Split);
        assert!("cheque".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_payment_details_wire_format() {
        let details: PaymentDetails = serde_json::from_str(
            r#"{"splitPayment":true,"splitReference":"split_1","reference":"QK12","till":"55"}"#,
        )
        .unwrap();
        assert!(details.split_payment);
        assert_eq!(details.split_reference.as_deref(), Some("split_1"));
        assert_eq!(details.reference.as_deref(), Some("QK12"));

        let empty: PaymentDetails = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, PaymentDetails::default());
        assert_eq!(serde_json::to_string(&empty).unwrap(), r#"{"splitPayment":false}"#);
    }

    #[test]
    fn test_sale_record_from_remote_json() {
        let record: SaleRecord = serde_json::from_str(
            r#"{
                "id": "srv1",
                "client_sale_id": "A",
                "product_id": "p1",
                "total_amount_cents": 500,
                "payment_method": "mpesa",
                "timestamp": "2026-01-31T10:00:00Z",
                "synced": true
            }"#,
        )
        .unwrap();
        assert_eq!(record.payment_method, Some(PaymentMethod::Mpesa));
        assert_eq!(record.provenance(), Provenance::Synced);
        assert!(!record.is_payment());
    }

    #[test]
    fn test_provenance() {
        let now = Utc::now();
        assert_eq!(SaleRecord::new("p1", now).provenance(), Provenance::Local);
        assert_eq!(
            SaleRecord::new("p1", now).with_offline_id("off-1").provenance(),
            Provenance::Offline
        );
        assert_eq!(
            SaleRecord::new("p1", now)
                .with_offline_id("off-1")
                .with_id("srv")
                .synced()
                .provenance(),
            Provenance::Synced
        );
    }

    #[test]
    fn test_is_payment() {
        let now = Utc::now();
        assert!(SaleRecord::new(PAYMENT_PRODUCT_ID, now).is_payment());
        assert!(!SaleRecord::at(now).is_payment());
    }
}
