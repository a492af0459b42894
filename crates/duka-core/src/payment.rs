//! # Payment Capture
//!
//! Turns a debt repayment entered at the till into the immutable sale
//! records that get stored and synced.
//!
//! ## Identity at Capture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PaymentRequest::new()                                                  │
//! │       │   client_sale_id = Uuid::new_v4()   ← assigned ONCE, here       │
//! │       ▼                                                                 │
//! │  payment_rows()   ← deterministic: same request ⇒ same rows             │
//! │       │                                                                 │
//! │       ├── attempt 1 ──► network error                                   │
//! │       └── attempt 2 ──► same client_sale_id, same split reference       │
//! │                          ⇒ reconcile() recognises the retry             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Persist the request (or at least its `client_sale_id`) before the first
//! attempt and rebuild from it on retry; never call `new()` again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::split::SplitPaymentData;
use crate::types::{PaymentDetails, PaymentMethod, SaleRecord};
use crate::validation::{validate_client_sale_id, validate_customer_id, validate_payment_amount};
use crate::PAYMENT_PRODUCT_ID;

// =============================================================================
// Tender
// =============================================================================

/// How the customer is paying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Tender {
    /// One method, one row.
    Single {
        method: PaymentMethod,
        amount_cents: i64,
    },
    /// Several methods, one row per tendered method.
    Split(SplitPaymentData),
}

impl Tender {
    pub fn cash(amount: Money) -> Self {
        Tender::Single {
            method: PaymentMethod::Cash,
            amount_cents: amount.cents(),
        }
    }

    pub fn mpesa(amount: Money) -> Self {
        Tender::Single {
            method: PaymentMethod::Mpesa,
            amount_cents: amount.cents(),
        }
    }

    /// Amount that reduces debt. Split discounts are excluded.
    pub fn collected(&self) -> Money {
        match self {
            Tender::Single { amount_cents, .. } => Money::from_cents(*amount_cents),
            Tender::Split(data) => data.collected(),
        }
    }
}

// =============================================================================
// Payment Request
// =============================================================================

/// A debt repayment captured at the till, before it is written anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentRequest {
    pub client_sale_id: String,
    pub offline_id: Option<String>,
    pub customer_id: String,
    pub tender: Tender,
    /// M-Pesa code or other external reference.
    pub reference: Option<String>,
    #[ts(as = "String")]
    pub timestamp: DateTime<Utc>,
}

impl PaymentRequest {
    /// Captures a new payment with a fresh `client_sale_id`.
    pub fn new(customer_id: impl Into<String>, tender: Tender) -> Self {
        PaymentRequest {
            client_sale_id: Uuid::new_v4().to_string(),
            offline_id: None,
            customer_id: customer_id.into(),
            tender,
            reference: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        let reference = reference.into();
        self.reference = (!reference.trim().is_empty()).then_some(reference);
        self
    }

    /// Marks the capture as made without connectivity.
    pub fn offline(mut self) -> Self {
        self.offline_id = Some(format!("offline_{}", Uuid::new_v4()));
        self
    }

    /// Shared reference for the rows of a split tender.
    ///
    /// Derived from `client_sale_id` so a retry produces the same value.
    pub fn split_reference(&self) -> Option<String> {
        match self.tender {
            Tender::Split(_) => Some(format!("split_{}", self.client_sale_id)),
            Tender::Single { .. } => None,
        }
    }

    /// Checks the request before any write and returns the amount collected.
    ///
    /// ## Errors
    /// - `InvalidAmount` if the collected amount is non-positive or above
    ///   `ceiling` (a split of only discounts collects nothing)
    /// - `Validation` for a missing customer, a malformed `client_sale_id`,
    ///   or a single tender using `debt`/`split` as its method
    pub fn validate(&self, ceiling: Money) -> CoreResult<Money> {
        validate_customer_id(&self.customer_id)?;
        validate_client_sale_id(&self.client_sale_id)?;

        if let Tender::Single { method, .. } = &self.tender {
            if !matches!(method, PaymentMethod::Cash | PaymentMethod::Mpesa) {
                return Err(CoreError::Validation(ValidationError::NotAllowed {
                    field: "payment_method".to_string(),
                    allowed: vec!["cash".to_string(), "mpesa".to_string()],
                }));
            }
        }

        let collected = self.tender.collected();
        validate_payment_amount(collected, ceiling)?;
        Ok(collected)
    }

    /// Expands the request into payment sale records.
    ///
    /// Single tender: one row. Split tender: one row per tendered method,
    /// all sharing [`split_reference`](Self::split_reference); discount
    /// lines produce no row. Rows are unsynced and carry no remote id.
    pub fn payment_rows(&self) -> Vec<SaleRecord> {
        match &self.tender {
            Tender::Single {
                method,
                amount_cents,
            } => {
                let details = PaymentDetails {
                    reference: self.reference.clone(),
                    ..PaymentDetails::default()
                };
                vec![self.row(
                    "Payment Received".to_string(),
                    *method,
                    Money::from_cents(*amount_cents),
                    details,
                )]
            }
            Tender::Split(data) => {
                let split_reference = self.split_reference();
                data.tendered_lines()
                    .into_iter()
                    .map(|(method, amount)| {
                        let details = PaymentDetails {
                            split_payment: true,
                            split_reference: split_reference.clone(),
                            reference: match method {
                                PaymentMethod::Mpesa => self.reference.clone(),
                                _ => None,
                            },
                        };
                        let name = format!("Payment Received ({})", method.as_str().to_uppercase());
                        self.row(name, method, amount, details)
                    })
                    .collect()
            }
        }
    }

    fn row(
        &self,
        product_name: String,
        method: PaymentMethod,
        amount: Money,
        details: PaymentDetails,
    ) -> SaleRecord {
        let credit = -amount.abs();
        SaleRecord {
            id: None,
            client_sale_id: Some(self.client_sale_id.clone()),
            offline_id: self.offline_id.clone(),
            product_id: Some(PAYMENT_PRODUCT_ID.to_string()),
            product_name,
            customer_id: Some(self.customer_id.clone()),
            quantity: 1,
            unit_price_cents: credit.cents(),
            total_amount_cents: credit.cents(),
            cost_price_cents: 0,
            profit_cents: 0,
            payment_method: Some(method),
            payment_details: details,
            timestamp: self.timestamp,
            synced: false,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
