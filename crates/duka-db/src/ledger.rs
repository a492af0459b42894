//! # Balance Ledger
//!
//! Applies debt repayments to customer balances.
//!
//! ## Record, then Apply
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  record_payment(request)                                                │
//! │       │                                                                 │
//! │       ├── validate ──────────────► InvalidAmount (nothing written)      │
//! │       │                                                                 │
//! │       ├── lock(customer_id)        one critical section per customer    │
//! │       │                                                                 │
//! │       ├── 1. write missing rows ──► PersistenceFailure { Rows }         │
//! │       │      (one transaction)                                          │
//! │       │                                                                 │
//! │       ├── 2. reconcile rows, skip rows already applied                  │
//! │       │                                                                 │
//! │       └── 3. balance + applied markers ──► PersistenceFailure {Balance} │
//! │              (one transaction, version-checked)                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A crash between 1 and 3 leaves rows without a balance effect. Retrying the
//! same [`PaymentRequest`] writes no new rows and completes step 3 exactly
//! once.
//!
//! ## Applied Markers
//! Every applied row leaves one `applied_payments` marker per merge key
//! (`split:s1:cash`, `client:c1:payment`, `id:srv-9`, ...). A row whose keys
//! include a marked one is a replay. Rows are tracked one by one, so the
//! missing half of a split payment still applies after the first half did.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError};

use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::error::{DbError, PaymentError, PaymentResult, WriteStage};
use crate::pool::Database;
use crate::repository::customer::AppliedPayment;
use duka_core::balance::{collected, payments_for_customer};
use duka_core::validation::validate_payment_amount;
use duka_core::{
    apply_payments, merge_keys, payment_contribution, reconcile, BalanceUpdate, Customer, Money,
    PaymentMethod, PaymentRequest, SaleRecord, Tender,
};

// =============================================================================
// Per-customer Locks
// =============================================================================

/// One async mutex per customer id, created on first use and dropped when
/// the last holder or waiter lets go.
#[derive(Debug, Default)]
pub struct CustomerLocks {
    inner: std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl CustomerLocks {
    /// Waits for exclusive access to `customer_id`'s balance.
    pub async fn acquire(self: &Arc<Self>, customer_id: &str) -> CustomerGuard {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(map.entry(customer_id.to_string()).or_default())
        };
        let guard = lock.lock_owned().await;

        CustomerGuard {
            guard: Some(guard),
            locks: Arc::clone(self),
            customer_id: customer_id.to_string(),
        }
    }

    /// Number of customers with a live lock entry.
    pub fn tracked(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn release(&self, customer_id: &str) {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the map's own reference left: no holder, no waiter.
        if map.get(customer_id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            map.remove(customer_id);
        }
    }
}

/// Exclusive access to one customer's balance until dropped.
#[derive(Debug)]
pub struct CustomerGuard {
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<CustomerLocks>,
    customer_id: String,
}

impl Drop for CustomerGuard {
    fn drop(&mut self) {
        self.guard.take();
        self.locks.release(&self.customer_id);
    }
}

// =============================================================================
// Balance Ledger
// =============================================================================

/// Serializes read → compute → write of customer balances.
#[derive(Debug, Clone)]
pub struct BalanceLedger {
    db: Database,
    locks: Arc<CustomerLocks>,
    max_payment: Money,
}

impl BalanceLedger {
    pub fn new(db: Database, locks: Arc<CustomerLocks>, max_payment: Money) -> Self {
        BalanceLedger {
            db,
            locks,
            max_payment,
        }
    }

    /// Ceiling for a single capture.
    pub fn max_payment(&self) -> Money {
        self.max_payment
    }

    /// Records a repayment captured at the till and applies it to the
    /// customer's balance.
    ///
    /// Safe to call again with the same request after any failure.
    ///
    /// ## Errors
    /// - `InvalidAmount` / `Invalid`: rejected before any write
    /// - `CustomerNotFound`: no such customer, nothing written
    /// - `PersistenceFailure { stage: Rows }`: no rows and no balance change
    /// - `PersistenceFailure { stage: Balance }`: rows are recorded, the
    ///   balance is not; retry the same request
    pub async fn record_payment(&self, request: &PaymentRequest) -> PaymentResult<BalanceUpdate> {
        let amount = request.validate(self.max_payment)?;

        let _guard = self.locks.acquire(&request.customer_id).await;
        let customer = self.load_customer(&request.customer_id).await?;

        let stored = self
            .db
            .sales()
            .by_client_sale_id(&request.client_sale_id)
            .await
            .map_err(PaymentError::Storage)?;

        let missing = missing_rows(request.payment_rows(), &stored);
        if !missing.is_empty() {
            self.db.sales().insert_many(&missing).await.map_err(|e| {
                warn!(
                    client_sale_id = %request.client_sale_id,
                    error = %e,
                    "Failed to record payment rows"
                );
                PaymentError::persistence(WriteStage::Rows, e)
            })?;
        }

        debug!(
            client_sale_id = %request.client_sale_id,
            amount = %amount,
            written = missing.len(),
            already_stored = stored.len(),
            "Payment rows recorded"
        );

        let mut recorded = stored;
        recorded.extend(missing);
        let payments = payments_for_customer(&reconcile(&recorded), &customer.id);

        self.apply_locked(customer, payments).await
    }

    /// Convenience for the non-split case: one method, one amount.
    ///
    /// Each call is a new capture. To retry after a failure, keep the
    /// [`PaymentRequest`] and use [`record_payment`](Self::record_payment).
    pub async fn record_single_payment(
        &self,
        customer_id: &str,
        method: PaymentMethod,
        amount: Money,
        reference: Option<&str>,
    ) -> PaymentResult<BalanceUpdate> {
        let mut request = PaymentRequest::new(
            customer_id,
            Tender::Single {
                method,
                amount_cents: amount.cents(),
            },
        );
        if let Some(reference) = reference {
            request = request.with_reference(reference);
        }
        self.record_payment(&request).await
    }

    /// Applies already-stored payment rows to the customer's balance.
    ///
    /// `payments` may contain provenance duplicates and other customers'
    /// rows; both are dropped before summing. Rows already applied are
    /// skipped, so the same set may be passed again.
    ///
    /// ## Errors
    /// - `Invalid` if a payment row carries no identifier at all: it could
    ///   never be recognised as applied
    pub async fn apply_reconciled_payments(
        &self,
        customer_id: &str,
        payments: &[SaleRecord],
    ) -> PaymentResult<BalanceUpdate> {
        let payments = payments_for_customer(&reconcile(payments), customer_id);
        if let Some(untracked) = payments.iter().find(|record| merge_keys(record).is_empty()) {
            return Err(PaymentError::Invalid(format!(
                "payment row at {} has no identifier",
                untracked.timestamp
            )));
        }
        validate_payment_amount(collected(&payments), self.max_payment)?;

        let _guard = self.locks.acquire(customer_id).await;
        let customer = self.load_customer(customer_id).await?;
        self.apply_locked(customer, payments).await
    }

    async fn load_customer(&self, customer_id: &str) -> PaymentResult<Customer> {
        self.db
            .customers()
            .get_by_id(customer_id)
            .await
            .map_err(PaymentError::Storage)?
            .ok_or_else(|| PaymentError::CustomerNotFound(customer_id.to_string()))
    }

    /// Caller holds the customer's lock; `payments` are reconciled and each
    /// has at least one merge key.
    async fn apply_locked(
        &self,
        customer: Customer,
        payments: Vec<SaleRecord>,
    ) -> PaymentResult<BalanceUpdate> {
        let current = customer.outstanding_debt();
        let applied = self
            .db
            .customers()
            .applied_keys(&customer.id)
            .await
            .map_err(PaymentError::Storage)?;

        let (pending, replayed): (Vec<SaleRecord>, Vec<SaleRecord>) = payments
            .into_iter()
            .partition(|record| !is_applied(record, &applied));

        if pending.is_empty() && !replayed.is_empty() {
            info!(
                customer_id = %customer.id,
                balance = %current,
                "Payment already applied, balance unchanged"
            );
            return Ok(BalanceUpdate::unchanged(current, collected(&replayed)));
        }

        let update = apply_payments(current, &pending);
        let markers = applied_markers(&pending);
        let last_payment = pending
            .iter()
            .map(|record| record.timestamp)
            .max()
            .unwrap_or_else(Utc::now);

        self.db
            .customers()
            .apply_balance(
                &customer.id,
                customer.sync_version,
                update.new_balance_cents,
                last_payment,
                &markers,
            )
            .await
            .map_err(|e: DbError| {
                warn!(customer_id = %customer.id, error = %e, "Failed to write balance");
                PaymentError::persistence(WriteStage::Balance, e)
            })?;

        info!(
            customer_id = %customer.id,
            previous = %update.previous(),
            collected = %update.collected(),
            new_balance = %update.new_balance(),
            applied_rows = pending.len(),
            replayed_rows = replayed.len(),
            "Balance reconciled"
        );

        if update.overpayment().is_positive() {
            warn!(
                customer_id = %customer.id,
                overpayment = %update.overpayment(),
                "Payment exceeded outstanding debt; excess not carried"
            );
        }

        Ok(update)
    }
}

/// Rows of `rows` with no stored copy yet.
///
/// A row is stored when some stored record shares one of its merge keys.
/// Split siblings share `client_sale_id`, so only their split keys count.
fn missing_rows(rows: Vec<SaleRecord>, stored: &[SaleRecord]) -> Vec<SaleRecord> {
    let stored_keys: HashSet<_> = stored.iter().flat_map(merge_keys).collect();

    rows.into_iter()
        .filter(|row| !merge_keys(row).iter().any(|key| stored_keys.contains(key)))
        .collect()
}

fn is_applied(record: &SaleRecord, applied: &HashSet<String>) -> bool {
    merge_keys(record)
        .iter()
        .any(|key| applied.contains(&key.to_string()))
}

/// One marker per merge key of each row.
fn applied_markers(payments: &[SaleRecord]) -> Vec<AppliedPayment> {
    let mut markers = Vec::new();
    for record in payments {
        let keys: Vec<String> = merge_keys(record).iter().map(ToString::to_string).collect();
        let Some(row_key) = keys.first().cloned() else {
            continue;
        };
        let amount_cents = payment_contribution(record).cents();

        markers.extend(keys.into_iter().map(|identity_key| AppliedPayment {
            identity_key,
            row_key: row_key.clone(),
            amount_cents,
        }));
    }
    markers
}

// =============================================================================
// Unit Tests
// =============================================================================
