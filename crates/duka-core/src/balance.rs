//! # Balance Arithmetic
//!
//! Pure half of balance reconciliation. The ledger in `duka-db` does the
//! locking and the writes; this module only answers "given this debt and
//! these payments, what is the new debt?".
//!
//! ```text
//! new_debt = max(0, current_debt − Σ |total_amount| of payment rows)
//! ```
//!
//! A split payment contributes the sum of its method rows. Each row counts
//! once only if the input already went through [`reconcile`](crate::reconcile),
//! so callers pass reconciled records.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::SaleRecord;

/// Outcome of applying payments to a customer's balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BalanceUpdate {
    pub previous_cents: i64,
    pub collected_cents: i64,
    pub new_balance_cents: i64,
    /// True when the payment had already been applied and nothing changed.
    pub replayed: bool,
}

impl BalanceUpdate {
    #[inline]
    pub fn previous(&self) -> Money {
        Money::from_cents(self.previous_cents)
    }

    #[inline]
    pub fn collected(&self) -> Money {
        Money::from_cents(self.collected_cents)
    }

    #[inline]
    pub fn new_balance(&self) -> Money {
        Money::from_cents(self.new_balance_cents)
    }

    /// Part of the payment that exceeded the debt and was not carried.
    pub fn overpayment(&self) -> Money {
        let applied = self.previous() - self.new_balance();
        (self.collected() - applied).max(Money::zero())
    }

    /// An update that changes nothing (the payment was already applied).
    pub fn unchanged(current: Money, collected: Money) -> Self {
        BalanceUpdate {
            previous_cents: current.cents(),
            collected_cents: collected.cents(),
            new_balance_cents: current.cents(),
            replayed: true,
        }
    }
}

/// How much one row reduces debt: the absolute value of a negative total.
///
/// Rows with a non-negative total (product sales) contribute nothing.
pub fn payment_contribution(record: &SaleRecord) -> Money {
    let total = record.total_amount();
    if total.is_negative() {
        total.abs()
    } else {
        Money::zero()
    }
}

/// Sum of contributions over `payments`.
pub fn collected(payments: &[SaleRecord]) -> Money {
    payments.iter().map(payment_contribution).sum()
}

/// Applies reconciled payment rows to `current` debt.
pub fn apply_payments(current: Money, payments: &[SaleRecord]) -> BalanceUpdate {
    let collected = collected(payments);
    let new_balance = current.saturating_reduce(collected);

    BalanceUpdate {
        previous_cents: current.cents(),
        collected_cents: collected.cents(),
        new_balance_cents: new_balance.cents(),
        replayed: false,
    }
}

/// Payment rows attributable to `customer_id`, cloned out of `records`.
pub fn payments_for_customer(records: &[SaleRecord], customer_id: &str) -> Vec<SaleRecord> {
    records
        .iter()
        .filter(|record| record.is_payment())
        .filter(|record| record.customer_id.as_deref() == Some(customer_id))
        .cloned()
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::reconcile;
    use crate::types::PaymentMethod;
    use crate::PAYMENT_PRODUCT_ID;
    use chrono::Utc;

    fn payment(cents: i64) -> SaleRecord {
        SaleRecord::new(PAYMENT_PRODUCT_ID, Utc::now())
            .with_customer("cust-1")
            .with_method(PaymentMethod::Cash)
            .with_total(Money::from_cents(-cents))
    }

    #[test]
    fn test_reduces_debt() {
        let update = apply_payments(
            Money::from_cents(1000),
            &[payment(200), payment(100)],
        );
        assert_eq!(update.new_balance_cents, 700);
        assert_eq!(update.collected_cents, 300);
        assert_eq!(update.overpayment(), Money::zero());
        assert!(!update.replayed);
    }

    #[test]
    fn test_never_negative() {
        let update = apply_payments(Money::from_cents(1000), &[payment(1500)]);
        assert_eq!(update.new_balance_cents, 0);
        assert_eq!(update.overpayment().cents(), 500);
    }

    #[test]
    fn test_non_negative_rows_contribute_nothing() {
        let sale = SaleRecord::new("p1", Utc::now()).with_total(Money::from_cents(900));
        assert_eq!(payment_contribution(&sale), Money::zero());
        assert_eq!(payment_contribution(&payment(250)).cents(), 250);
    }

    #[test]
    fn test_split_rows_counted_once_after_reconcile() {
        let now = Utc::now();
        let cash = SaleRecord::at(now)
            .with_method(PaymentMethod::Cash)
            .with_split_reference("s1")
            .with_total(Money::from_cents(-200));
        let mpesa = SaleRecord::at(now)
            .with_method(PaymentMethod::Mpesa)
            .with_split_reference("s1")
            .with_total(Money::from_cents(-100));
        let cash_synced = cash.clone().with_id("srv").synced();

        let rows = reconcile(&[cash, mpesa, cash_synced]);
        let update = apply_payments(Money::from_cents(1000), &rows);
        assert_eq!(update.collected_cents, 300);
        assert_eq!(update.new_balance_cents, 700);
    }

    #[test]
    fn test_payments_for_customer() {
        let other = payment(50).with_customer("cust-2");
        let sale = SaleRecord::new("p1", Utc::now()).with_customer("cust-1");
        let records = vec![payment(100), other, sale];

        let mine = payments_for_customer(&records, "cust-1");
        assert_eq!(mine.len(), 1);
        assert_eq!(collected(&mine).cents(), 100);
    }

    #[test]
    fn test_unchanged() {
        let update = BalanceUpdate::unchanged(Money::from_cents(400), Money::from_cents(100));
        assert!(update.replayed);
        assert_eq!(update.new_balance(), update.previous());
    }
}
