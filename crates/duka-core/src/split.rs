//! # Split-Tender Grouping
//!
//! A split-tender transaction is one logical payment spread across several
//! methods (e.g. part cash, part M-Pesa). It is stored as one sale record
//! per method, all sharing a `splitReference` in their payment details.
//!
//! ```text
//! SplitPaymentData { cash: 200, mpesa: 100, discount: 50 }
//!        │
//!        ▼  tendered_lines()   (discount dropped, amounts > 0 only)
//! ┌──────────────────────────┐ ┌──────────────────────────┐
//! │ row: cash   -200  ref=s1 │ │ row: mpesa  -100  ref=s1 │
//! └──────────────────────────┘ └──────────────────────────┘
//! ```
//!
//! Everything here is a pure predicate or extractor.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{PaymentMethod, SaleRecord};

// =============================================================================
// Classification
// =============================================================================

/// Returns true if `record` is one row of a split-tender transaction.
pub fn is_split_payment(record: &SaleRecord) -> bool {
    record.payment_method == Some(PaymentMethod::Split)
        || record.payment_details.split_payment
        || split_reference(record).is_some()
}

/// Extracts the split reference, ignoring blank values.
pub fn split_reference(record: &SaleRecord) -> Option<&str> {
    record
        .payment_details
        .split_reference
        .as_deref()
        .map(str::trim)
        .filter(|reference| !reference.is_empty())
}

/// Groups split rows by their reference. Non-split rows are skipped.
pub fn group_by_split_reference(records: &[SaleRecord]) -> BTreeMap<&str, Vec<&SaleRecord>> {
    let mut groups: BTreeMap<&str, Vec<&SaleRecord>> = BTreeMap::new();
    for record in records {
        if !is_split_payment(record) {
            continue;
        }
        if let Some(reference) = split_reference(record) {
            groups.entry(reference).or_default().push(record);
        }
    }
    groups
}

// =============================================================================
// Split Breakdown
// =============================================================================

/// One component of a split breakdown as entered by the cashier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SplitComponent {
    Cash,
    Mpesa,
    Debt,
    /// Reduces the tendered total. Never becomes a row.
    Discount,
}

impl SplitComponent {
    /// The payment method a row for this component carries, if any.
    pub fn payment_method(&self) -> Option<PaymentMethod> {
        match self {
            SplitComponent::Cash => Some(PaymentMethod::Cash),
            SplitComponent::Mpesa => Some(PaymentMethod::Mpesa),
            SplitComponent::Debt => Some(PaymentMethod::Debt),
            SplitComponent::Discount => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SplitLine {
    pub component: SplitComponent,
    pub amount_cents: i64,
}

/// Cashier-entered breakdown of a split-tender payment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SplitPaymentData {
    pub lines: Vec<SplitLine>,
}

impl SplitPaymentData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a component line.
    pub fn with(mut self, component: SplitComponent, amount: Money) -> Self {
        self.lines.push(SplitLine {
            component,
            amount_cents: amount.cents(),
        });
        self
    }

    /// Amount per payment method that becomes a row.
    ///
    /// Discount and non-positive lines are dropped. Repeated components are
    /// summed so each method yields exactly one row.
    pub fn tendered_lines(&self) -> Vec<(PaymentMethod, Money)> {
        let mut by_method: BTreeMap<PaymentMethod, Money> = BTreeMap::new();
        for line in &self.lines {
            let Some(method) = line.component.payment_method() else {
                continue;
            };
            let amount = Money::from_cents(line.amount_cents);
            if amount.is_positive() {
                *by_method.entry(method).or_default() += amount;
            }
        }
        by_method.into_iter().collect()
    }

    /// Total collected across tendered lines (discount excluded).
    pub fn collected(&self) -> Money {
        self.tendered_lines().iter().map(|(_, amount)| *amount).sum()
    }

    /// Total discount entered.
    pub fn discount(&self) -> Money {
        self.lines
            .iter()
            .filter(|line| line.component == SplitComponent::Discount)
            .map(|line| Money::from_cents(line.amount_cents.max(0)))
            .sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_split_classification() {
        let now = Utc::now();

        let plain = SaleRecord::new("p1", now).with_method(PaymentMethod::Cash);
        assert!(!is_split_payment(&plain));
        assert_eq!(split_reference(&plain), None);

        let row = SaleRecord::at(now)
            .with_method(PaymentMethod::Cash)
            .with_split_reference("s1");
        assert!(is_split_payment(&row));
        assert_eq!(split_reference(&row), Some("s1"));

        let marker_only = SaleRecord::at(now).with_method(PaymentMethod::Split);
        assert!(is_split_payment(&marker_only));
        assert_eq!(split_reference(&marker_only), None);
    }

    #[test]
    fn test_blank_reference_is_ignored() {
        let row = SaleRecord::at(Utc::now()).with_split_reference("   ");
        assert_eq!(split_reference(&row), None);
    }

    #[test]
    fn test_tendered_lines_drop_discount() {
        let data = SplitPaymentData::new()
            .with(SplitComponent::Cash, Money::from_cents(200))
            .with(SplitComponent::Mpesa, Money::from_cents(100))
            .with(SplitComponent::Discount, Money::from_cents(50))
            .with(SplitComponent::Debt, Money::zero());

        let lines = data.tendered_lines();
        assert_eq!(
            lines,
            vec![
                (PaymentMethod::Cash, Money::from_cents(200)),
                (PaymentMethod::Mpesa, Money::from_cents(100)),
            ]
        );
        assert_eq!(data.collected().cents(), 300);
        assert_eq!(data.discount().cents(), 50);
    }

    #[test]
    fn test_repeated_component_is_summed() {
        let data = SplitPaymentData::new()
            .with(SplitComponent::Cash, Money::from_cents(150))
            .with(SplitComponent::Cash, Money::from_cents(50));
        assert_eq!(
            data.tendered_lines(),
            vec![(PaymentMethod::Cash, Money::from_cents(200))]
        );
    }

    #[test]
    fn test_group_by_split_reference() {
        let now = Utc::now();
        let records = vec![
            SaleRecord::at(now).with_method(PaymentMethod::Cash).with_split_reference("s1"),
            SaleRecord::at(now).with_method(PaymentMethod::Mpesa).with_split_reference("s1"),
            SaleRecord::at(now).with_method(PaymentMethod::Cash).with_split_reference("s2"),
            SaleRecord::new("p1", now),
        ];
        let groups = group_by_split_reference(&records);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["s1"].len(), 2);
        assert_eq!(groups["s2"].len(), 1);
    }
}
