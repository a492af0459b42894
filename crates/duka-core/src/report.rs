//! # Sales Summary
//!
//! Aggregates over reconciled sale records for the daily report. Feed it
//! the output of [`reconcile`](crate::reconcile::reconcile); on raw input an
//! offline copy and its synced twin would both be counted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::balance::payment_contribution;
use crate::money::Money;
use crate::split::group_by_split_reference;
use crate::types::SaleRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalesSummary {
    pub record_count: usize,
    pub sale_count: usize,
    pub payment_count: usize,
    /// Distinct split-tender transactions (not rows).
    pub split_transactions: usize,
    pub revenue_cents: i64,
    pub cost_cents: i64,
    pub profit_cents: i64,
    /// Debt repayments received.
    pub payments_collected_cents: i64,
    /// Product revenue per payment method; "unknown" when absent.
    pub revenue_by_method: BTreeMap<String, i64>,
}

impl SalesSummary {
    #[inline]
    pub fn revenue(&self) -> Money {
        Money::from_cents(self.revenue_cents)
    }

    #[inline]
    pub fn payments_collected(&self) -> Money {
        Money::from_cents(self.payments_collected_cents)
    }
}

/// Summarizes reconciled records.
pub fn summarize(records: &[SaleRecord]) -> SalesSummary {
    let mut summary = SalesSummary {
        record_count: records.len(),
        split_transactions: group_by_split_reference(records).len(),
        ..SalesSummary::default()
    };

    for record in records {
        if record.is_payment() {
            summary.payment_count += 1;
            summary.payments_collected_cents += payment_contribution(record).cents();
            continue;
        }

        summary.sale_count += 1;
        summary.revenue_cents += record.total_amount_cents;
        summary.cost_cents += record.cost_price_cents * record.quantity;
        summary.profit_cents += record.profit_cents;

        let method = record
            .payment_method
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        *summary.revenue_by_method.entry(method).or_default() += record.total_amount_cents;
    }

    summary
}

// =============================================================================
// Unit Tests
// =============================================================================
