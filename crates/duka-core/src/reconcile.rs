//! # Deduplication Engine
//!
//! Collapses a working set of sale records from every source into one
//! canonical, duplicate-free sequence, most recent first.
//!
//! ## Algorithm
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  records ──► merge_keys() per record                                    │
//! │                    │   (split rows: split key only, so split siblings   │
//! │                    │    never meet through client or offline ids)       │
//! │                    ▼                                                    │
//! │  key → first owner index;  shared key ⇒ union(owner, record)            │
//! │                    │                                                    │
//! │                    ▼                                                    │
//! │  per group: first synced record wins, else first seen                   │
//! │                    │                                                    │
//! │                    ▼                                                    │
//! │  sort by timestamp DESC (stable)                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Union-find makes matches transitive: if A shares K1 with B and B shares
//! K2 with C, all three fold into one group even though A and C share no
//! key directly.
//!
//! ## Guarantees
//! - Never fails and never drops a record that has no mergeable key.
//! - Does not read or mutate its input; safe to run concurrently on
//!   different snapshots.
//! - `reconcile(&reconcile(x)) == reconcile(x)`. A record's merge keys
//!   depend on that record alone, and two groups that survive share none.
//! - When two unsynced copies collide, the first one in input order wins.
//!   Callers merging several stores get whichever order they passed in.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use tracing::debug;

use crate::identity::{merge_keys, IdentityKey};
use crate::types::SaleRecord;

// =============================================================================
// Disjoint Set
// =============================================================================

/// Union-find over record indices.
struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    fn new(len: usize) -> Self {
        DisjointSet {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            // path halving
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Joins the groups of `a` and `b`; false if they were already one.
    fn union(&mut self, a: usize, b: usize) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }

        let (root, child) = if self.rank[ra] >= self.rank[rb] {
            (ra, rb)
        } else {
            (rb, ra)
        };
        if self.rank[root] == self.rank[child] {
            self.rank[root] += 1;
        }
        self.parent[child] = root;
        true
    }
}

// =============================================================================
// Reconcile
// =============================================================================

/// Produces the canonical, duplicate-free, newest-first sale sequence.
///
/// Records sharing any merge key are the same logical transaction; of
/// each group, the first synced copy is kept, otherwise the first seen.
/// Amounts are not compared.
///
/// ## Example
/// ```rust
/// use chrono::{Duration, Utc};
/// use duka_core::{reconcile, Money, PaymentMethod, SaleRecord};
///
/// let t1 = Utc::now();
/// let t2 = t1 + Duration::minutes(5);
///
/// let records = vec![
///     SaleRecord::new("p1", t1).with_client_sale_id("A"),
///     SaleRecord::new("p1", t1).with_client_sale_id("A").with_id("srv1").synced(),
///     SaleRecord::at(t2)
///         .with_method(PaymentMethod::Cash)
///         .with_split_reference("s1")
///         .with_total(Money::from_cents(-200)),
///     SaleRecord::at(t2)
///         .with_method(PaymentMethod::Mpesa)
///         .with_split_reference("s1")
///         .with_total(Money::from_cents(-100)),
/// ];
///
/// let canonical = reconcile(&records);
/// assert_eq!(canonical.len(), 3);
/// assert_eq!(canonical[2].id.as_deref(), Some("srv1"));
/// ```
pub fn reconcile(records: &[SaleRecord]) -> Vec<SaleRecord> {
    if records.is_empty() {
        return Vec::new();
    }

    let keys: Vec<Vec<IdentityKey>> = records.iter().map(merge_keys).collect();
    let mut sets = DisjointSet::new(records.len());
    let mut owners: HashMap<&IdentityKey, usize> = HashMap::new();
    let mut unions = 0usize;

    for (index, record_keys) in keys.iter().enumerate() {
        for key in record_keys {
            match owners.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(index);
                }
                Entry::Occupied(slot) => {
                    if sets.union(*slot.get(), index) {
                        unions += 1;
                    }
                }
            }
        }
    }

    // Representative per group: first synced, else first seen.
    let mut winners: HashMap<usize, usize> = HashMap::new();
    for (index, record) in records.iter().enumerate() {
        let root = sets.find(index);
        match winners.entry(root) {
            Entry::Vacant(slot) => {
                slot.insert(index);
            }
            Entry::Occupied(mut slot) => {
                if record.synced && !records[*slot.get()].synced {
                    slot.insert(index);
                }
            }
        }
    }

    let mut survivors: Vec<usize> = winners.into_values().collect();
    survivors.sort_unstable();

    let mut canonical: Vec<SaleRecord> = survivors.iter().map(|&i| records[i].clone()).collect();
    canonical.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    debug!(
        input = records.len(),
        output = canonical.len(),
        merged = unions,
        "Reconciled sale records"
    );

    canonical
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::types::PaymentMethod;
    use crate::PAYMENT_PRODUCT_ID;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn t(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn split_row(reference: &str, method: PaymentMethod, cents: i64, at: DateTime<Utc>) -> SaleRecord {
        SaleRecord::at(at)
            .with_method(method)
            .with_split_reference(reference)
            .with_total(Money::from_cents(cents))
    }

    /// A payment row as the till writes it: split rows share the capture's
    /// client_sale_id and the payment product.
    fn payment_row(method: PaymentMethod, cents: i64) -> SaleRecord {
        let mut row = split_row("s1", method, cents, t(0)).with_client_sale_id("c9");
        row.product_id = Some(PAYMENT_PRODUCT_ID.to_string());
        row
    }

    fn assert_idempotent(records: &[SaleRecord]) {
        let once = reconcile(records);
        let twice = reconcile(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_input() {
        assert!(reconcile(&[]).is_empty());
    }

    #[test]
    fn test_synced_copy_absorbs_unsynced() {
        let unsynced = SaleRecord::new("p1", t(0)).with_client_sale_id("c1");
        let synced = SaleRecord::new("p1", t(0))
            .with_client_sale_id("c1")
            .with_id("srv1")
            .synced();

        let out = reconcile(&[unsynced.clone(), synced.clone()]);
        assert_eq!(out, vec![synced.clone()]);

        // order of arrival does not matter
        let out = reconcile(&[synced.clone(), unsynced]);
        assert_eq!(out, vec![synced]);
    }

    #[test]
    fn test_first_seen_wins_between_unsynced() {
        let first = SaleRecord::new("p1", t(0)).with_client_sale_id("c1").with_id("tmp-1");
        let second = SaleRecord::new("p1", t(0)).with_client_sale_id("c1").with_id("tmp-2");
        let out = reconcile(&[first.clone(), second]);
        assert_eq!(out, vec![first]);
    }

    #[test]
    fn test_first_synced_wins_between_synced() {
        let a = SaleRecord::new("p1", t(0)).with_client_sale_id("c1").with_id("srv-a").synced();
        let b = SaleRecord::new("p1", t(0)).with_client_sale_id("c1").with_id("srv-b").synced();
        let out = reconcile(&[a.clone(), b]);
        assert_eq!(out, vec![a]);
    }

    #[test]
    fn test_split_siblings_do_not_collapse() {
        let records = vec![
            split_row("s1", PaymentMethod::Cash, 500, t(0)),
            split_row("s1", PaymentMethod::Mpesa, 300, t(0)),
            split_row("s1", PaymentMethod::Debt, 200, t(0)),
        ];
        assert_eq!(reconcile(&records).len(), 3);
    }

    #[test]
    fn test_split_siblings_sharing_client_id_stay_apart() {
        let cash = payment_row(PaymentMethod::Cash, -200);
        let mpesa = payment_row(PaymentMethod::Mpesa, -100);
        let synced_cash = cash.clone().with_id("srv-cash").synced();

        let out = reconcile(&[cash, mpesa.clone(), synced_cash.clone()]);
        assert_eq!(out.len(), 2);
        assert!(out.contains(&synced_cash));
        assert!(out.contains(&mpesa));
    }

    #[test]
    fn test_split_rows_do_not_join_plain_record_with_same_client_key() {
        let cash = payment_row(PaymentMethod::Cash, -200);
        let mpesa = payment_row(PaymentMethod::Mpesa, -100);
        let plain = SaleRecord::new(PAYMENT_PRODUCT_ID, t(0))
            .with_client_sale_id("c9")
            .with_id("srv-plain")
            .with_total(Money::from_cents(-300))
            .synced();

        let once = reconcile(&[cash, mpesa, plain.clone()]);
        assert_eq!(once.len(), 3);
        assert!(once.contains(&plain));
        assert_eq!(reconcile(&once), once);

        // the answer does not depend on which record reached a key first
        let mpesa = payment_row(PaymentMethod::Mpesa, -100);
        let cash = payment_row(PaymentMethod::Cash, -200);
        let reordered = reconcile(&[plain, mpesa, cash]);
        assert_eq!(reordered.len(), 3);
    }

    #[test]
    fn test_split_duplicate_across_provenance_merges() {
        let local = split_row("s1", PaymentMethod::Cash, -200, t(0));
        let synced = split_row("s1", PaymentMethod::Cash, -200, t(0)).with_id("srv").synced();
        let out = reconcile(&[local, synced.clone()]);
        assert_eq!(out, vec![synced]);
    }

    #[test]
    fn test_transitive_merge() {
        // a: offline key only; b: offline + client; c: client only
        let a = SaleRecord::new("p1", t(0)).with_offline_id("off-1");
        let b = SaleRecord::new("p1", t(0))
            .with_offline_id("off-1")
            .with_client_sale_id("c1");
        let c = SaleRecord::new("p1", t(0))
            .with_client_sale_id("c1")
            .with_id("srv")
            .synced();

        let out = reconcile(&[a, b, c.clone()]);
        assert_eq!(out, vec![c]);
    }

    #[test]
    fn test_fallback_records_are_kept() {
        let bare = SaleRecord::at(t(0));
        let also_bare = SaleRecord::at(t(0));
        let by_id = SaleRecord::at(t(1)).with_id("srv-7");

        let out = reconcile(&[bare, also_bare, by_id.clone(), by_id.clone()]);
        // id-less records never merge; identical ids do
        assert_eq!(out.len(), 3);
        assert_eq!(out[0], by_id);
    }

    #[test]
    fn test_orders_newest_first() {
        let r1 = SaleRecord::new("p1", t(1)).with_client_sale_id("a");
        let r2 = SaleRecord::new("p1", t(2)).with_client_sale_id("b");
        let r3 = SaleRecord::new("p1", t(3)).with_client_sale_id("c");

        let out = reconcile(&[r2.clone(), r1.clone(), r3.clone()]);
        assert_eq!(out, vec![r3, r2, r1]);
    }

    #[test]
    fn test_idempotent() {
        let records = vec![
            SaleRecord::new("p1", t(0)).with_client_sale_id("A"),
            SaleRecord::new("p1", t(0)).with_client_sale_id("A").with_id("srv1").synced(),
            split_row("s1", PaymentMethod::Cash, -200, t(5)).with_client_sale_id("P"),
            split_row("s1", PaymentMethod::Mpesa, -100, t(5)).with_client_sale_id("P"),
            SaleRecord::new("p2", t(3)).with_offline_id("off-2"),
            SaleRecord::at(t(4)),
        ];
        let once = reconcile(&records);
        let twice = reconcile(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_idempotent_across_split_and_client_chains() {
        // split group: local cash row (client P) and its synced copy
        let a = split_row("s1", PaymentMethod::Cash, -200, t(5)).with_client_sale_id("P");
        let b = split_row("s1", PaymentMethod::Cash, -200, t(5)).with_id("srv-a").synced();
        // plain chain through client P and offline o1
        let c = SaleRecord::new("p1", t(2)).with_client_sale_id("P");
        let d = SaleRecord::new("p1", t(2))
            .with_client_sale_id("P")
            .with_offline_id("o1");
        let e = SaleRecord::new("p1", t(2)).with_offline_id("o1").with_id("srv-e").synced();

        let out = reconcile(&[a.clone(), c.clone(), b.clone(), d.clone(), e.clone()]);
        assert_eq!(out, vec![b.clone(), e.clone()]);

        assert_idempotent(&[a.clone(), b.clone(), c.clone(), d.clone(), e.clone()]);
        assert_idempotent(&[e.clone(), d.clone(), c.clone(), b.clone(), a.clone()]);
        assert_idempotent(&[
            c,
            a,
            payment_row(PaymentMethod::Mpesa, -100),
            d,
            payment_row(PaymentMethod::Cash, -200),
            b,
            e,
            SaleRecord::at(t(9)),
        ]);
    }

    #[test]
    fn test_repeated_delivery_is_absorbed() {
        let record = SaleRecord::new("p1", t(0)).with_offline_id("off-1");
        let synced = record.clone().with_id("srv").synced();
        let mut input = vec![record.clone(); 5];
        input.push(synced.clone());
        input.extend(vec![synced.clone(); 3]);

        assert_eq!(reconcile(&input), vec![synced]);
    }

    #[test]
    fn test_input_is_not_mutated() {
        let records = vec![
            SaleRecord::new("p1", t(0)).with_client_sale_id("A"),
            SaleRecord::new("p1", t(1)).with_client_sale_id("A").synced(),
        ];
        let snapshot = records.clone();
        let _ = reconcile(&records);
        assert_eq!(records, snapshot);
    }

    #[test]
    fn test_mixed_working_set() {
        let out = reconcile(&[
            SaleRecord::new("p1", t(0)).with_client_sale_id("A"),
            SaleRecord::new("p1", t(0)).with_client_sale_id("A").with_id("srv1").synced(),
            split_row("s1", PaymentMethod::Cash, -200, t(10)),
            split_row("s1", PaymentMethod::Mpesa, -100, t(10)),
        ]);

        assert_eq!(out.len(), 3);
        assert_eq!(out[0].timestamp, t(10));
        assert_eq!(out[1].timestamp, t(10));
        assert_eq!(out[2].id.as_deref(), Some("srv1"));
        assert!(out[2].synced);
    }

    #[tokio::test]
    async fn test_concurrent_snapshots_agree() {
        let snapshot = std::sync::Arc::new(vec![
            SaleRecord::new("p1", t(0)).with_client_sale_id("A"),
            SaleRecord::new("p1", t(0)).with_client_sale_id("A").with_id("srv1").synced(),
            split_row("s1", PaymentMethod::Cash, -200, t(10)),
            split_row("s1", PaymentMethod::Mpesa, -100, t(10)),
        ]);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let snapshot = std::sync::Arc::clone(&snapshot);
                tokio::task::spawn_blocking(move || reconcile(&snapshot))
            })
            .collect();

        let expected = reconcile(&snapshot);
        for handle in handles {
            assert_eq!(handle.await.unwrap(), expected);
        }
    }
}
