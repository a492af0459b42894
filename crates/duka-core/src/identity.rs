//! # Identity Resolver
//!
//! No single field identifies a sale record across provenances: offline
//! captures lack a remote `id`, synced copies may come back without their
//! `offline_id`. Each record therefore yields several candidate keys, most
//! specific first, and any shared key marks two records as the same
//! logical transaction.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │  1. split:{splitReference}:{paymentMethod}   split-tender rows     │
//! │  2. offline:{offlineId}:{productId}          offline captures      │
//! │  3. client:{clientSaleId}:{productId}        any capture           │
//! │  4. id:{id}                                  only if nothing else  │
//! └────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use crate::split::{is_split_payment, split_reference};
use crate::types::{PaymentMethod, SaleRecord};

/// A derived key used to detect that two records are the same transaction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IdentityKey {
    Split {
        reference: String,
        method: PaymentMethod,
    },
    Offline {
        offline_id: String,
        product_id: String,
    },
    Client {
        client_sale_id: String,
        product_id: String,
    },
    /// Last resort. A record without an `id` gets `Fallback { id: None }`,
    /// which never matches anything, not even another `Fallback { id: None }`.
    Fallback { id: Option<String> },
}

impl IdentityKey {
    /// False for keys that must never merge two records.
    pub fn is_mergeable(&self) -> bool {
        !matches!(self, IdentityKey::Fallback { id: None })
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityKey::Split { reference, method } => write!(f, "split:{}:{}", reference, method),
            IdentityKey::Offline {
                offline_id,
                product_id,
            } => write!(f, "offline:{}:{}", offline_id, product_id),
            IdentityKey::Client {
                client_sale_id,
                product_id,
            } => write!(f, "client:{}:{}", client_sale_id, product_id),
            IdentityKey::Fallback { id: Some(id) } => write!(f, "id:{}", id),
            IdentityKey::Fallback { id: None } => write!(f, "id:-"),
        }
    }
}

/// Trims and drops blank identifiers.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Computes the candidate identity keys for `record`, most specific first.
///
/// Always returns at least one key.
pub fn identity_keys(record: &SaleRecord) -> Vec<IdentityKey> {
    let mut keys = Vec::with_capacity(3);
    let product_id = present(&record.product_id);

    if is_split_payment(record) {
        if let (Some(reference), Some(method)) = (split_reference(record), record.payment_method) {
            keys.push(IdentityKey::Split {
                reference: reference.to_string(),
                method,
            });
        }
    }

    if let (Some(offline_id), Some(product_id)) = (present(&record.offline_id), product_id) {
        keys.push(IdentityKey::Offline {
            offline_id: offline_id.to_string(),
            product_id: product_id.to_string(),
        });
    }

    if let (Some(client_sale_id), Some(product_id)) = (present(&record.client_sale_id), product_id) {
        keys.push(IdentityKey::Client {
            client_sale_id: client_sale_id.to_string(),
            product_id: product_id.to_string(),
        });
    }

    if keys.is_empty() {
        keys.push(IdentityKey::Fallback {
            id: present(&record.id).map(str::to_string),
        });
    }

    keys
}

/// Keys through which `record` may merge with another record.
///
/// A split-tender row merges only through its split key. Its siblings share
/// `client_sale_id` and `offline_id`, so those keys cannot tell one method's
/// row from another's. Unmergeable fallbacks are dropped; the result may be
/// empty.
pub fn merge_keys(record: &SaleRecord) -> Vec<IdentityKey> {
    let keys = identity_keys(record);
    if keys.iter().any(|key| matches!(key, IdentityKey::Split { .. })) {
        keys.into_iter()
            .filter(|key| matches!(key, IdentityKey::Split { .. }))
            .collect()
    } else {
        keys.into_iter().filter(IdentityKey::is_mergeable).collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn rendered(record: &SaleRecord) -> Vec<String> {
        identity_keys(record).iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_keys_in_specificity_order() {
        let record = SaleRecord::new("p1", Utc::now())
            .with_offline_id("off-9")
            .with_client_sale_id("c1")
            .with_method(PaymentMethod::Cash)
            .with_split_reference("s1");
        assert_eq!(
            rendered(&record),
            vec!["split:s1:cash", "offline:off-9:p1", "client:c1:p1"]
        );
    }

    #[test]
    fn test_split_key_needs_method() {
        let record = SaleRecord::at(Utc::now()).with_split_reference("s1").with_id("x");
        assert_eq!(rendered(&record), vec!["id:x"]);
    }

    #[test]
    fn test_product_required_for_offline_and_client_keys() {
        let record = SaleRecord::at(Utc::now())
            .with_offline_id("off-1")
            .with_client_sale_id("c1")
            .with_id("srv1");
        assert_eq!(rendered(&record), vec!["id:srv1"]);
    }

    #[test]
    fn test_fallback_without_id_never_merges() {
        let record = SaleRecord::at(Utc::now());
        let keys = identity_keys(&record);
        assert_eq!(keys, vec![IdentityKey::Fallback { id: None }]);
        assert!(!keys[0].is_mergeable());
    }

    #[test]
    fn test_split_rows_merge_only_through_split_key() {
        let record = SaleRecord::new("p1", Utc::now())
            .with_offline_id("off-9")
            .with_client_sale_id("c1")
            .with_method(PaymentMethod::Mpesa)
            .with_split_reference("s1");
        let keys: Vec<String> = merge_keys(&record).iter().map(ToString::to_string).collect();
        assert_eq!(keys, vec!["split:s1:mpesa"]);

        let plain = SaleRecord::new("p1", Utc::now())
            .with_offline_id("off-9")
            .with_client_sale_id("c1");
        assert_eq!(merge_keys(&plain).len(), 2);
        assert!(merge_keys(&SaleRecord::at(Utc::now())).is_empty());
    }

    #[test]
    fn test_blank_identifiers_are_ignored() {
        let record = SaleRecord::new("p1", Utc::now())
            .with_client_sale_id("  ")
            .with_id("srv2");
        assert_eq!(rendered(&record), vec!["id:srv2"]);
    }
}
