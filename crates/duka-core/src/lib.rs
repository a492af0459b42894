//! # duka-core: Pure Sales Reconciliation Logic for Duka
//!
//! This crate turns a mixed working set of sale records (offline captures,
//! server-confirmed copies, split-tender rows) into one canonical,
//! duplicate-free sequence, and does the debt arithmetic on top of it.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Duka Data Flow                                 │
//! │                                                                         │
//! │  Local capture (offline/online)      Remote store (synced copies)       │
//! │          │                                     │                        │
//! │          └──────────────┬──────────────────────┘                        │
//! │                         ▼                                               │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               ★ duka-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  identity │  │   split   │  │ reconcile │  │  balance  │  │   │
//! │  │   │   keys    │─►│  grouper  │─►│ union-find│─►│ debt math │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                         │                                               │
//! │                         ▼                                               │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            duka-db (storage + balance ledger)                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Sale records, customers, payment methods
//! - [`money`] - Integer minor-unit amounts
//! - [`identity`] - Candidate identity keys per record
//! - [`split`] - Split-tender classification and breakdowns
//! - [`reconcile`] - The deduplication engine
//! - [`balance`] - Outstanding-debt arithmetic
//! - [`payment`] - Building payment rows from a tender
//! - [`report`] - Aggregates over reconciled output
//! - [`validation`] - Amount checks
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::Utc;
//! use duka_core::{reconcile, SaleRecord};
//!
//! let now = Utc::now();
//! let offline = SaleRecord::new("p1", now).with_client_sale_id("A");
//! let synced = SaleRecord::new("p1", now)
//!     .with_client_sale_id("A")
//!     .with_id("srv1")
//!     .synced();
//!
//! let canonical = reconcile(&[offline, synced]);
//! assert_eq!(canonical.len(), 1);
//! assert!(canonical[0].synced);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod balance;
pub mod error;
pub mod identity;
pub mod money;
pub mod payment;
pub mod reconcile;
pub mod report;
pub mod split;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use balance::{apply_payments, payment_contribution, BalanceUpdate};
pub use error::{CoreError, CoreResult, ValidationError};
pub use identity::{identity_keys, merge_keys, IdentityKey};
pub use money::Money;
pub use payment::{PaymentRequest, Tender};
pub use reconcile::reconcile;
pub use report::{summarize, SalesSummary};
pub use split::{is_split_payment, split_reference, SplitComponent, SplitLine, SplitPaymentData};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Product id of the "payment" pseudo-product.
///
/// Rows carrying this product id are debt repayments, not product sales,
/// and always have a non-positive `total_amount_cents`.
pub const PAYMENT_PRODUCT_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Default ceiling for a single payment, in cents (KES 1,000,000.00).
pub const DEFAULT_MAX_PAYMENT_CENTS: i64 = 100_000_000;
