//! # duka-db: Database Layer for Duka
//!
//! SQLite storage for sale records and customers, and the balance ledger
//! that applies debt repayments.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           Duka Data Flow                                │
//! │                                                                         │
//! │  Till (PaymentRequest)            Remote sync (synced SaleRecords)      │
//! │       │                                  │                              │
//! │       ▼                                  ▼                              │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     duka-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │ BalanceLedger │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │  (ledger.rs)  │───►│ SaleRepo      │    │  (embedded)  │  │   │
//! │  │   │ per-customer  │    │ CustomerRepo  │    │ 001_init.sql │  │   │
//! │  │   │ locks         │    │               │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │          │ reconcile() / apply_payments() from duka-core        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database (ledger.toml → [database] path)                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Storage, payment and config error types
//! - [`repository`] - Sale record and customer repositories
//! - [`ledger`] - Balance reconciliation with per-customer serialization
//! - [`config`] - `ledger.toml` loading
//!
//! ## Usage
//!
//! ```rust,ignore
//! use duka_core::{Money, PaymentRequest, Tender};
//! use duka_db::{Database, LedgerConfig};
//!
//! let config = LedgerConfig::load(None)?;
//! let db = Database::new(config.db_config()).await?;
//! let ledger = db.ledger(config.max_payment());
//!
//! let request = PaymentRequest::new(customer_id, Tender::cash(Money::from_cents(30_000)));
//! let update = ledger.record_payment(&request).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::LedgerConfig;
pub use error::{ConfigError, DbError, DbResult, PaymentError, PaymentResult, WriteStage};
pub use ledger::BalanceLedger;
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::customer::{AppliedPayment, CustomerRepository};
pub use repository::sale::SaleRepository;
