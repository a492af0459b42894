//! # Repository Module
//!
//! Database repository implementations for Duka.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  BalanceLedger / report binary                                          │
//! │       │                                                                 │
//! │       │  db.sales().by_client_sale_id("…")                              │
//! │       ▼                                                                 │
//! │  SaleRepository                      CustomerRepository                 │
//! │  ├── insert / insert_many            ├── insert / create               │
//! │  ├── list_all / list_for_customer    ├── get_by_id / list              │
//! │  ├── payments_for_customer           ├── applied_keys                  │
//! │  └── by_client_sale_id               └── apply_balance (versioned)     │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Repositories hand back raw rows. Provenance duplicates are folded by
//! [`duka_core::reconcile`], never by SQL.
//!
//! ## Available Repositories
//!
//! - [`SaleRepository`](sale::SaleRepository) - Append-only sale record storage
//! - [`CustomerRepository`](customer::CustomerRepository) - Customers and balances

pub mod customer;
pub mod sale;
