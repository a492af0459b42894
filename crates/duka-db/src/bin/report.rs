//! # Sales Report
//!
//! Prints a reconciled summary of the sale records in a database.
//!
//! ## Usage
//! ```bash
//! # Whole shop, database from ledger.toml / DUKA_DB_PATH
//! cargo run -p duka-db --bin report
//!
//! # One customer, explicit database
//! cargo run -p duka-db --bin report -- --db ./duka.db --customer <ID>
//! ```
//!
//! Raw rows include both offline and synced copies of the same capture; the
//! report counts each logical transaction once.

use std::env;
use std::path::PathBuf;

use tracing::info;
use tracing_subscriber::EnvFilter;

use duka_core::summarize;
use duka_db::{Database, LedgerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,duka=debug,sqlx=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Vec<String> = env::args().collect();

    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut customer_id: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--customer" => {
                if i + 1 < args.len() {
                    customer_id = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Duka Sales Report");
                println!();
                println!("Usage: report [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>        Database file (default: from ledger.toml)");
                println!("  -c, --config <PATH>    Config file (default: platform config dir)");
                println!("      --customer <ID>    Only this customer's records");
                println!("  -h, --help             Show this help message");
                return Ok(());
            }
            other => eprintln!("Ignoring unknown argument: {}", other),
        }
        i += 1;
    }

    let mut config = LedgerConfig::load(config_path)?;
    if let Some(path) = db_path {
        config.database.path = path;
    }

    info!(path = %config.database.path.display(), "Opening database");
    let db = Database::new(config.db_config()).await?;

    let raw = db.sales().count().await?;
    let records = db.sales().reconciled(customer_id.as_deref()).await?;
    let summary = summarize(&records);

    println!("Database:   {}", config.database.path.display());
    println!("Raw rows:   {}", raw);
    println!("Reconciled: {}", records.len());

    if let Some(id) = customer_id.as_deref() {
        match db.customers().get_by_id(id).await? {
            Some(customer) => println!(
                "Customer:   {} ({}), owes {}",
                customer.name,
                customer.id,
                customer.outstanding_debt()
            ),
            None => println!("Customer:   {} (not found)", id),
        }
    }

    println!("Revenue:    {}", summary.revenue());
    println!("Collected:  {}", summary.payments_collected());
    println!();
    println!("{}", serde_json::to_string_pretty(&summary)?);

    db.close().await;
    Ok(())
}
