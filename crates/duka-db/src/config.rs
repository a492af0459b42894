//! # Ledger Configuration
//!
//! Where the database lives and how large a single payment may be.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     DUKA_DB_PATH=/var/lib/duka/duka.db                                 │
//! │     DUKA_MAX_CONNECTIONS=5                                             │
//! │     DUKA_MAX_PAYMENT_CENTS=100000000                                   │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/duka/ledger.toml (Linux)                                 │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "duka.db"
//! max_connections = 5
//!
//! [payments]
//! max_payment_cents = 100000000
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ConfigError;
use crate::pool::DbConfig;
use duka_core::validation::validate_ceiling_cents;
use duka_core::{Money, DEFAULT_MAX_PAYMENT_CENTS};

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file; relative paths resolve against the working directory.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("duka.db")
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSettings {
    /// Ceiling for one payment capture, in cents.
    #[serde(default = "default_max_payment_cents")]
    pub max_payment_cents: i64,
}

fn default_max_payment_cents() -> i64 {
    DEFAULT_MAX_PAYMENT_CENTS
}

impl Default for PaymentSettings {
    fn default() -> Self {
        PaymentSettings {
            max_payment_cents: default_max_payment_cents(),
        }
    }
}

// =============================================================================
// LedgerConfig
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub payments: PaymentSettings,
}

impl LedgerConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (ledger.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading ledger config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Saves configuration to file, creating the parent directory.
    pub fn save(&self, config_path: Option<PathBuf>) -> Result<(), ConfigError> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::Invalid("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Ledger config saved");
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_ceiling_cents(self.payments.max_payment_cents)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "max_connections must be greater than 0".into(),
            ));
        }

        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database path is empty".into()));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("DUKA_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(value) = std::env::var("DUKA_MAX_CONNECTIONS") {
            match value.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %value, "Ignoring unparseable DUKA_MAX_CONNECTIONS"),
            }
        }

        if let Ok(value) = std::env::var("DUKA_MAX_PAYMENT_CENTS") {
            match value.parse::<i64>() {
                Ok(cents) => {
                    debug!(cents, "Overriding payment ceiling from environment");
                    self.payments.max_payment_cents = cents;
                }
                Err(_) => warn!(value = %value, "Ignoring unparseable DUKA_MAX_PAYMENT_CENTS"),
            }
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "duka", "duka")
            .map(|dirs| dirs.config_dir().join("ledger.toml"))
    }

    /// Pool settings for [`Database::new`](crate::Database::new).
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path).max_connections(self.database.max_connections)
    }

    pub fn max_payment(&self) -> Money {
        Money::from_cents(self.payments.max_payment_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
