//! # Engine Configuration
//!
//! Settings for the store handle, checkout policy and the payment simulator.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                            │
//! │     REVSHOP_DB_PATH=./revshop.db                                        │
//! │     REVSHOP_STATUS_SCOPE=per_seller                                     │
//! │                                                                         │
//! │  2. TOML Config File (path in REVSHOP_CONFIG)                           │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                    │
//! │     order_wide status, unchecked stock, 90% approval                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "./revshop.db"
//! max_connections = 5
//!
//! [checkout]
//! status_scope = "order_wide"   # order_wide | per_seller
//! stock_policy = "unchecked"    # unchecked | strict
//!
//! [payment]
//! approval_rate = 0.9
//! latency_ms = 1500
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use revshop_db::DbConfig;

pub const ENV_CONFIG_FILE: &str = "REVSHOP_CONFIG";
pub const ENV_DB_PATH: &str = "REVSHOP_DB_PATH";
pub const ENV_DB_MAX_CONNECTIONS: &str = "REVSHOP_DB_MAX_CONNECTIONS";
pub const ENV_STATUS_SCOPE: &str = "REVSHOP_STATUS_SCOPE";
pub const ENV_STOCK_POLICY: &str = "REVSHOP_STOCK_POLICY";
pub const ENV_PAYMENT_APPROVAL_RATE: &str = "REVSHOP_PAYMENT_APPROVAL_RATE";
pub const ENV_PAYMENT_LATENCY_MS: &str = "REVSHOP_PAYMENT_LATENCY_MS";

// =============================================================================
// Status Scope
// =============================================================================

/// Where a seller's status change lands.
///
/// ## Scope Comparison
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  ORDER_WIDE (Default)               │  PER_SELLER                       │
/// │  ────────────────────               │  ──────────                       │
/// │  • Overwrites orders.status         │  • Writes only the seller's row   │
/// │  • Seller row recorded too          │  • orders.status = roll-up        │
/// │  • Seller A's DELIVERED marks       │  • Reviews follow the reviewed    │
/// │    seller B's lines delivered       │    product's seller row           │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusScope {
    #[default]
    OrderWide,
    PerSeller,
}

impl std::fmt::Display for StatusScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusScope::OrderWide => write!(f, "order_wide"),
            StatusScope::PerSeller => write!(f, "per_seller"),
        }
    }
}

impl FromStr for StatusScope {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "order_wide" | "order-wide" => Ok(StatusScope::OrderWide),
            "per_seller" | "per-seller" => Ok(StatusScope::PerSeller),
            _ => Err(ConfigError::InvalidValue(ENV_STATUS_SCOPE.to_string())),
        }
    }
}

// =============================================================================
// Stock Policy
// =============================================================================

/// How checkout treats stock.
///
/// `Unchecked` decrements after commit with no floor, so two buyers can
/// both take the last unit. `Strict` pre-checks before payment and
/// decrements inside the order transaction, refusing to go below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockPolicy {
    #[default]
    Unchecked,
    Strict,
}

impl StockPolicy {
    pub fn is_strict(&self) -> bool {
        matches!(self, StockPolicy::Strict)
    }
}

impl std::fmt::Display for StockPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StockPolicy::Unchecked => write!(f, "unchecked"),
            StockPolicy::Strict => write!(f, "strict"),
        }
    }
}

impl FromStr for StockPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "unchecked" => Ok(StockPolicy::Unchecked),
            "strict" => Ok(StockPolicy::Strict),
            _ => Err(ConfigError::InvalidValue(ENV_STOCK_POLICY.to_string())),
        }
    }
}

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file, or `:memory:`.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./revshop.db")
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

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutSettings {
    #[serde(default)]
    pub status_scope: StatusScope,

    #[serde(default)]
    pub stock_policy: StockPolicy,
}

/// Payment simulator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSettings {
    /// Probability in [0, 1] that a payment is approved.
    /// Default: 0.9
    #[serde(default = "default_approval_rate")]
    pub approval_rate: f64,

    /// Simulated processing time.
    /// Default: 1500 ms
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,
}

fn default_approval_rate() -> f64 {
    0.9
}

fn default_latency_ms() -> u64 {
    1500
}

impl Default for PaymentSettings {
    fn default() -> Self {
        PaymentSettings {
            approval_rate: default_approval_rate(),
            latency_ms: default_latency_ms(),
        }
    }
}

// =============================================================================
// Engine Configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub checkout: CheckoutSettings,

    #[serde(default)]
    pub payment: PaymentSettings,
}

impl EngineConfig {
    /// Loads configuration from the process environment.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. TOML file named by `REVSHOP_CONFIG`
    /// 3. `REVSHOP_*` environment variables
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Same as [`load`](Self::load) with an injected variable lookup.
    pub fn load_with<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(ENV_CONFIG_FILE) {
            Some(path) => {
                let path = PathBuf::from(path);
                info!(?path, "Loading engine config from file");
                let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                    path: path.clone(),
                    source,
                })?;
                Self::from_toml_str(&contents)?
            }
            None => {
                debug!("No config file, using defaults");
                Self::default()
            }
        };

        config.apply_overrides(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML document. Missing sections and keys take defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue("database.max_connections".to_string()));
        }

        let rate = self.payment.approval_rate;
        if !rate.is_finite() || !(0.0..=1.0).contains(&rate) {
            return Err(ConfigError::InvalidValue("payment.approval_rate".to_string()));
        }

        Ok(())
    }

    fn apply_overrides<F>(&mut self, lookup: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_DB_PATH) {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = lookup(ENV_DB_MAX_CONNECTIONS) {
            self.database.max_connections = max
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(ENV_DB_MAX_CONNECTIONS.to_string()))?;
        }

        if let Some(scope) = lookup(ENV_STATUS_SCOPE) {
            self.checkout.status_scope = scope.parse()?;
        }

        if let Some(policy) = lookup(ENV_STOCK_POLICY) {
            self.checkout.stock_policy = policy.parse()?;
        }

        if let Some(rate) = lookup(ENV_PAYMENT_APPROVAL_RATE) {
            self.payment.approval_rate = rate
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(ENV_PAYMENT_APPROVAL_RATE.to_string()))?;
        }

        if let Some(latency) = lookup(ENV_PAYMENT_LATENCY_MS) {
            self.payment.latency_ms = latency
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(ENV_PAYMENT_LATENCY_MS.to_string()))?;
        }

        Ok(())
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Pool settings for [`revshop_db::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path).max_connections(self.database.max_connections)
    }

    pub fn status_scope(&self) -> StatusScope {
        self.checkout.status_scope
    }

    pub fn stock_policy(&self) -> StockPolicy {
        self.checkout.stock_policy
    }

    pub fn payment_latency(&self) -> Duration {
        Duration::from_millis(self.payment.latency_ms)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Cannot read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
}
