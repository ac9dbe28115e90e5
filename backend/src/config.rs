//! Configuration management for the Inventaris platform
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with INV__ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use shared::models::Destination;
use shared::profit::ProfitSharePolicy;
use shared::transfer::ApprovalPolicy;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// Stock ledger behaviour
    pub ledger: LedgerConfig,

    /// Transfer approval policy
    pub transfer: TransferConfig,

    /// Profit-sharing ratios for non-damaged goods
    pub profit_share: ProfitShareConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Seconds to wait for a pooled connection
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for verifying JWT tokens
    pub secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LedgerConfig {
    /// Business timezone offset; WIB is UTC+7
    pub utc_offset_minutes: i32,

    /// Global low-stock threshold
    pub low_stock_threshold: i64,

    /// Default look-ahead window for near-expiry items
    pub expiry_window_days: i64,

    /// Upper bound for `per_page` on list endpoints
    pub max_page_size: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TransferConfig {
    /// Destinations whose transfers start Pending
    pub approval_required: Vec<Destination>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProfitShareConfig {
    /// Source percentage for good-condition goods
    pub good_source_percent: Option<u8>,

    /// Source percentage for goods needing repair
    pub needs_repair_source_percent: Option<u8>,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("INV__ENVIRONMENT")
            .or_else(|_| std::env::var("INV_ENVIRONMENT"))
            .unwrap_or_else(|_| "development".into());

        let config = Self::builder(&environment)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (INV__ prefix)
            .add_source(
                Environment::with_prefix("INV")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("transfer.approval_required")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Builder pre-populated with the code defaults
    fn builder(
        environment: &str,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        config::Config::builder()
            .set_default("environment", environment)?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.url", "postgres://localhost/inventaris")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout_secs", 30)?
            .set_default("jwt.secret", "development-secret-key")?
            .set_default("ledger.utc_offset_minutes", 420)?
            .set_default("ledger.low_stock_threshold", 10)?
            .set_default("ledger.expiry_window_days", 30)?
            .set_default("ledger.max_page_size", 100)?
            .set_default("transfer.approval_required", vec!["cooperative"])?
            .set_default("profit_share.good_source_percent", 100)
    }

    pub fn approval_policy(&self) -> ApprovalPolicy {
        ApprovalPolicy {
            approval_required: self.transfer.approval_required.clone(),
        }
    }

    pub fn profit_policy(&self) -> ProfitSharePolicy {
        ProfitSharePolicy {
            good_source_percent: self.profit_share.good_source_percent,
            needs_repair_source_percent: self.profit_share.needs_repair_source_percent,
        }
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config::builder("test")
        .and_then(|b| b.build())
        .and_then(|c| c.try_deserialize())
        .expect("defaults deserialize")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_load_without_files() {
        let config = test_config();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.ledger.utc_offset_minutes, 420);
        assert_eq!(config.ledger.low_stock_threshold, 10);
        assert_eq!(config.ledger.expiry_window_days, 30);
        assert_eq!(config.ledger.max_page_size, 100);
    }

    #[test]
    fn test_default_policies() {
        let config = test_config();
        assert_eq!(config.approval_policy(), ApprovalPolicy::default());
        assert_eq!(config.profit_policy(), ProfitSharePolicy::default());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let config: Config = Config::builder("test")
            .unwrap()
            .add_source(config::File::from_str(
                r#"
                [transfer]
                approval_required = ["cooperative", "distribution"]

                [profit_share]
                good_source_percent = 90
                needs_repair_source_percent = 80
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert!(config.approval_policy().requires_approval(Destination::Distribution));
        assert!(!config.approval_policy().requires_approval(Destination::Kitchen));
        assert_eq!(config.profit_policy().needs_repair_source_percent, Some(80));
    }
}
