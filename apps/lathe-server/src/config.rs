//! # Server Configuration
//!
//! Bind address, database location and the shop's rate table.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     LATHE_PORT=8080                                                    │
//! │     LATHE_DB_PATH=/var/lib/lathe/lathe.db                              │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     --config <path>, else $LATHE_CONFIG, else                          │
//! │     ~/.config/lathe/server.toml (Linux)                                │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     127.0.0.1:3000, default rate table                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # server.toml
//! [server]
//! bind_addr = "0.0.0.0"
//! port = 3000
//!
//! [database]
//! path = "/var/lib/lathe/lathe.db"
//! max_connections = 5
//!
//! [pricing]
//! lead_time_fast = 2.0
//! lead_time_standard = 1.0
//! lead_time_economy = 0.85
//! complexity_default = 2.15
//! tolerance_min = 0.75
//! ```

use std::path::PathBuf;

use lathe_core::pricing::{LeadTimeMultipliers, MultiplierRange, RateTable, ThreadRates};
use lathe_core::{Money, Multiplier, ValidationError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

// =============================================================================
// Config Error
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Invalid pricing rates: {0}")]
    Rates(#[from] ValidationError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Server Settings
// =============================================================================

/// Where the HTTP listener binds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind_addr() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            bind_addr: default_bind_addr(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    /// Returns the full bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

// =============================================================================
// Database Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Defaults to the platform data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Pricing Settings
// =============================================================================

/// The rate table, flattened for hand editing.
///
/// Missing keys fall back to [`RateTable::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingSettings {
    pub lead_time_fast: Decimal,
    pub lead_time_standard: Decimal,
    pub lead_time_economy: Decimal,

    pub small_thread_rate: Decimal,
    pub medium_thread_rate: Decimal,
    pub large_thread_rate: Decimal,

    pub complexity_min: Decimal,
    pub complexity_max: Decimal,
    pub complexity_default: Decimal,

    pub tolerance_min: Decimal,
    pub tolerance_max: Decimal,
    pub tolerance_default: Decimal,
}

impl Default for PricingSettings {
    fn default() -> Self {
        PricingSettings::from_rate_table(&RateTable::default())
    }
}

impl PricingSettings {
    pub fn from_rate_table(rates: &RateTable) -> Self {
        PricingSettings {
            lead_time_fast: rates.lead_time.fast.value(),
            lead_time_standard: rates.lead_time.standard.value(),
            lead_time_economy: rates.lead_time.economy.value(),
            small_thread_rate: rates.thread_rates.small.amount(),
            medium_thread_rate: rates.thread_rates.medium.amount(),
            large_thread_rate: rates.thread_rates.large.amount(),
            complexity_min: rates.complexity.min.value(),
            complexity_max: rates.complexity.max.value(),
            complexity_default: rates.complexity.default.value(),
            tolerance_min: rates.tolerance.min.value(),
            tolerance_max: rates.tolerance.max.value(),
            tolerance_default: rates.tolerance.default.value(),
        }
    }

    pub fn to_rate_table(&self) -> RateTable {
        RateTable {
            lead_time: LeadTimeMultipliers {
                fast: Multiplier::new(self.lead_time_fast),
                standard: Multiplier::new(self.lead_time_standard),
                economy: Multiplier::new(self.lead_time_economy),
            },
            thread_rates: ThreadRates {
                small: Money::new(self.small_thread_rate),
                medium: Money::new(self.medium_thread_rate),
                large: Money::new(self.large_thread_rate),
            },
            complexity: MultiplierRange {
                min: Multiplier::new(self.complexity_min),
                max: Multiplier::new(self.complexity_max),
                default: Multiplier::new(self.complexity_default),
            },
            tolerance: MultiplierRange {
                min: Multiplier::new(self.tolerance_min),
                max: Multiplier::new(self.tolerance_max),
                default: Multiplier::new(self.tolerance_default),
            },
        }
    }
}

// =============================================================================
// Main Server Configuration
// =============================================================================

/// Complete server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub pricing: PricingSettings,
}

impl ServerConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (server.toml)
    /// 3. Environment variables
    ///
    /// An explicitly named file that does not exist is an error; a missing
    /// default file is not.
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let explicit = config_path.or_else(|| std::env::var_os("LATHE_CONFIG").map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => {
                info!(?path, "Loading server config from file");
                Self::from_toml(&std::fs::read_to_string(&path)?)?
            }
            None => match Self::default_config_path() {
                Some(path) if path.exists() => {
                    info!(?path, "Loading server config from file");
                    Self::from_toml(&std::fs::read_to_string(&path)?)?
                }
                path => {
                    debug!(?path, "Config file not found, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    pub fn from_toml(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Validates the configuration, including the rate table.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.server.bind_addr.trim().is_empty() {
            return Err(ConfigError::Invalid("server.bind_addr must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        self.rate_table().validate()?;
        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Applies overrides from `lookup`. Unparseable values are skipped with
    /// a warning.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup("LATHE_BIND") {
            debug!(bind_addr = %addr, "Overriding bind address from environment");
            self.server.bind_addr = addr;
        }

        if let Some(port) = lookup("LATHE_PORT") {
            match port.parse::<u16>() {
                Ok(p) => {
                    debug!(port = p, "Overriding port from environment");
                    self.server.port = p;
                }
                Err(_) => warn!(port = %port, "Ignoring invalid LATHE_PORT"),
            }
        }

        if let Some(path) = lookup("LATHE_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(max) = lookup("LATHE_DB_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring invalid LATHE_DB_MAX_CONNECTIONS"),
            }
        }

        let pricing = &mut self.pricing;
        for (name, slot) in [
            ("LATHE_COMPLEXITY_DEFAULT", &mut pricing.complexity_default),
            ("LATHE_TOLERANCE_DEFAULT", &mut pricing.tolerance_default),
            ("LATHE_LEAD_TIME_FAST", &mut pricing.lead_time_fast),
            ("LATHE_LEAD_TIME_STANDARD", &mut pricing.lead_time_standard),
            ("LATHE_LEAD_TIME_ECONOMY", &mut pricing.lead_time_economy),
        ] {
            if let Some(raw) = lookup(name) {
                match raw.trim().parse::<Decimal>() {
                    Ok(value) => {
                        debug!(%name, %value, "Overriding rate from environment");
                        *slot = value;
                    }
                    Err(_) => warn!(%name, value = %raw, "Ignoring invalid rate override"),
                }
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "lathe", "lathe")
            .map(|dirs| dirs.config_dir().join("server.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn rate_table(&self) -> RateTable {
        self.pricing.to_rate_table()
    }

    /// The configured database file, else `lathe.db` in the platform data
    /// directory, else `./lathe.db`.
    pub fn database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .or_else(|| {
                directories::ProjectDirs::from("com", "lathe", "lathe")
                    .map(|dirs| dirs.data_dir().join("lathe.db"))
            })
            .unwrap_or_else(|| PathBuf::from("lathe.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.server.bind_address(), "127.0.0.1:3000");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.rate_table(), RateTable::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ServerConfig::from_toml(
            r#"
            [server]
            port = 8080

            [pricing]
            complexity_default = "2.5"
            tolerance_min = 0.5
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.bind_addr, "127.0.0.1");

        let rates = config.rate_table();
        assert_eq!(rates.complexity.default.value(), dec!(2.5));
        assert_eq!(rates.tolerance.min.value(), dec!(0.5));
        assert_eq!(rates.lead_time.economy.value(), dec!(0.85));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_rates() {
        let mut config = ServerConfig::default();
        config.pricing.complexity_default = dec!(5);
        assert!(matches!(config.validate(), Err(ConfigError::Rates(_))));

        let mut config = ServerConfig::default();
        config.database.max_connections = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("LATHE_PORT", "9000"),
            ("LATHE_DB_PATH", "/tmp/quotes.db"),
            ("LATHE_LEAD_TIME_FAST", "1.75"),
            ("LATHE_DB_MAX_CONNECTIONS", "lots"),
        ]);

        let mut config = ServerConfig::default();
        config.apply_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.database_path(), PathBuf::from("/tmp/quotes.db"));
        assert_eq!(config.pricing.lead_time_fast, dec!(1.75));
        // Unparseable values are ignored
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = ServerConfig::load(Some(PathBuf::from("/nonexistent/lathe/server.toml")));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_toml_serialization() {
        let config = ServerConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[server]"));
        assert!(toml_str.contains("[pricing]"));
    }
}
