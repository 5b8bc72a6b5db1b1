//! Configuration loading and representation.
//!
//! Layered, lowest precedence first:
//! 1. Default values in code
//! 2. `config/<environment>.toml` (optional)
//! 3. Environment variables with the `AUTOSHOP_` prefix, `__` between
//!    sections (e.g. `AUTOSHOP_ENGINE__MAX_COMMIT_RETRIES=10`)

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;

use autoshop_inventory::CostLayerPolicy;
use autoshop_observability::LoggingConfig;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Current environment (development, production)
    pub environment: String,

    /// Stock engine settings
    pub engine: EngineConfig,

    /// Log output settings
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// Currency code reported on account balances
    pub currency: String,

    /// Re-runs of an operation after an optimistic commit conflict
    pub max_commit_retries: u32,

    /// How deferred buying-price layers queue up
    pub cost_layer_policy: CostLayerPolicy,

    /// Ledger page size when the caller passes none
    pub default_page_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
            max_commit_retries: 5,
            cost_layer_policy: CostLayerPolicy::LatestPending,
            default_page_size: 50,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            engine: EngineConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("AUTOSHOP_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        Self::defaults(&environment)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{environment}")).required(false))
            // Override with environment variables (AUTOSHOP_ prefix)
            .add_source(
                Environment::with_prefix("AUTOSHOP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    fn defaults(environment: &str) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let engine = EngineConfig::default();
        let logging = LoggingConfig::default();

        config::Config::builder()
            .set_default("environment", environment)?
            .set_default("engine.currency", engine.currency)?
            .set_default("engine.max_commit_retries", u64::from(engine.max_commit_retries))?
            .set_default("engine.cost_layer_policy", "latest_pending")?
            .set_default("engine.default_page_size", engine.default_page_size as u64)?
            .set_default("logging.filter", logging.filter)?
            .set_default("logging.json", logging.json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn defaults_deserialize_to_default_config() {
        let loaded: AppConfig = AppConfig::defaults("development")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        let expected = AppConfig::default();
        assert_eq!(loaded.environment, expected.environment);
        assert_eq!(loaded.engine, expected.engine);
        assert_eq!(loaded.logging, expected.logging);
    }

    #[test]
    fn file_overrides_defaults() {
        let toml = r#"
            [engine]
            currency = "LKR"
            cost_layer_policy = "fifo"

            [logging]
            json = false
        "#;
        let loaded: AppConfig = AppConfig::defaults("production")
            .unwrap()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(loaded.environment, "production");
        assert_eq!(loaded.engine.currency, "LKR");
        assert_eq!(loaded.engine.cost_layer_policy, CostLayerPolicy::Fifo);
        assert_eq!(loaded.engine.max_commit_retries, 5);
        assert!(!loaded.logging.json);
    }
}
