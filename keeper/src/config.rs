//! Keeper configuration

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use strike_common::{Domain, Identity};
use strike_options::AdminConfig;
use strike_pool::{PoolConfig, RateConfig};

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "STRIKE_KEEPER_CONFIG";

/// Config file used when `STRIKE_KEEPER_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "keeper-config.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// JSON-lines command journal to replay (tilde expanded)
    pub journal_path: String,

    /// Keep polling the journal for new entries after the initial replay
    pub follow: bool,

    /// Polling interval in seconds (follow mode)
    pub poll_interval_secs: u64,

    /// Maximum expirations per tick
    pub max_expirations_per_batch: usize,

    /// Utilization (1e18 = 100%) above which the health report warns
    pub utilization_alert: u64,

    /// Liquidity pool wiring
    pub pool: PoolConfig,

    /// Options engine wiring
    pub engine: AdminConfig,
}

impl Config {
    /// Config file path from the environment
    pub fn path() -> String {
        std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
    }

    /// Load configuration from TOML file
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path())
    }

    pub fn load_from(path: &str) -> Result<Self> {
        let expanded = shellexpand::tilde(path);
        let config_str = std::fs::read_to_string(expanded.as_ref())
            .context(format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&config_str)
            .context("Failed to parse config TOML")?;

        Ok(config)
    }

    /// Local single-operator deployment
    ///
    /// Every role is held by one well-known identity so a hand-written
    /// journal can drive the whole engine.
    pub fn default_local() -> Self {
        let admin = Identity::new([1; 32]);
        let pool_account = Identity::new([2; 32]);
        let custody = Identity::new([3; 32]);
        let asset = Identity::new([4; 32]);

        let mut engine = AdminConfig::new(admin, custody, asset);
        engine.domain = Domain {
            verifying_party: custody,
            ..Domain::default()
        };

        Self {
            journal_path: "~/.strike/journal.jsonl".to_string(),
            follow: false,
            poll_interval_secs: 1,
            max_expirations_per_batch: 16,
            utilization_alert: 900_000_000_000_000_000, // 90%
            pool: PoolConfig {
                account: pool_account,
                owner: admin,
                manager: admin,
                settlement_account: custody,
                rate: RateConfig::default(),
            },
            engine,
        }
    }

    /// Write default config to file
    pub fn write_default(path: &str) -> Result<()> {
        let config = Self::default_local();
        let toml_str = toml::to_string_pretty(&config)
            .context("Failed to serialize config")?;

        let expanded = shellexpand::tilde(path);
        std::fs::write(expanded.as_ref(), toml_str)
            .context(format!("Failed to write config to {}", path))?;

        log::info!("Created default config at {}", path);
        Ok(())
    }

    /// Journal path with `~` expanded
    pub fn journal_file(&self) -> String {
        shellexpand::tilde(&self.journal_path).into_owned()
    }
}
