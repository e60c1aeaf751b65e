//! Configuration management for ethwrap
//!
//! Loads configuration from a TOML file with environment variable substitution.

use crate::error::{WalletError, WalletResult};

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

/// Intrinsic gas cost of a plain value transfer
pub const TRANSFER_GAS: u64 = 21_000;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub network: NetworkConfig,
    #[serde(default)]
    pub gas: GasConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkConfig {
    pub rpc_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct GasConfig {
    /// Upper bound handed to the node when estimating contract calls
    #[serde(default = "default_gas_limit")]
    pub default_limit: u64,
    /// Ceiling for the legacy gas price and the EIP-1559 priority tip
    #[serde(default = "default_max_gas_price_gwei")]
    pub max_gas_price_gwei: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WalletConfig {
    /// Environment variable holding the hex private key used for signing
    #[serde(default = "default_private_key_env")]
    pub private_key_env: String,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_gas_limit() -> u64 {
    300_000
}

fn default_max_gas_price_gwei() -> u64 {
    200
}

fn default_private_key_env() -> String {
    "ETHWRAP_PRIVATE_KEY".to_string()
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            default_limit: default_gas_limit(),
            max_gas_price_gwei: default_max_gas_price_gwei(),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            private_key_env: default_private_key_env(),
        }
    }
}

impl Settings {
    /// Load settings from an explicit path, `ETHWRAP_CONFIG`, or the default file
    pub fn load(path: Option<&Path>) -> WalletResult<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => env::var("ETHWRAP_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("config/default.toml")),
        };

        let config_str = std::fs::read_to_string(&config_path).map_err(|e| {
            WalletError::Config(format!("Failed to read config file {:?}: {}", config_path, e))
        })?;

        let settings = Self::from_toml(&config_str)?;
        tracing::debug!("Loaded configuration from {:?}", config_path);
        Ok(settings)
    }

    /// Parse and validate settings from TOML text
    pub fn from_toml(input: &str) -> WalletResult<Self> {
        // Substitute environment variables
        let config_str = substitute_env_vars(input);

        let settings: Settings = toml::from_str(&config_str)
            .map_err(|e| WalletError::Config(format!("Failed to parse configuration: {}", e)))?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> WalletResult<()> {
        let url = self.network.rpc_url.trim();
        if url.is_empty() {
            return Err(WalletError::Config("network.rpc_url is empty".to_string()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(WalletError::Config(format!(
                "network.rpc_url must be an http(s) endpoint, got {}",
                url
            )));
        }
        if self.network.timeout_secs == 0 {
            return Err(WalletError::Config(
                "network.timeout_secs must be positive".to_string(),
            ));
        }
        if self.gas.default_limit < TRANSFER_GAS {
            return Err(WalletError::Config(format!(
                "gas.default_limit {} is below the {} gas intrinsic cost",
                self.gas.default_limit, TRANSFER_GAS
            )));
        }
        if self.gas.max_gas_price_gwei == 0 {
            return Err(WalletError::Config(
                "gas.max_gas_price_gwei must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

lazy_static! {
    static ref ENV_VAR: Regex = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("valid env var pattern");
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    ENV_VAR
        .replace_all(input, |cap: &regex::Captures| {
            env::var(&cap[1]).unwrap_or_default()
        })
        .into_owned()
}
