//! Configuration for the orchestration client
//!
//! Loads settings from a TOML file with environment variable substitution.
//! The signing credential and the RPC endpoint are required: their absence
//! is a fatal configuration error raised before any network activity.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub endpoint: EndpointConfig,
    pub wallet: WalletConfig,
    pub contracts: ContractsConfig,
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    pub chain_id: u64,
    pub rpc_urls: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    /// Name of the environment variable holding the hex private key.
    /// The key itself never appears in the config file.
    pub private_key_env: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContractsConfig {
    pub router: String,
    pub wrapped_native: String,
    /// Bridge contract per destination chain id
    pub bridges: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Blocks required on top of the including block before a transaction
    /// is reported Confirmed.
    pub finality_margin: u64,
    /// Receipt polling interval while Pending
    pub poll_interval_ms: u64,
    /// Blocks without a receipt before the transaction is reported Dropped
    pub drop_after_blocks: u64,
    /// Wall-clock bound on the local watch; the chain may still confirm later
    pub wait_timeout_secs: u64,
    pub gas_price_strategy: GasPriceStrategy,
    pub max_gas_price_gwei: u64,
    pub gas_limit_buffer_percent: u64,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum GasPriceStrategy {
    Legacy,
    Eip1559,
}

impl Settings {
    /// Load settings from the configuration file
    pub fn load() -> Result<Self> {
        let config_path = env::var("DEXOPS_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        let config_str = substitute_env_vars(&config_str);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration before any network activity
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.rpc_urls.is_empty()
            || self.endpoint.rpc_urls.iter().all(|u| u.trim().is_empty())
        {
            anyhow::bail!("No RPC endpoint configured (endpoint.rpc_urls)");
        }

        if self.wallet.private_key_env.trim().is_empty() {
            anyhow::bail!("wallet.private_key_env must name an environment variable");
        }
        if env::var(&self.wallet.private_key_env)
            .map(|v| v.trim().is_empty())
            .unwrap_or(true)
        {
            anyhow::bail!(
                "Signing credential missing: environment variable {} is unset or empty",
                self.wallet.private_key_env
            );
        }

        if self.contracts.router.trim().is_empty() {
            anyhow::bail!("contracts.router address is required");
        }
        if self.contracts.wrapped_native.trim().is_empty() {
            anyhow::bail!("contracts.wrapped_native address is required");
        }

        if self.engine.poll_interval_ms == 0 {
            anyhow::bail!("engine.poll_interval_ms must be non-zero");
        }
        if self.engine.drop_after_blocks == 0 {
            anyhow::bail!("engine.drop_after_blocks must be non-zero");
        }

        Ok(())
    }

    /// Read the private key from the configured environment variable
    pub fn private_key(&self) -> Result<String> {
        env::var(&self.wallet.private_key_env).with_context(|| {
            format!(
                "Signing credential missing: {} is unset",
                self.wallet.private_key_env
            )
        })
    }

    /// Bridge contract address for a destination chain, if configured
    pub fn bridge_for_chain(&self, chain_id: u64) -> Option<&str> {
        self.contracts
            .bridges
            .get(&chain_id.to_string())
            .map(|s| s.as_str())
    }
}

lazy_static::lazy_static! {
    static ref ENV_VAR_RE: regex::Regex =
        regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    let mut result = input.to_string();
    for cap in ENV_VAR_RE.captures_iter(input) {
        let var_value = env::var(&cap[1]).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }
    result
}
