//! Configuration management for the ABI-to-MCP generator and runtime

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::networks::NetworkConfig;

pub const DEFAULT_ETHERSCAN_API_URL: &str = "https://api.etherscan.io/v2/api";
pub const DEFAULT_SOURCIFY_API_URL: &str = "https://sourcify.dev/server";

/// Configuration loaded from `~/.abi-mcp-config.json` or an explicit file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API key for the Etherscan v2 multichain API
    #[serde(default)]
    pub etherscan_api_key: Option<String>,

    /// RPC URL overrides keyed by network name (e.g. {"mainnet": "https://..."})
    #[serde(default)]
    pub rpc_urls: HashMap<String, String>,

    /// Network used when a command does not name one
    #[serde(default = "default_network")]
    pub default_network: String,

    /// Timeout for every explorer and RPC request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// How long to wait for a transaction receipt
    #[serde(default = "default_receipt_timeout_secs")]
    pub receipt_timeout_secs: u64,

    #[serde(default = "default_etherscan_api_url")]
    pub etherscan_api_url: String,

    #[serde(default = "default_sourcify_api_url")]
    pub sourcify_api_url: String,

    /// Whether explorer fetches follow proxies to their implementation
    #[serde(default = "default_detect_proxies")]
    pub detect_proxies: bool,
}

fn default_network() -> String {
    "mainnet".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_receipt_timeout_secs() -> u64 {
    120
}

fn default_etherscan_api_url() -> String {
    DEFAULT_ETHERSCAN_API_URL.to_string()
}

fn default_sourcify_api_url() -> String {
    DEFAULT_SOURCIFY_API_URL.to_string()
}

fn default_detect_proxies() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            etherscan_api_key: None,
            rpc_urls: HashMap::new(),
            default_network: default_network(),
            request_timeout_secs: default_request_timeout_secs(),
            receipt_timeout_secs: default_receipt_timeout_secs(),
            etherscan_api_url: default_etherscan_api_url(),
            sourcify_api_url: default_sourcify_api_url(),
            detect_proxies: default_detect_proxies(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let content = std::fs::read_to_string(path_ref)
            .with_context(|| format!("Failed to read config file: {}", path_ref.display()))?;

        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path_ref.display()))?;

        Ok(config)
    }

    /// `~/.abi-mcp-config.json`, when `HOME` is set.
    pub fn default_path() -> Option<PathBuf> {
        std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".abi-mcp-config.json"))
    }

    /// Load configuration from `~/.abi-mcp-config.json`, falling back to defaults.
    pub fn load_default() -> Self {
        if let Some(default_path) = Self::default_path().filter(|p| p.exists()) {
            match Self::from_file(&default_path) {
                Ok(config) => {
                    tracing::info!(path = %default_path.display(), "loaded config");
                    return config;
                }
                Err(e) => {
                    tracing::warn!(
                        path = %default_path.display(),
                        error = %e,
                        "failed to parse config"
                    );
                }
            }
        }

        tracing::debug!("using default config");
        Self::default()
    }

    /// Overlay values captured from the environment at the CLI boundary.
    pub fn apply_env(&mut self, env: &RuntimeEnv) {
        if let Some(key) = &env.etherscan_api_key {
            self.etherscan_api_key = Some(key.clone());
        }
    }

    /// RPC URL for a network: configured override first, then the public default.
    pub fn rpc_url_for(&self, network: &NetworkConfig) -> String {
        self.rpc_urls
            .get(network.name)
            .cloned()
            .unwrap_or_else(|| network.rpc_url.to_string())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.receipt_timeout_secs)
    }

    /// Save configuration to a file in JSON format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path_ref = path.as_ref();
        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;

        std::fs::write(path_ref, json)
            .with_context(|| format!("Failed to write config file: {}", path_ref.display()))?;

        Ok(())
    }
}

/// Values a generated server reads from its environment.
///
/// Captured once at startup; nothing below the entry point reads the environment.
#[derive(Clone, Default)]
pub struct RuntimeEnv {
    pub rpc_url: Option<String>,
    pub contract_address: Option<String>,
    pub private_key: Option<String>,
    pub etherscan_api_key: Option<String>,
}

impl std::fmt::Debug for RuntimeEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeEnv")
            .field("rpc_url", &self.rpc_url)
            .field("contract_address", &self.contract_address)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field(
                "etherscan_api_key",
                &self.etherscan_api_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl RuntimeEnv {
    /// Read `RPC_URL`, `CONTRACT_ADDRESS`, `PRIVATE_KEY` and `ETHERSCAN_API_KEY`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            rpc_url: get("RPC_URL"),
            contract_address: get("CONTRACT_ADDRESS"),
            private_key: get("PRIVATE_KEY"),
            etherscan_api_key: get("ETHERSCAN_API_KEY"),
        }
    }
}
