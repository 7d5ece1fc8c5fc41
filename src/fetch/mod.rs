//! ABI sources: local files, Etherscan and Sourcify
//!
//! Fetchers are tried in a fixed order. The first one whose `can_handle`
//! accepts the source is used; for addresses a "not found" failure falls back
//! to the remaining address-capable fetchers and every reason is collected.

pub mod etherscan;
pub mod file;
pub mod proxy;
pub mod sourcify;

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

use crate::config::Config;
use crate::error::{Error, FetchAttempt, Result};

pub use etherscan::EtherscanFetcher;
pub use file::{extract_abi, fetch_from_value, FileFetcher};
pub use proxy::{detect_proxy, ProbeOutcome, ProxyProbe};
pub use sourcify::SourcifyFetcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    File,
    Etherscan,
    Sourcify,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceKind::File => "file",
            SourceKind::Etherscan => "etherscan",
            SourceKind::Sourcify => "sourcify",
        })
    }
}

/// An ABI together with where it came from.
#[derive(Debug, Clone, Serialize)]
pub struct FetchResult {
    pub abi: Vec<Value>,
    pub source_kind: SourceKind,
    /// File path, or the contract address for remote sources
    pub source_location: String,
    pub contract_name: Option<String>,
    pub compiler_version: Option<String>,
    #[serde(skip)]
    pub source_code: Option<String>,
    pub is_proxy: bool,
    pub implementation_address: Option<String>,
}

impl FetchResult {
    pub fn new(abi: Vec<Value>, source_kind: SourceKind, source_location: impl Into<String>) -> Self {
        Self {
            abi,
            source_kind,
            source_location: source_location.into(),
            contract_name: None,
            compiler_version: None,
            source_code: None,
            is_proxy: false,
            implementation_address: None,
        }
    }

    /// The ABI as a single JSON array.
    pub fn abi_json(&self) -> Value {
        Value::Array(self.abi.clone())
    }
}

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub network: String,
    pub detect_proxy: bool,
    pub api_key: Option<String>,
    /// Overrides the network's RPC endpoint for proxy probing
    pub rpc_url: Option<String>,
}

impl FetchOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            network: config.default_network.clone(),
            detect_proxy: config.detect_proxies,
            api_key: config.etherscan_api_key.clone(),
            rpc_url: None,
        }
    }

    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = network.into();
        self
    }
}

/// `0x` followed by exactly 40 hex digits.
pub fn is_address(source: &str) -> bool {
    source.len() == 42
        && source.starts_with("0x")
        && source[2..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Lowercased address, or an invalid-address error.
pub fn normalize_address(source: &str) -> Result<String> {
    let trimmed = source.trim();
    if is_address(trimmed) {
        Ok(trimmed.to_lowercase())
    } else {
        Err(Error::InvalidAddress(trimmed.to_string()))
    }
}

/// The closed set of ABI sources.
#[derive(Debug, Clone)]
pub enum Fetcher {
    File(FileFetcher),
    Etherscan(EtherscanFetcher),
    Sourcify(SourcifyFetcher),
}

impl Fetcher {
    pub fn name(&self) -> &'static str {
        match self {
            Fetcher::File(_) => "file",
            Fetcher::Etherscan(_) => "etherscan",
            Fetcher::Sourcify(_) => "sourcify",
        }
    }

    pub fn can_handle(&self, source: &str) -> bool {
        match self {
            Fetcher::File(_) => FileFetcher::can_handle(source),
            Fetcher::Etherscan(_) | Fetcher::Sourcify(_) => is_address(source),
        }
    }

    pub async fn fetch(&self, source: &str, options: &FetchOptions) -> Result<FetchResult> {
        match self {
            Fetcher::File(f) => f.fetch(source).await,
            Fetcher::Etherscan(f) => f.fetch(source, options).await,
            Fetcher::Sourcify(f) => f.fetch(source, options).await,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetcherRegistry {
    fetchers: Vec<Fetcher>,
}

impl FetcherRegistry {
    pub fn new(config: &Config) -> Result<Self> {
        let http = http_client(config.request_timeout())?;
        Ok(Self {
            fetchers: vec![
                Fetcher::File(FileFetcher),
                Fetcher::Etherscan(EtherscanFetcher::new(http.clone(), config)),
                Fetcher::Sourcify(SourcifyFetcher::new(http, &config.sourcify_api_url)),
            ],
        })
    }

    pub fn fetchers(&self) -> &[Fetcher] {
        &self.fetchers
    }

    pub async fn fetch(&self, source: &str, options: &FetchOptions) -> Result<FetchResult> {
        let source = source.trim();
        let Some(first) = self.fetchers.iter().position(|f| f.can_handle(source)) else {
            return Err(Error::SourceNotFound {
                input: source.to_string(),
                attempts: vec![FetchAttempt::new("registry", "no fetcher can handle this source")],
            });
        };

        let fetcher = &self.fetchers[first];
        tracing::debug!(fetcher = fetcher.name(), source, "fetching ABI");
        let err = match fetcher.fetch(source, options).await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_not_found() && is_address(source) => e,
            Err(e) => return Err(e),
        };

        let mut attempts = vec![FetchAttempt::new(fetcher.name(), err.to_string())];
        for fallback in self.fetchers[first + 1..]
            .iter()
            .filter(|f| f.can_handle(source))
        {
            tracing::info!(fetcher = fallback.name(), "falling back to next source");
            match fallback.fetch(source, options).await {
                Ok(result) => return Ok(result),
                Err(e) => attempts.push(FetchAttempt::new(fallback.name(), e.to_string())),
            }
        }

        Err(Error::SourceNotFound {
            input: source.to_string(),
            attempts,
        })
    }
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("abi-mcp/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Error::Network {
            url: String::new(),
            status: None,
            message: format!("failed to build HTTP client: {e}"),
        })
}

/// Map a transport failure onto the crate error.
pub(crate) fn network_error(url: &str, err: reqwest::Error) -> Error {
    Error::Network {
        url: url.to_string(),
        status: err.status().map(|s| s.as_u16()),
        message: err.to_string(),
    }
}

/// `Retry-After` in seconds, when present.
pub(crate) fn retry_after(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}
