//! Etherscan v2 multichain API
//!
//! One endpoint serves every supported chain; the chain is picked with the
//! `chainid` query parameter.

use alloy::primitives::Address;
use serde::Deserialize;
use serde_json::Value;

use super::proxy::detect_proxy;
use super::{network_error, normalize_address, retry_after, FetchOptions, FetchResult, SourceKind};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::networks::{get_network, NetworkConfig};
use crate::runtime::ChainClient;

const SERVICE: &str = "Etherscan";

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    result: Value,
}

/// Fields of a `getsourcecode` result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    pub abi: Vec<Value>,
    pub contract_name: Option<String>,
    pub compiler_version: Option<String>,
    pub source_code: Option<String>,
    /// Implementation address Etherscan itself reports for proxies
    pub implementation: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EtherscanFetcher {
    http: reqwest::Client,
    config: Config,
}

impl EtherscanFetcher {
    pub fn new(http: reqwest::Client, config: &Config) -> Self {
        Self {
            http,
            config: config.clone(),
        }
    }

    pub async fn fetch(&self, source: &str, options: &FetchOptions) -> Result<FetchResult> {
        let address = normalize_address(source)?;
        let network = get_network(&options.network)?;
        let api_key = options
            .api_key
            .as_deref()
            .or(self.config.etherscan_api_key.as_deref());

        let info = self.source_info(&address, network.chain_id, api_key).await?;
        let mut result = FetchResult::new(info.abi, SourceKind::Etherscan, address.clone());
        result.contract_name = info.contract_name;
        result.compiler_version = info.compiler_version;
        result.source_code = info.source_code;

        if options.detect_proxy {
            let implementation = self
                .find_implementation(&address, network, options)
                .await
                .or(info.implementation);
            if let Some(implementation) = implementation {
                self.follow_proxy(&mut result, &implementation, network.chain_id, api_key)
                    .await;
            }
        }
        Ok(result)
    }

    async fn source_info(
        &self,
        address: &str,
        chain_id: u64,
        api_key: Option<&str>,
    ) -> Result<SourceInfo> {
        let url = &self.config.etherscan_api_url;
        let chain_id = chain_id.to_string();
        let mut query = vec![
            ("chainid", chain_id.as_str()),
            ("module", "contract"),
            ("action", "getsourcecode"),
            ("address", address),
        ];
        if let Some(key) = api_key {
            query.push(("apikey", key));
        }

        let response = self
            .http
            .get(url)
            .query(&query)
            .send()
            .await
            .map_err(|e| network_error(url, e))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited {
                url: url.clone(),
                retry_after: retry_after(&response),
            });
        }
        if !status.is_success() {
            return Err(Error::Network {
                url: url.clone(),
                status: Some(status.as_u16()),
                message: status.canonical_reason().unwrap_or("request failed").to_string(),
            });
        }

        let body = response.text().await.map_err(|e| network_error(url, e))?;
        parse_source_response(&body, address, url)
    }

    /// Probe the chain for an implementation address. Failures only log.
    async fn find_implementation(
        &self,
        address: &str,
        network: &NetworkConfig,
        options: &FetchOptions,
    ) -> Option<String> {
        let rpc_url = options
            .rpc_url
            .clone()
            .unwrap_or_else(|| self.config.rpc_url_for(network));
        let client = match ChainClient::new(&rpc_url, self.config.request_timeout()) {
            Ok(client) => client.with_chain_id(network.chain_id),
            Err(e) => {
                tracing::warn!(error = %e, "skipping proxy detection");
                return None;
            }
        };
        let address: Address = address.parse().ok()?;
        detect_proxy(&client, address)
            .await
            .map(|a| format!("{a:#x}"))
    }

    /// Replace the proxy ABI with the implementation's, keeping the proxy address.
    async fn follow_proxy(
        &self,
        result: &mut FetchResult,
        implementation: &str,
        chain_id: u64,
        api_key: Option<&str>,
    ) {
        let implementation = implementation.to_lowercase();
        result.is_proxy = true;
        result.implementation_address = Some(implementation.clone());

        match self.source_info(&implementation, chain_id, api_key).await {
            Ok(info) => {
                tracing::info!(%implementation, "using implementation ABI");
                result.abi = info.abi;
                result.contract_name = info.contract_name.or(result.contract_name.take());
                result.compiler_version = info.compiler_version.or(result.compiler_version.take());
                result.source_code = info.source_code.or(result.source_code.take());
            }
            Err(e) => {
                tracing::warn!(%implementation, error = %e, "implementation ABI unavailable, keeping proxy ABI");
            }
        }
    }
}

fn is_not_verified(text: &str) -> bool {
    text.to_lowercase().contains("not verified")
}

/// Interpret a `getsourcecode` (or `getabi`) response body.
pub fn parse_source_response(body: &str, address: &str, url: &str) -> Result<SourceInfo> {
    let response: ApiResponse = serde_json::from_str(body)
        .map_err(|e| Error::parse(format!("invalid Etherscan response: {}", e)))?;

    if response.status != "1" {
        let detail = response.result.as_str().unwrap_or(&response.message).to_string();
        let lowered = detail.to_lowercase();
        if lowered.contains("rate limit") {
            return Err(Error::RateLimited {
                url: url.to_string(),
                retry_after: None,
            });
        }
        if is_not_verified(&detail) {
            return Err(Error::NotVerified {
                address: address.to_string(),
                service: SERVICE.to_string(),
            });
        }
        return Err(Error::Network {
            url: url.to_string(),
            status: None,
            message: detail,
        });
    }

    let (abi_text, entry) = match &response.result {
        Value::String(abi) => (abi.clone(), None),
        Value::Array(items) => {
            let entry = items
                .first()
                .ok_or_else(|| Error::parse("Etherscan returned an empty result"))?;
            let abi = entry.get("ABI").and_then(Value::as_str).unwrap_or_default();
            (abi.to_string(), Some(entry))
        }
        _ => return Err(Error::parse("unexpected Etherscan result shape")),
    };

    if is_not_verified(&abi_text) || abi_text.is_empty() {
        return Err(Error::NotVerified {
            address: address.to_string(),
            service: SERVICE.to_string(),
        });
    }

    let abi = match serde_json::from_str::<Value>(&abi_text) {
        Ok(Value::Array(entries)) => entries,
        Ok(_) => return Err(Error::parse("Etherscan ABI is not a JSON array")),
        Err(e) => return Err(Error::parse(format!("Etherscan ABI is not valid JSON: {}", e))),
    };

    let field = |key: &str| {
        entry
            .and_then(|e| e.get(key))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    let implementation = match field("Proxy").as_deref() {
        Some("1") => field("Implementation"),
        _ => None,
    };

    Ok(SourceInfo {
        abi,
        contract_name: field("ContractName"),
        compiler_version: field("CompilerVersion"),
        source_code: field("SourceCode"),
        implementation,
    })
}
