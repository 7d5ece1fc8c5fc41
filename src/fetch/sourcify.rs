//! Sourcify verified-source repository

use alloy::primitives::Address;
use serde::Deserialize;
use serde_json::Value;

use super::file::compilation_target;
use super::{network_error, normalize_address, retry_after, FetchOptions, FetchResult, SourceKind};
use crate::error::{Error, Result};
use crate::networks::get_network;

const SERVICE: &str = "Sourcify";

/// One file of a verified contract.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceFile {
    pub name: String,
    #[serde(default)]
    pub path: Option<String>,
    pub content: String,
}

/// Listing endpoints return either a bare array or `{"status", "files"}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FileListing {
    Files(Vec<SourceFile>),
    Wrapped { files: Vec<SourceFile> },
}

#[derive(Debug, Clone)]
pub struct SourcifyFetcher {
    http: reqwest::Client,
    api_url: String,
}

impl SourcifyFetcher {
    pub fn new(http: reqwest::Client, api_url: &str) -> Self {
        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn fetch(&self, source: &str, options: &FetchOptions) -> Result<FetchResult> {
        let address = normalize_address(source)?;
        let network = get_network(&options.network)?;
        let checksummed = address
            .parse::<Address>()
            .map(|a| a.to_checksum(None))
            .map_err(|_| Error::InvalidAddress(address.clone()))?;

        let endpoints = [
            ("full_match", format!("{}/files/{}/{}", self.api_url, network.chain_id, checksummed)),
            ("any_match", format!("{}/files/any/{}/{}", self.api_url, network.chain_id, checksummed)),
        ];

        for (label, url) in &endpoints {
            match self.list_files(url).await? {
                Some(files) => {
                    tracing::debug!(match_kind = label, files = files.len(), "sourcify files");
                    return build_result(&files, &address);
                }
                None => tracing::debug!(match_kind = label, "no sourcify match"),
            }
        }

        Err(Error::NotVerified {
            address,
            service: SERVICE.to_string(),
        })
    }

    /// `None` on 404.
    async fn list_files(&self, url: &str) -> Result<Option<Vec<SourceFile>>> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| network_error(url, e))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited {
                url: url.to_string(),
                retry_after: retry_after(&response),
            });
        }
        if !status.is_success() {
            return Err(Error::Network {
                url: url.to_string(),
                status: Some(status.as_u16()),
                message: status.canonical_reason().unwrap_or("request failed").to_string(),
            });
        }

        let body = response.text().await.map_err(|e| network_error(url, e))?;
        parse_files(&body).map(Some)
    }
}

pub fn parse_files(body: &str) -> Result<Vec<SourceFile>> {
    let listing: FileListing = serde_json::from_str(body)
        .map_err(|e| Error::parse(format!("invalid Sourcify response: {}", e)))?;
    Ok(match listing {
        FileListing::Files(files) | FileListing::Wrapped { files } => files,
    })
}

/// Pull ABI, compiler and name out of `metadata.json`, and join the sources.
pub fn build_result(files: &[SourceFile], address: &str) -> Result<FetchResult> {
    let metadata_file = files
        .iter()
        .find(|f| f.name == "metadata.json")
        .ok_or_else(|| Error::parse("Sourcify response has no metadata.json"))?;

    let metadata: Value = serde_json::from_str(&metadata_file.content)
        .map_err(|e| Error::parse(format!("invalid metadata.json: {}", e)))?;
    // Some responses double-encode the metadata as a JSON string
    let metadata = match metadata {
        Value::String(inner) => serde_json::from_str(&inner)
            .map_err(|e| Error::parse(format!("invalid metadata.json: {}", e)))?,
        other => other,
    };

    let abi = match metadata.pointer("/output/abi") {
        Some(Value::Array(entries)) if !entries.is_empty() => entries.clone(),
        Some(Value::Array(_)) => return Err(Error::parse("ABI is empty")),
        _ => return Err(Error::parse("metadata.json has no output.abi")),
    };

    let sources: Vec<String> = files
        .iter()
        .filter(|f| f.name.ends_with(".sol"))
        .map(|f| format!("// File: {}\n{}", f.path.as_deref().unwrap_or(&f.name), f.content))
        .collect();

    let mut result = FetchResult::new(abi, SourceKind::Sourcify, address);
    result.contract_name = compilation_target(&metadata);
    result.compiler_version = metadata
        .pointer("/compiler/version")
        .and_then(Value::as_str)
        .map(str::to_string);
    result.source_code = (!sources.is_empty()).then(|| sources.join("\n\n"));
    Ok(result)
}
