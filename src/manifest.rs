//! The `mcp-server.json` document a generated server runs from

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::abi::{parse_abi, ParsedContract, Standard};
use crate::error::{Error, Result};
use crate::mapper::{map_contract, MappedContract};
use crate::networks::{get_network, NetworkConfig};

pub const MANIFEST_FILE: &str = "mcp-server.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerManifest {
    pub server_name: String,
    pub package_name: String,
    pub version: String,
    pub network: String,
    pub chain_id: u64,
    pub contract_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_name: Option<String>,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default = "default_true")]
    pub include_events: bool,
    #[serde(default = "default_true")]
    pub simulate_default: bool,
    #[serde(default)]
    pub standard: Option<Standard>,
    pub abi: Value,
}

fn default_true() -> bool {
    true
}

impl ServerManifest {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| Error::parse(format!("invalid {}: {}", MANIFEST_FILE, e)))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::FileNotFound(path.display().to_string()),
            _ => Error::Io(e),
        })?;
        Self::from_json(&text)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::Generation(format!("cannot serialize manifest: {}", e)))
    }

    pub fn network_config(&self) -> Result<&'static NetworkConfig> {
        get_network(&self.network)
    }

    /// Parse the embedded ABI and map it the way generation did.
    pub fn contract(&self) -> Result<(ParsedContract, MappedContract)> {
        let contract = parse_abi(&self.abi)?;
        let mut mapped = map_contract(&contract, self.simulate_default);
        if self.read_only {
            mapped.tools.retain(|t| t.is_read());
        }
        if !self.include_events {
            mapped.resources.clear();
        }
        Ok((contract, mapped))
    }
}
