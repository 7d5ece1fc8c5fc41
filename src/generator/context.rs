//! Naming and the shared context every output file is rendered from

use serde::Serialize;

use crate::abi::Standard;
use crate::manifest::ServerManifest;
use crate::mapper::{MappedResource, MappedTool};
use crate::networks::NetworkConfig;

const NAME_SUFFIX: &str = " MCP Server";

/// Display name: override, then contract name, then standard, then the
/// abbreviated address.
pub fn display_name(
    name_override: Option<&str>,
    contract_name: Option<&str>,
    standard: Option<Standard>,
    address: &str,
) -> String {
    fn non_empty<'a>(s: Option<&'a str>) -> Option<&'a str> {
        s.map(str::trim).filter(|s| !s.is_empty())
    }

    if let Some(name) = non_empty(name_override) {
        return name.to_string();
    }
    if let Some(name) = non_empty(contract_name) {
        return format!("{}{}", name, NAME_SUFFIX);
    }
    if let Some(standard) = standard {
        return format!("{}{}", standard.name(), NAME_SUFFIX);
    }
    format!("Contract {}{}", abbreviate_address(address), NAME_SUFFIX)
}

/// `0xabcd…1234`
pub fn abbreviate_address(address: &str) -> String {
    if address.len() <= 10 || !address.is_ascii() {
        return address.to_string();
    }
    format!("{}…{}", &address[..6], &address[address.len() - 4..])
}

/// Package-safe identifier derived from a display name.
pub fn package_name(display_name: &str) -> String {
    let base = display_name
        .strip_suffix(NAME_SUFFIX)
        .unwrap_or(display_name)
        .to_lowercase();

    let mut name = String::with_capacity(base.len());
    for c in base.chars() {
        let c = if c.is_ascii_alphanumeric() { c } else { '_' };
        if c == '_' && name.ends_with('_') {
            continue;
        }
        name.push(c);
    }
    let name = name.trim_matches('_');

    if name.is_empty() {
        "mcp_server".to_string()
    } else if name.starts_with(|c: char| c.is_ascii_digit()) {
        format!("contract_{}", name)
    } else {
        name.to_string()
    }
}

/// Everything a renderer may need, computed once per generation.
#[derive(Debug, Clone, Serialize)]
pub struct RenderContext {
    pub manifest: ServerManifest,
    pub network: NetworkConfig,
    pub read_tools: Vec<MappedTool>,
    pub write_tools: Vec<MappedTool>,
    pub resources: Vec<MappedResource>,
    /// Version of this crate the generated server depends on
    pub runtime_version: String,
}

impl RenderContext {
    pub fn tool_count(&self) -> usize {
        self.read_tools.len() + self.write_tools.len()
    }
}
