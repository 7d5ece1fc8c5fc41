//! Plain entry points over the fetch → parse → map → generate stages

use serde::Serialize;
use serde_json::Value;

use crate::abi::{parse_abi, validate_abi, ParsedContract, ValidationReport};
use crate::config::Config;
use crate::error::Result;
use crate::fetch::{is_address, FetchOptions, FetchResult, FetcherRegistry};
use crate::generator::{GenerateOptions, GenerateRequest, GeneratedServer, ServerGenerator};
use crate::mapper::{map_contract, MappedContract, ToolCategory};

/// Used when a file source is generated without `--address`; `CONTRACT_ADDRESS`
/// must then be set when the server runs.
pub const PLACEHOLDER_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

pub async fn fetch(source: &str, options: &FetchOptions, config: &Config) -> Result<FetchResult> {
    FetcherRegistry::new(config)?.fetch(source, options).await
}

pub fn parse(abi: &Value) -> Result<ParsedContract> {
    parse_abi(abi)
}

pub fn map(contract: &ParsedContract, simulate_default: bool) -> MappedContract {
    map_contract(contract, simulate_default)
}

pub fn validate(abi: &Value, strict: bool) -> ValidationReport {
    validate_abi(abi, strict)
}

/// Parse, map and generate a server for a fetched ABI.
///
/// The contract address is `address` when given, else the fetched address.
pub fn generate(
    fetched: &FetchResult,
    address: Option<&str>,
    network: &str,
    options: GenerateOptions,
) -> Result<GeneratedServer> {
    let contract = parse(&fetched.abi_json())?;
    let mapped = map(&contract, options.simulate_default);

    let address = match address {
        Some(address) => address.to_string(),
        None if is_address(&fetched.source_location) => fetched.source_location.clone(),
        None => {
            tracing::warn!(
                "no contract address given; using {} (set CONTRACT_ADDRESS when running)",
                PLACEHOLDER_ADDRESS
            );
            PLACEHOLDER_ADDRESS.to_string()
        }
    };

    ServerGenerator::new().generate(&GenerateRequest {
        contract: &contract,
        tools: &mapped.tools,
        resources: &mapped.resources,
        address: &address,
        network,
        contract_name: fetched.contract_name.as_deref(),
        options,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolSummary {
    pub name: String,
    pub category: ToolCategory,
    pub signature: String,
}

/// What `inspect` prints about a contract.
#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    pub source: String,
    pub source_kind: String,
    pub contract_name: Option<String>,
    pub compiler_version: Option<String>,
    pub standard: Option<String>,
    pub is_proxy: bool,
    pub implementation_address: Option<String>,
    pub function_count: usize,
    pub event_count: usize,
    pub error_count: usize,
    pub tools: Vec<ToolSummary>,
    pub events: Vec<String>,
    pub errors: Vec<String>,
    pub has_constructor: bool,
    pub has_fallback: bool,
    pub has_receive: bool,
    pub warnings: Vec<String>,
}

impl InspectReport {
    pub fn tools_in(&self, category: ToolCategory) -> impl Iterator<Item = &ToolSummary> {
        self.tools.iter().filter(move |t| t.category == category)
    }
}

pub fn inspect(fetched: &FetchResult) -> Result<InspectReport> {
    let abi = fetched.abi_json();
    let contract = parse(&abi)?;
    let mapped = map(&contract, true);
    let report = validate(&abi, true);

    Ok(InspectReport {
        source: fetched.source_location.clone(),
        source_kind: fetched.source_kind.to_string(),
        contract_name: fetched.contract_name.clone(),
        compiler_version: fetched.compiler_version.clone(),
        standard: contract.standard.map(|s| s.name().to_string()),
        is_proxy: fetched.is_proxy,
        implementation_address: fetched.implementation_address.clone(),
        function_count: contract.functions.len(),
        event_count: contract.events.len(),
        error_count: contract.errors.len(),
        tools: mapped
            .tools
            .iter()
            .map(|t| ToolSummary {
                name: t.name.clone(),
                category: t.category,
                signature: t.abi_signature.clone(),
            })
            .collect(),
        events: contract.events.iter().map(|e| e.signature()).collect(),
        errors: contract.errors.iter().map(|e| e.signature()).collect(),
        has_constructor: contract.has_constructor,
        has_fallback: contract.has_fallback,
        has_receive: contract.has_receive,
        warnings: report.issues.iter().map(|i| i.to_string()).collect(),
    })
}
