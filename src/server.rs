//! MCP server handler for one deployed contract

use std::sync::Arc;

use alloy::primitives::Address;
use anyhow::Context;
use rmcp::{
    model::*,
    service::{RequestContext, RoleServer, ServiceExt},
    transport::streamable_http_server::{
        session::local::LocalSessionManager, StreamableHttpService,
    },
    ErrorData as McpError, ServerHandler,
};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::abi::{Event, Function};
use crate::config::{Config, RuntimeEnv};
use crate::manifest::ServerManifest;
use crate::mapper::functions::{GET_GAS_PRICES, QUERY_EVENTS};
use crate::mapper::{MappedResource, MappedTool};
use crate::networks::NetworkConfig;
use crate::runtime::{ChainClient, ContractExecutor, ExecutorOptions, TxError, TxSigner};

pub const ABI_RESOURCE_URI: &str = "contract://abi";
pub const INFO_RESOURCE_URI: &str = "contract://info";

/// Events returned when an event resource is read.
pub const RESOURCE_EVENT_LIMIT: usize = 50;

/// Arguments of the built-in `query_events` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct QueryEventsArgs {
    /// Event name as declared in the ABI or as listed under `events://`
    pub event: String,
    /// First block to search (default: 1000 blocks before `to_block`)
    #[serde(default)]
    pub from_block: Option<u64>,
    /// Last block to search (default: latest)
    #[serde(default)]
    pub to_block: Option<u64>,
    /// Keep only the most recent N events
    #[serde(default)]
    pub limit: Option<usize>,
}

struct ToolBinding {
    tool: MappedTool,
    function: Function,
    keys: Vec<String>,
}

struct EventBinding {
    resource: MappedResource,
    event: Event,
    names: Vec<String>,
}

struct HandlerState {
    manifest: ServerManifest,
    network: &'static NetworkConfig,
    executor: ContractExecutor,
    tools: Vec<ToolBinding>,
    events: Vec<EventBinding>,
}

/// MCP server handler
#[derive(Clone)]
pub struct ContractMcpHandler {
    state: Arc<HandlerState>,
}

impl ContractMcpHandler {
    /// Bind the manifest's mapped tools and resources to `executor`.
    pub fn new(manifest: ServerManifest, executor: ContractExecutor) -> crate::Result<Self> {
        let network = manifest.network_config()?;
        let (contract, mapped) = manifest.contract()?;
        let executor = executor.with_errors(&contract.errors);

        let tools = mapped
            .tools
            .into_iter()
            .filter_map(|tool| {
                let function = contract
                    .functions
                    .iter()
                    .find(|f| f.signature() == tool.abi_signature)?
                    .clone();
                let keys = tool.params.iter().map(|p| p.name.clone()).collect();
                Some(ToolBinding {
                    tool,
                    function,
                    keys,
                })
            })
            .collect();

        let events = mapped
            .resources
            .into_iter()
            .filter_map(|resource| {
                let event = contract
                    .events
                    .iter()
                    .find(|e| e.signature() == resource.abi_signature)?
                    .clone();
                let names = resource.fields.iter().map(|f| f.name.clone()).collect();
                Some(EventBinding {
                    resource,
                    event,
                    names,
                })
            })
            .collect();

        Ok(Self {
            state: Arc::new(HandlerState {
                manifest,
                network,
                executor,
                tools,
                events,
            }),
        })
    }

    pub fn manifest(&self) -> &ServerManifest {
        &self.state.manifest
    }

    pub fn executor(&self) -> &ContractExecutor {
        &self.state.executor
    }

    /// Mapped contract tools followed by the built-ins.
    pub fn tools(&self) -> Vec<Tool> {
        let mut tools: Vec<Tool> = self
            .state
            .tools
            .iter()
            .map(|b| {
                Tool::new(
                    b.tool.name.clone(),
                    b.tool.description.clone(),
                    Arc::new(b.tool.input_schema.clone()),
                )
            })
            .collect();

        tools.push(Tool::new(
            GET_GAS_PRICES.to_string(),
            format!(
                "Current gas prices on {} as slow, standard, fast and instant tiers (wei and gwei).",
                self.state.network.display_name
            ),
            Arc::new({
                let mut schema = Map::new();
                schema.insert("type".to_string(), Value::String("object".to_string()));
                schema.insert("properties".to_string(), Value::Object(Map::new()));
                schema
            }),
        ));

        if !self.state.events.is_empty() {
            let schema = serde_json::to_value(schemars::schema_for!(QueryEventsArgs))
                .ok()
                .and_then(|v| v.as_object().cloned())
                .unwrap_or_default();
            let names: Vec<&str> = self
                .state
                .events
                .iter()
                .map(|b| b.event.name.as_str())
                .collect();
            tools.push(Tool::new(
                QUERY_EVENTS.to_string(),
                format!(
                    "Query decoded contract events over a block range. Events: {}.",
                    names.join(", ")
                ),
                Arc::new(schema),
            ));
        }
        tools
    }

    pub fn resources(&self) -> Vec<Resource> {
        let mut resources: Vec<Resource> = self
            .state
            .events
            .iter()
            .map(|b| {
                let mut resource = RawResource::new(b.resource.uri.clone(), b.event.name.clone());
                resource.description = Some(format!(
                    "{}. Returns the last {} occurrences within the most recent blocks.",
                    b.resource.description, RESOURCE_EVENT_LIMIT
                ));
                resource.mime_type = Some("application/json".to_string());
                resource.no_annotation()
            })
            .collect();

        let mut abi = RawResource::new(ABI_RESOURCE_URI, "Contract ABI");
        abi.description = Some("The JSON ABI this server was generated from".to_string());
        abi.mime_type = Some("application/json".to_string());
        resources.push(abi.no_annotation());

        let mut info = RawResource::new(INFO_RESOURCE_URI, "Contract Info");
        info.description =
            Some("Address, network, mode and signer status of this server".to_string());
        info.mime_type = Some("application/json".to_string());
        resources.push(info.no_annotation());

        resources
    }

    /// Run a tool. Runtime failures come back as error-flagged results.
    pub async fn dispatch(
        &self,
        name: &str,
        args: Map<String, Value>,
    ) -> Result<CallToolResult, McpError> {
        match name {
            GET_GAS_PRICES => {
                return Ok(match self.state.executor.gas_prices().await {
                    Ok(prices) => json_result(&prices),
                    Err(e) => tx_error_result(&e),
                });
            }
            QUERY_EVENTS if !self.state.events.is_empty() => {
                let args: QueryEventsArgs = serde_json::from_value(Value::Object(args))
                    .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
                return self.query_events(args).await;
            }
            _ => {}
        }

        let binding = self
            .state
            .tools
            .iter()
            .find(|b| b.tool.name == name)
            .ok_or_else(|| McpError::invalid_params(format!("Unknown tool: {}", name), None))?;

        tracing::debug!(tool = %name, "calling contract tool");
        let executor = &self.state.executor;
        if binding.tool.is_read() {
            return Ok(
                match executor.read(&binding.function, &binding.keys, &args).await {
                    Ok(value) => json_result(&value),
                    Err(e) => tx_error_result(&e),
                },
            );
        }

        match executor.write(&binding.function, &binding.keys, &args).await {
            Ok(outcome) => {
                let mut body = serde_json::to_value(&outcome)
                    .map_err(|e| McpError::internal_error(e.to_string(), None))?;
                if let (Some(hash), Value::Object(map)) = (&outcome.tx_hash, &mut body) {
                    map.insert(
                        "explorer_url".to_string(),
                        Value::String(self.state.network.tx_url(hash)),
                    );
                }
                let text = pretty(&body);
                Ok(if outcome.is_success() {
                    CallToolResult::success(vec![Content::text(text)])
                } else {
                    CallToolResult::error(vec![Content::text(text)])
                })
            }
            Err(e) => Ok(tx_error_result(&e)),
        }
    }

    async fn query_events(&self, args: QueryEventsArgs) -> Result<CallToolResult, McpError> {
        let binding = self
            .find_event(&args.event)
            .ok_or_else(|| McpError::invalid_params(format!("Unknown event: {}", args.event), None))?;
        Ok(
            match self
                .state
                .executor
                .query_events(
                    &binding.event,
                    &binding.names,
                    args.from_block,
                    args.to_block,
                    args.limit,
                )
                .await
            {
                Ok(events) => json_result(&events),
                Err(e) => tx_error_result(&e),
            },
        )
    }

    fn find_event(&self, name: &str) -> Option<&EventBinding> {
        self.state
            .events
            .iter()
            .find(|b| b.resource.name == name || b.event.name == name)
    }

    /// Text of a resource by URI.
    pub async fn read(&self, uri: &str) -> Result<String, McpError> {
        match uri {
            ABI_RESOURCE_URI => Ok(pretty(&self.state.manifest.abi)),
            INFO_RESOURCE_URI => Ok(pretty(&self.info_json())),
            _ => {
                let binding = self
                    .state
                    .events
                    .iter()
                    .find(|b| b.resource.uri == uri)
                    .ok_or_else(|| {
                        McpError::invalid_params(format!("Unknown resource URI: {}", uri), None)
                    })?;
                let events = self
                    .state
                    .executor
                    .query_events(
                        &binding.event,
                        &binding.names,
                        None,
                        None,
                        Some(RESOURCE_EVENT_LIMIT),
                    )
                    .await
                    .map_err(|e| {
                        McpError::internal_error(
                            format!("Failed to query {} events: {}", binding.event.name, e),
                            None,
                        )
                    })?;
                Ok(pretty(&Value::Array(events)))
            }
        }
    }

    fn info_json(&self) -> Value {
        let m = &self.state.manifest;
        let executor = &self.state.executor;
        json!({
            "name": m.server_name,
            "contract_name": m.contract_name,
            "address": executor.address().to_checksum(None),
            "network": self.state.network.name,
            "chain_id": m.chain_id,
            "explorer_url": self.state.network.address_url(&m.contract_address),
            "standard": m.standard.map(|s| s.name()),
            "read_only": executor.is_read_only(),
            "signer": executor.signer_address().map(|a| a.to_checksum(None)),
            "tools": self.state.tools.len(),
            "events": self.state.events.len(),
        })
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn json_result<T: serde::Serialize>(value: &T) -> CallToolResult {
    match serde_json::to_value(value) {
        Ok(value) => CallToolResult::success(vec![Content::text(pretty(&value))]),
        Err(e) => CallToolResult::error(vec![Content::text(e.to_string())]),
    }
}

fn tx_error_result(error: &TxError) -> CallToolResult {
    tracing::warn!(kind = error.kind(), error = %error, "tool call failed");
    let body = json!({ "error": error.kind(), "message": error.to_string() });
    CallToolResult::error(vec![Content::text(pretty(&body))])
}

impl ServerHandler for ContractMcpHandler {
    fn get_info(&self) -> ServerInfo {
        let m = &self.state.manifest;
        let mode = if self.state.executor.is_read_only() {
            "Read-only: write functions are not exposed."
        } else if self.state.executor.signer_address().is_some() {
            "Write tools are simulated before sending and signed with the configured key."
        } else {
            "No PRIVATE_KEY is configured: write tools can be simulated with dry_run but not sent."
        };
        ServerInfo {
            protocol_version: ProtocolVersion::default(),
            capabilities: ServerCapabilities {
                prompts: None,
                resources: Some(ResourcesCapability {
                    subscribe: None,
                    list_changed: None,
                }),
                tools: Some(ToolsCapability {
                    list_changed: None,
                }),
                logging: None,
                completions: None,
                experimental: None,
            },
            server_info: Implementation {
                name: m.package_name.clone(),
                version: m.version.clone(),
                title: Some(m.server_name.clone()),
                icons: None,
                website_url: Some(self.state.network.address_url(&m.contract_address)),
            },
            instructions: Some(format!(
                "Tools for contract {} on {}. Events are available as events:// resources and through query_events. {}",
                m.contract_address, self.state.network.display_name, mode
            )),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            tools: self.tools(),
            next_cursor: None,
        })
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        Ok(ListResourcesResult {
            resources: self.resources(),
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        let text = self.read(&request.uri).await?;
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::TextResourceContents {
                uri: request.uri,
                mime_type: Some("application/json".to_string()),
                text,
                meta: None,
            }],
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let args = request.arguments.unwrap_or_default();
        self.dispatch(&request.name, args).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Stdio,
    /// Streamable HTTP on `/mcp`
    Http { port: u16 },
}

/// Build the handler for `manifest`. `RPC_URL` and `CONTRACT_ADDRESS` from
/// `env` override the manifest; `PRIVATE_KEY` enables signing.
pub fn build_handler(
    manifest: ServerManifest,
    env: &RuntimeEnv,
    config: &Config,
) -> anyhow::Result<ContractMcpHandler> {
    let network = manifest.network_config()?;

    let client = match &env.rpc_url {
        Some(url) => ChainClient::new(url, config.request_timeout())?,
        None => ChainClient::new(&config.rpc_url_for(network), config.request_timeout())?
            .with_chain_id(network.chain_id),
    };

    let address_text = env
        .contract_address
        .as_deref()
        .unwrap_or(&manifest.contract_address);
    let address: Address = address_text
        .parse()
        .with_context(|| format!("Invalid contract address '{}'", address_text))?;

    let options = ExecutorOptions {
        read_only: manifest.read_only,
        simulate_default: manifest.simulate_default,
        receipt_timeout: config.receipt_timeout(),
        ..Default::default()
    };
    let mut executor = ContractExecutor::new(client, address, options);
    match &env.private_key {
        Some(key) if !manifest.read_only => {
            let signer = TxSigner::from_private_key(key).context("Failed to load PRIVATE_KEY")?;
            tracing::info!(signer = %signer.address(), "signing enabled");
            executor = executor.with_signer(signer);
        }
        Some(_) => tracing::info!("PRIVATE_KEY ignored: server is read-only"),
        None => {}
    }

    tracing::info!(
        server = %manifest.server_name,
        address = %address,
        network = network.name,
        rpc = %executor.client().rpc_url(),
        "starting MCP server"
    );
    Ok(ContractMcpHandler::new(manifest, executor)?)
}

/// Serve `manifest` until the client disconnects or Ctrl-C.
pub async fn run_manifest(
    manifest: ServerManifest,
    env: RuntimeEnv,
    config: &Config,
    transport: Transport,
) -> anyhow::Result<()> {
    let handler = build_handler(manifest, &env, config)?;

    match transport {
        Transport::Stdio => {
            let stdin = tokio::io::stdin();
            let stdout = tokio::io::stdout();

            let service = handler.serve((stdin, stdout)).await?;
            service.waiting().await?;
        }
        Transport::Http { port } => {
            let service = StreamableHttpService::new(
                move || Ok(handler.clone()),
                LocalSessionManager::default().into(),
                Default::default(),
            );
            let router = axum::Router::new().nest_service("/mcp", service);
            let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
                .await
                .with_context(|| format!("Failed to bind port {}", port))?;
            tracing::info!("listening on http://127.0.0.1:{}/mcp", port);
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = tokio::signal::ctrl_c().await;
                })
                .await?;
        }
    }
    Ok(())
}

/// Entry point of a generated server: `manifest_json` is its embedded
/// `mcp-server.json`.
pub async fn run_embedded(manifest_json: &str) -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing(false);

    let manifest =
        ServerManifest::from_json(manifest_json).context("Failed to parse embedded manifest")?;
    let mut config = Config::load_default();
    let env = RuntimeEnv::from_env();
    config.apply_env(&env);

    run_manifest(manifest, env, &config, Transport::Stdio).await
}

/// Log to stderr; stdout carries the stdio transport.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::client::test_support::mocked_client;
    use alloy::dyn_abi::DynSolValue;
    use alloy::primitives::{Bytes, U256};
    use alloy::transports::mock::Asserter;

    const ADDRESS: &str = "0x000000000000000000000000000000000000dead";

    fn manifest(read_only: bool) -> ServerManifest {
        ServerManifest {
            server_name: "Token MCP Server".into(),
            package_name: "token".into(),
            version: "0.1.0".into(),
            network: "mainnet".into(),
            chain_id: 1,
            contract_address: ADDRESS.into(),
            contract_name: Some("Token".into()),
            read_only,
            include_events: true,
            simulate_default: true,
            standard: None,
            abi: json!([
                {"type": "function", "name": "balanceOf", "inputs": [{"name": "account", "type": "address"}], "outputs": [{"name": "", "type": "uint256"}], "stateMutability": "view"},
                {"type": "function", "name": "transfer", "inputs": [{"name": "to", "type": "address"}, {"name": "amount", "type": "uint256"}], "outputs": [{"name": "", "type": "bool"}], "stateMutability": "nonpayable"},
                {"type": "event", "name": "Transfer", "inputs": [{"name": "from", "type": "address", "indexed": true}, {"name": "to", "type": "address", "indexed": true}, {"name": "value", "type": "uint256", "indexed": false}], "anonymous": false}
            ]),
        }
    }

    fn handler(read_only: bool) -> (ContractMcpHandler, Asserter) {
        let (client, asserter) = mocked_client();
        let options = ExecutorOptions {
            read_only,
            ..Default::default()
        };
        let executor = ContractExecutor::new(
            client.with_chain_id(1),
            ADDRESS.parse().unwrap(),
            options,
        );
        (
            ContractMcpHandler::new(manifest(read_only), executor).unwrap(),
            asserter,
        )
    }

    fn text(result: &CallToolResult) -> String {
        result.content[0].as_text().unwrap().text.clone()
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_get_info_describes_contract() {
        let (handler, _) = handler(false);
        let info = handler.get_info();
        assert_eq!(info.server_info.name, "token");
        assert_eq!(info.server_info.title, Some("Token MCP Server".to_string()));
        assert!(info.capabilities.tools.is_some());
        assert!(info.capabilities.resources.is_some());
        assert!(info.capabilities.prompts.is_none());
        assert!(info.instructions.unwrap().contains(ADDRESS));
    }

    #[test]
    fn test_tool_list_includes_builtins() {
        let (handler, _) = handler(false);
        let names: Vec<String> = handler.tools().iter().map(|t| t.name.to_string()).collect();
        assert_eq!(
            names,
            vec!["balance_of", "transfer", GET_GAS_PRICES, QUERY_EVENTS]
        );
        let query = handler
            .tools()
            .into_iter()
            .find(|t| t.name == QUERY_EVENTS)
            .unwrap();
        let properties = query.input_schema.get("properties").unwrap();
        assert!(properties.get("event").is_some());
        assert!(properties.get("from_block").is_some());
    }

    #[test]
    fn test_read_only_hides_write_tools() {
        let (handler, _) = handler(true);
        let names: Vec<String> = handler.tools().iter().map(|t| t.name.to_string()).collect();
        assert!(!names.contains(&"transfer".to_string()));
        assert!(names.contains(&"balance_of".to_string()));
    }

    #[test]
    fn test_resources() {
        let (handler, _) = handler(false);
        let uris: Vec<String> = handler.resources().iter().map(|r| r.uri.clone()).collect();
        assert_eq!(uris, vec!["events://transfer", ABI_RESOURCE_URI, INFO_RESOURCE_URI]);
    }

    #[tokio::test]
    async fn test_read_tool_returns_decoded_value() {
        let (handler, asserter) = handler(false);
        let output = DynSolValue::Tuple(vec![DynSolValue::Uint(U256::from(42), 256)])
            .abi_encode_params();
        asserter.push_success(&Bytes::from(output));

        let result = handler
            .dispatch("balance_of", args(json!({"account": ADDRESS})))
            .await
            .unwrap();
        assert_ne!(result.is_error, Some(true));
        assert_eq!(text(&result), "\"42\"");
    }

    #[tokio::test]
    async fn test_contract_function_named_like_builtin_stays_reachable() {
        let mut manifest = manifest(true);
        manifest.abi = json!([
            {"type": "function", "name": "getGasPrices", "inputs": [], "outputs": [{"name": "", "type": "uint256"}], "stateMutability": "view"},
            {"type": "function", "name": "queryEvents", "inputs": [], "outputs": [{"name": "", "type": "uint256"}], "stateMutability": "view"},
            {"type": "event", "name": "Ping", "inputs": [], "anonymous": false}
        ]);
        let (client, asserter) = mocked_client();
        let executor = ContractExecutor::new(
            client.with_chain_id(1),
            ADDRESS.parse().unwrap(),
            ExecutorOptions {
                read_only: true,
                ..Default::default()
            },
        );
        let handler = ContractMcpHandler::new(manifest, executor).unwrap();

        let names: Vec<String> = handler.tools().iter().map(|t| t.name.to_string()).collect();
        assert_eq!(
            names,
            vec!["get_gas_prices_2", "query_events_2", GET_GAS_PRICES, QUERY_EVENTS]
        );

        let output = DynSolValue::Tuple(vec![DynSolValue::Uint(U256::from(7), 256)])
            .abi_encode_params();
        asserter.push_success(&Bytes::from(output));
        let result = handler
            .dispatch("get_gas_prices_2", Map::new())
            .await
            .unwrap();
        assert_ne!(result.is_error, Some(true));
        assert_eq!(text(&result), "\"7\"");
    }

    #[tokio::test]
    async fn test_runtime_error_is_tool_error() {
        let (handler, _) = handler(false);
        let result = handler
            .dispatch("balance_of", args(json!({"account": "not-an-address"})))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(text(&result).contains("invalid_argument"));
    }

    #[tokio::test]
    async fn test_write_without_signer_is_tool_error() {
        let (handler, asserter) = handler(false);
        // eth_call simulation succeeds
        asserter.push_success(&Bytes::new());
        let result = handler
            .dispatch(
                "transfer",
                args(json!({
                    "to": ADDRESS,
                    "amount": "1",
                    "gas_limit": "60000",
                    "gas_price": "1000000000"
                })),
            )
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(text(&result).contains("signer_not_configured"));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let (handler, _) = handler(false);
        assert!(handler.dispatch("nope", Map::new()).await.is_err());
    }

    #[tokio::test]
    async fn test_abi_resource() {
        let (handler, _) = handler(false);
        let text = handler.read(ABI_RESOURCE_URI).await.unwrap();
        let abi: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(abi.as_array().unwrap().len(), 3);

        let info: Value = serde_json::from_str(&handler.read(INFO_RESOURCE_URI).await.unwrap()).unwrap();
        assert_eq!(info["chain_id"], 1);
        assert_eq!(info["signer"], Value::Null);
        assert!(handler.read("events://nope").await.is_err());
    }

    #[test]
    fn test_build_handler_rejects_bad_key() {
        let env = RuntimeEnv {
            rpc_url: Some("http://127.0.0.1:8545".into()),
            private_key: Some("0x1234".into()),
            ..Default::default()
        };
        assert!(build_handler(manifest(false), &env, &Config::default()).is_err());
    }

    #[test]
    fn test_build_handler_env_overrides() {
        let env = RuntimeEnv {
            rpc_url: Some("http://127.0.0.1:8545".into()),
            contract_address: Some("0x000000000000000000000000000000000000bEEF".into()),
            private_key: Some(
                "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80".into(),
            ),
            ..Default::default()
        };
        let handler = build_handler(manifest(false), &env, &Config::default()).unwrap();
        assert_eq!(
            handler.executor().address(),
            "0x000000000000000000000000000000000000bEEF".parse::<Address>().unwrap()
        );
        assert!(handler.executor().signer_address().is_some());
        assert_eq!(handler.executor().client().rpc_url(), "http://127.0.0.1:8545");
    }
}
