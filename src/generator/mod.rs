//! Server generation: mapped tools and resources → a complete file set
//!
//! Generation is pure. Every output is rendered before anything is returned,
//! so a rendering failure means no files at all. Writing is a separate step
//! in [`writer`].

pub mod context;
pub mod render;
pub mod writer;

use serde::Serialize;

use crate::abi::{is_valid_address, ParsedContract};
use crate::error::{Error, Result};
use crate::manifest::ServerManifest;
use crate::mapper::{MappedResource, MappedTool};
use crate::networks::get_network;

pub use context::{display_name, package_name, RenderContext};
pub use render::{BuiltinRenderer, TemplateRenderer, OUTPUT_FILES};
pub use writer::write_server;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateOptions {
    pub server_name: Option<String>,
    pub read_only: bool,
    pub include_events: bool,
    pub simulate_default: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            server_name: None,
            read_only: false,
            include_events: true,
            simulate_default: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerateRequest<'a> {
    pub contract: &'a ParsedContract,
    pub tools: &'a [MappedTool],
    pub resources: &'a [MappedResource],
    pub address: &'a str,
    pub network: &'a str,
    pub contract_name: Option<&'a str>,
    pub options: GenerateOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedFile {
    /// Path relative to the output directory
    pub path: String,
    pub content: String,
    pub executable: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedServer {
    pub files: Vec<GeneratedFile>,
    pub tool_count: usize,
    pub resource_count: usize,
    pub read_tools: Vec<String>,
    pub write_tools: Vec<String>,
    pub events: Vec<String>,
    pub server_name: String,
    pub package_name: String,
    pub contract_address: String,
    pub network: String,
}

impl GeneratedServer {
    pub fn file(&self, path: &str) -> Option<&GeneratedFile> {
        self.files.iter().find(|f| f.path == path)
    }
}

pub struct ServerGenerator {
    renderer: Box<dyn TemplateRenderer>,
}

impl Default for ServerGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerGenerator {
    pub fn new() -> Self {
        Self::with_renderer(BuiltinRenderer)
    }

    pub fn with_renderer<R: TemplateRenderer + 'static>(renderer: R) -> Self {
        Self {
            renderer: Box::new(renderer),
        }
    }

    pub fn generate(&self, request: &GenerateRequest<'_>) -> Result<GeneratedServer> {
        let options = &request.options;
        let network = get_network(request.network)
            .map_err(|_| Error::Generation(format!("unknown network '{}'", request.network)))?;
        if !is_valid_address(request.address) {
            return Err(Error::InvalidAddress(request.address.to_string()));
        }
        let address = request.address.to_lowercase();

        let server_name = display_name(
            options.server_name.as_deref(),
            request.contract_name,
            request.contract.standard,
            &address,
        );
        let package = package_name(&server_name);

        let read_tools: Vec<MappedTool> =
            request.tools.iter().filter(|t| t.is_read()).cloned().collect();
        let write_tools: Vec<MappedTool> = if options.read_only {
            Vec::new()
        } else {
            request.tools.iter().filter(|t| !t.is_read()).cloned().collect()
        };
        let resources: Vec<MappedResource> = if options.include_events {
            request.resources.to_vec()
        } else {
            Vec::new()
        };

        let manifest = ServerManifest {
            server_name: server_name.clone(),
            package_name: package.clone(),
            version: "0.1.0".to_string(),
            network: network.name.to_string(),
            chain_id: network.chain_id,
            contract_address: address.clone(),
            contract_name: request.contract_name.map(str::to_string),
            read_only: options.read_only,
            include_events: options.include_events,
            simulate_default: options.simulate_default,
            standard: request.contract.standard,
            abi: request.contract.raw.clone(),
        };

        let context = RenderContext {
            manifest,
            network: network.clone(),
            read_tools,
            write_tools,
            resources,
            runtime_version: env!("CARGO_PKG_VERSION").to_string(),
        };

        let files = OUTPUT_FILES
            .iter()
            .map(|path| {
                Ok(GeneratedFile {
                    path: path.to_string(),
                    content: self.renderer.render(path, &context)?,
                    executable: false,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::info!(
            server = %server_name,
            tools = context.tool_count(),
            resources = context.resources.len(),
            "generated server"
        );

        Ok(GeneratedServer {
            files,
            tool_count: context.tool_count(),
            resource_count: context.resources.len(),
            read_tools: context.read_tools.iter().map(|t| t.name.clone()).collect(),
            write_tools: context.write_tools.iter().map(|t| t.name.clone()).collect(),
            events: context.resources.iter().map(|r| r.original_name.clone()).collect(),
            server_name,
            package_name: package,
            contract_address: address,
            network: network.name.to_string(),
        })
    }
}
