//! Rendering of the generated files
//!
//! A [`TemplateRenderer`] turns a template name plus the shared
//! [`RenderContext`] into file text. The built-in renderer builds each file
//! with plain string formatting.

use std::fmt::Write;

use super::context::RenderContext;
use crate::error::{Error, Result};
use crate::mapper::functions::{GET_GAS_PRICES, QUERY_EVENTS};
use crate::mapper::{MappedResource, MappedTool};

pub const MAIN_RS: &str = "src/main.rs";
pub const MANIFEST_JSON: &str = "mcp-server.json";
pub const README_MD: &str = "README.md";
pub const CARGO_TOML: &str = "Cargo.toml";
pub const ENV_EXAMPLE: &str = ".env.example";

/// Output files in the order they are emitted.
pub const OUTPUT_FILES: [&str; 5] = [MAIN_RS, MANIFEST_JSON, README_MD, CARGO_TOML, ENV_EXAMPLE];

pub trait TemplateRenderer: Send + Sync {
    fn render(&self, template: &str, context: &RenderContext) -> Result<String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinRenderer;

impl TemplateRenderer for BuiltinRenderer {
    fn render(&self, template: &str, context: &RenderContext) -> Result<String> {
        let text = match template {
            MAIN_RS => render_main(context),
            MANIFEST_JSON => return context.manifest.to_json_pretty().map(|s| s + "\n"),
            README_MD => render_readme(context),
            CARGO_TOML => render_cargo_toml(context),
            ENV_EXAMPLE => render_env_example(context),
            other => return Err(Error::Generation(format!("unknown template '{}'", other))),
        };
        text.map_err(|e| Error::Generation(format!("failed to render {}: {}", template, e)))
    }
}

fn render_main(ctx: &RenderContext) -> std::result::Result<String, std::fmt::Error> {
    let m = &ctx.manifest;
    let mut out = String::new();
    writeln!(out, "//! {}", m.server_name)?;
    writeln!(out, "//!")?;
    writeln!(
        out,
        "//! MCP server for contract {} on {}.",
        m.contract_address, ctx.network.display_name
    )?;
    writeln!(
        out,
        "//! {} tools, {} event resources.",
        ctx.tool_count(),
        ctx.resources.len()
    )?;
    writeln!(out)?;
    writeln!(out, "const MANIFEST: &str = include_str!(\"../{}\");", MANIFEST_JSON)?;
    writeln!(out)?;
    writeln!(out, "#[tokio::main]")?;
    writeln!(out, "async fn main() -> anyhow::Result<()> {{")?;
    writeln!(out, "    abi_mcp::server::run_embedded(MANIFEST).await")?;
    writeln!(out, "}}")?;
    Ok(out)
}

fn render_cargo_toml(ctx: &RenderContext) -> std::result::Result<String, std::fmt::Error> {
    let mut out = String::new();
    writeln!(out, "[package]")?;
    writeln!(out, "name = \"{}\"", ctx.manifest.package_name)?;
    writeln!(out, "version = \"{}\"", ctx.manifest.version)?;
    writeln!(out, "edition = \"2021\"")?;
    writeln!(out, "description = \"{}\"", ctx.manifest.server_name.replace('"', "'"))?;
    writeln!(out)?;
    writeln!(out, "[dependencies]")?;
    writeln!(out, "abi-mcp = \"{}\"", ctx.runtime_version)?;
    writeln!(out, "anyhow = \"1.0\"")?;
    writeln!(out, "tokio = {{ version = \"1\", features = [\"full\"] }}")?;
    Ok(out)
}

fn render_env_example(ctx: &RenderContext) -> std::result::Result<String, std::fmt::Error> {
    let mut out = String::new();
    writeln!(out, "# JSON-RPC endpoint for {}", ctx.network.display_name)?;
    writeln!(out, "RPC_URL={}", ctx.network.rpc_url)?;
    writeln!(out)?;
    writeln!(out, "# Optional: override the contract address ({})", ctx.manifest.contract_address)?;
    writeln!(out, "CONTRACT_ADDRESS=")?;
    writeln!(out)?;
    if ctx.manifest.read_only {
        writeln!(out, "# Not used: this server is read-only")?;
    } else {
        writeln!(out, "# Optional: hex private key used to sign write transactions.")?;
        writeln!(out, "# Keep it out of version control.")?;
    }
    writeln!(out, "PRIVATE_KEY=")?;
    Ok(out)
}

fn render_readme(ctx: &RenderContext) -> std::result::Result<String, std::fmt::Error> {
    let m = &ctx.manifest;
    let mut out = String::new();

    writeln!(out, "# {}", m.server_name)?;
    writeln!(out)?;
    writeln!(
        out,
        "MCP server for [`{}`]({}) on {} (chain id {}).",
        m.contract_address,
        ctx.network.address_url(&m.contract_address),
        ctx.network.display_name,
        m.chain_id
    )?;
    if let Some(standard) = m.standard {
        writeln!(out)?;
        writeln!(out, "Detected standard: **{}** ({}).", standard, standard.description())?;
    }
    writeln!(out)?;
    writeln!(out, "| | |")?;
    writeln!(out, "|---|---|")?;
    writeln!(out, "| Read tools | {} |", ctx.read_tools.len())?;
    if !m.read_only {
        writeln!(out, "| Write tools | {} |", ctx.write_tools.len())?;
    }
    writeln!(out, "| Event resources | {} |", ctx.resources.len())?;
    writeln!(out, "| Mode | {} |", if m.read_only { "read-only" } else { "read/write" })?;
    writeln!(out)?;

    writeln!(out, "## Setup")?;
    writeln!(out)?;
    writeln!(out, "```sh")?;
    writeln!(out, "cp .env.example .env")?;
    writeln!(out, "cargo run --release")?;
    writeln!(out, "```")?;
    writeln!(out)?;
    writeln!(out, "The server speaks MCP over stdio. Logs go to stderr; set `RUST_LOG=debug` for more detail.")?;
    writeln!(out)?;

    writeln!(out, "## Read Operations")?;
    writeln!(out)?;
    write_tools(&mut out, &ctx.read_tools)?;

    if !m.read_only {
        writeln!(out, "## Write Operations")?;
        writeln!(out)?;
        if !ctx.write_tools.is_empty() {
            writeln!(
                out,
                "Write tools are simulated with `eth_call` before sending{}. \
                 Pass `dry_run: true` to stop after simulation. Signing needs `PRIVATE_KEY`.",
                if m.simulate_default { " unless `simulate: false` is given" } else { " when `simulate: true` is given" }
            )?;
            writeln!(out)?;
        }
        write_tools(&mut out, &ctx.write_tools)?;
    }

    if m.include_events {
        writeln!(out, "## Resources")?;
        writeln!(out)?;
        write_resources(&mut out, &ctx.resources)?;
    }

    writeln!(out, "## Built-in Tools")?;
    writeln!(out)?;
    writeln!(out, "- `{}`: slow, standard, fast and instant fee tiers", GET_GAS_PRICES)?;
    if m.include_events {
        writeln!(out, "- `{}`: logs of any contract event over a block range", QUERY_EVENTS)?;
    }
    Ok(out)
}

fn write_tools(out: &mut String, tools: &[MappedTool]) -> std::fmt::Result {
    if tools.is_empty() {
        writeln!(out, "None.")?;
        writeln!(out)?;
        return Ok(());
    }
    for tool in tools {
        writeln!(out, "### `{}`", tool.name)?;
        writeln!(out)?;
        writeln!(out, "{}", tool.description)?;
        writeln!(out)?;
        writeln!(out, "```rust")?;
        writeln!(out, "{}", tool.signature)?;
        writeln!(out, "```")?;
        writeln!(out)?;
        if !tool.params.is_empty() {
            writeln!(out, "| Parameter | Type |")?;
            writeln!(out, "|---|---|")?;
            for param in &tool.params {
                writeln!(out, "| `{}` | `{}` |", param.name, param.solidity_type)?;
            }
            writeln!(out)?;
        }
    }
    Ok(())
}

fn write_resources(out: &mut String, resources: &[MappedResource]) -> std::fmt::Result {
    if resources.is_empty() {
        writeln!(out, "None.")?;
        writeln!(out)?;
        return Ok(());
    }
    for resource in resources {
        writeln!(out, "### `{}`", resource.uri)?;
        writeln!(out)?;
        writeln!(out, "{}", resource.description)?;
        writeln!(out)?;
        for field in &resource.fields {
            writeln!(
                out,
                "- `{}` ({}){}",
                field.name,
                field.solidity_type,
                if field.indexed { ", indexed" } else { "" }
            )?;
        }
        writeln!(out)?;
    }
    Ok(())
}
