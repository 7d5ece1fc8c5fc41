//! ABI MCP - Entry point

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use abi_mcp::{
    config::{Config, RuntimeEnv},
    fetch::{FetchOptions, FetchResult},
    generator::{write_server, GenerateOptions},
    manifest::{ServerManifest, MANIFEST_FILE},
    mapper::ToolCategory,
    networks::{format_network_table, get_network},
    pipeline,
    runtime::TxError,
    server::{self, Transport},
};

/// ABI MCP - generate Model Context Protocol servers from smart-contract ABIs
#[derive(Parser, Debug)]
#[command(name = "abi-mcp")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<String>,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate an MCP server crate for a contract
    Generate {
        /// ABI file, artifact, or contract address
        source: String,

        /// Output directory (default: ./<package name>)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        #[arg(short, long)]
        network: Option<String>,

        /// Deployed contract address (required for file sources)
        #[arg(short, long)]
        address: Option<String>,

        /// Server display name
        #[arg(long)]
        name: Option<String>,

        /// Expose only view and pure functions
        #[arg(long)]
        read_only: bool,

        /// Expose events as resources (default)
        #[arg(long, overrides_with = "no_events")]
        events: bool,

        #[arg(long, overrides_with = "events")]
        no_events: bool,

        /// Simulate write calls before sending (default)
        #[arg(long, overrides_with = "no_simulate")]
        simulate: bool,

        #[arg(long, overrides_with = "simulate")]
        no_simulate: bool,

        /// Do not follow proxies to their implementation ABI
        #[arg(long)]
        no_proxy: bool,

        /// Overwrite a non-empty output directory
        #[arg(short, long)]
        force: bool,
    },

    /// Summarize a contract's ABI
    Inspect {
        source: String,

        #[arg(short, long)]
        network: Option<String>,
    },

    /// Check an ABI for structural problems
    Validate {
        source: String,

        /// Also report warnings (duplicates, unnamed parameters, unknown types)
        #[arg(long)]
        strict: bool,
    },

    /// Run a generated server from its directory without compiling it
    Serve {
        dir: PathBuf,

        #[arg(short, long, default_value_t = 8080)]
        port: u16,

        #[arg(short, long, value_enum, default_value_t = TransportArg::Stdio)]
        transport: TransportArg,
    },

    /// List supported networks
    Networks,

    /// Write a default configuration file (to --config, or ~/.abi-mcp-config.json)
    Init {
        /// Replace an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TransportArg {
    Stdio,
    Http,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    server::init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error[{}]: {:#}", error_kind(&e), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = match (&cli.command, cli.config.as_deref()) {
        (Command::Init { .. }, _) => Config::default(),
        (_, Some(config_path)) => Config::from_file(config_path)?,
        (_, None) => Config::load_default(),
    };

    match cli.command {
        Command::Generate {
            source,
            output,
            network,
            address,
            name,
            read_only,
            events: _,
            no_events,
            simulate: _,
            no_simulate,
            no_proxy,
            force,
        } => {
            dotenv::dotenv().ok();
            let env = RuntimeEnv::from_env();
            config.apply_env(&env);

            let network = network.unwrap_or_else(|| config.default_network.clone());
            let fetched = fetch(&source, &network, !no_proxy, &env, &config).await?;
            let options = GenerateOptions {
                server_name: name,
                read_only,
                include_events: !no_events,
                simulate_default: !no_simulate,
            };
            let generated = pipeline::generate(&fetched, address.as_deref(), &network, options)?;
            let dir = output.unwrap_or_else(|| PathBuf::from(&generated.package_name));
            let dir = write_server(&generated, &dir, force)?;

            println!("✓ Generated {} in {}", generated.server_name, dir.display());
            println!("  Contract: {} ({})", generated.contract_address, generated.network);
            println!(
                "  Tools: {} ({} read, {} write)",
                generated.tool_count,
                generated.read_tools.len(),
                generated.write_tools.len()
            );
            println!("  Resources: {}", generated.resource_count);
            if fetched.is_proxy {
                if let Some(implementation) = &fetched.implementation_address {
                    println!("  Proxy: ABI taken from implementation {}", implementation);
                }
            }
            for file in &generated.files {
                println!("    {}", file.path);
            }
            println!();
            println!("Next: cd {} && cp .env.example .env && cargo run --release", dir.display());
            Ok(ExitCode::SUCCESS)
        }

        Command::Inspect { source, network } => {
            let env = RuntimeEnv::from_env();
            config.apply_env(&env);
            let network = network.unwrap_or_else(|| config.default_network.clone());
            let fetched = fetch(&source, &network, config.detect_proxies, &env, &config).await?;
            print_inspect(&pipeline::inspect(&fetched)?);
            Ok(ExitCode::SUCCESS)
        }

        Command::Validate { source, strict } => {
            let env = RuntimeEnv::from_env();
            config.apply_env(&env);
            let network = config.default_network.clone();
            let fetched = fetch(&source, &network, false, &env, &config).await?;
            let report = pipeline::validate(&fetched.abi_json(), strict);

            for issue in &report.issues {
                println!("{}", issue);
            }
            let errors = report.errors().count();
            let warnings = report.warnings().count();
            println!(
                "{} entries, {} error(s), {} warning(s)",
                report.entry_count, errors, warnings
            );
            report.ensure_valid()?;
            if report.entry_count == 0 {
                println!("ABI has no entries");
                return Ok(ExitCode::FAILURE);
            }
            println!("✓ ABI is valid");
            Ok(ExitCode::SUCCESS)
        }

        Command::Serve {
            dir,
            port,
            transport,
        } => {
            serve(&dir, port, transport, config).await?;
            Ok(ExitCode::SUCCESS)
        }

        Command::Networks => {
            print!("{}", format_network_table());
            Ok(ExitCode::SUCCESS)
        }

        Command::Init { force } => {
            let path = init_config(cli.config.map(PathBuf::from), force)?;
            println!("✓ Wrote default config to {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_config(path: Option<PathBuf>, force: bool) -> Result<PathBuf> {
    let path = path
        .or_else(Config::default_path)
        .context("HOME is not set; pass --config <FILE>")?;
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to replace it)", path.display());
    }
    Config::default().save_to_file(&path)?;
    Ok(path)
}

async fn fetch(
    source: &str,
    network: &str,
    detect_proxy: bool,
    env: &RuntimeEnv,
    config: &Config,
) -> Result<FetchResult> {
    let network = get_network(network)?;
    let mut options = FetchOptions::from_config(config).with_network(network.name);
    options.detect_proxy = detect_proxy && config.detect_proxies;
    options.rpc_url = env.rpc_url.clone();

    let fetched = pipeline::fetch(source, &options, config)
        .await
        .with_context(|| format!("Failed to load ABI from {}", source))?;
    tracing::info!(
        source = %fetched.source_location,
        kind = %fetched.source_kind,
        entries = fetched.abi.len(),
        "loaded ABI"
    );
    Ok(fetched)
}

async fn serve(dir: &Path, port: u16, transport: TransportArg, mut config: Config) -> Result<()> {
    dotenv::from_path(dir.join(".env")).ok();
    let manifest = ServerManifest::load(dir.join(MANIFEST_FILE))?;
    let env = RuntimeEnv::from_env();
    config.apply_env(&env);

    let transport = match transport {
        TransportArg::Stdio => Transport::Stdio,
        TransportArg::Http => Transport::Http { port },
    };
    server::run_manifest(manifest, env, &config, transport).await
}

fn print_inspect(report: &pipeline::InspectReport) {
    println!("Source: {} ({})", report.source, report.source_kind);
    if let Some(name) = &report.contract_name {
        println!("Contract: {}", name);
    }
    if let Some(version) = &report.compiler_version {
        println!("Compiler: {}", version);
    }
    println!(
        "Standard: {}",
        report.standard.as_deref().unwrap_or("none detected")
    );
    if report.is_proxy {
        println!(
            "Proxy: yes (implementation {})",
            report.implementation_address.as_deref().unwrap_or("unknown")
        );
    }
    println!(
        "Functions: {}  Events: {}  Errors: {}",
        report.function_count, report.event_count, report.error_count
    );

    for (label, category) in [
        ("Read tools", ToolCategory::Read),
        ("Write tools", ToolCategory::Write),
        ("Payable tools", ToolCategory::WritePayable),
    ] {
        let tools: Vec<_> = report.tools_in(category).collect();
        if tools.is_empty() {
            continue;
        }
        println!("\n{} ({}):", label, tools.len());
        for tool in tools {
            println!("  {:<28} {}", tool.name, tool.signature);
        }
    }

    if !report.events.is_empty() {
        println!("\nEvents ({}):", report.events.len());
        for event in &report.events {
            println!("  {}", event);
        }
    }
    if !report.errors.is_empty() {
        println!("\nErrors ({}):", report.errors.len());
        for error in &report.errors {
            println!("  {}", error);
        }
    }
    let special: Vec<&str> = [
        ("constructor", report.has_constructor),
        ("fallback", report.has_fallback),
        ("receive", report.has_receive),
    ]
    .iter()
    .filter(|(_, present)| *present)
    .map(|(name, _)| *name)
    .collect();
    if !special.is_empty() {
        println!("\nAlso declares: {}", special.join(", "));
    }
    if !report.warnings.is_empty() {
        println!("\nValidation ({}):", report.warnings.len());
        for warning in &report.warnings {
            println!("  {}", warning);
        }
    }
}

/// Kind name of the first crate error in the chain.
fn error_kind(err: &anyhow::Error) -> &'static str {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<abi_mcp::Error>() {
            return e.kind();
        }
        if let Some(e) = cause.downcast_ref::<TxError>() {
            return e.kind();
        }
    }
    "error"
}
