//! End-to-end: artifact on disk → parse → map → generate → write

use std::fs;

use abi_mcp::config::Config;
use abi_mcp::fetch::{FetchOptions, SourceKind};
use abi_mcp::generator::{write_server, GenerateOptions};
use abi_mcp::manifest::{ServerManifest, MANIFEST_FILE};
use abi_mcp::pipeline;
use serde_json::json;

const ADDRESS: &str = "0x6B175474E89094C44Da98b954EedeAC495271d0F";

fn nft_artifact() -> serde_json::Value {
    json!({
        "contractName": "Collectibles",
        "compiler": {"version": "0.8.24+commit.e11b9ed9"},
        "abi": [
            {"type": "function", "name": "balanceOf", "inputs": [{"name": "owner", "type": "address"}], "outputs": [{"name": "", "type": "uint256"}], "stateMutability": "view"},
            {"type": "function", "name": "ownerOf", "inputs": [{"name": "tokenId", "type": "uint256"}], "outputs": [{"name": "", "type": "address"}], "stateMutability": "view"},
            {"type": "function", "name": "getApproved", "inputs": [{"name": "tokenId", "type": "uint256"}], "outputs": [{"name": "", "type": "address"}], "stateMutability": "view"},
            {"type": "function", "name": "isApprovedForAll", "inputs": [{"name": "owner", "type": "address"}, {"name": "operator", "type": "address"}], "outputs": [{"name": "", "type": "bool"}], "stateMutability": "view"},
            {"type": "function", "name": "approve", "inputs": [{"name": "to", "type": "address"}, {"name": "tokenId", "type": "uint256"}], "outputs": [], "stateMutability": "nonpayable"},
            {"type": "function", "name": "setApprovalForAll", "inputs": [{"name": "operator", "type": "address"}, {"name": "approved", "type": "bool"}], "outputs": [], "stateMutability": "nonpayable"},
            {"type": "function", "name": "transferFrom", "inputs": [{"name": "from", "type": "address"}, {"name": "to", "type": "address"}, {"name": "tokenId", "type": "uint256"}], "outputs": [], "stateMutability": "nonpayable"},
            {"type": "function", "name": "safeTransferFrom", "inputs": [{"name": "from", "type": "address"}, {"name": "to", "type": "address"}, {"name": "tokenId", "type": "uint256"}], "outputs": [], "stateMutability": "nonpayable"},
            {"type": "function", "name": "safeTransferFrom", "inputs": [{"name": "from", "type": "address"}, {"name": "to", "type": "address"}, {"name": "tokenId", "type": "uint256"}, {"name": "data", "type": "bytes"}], "outputs": [], "stateMutability": "nonpayable"},
            {"type": "function", "name": "mint", "inputs": [{"name": "to", "type": "address"}, {"name": "traits", "type": "tuple[]", "components": [{"name": "kind", "type": "uint8"}, {"name": "level", "type": "uint16"}]}], "outputs": [], "stateMutability": "payable"},
            {"type": "event", "name": "Transfer", "inputs": [{"name": "from", "type": "address", "indexed": true}, {"name": "to", "type": "address", "indexed": true}, {"name": "tokenId", "type": "uint256", "indexed": true}], "anonymous": false},
            {"type": "event", "name": "Approval", "inputs": [{"name": "owner", "type": "address", "indexed": true}, {"name": "approved", "type": "address", "indexed": true}, {"name": "tokenId", "type": "uint256", "indexed": true}], "anonymous": false},
            {"type": "event", "name": "ApprovalForAll", "inputs": [{"name": "owner", "type": "address", "indexed": true}, {"name": "operator", "type": "address", "indexed": true}, {"name": "approved", "type": "bool", "indexed": false}], "anonymous": false}
        ]
    })
}

async fn fetch_artifact(dir: &std::path::Path) -> abi_mcp::fetch::FetchResult {
    let path = dir.join("Collectibles.json");
    fs::write(&path, nft_artifact().to_string()).unwrap();

    let config = Config::default();
    let options = FetchOptions::from_config(&config);
    pipeline::fetch(path.to_str().unwrap(), &options, &config)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_artifact_to_server_on_disk() {
    let tmp = tempfile::tempdir().unwrap();
    let fetched = fetch_artifact(tmp.path()).await;
    assert_eq!(fetched.source_kind, SourceKind::File);
    assert_eq!(fetched.contract_name.as_deref(), Some("Collectibles"));

    let server = pipeline::generate(&fetched, Some(ADDRESS), "base", GenerateOptions::default())
        .unwrap();
    assert_eq!(server.server_name, "Collectibles MCP Server");
    assert_eq!(server.package_name, "collectibles");
    assert!(server.write_tools.contains(&"safe_transfer_from".to_string()));
    assert!(server.write_tools.contains(&"safe_transfer_from_2".to_string()));
    assert_eq!(server.events, vec!["Transfer", "Approval", "ApprovalForAll"]);

    let out = tmp.path().join("collectibles");
    write_server(&server, &out, false).unwrap();

    for file in &server.files {
        assert!(out.join(&file.path).is_file(), "missing {}", file.path);
    }

    let manifest = ServerManifest::load(out.join(MANIFEST_FILE)).unwrap();
    assert_eq!(manifest.chain_id, 8453);
    assert_eq!(manifest.contract_address, ADDRESS.to_lowercase());
    assert_eq!(manifest.standard.map(|s| s.name()), Some("ERC721"));

    // The manifest alone reproduces the generated tool set.
    let (_, mapped) = manifest.contract().unwrap();
    let names: Vec<&str> = mapped.tools.iter().map(|t| t.name.as_str()).collect();
    let mut expected = server.read_tools.clone();
    expected.extend(server.write_tools.iter().cloned());
    for name in &expected {
        assert!(names.contains(&name.as_str()), "manifest lost tool {}", name);
    }

    let mint = mapped.tools.iter().find(|t| t.name == "mint").unwrap();
    assert!(mint.is_payable());
    let traits = &mint.input_schema["properties"]["traits"];
    assert_eq!(traits["type"], "array");
    assert_eq!(traits["items"]["type"], "object");
    assert_eq!(traits["items"]["required"].as_array().unwrap().len(), 2);

    let env = fs::read_to_string(out.join(".env.example")).unwrap();
    assert!(env.contains("PRIVATE_KEY="));
    assert!(!env.contains("0xac09"));

    // Second write without --force is refused and leaves the output intact.
    let err = write_server(&server, &out, false).unwrap_err();
    assert_eq!(err.kind(), "generation_error");
    assert!(out.join(MANIFEST_FILE).is_file());
}

#[tokio::test]
async fn test_read_only_server_has_no_write_surface() {
    let tmp = tempfile::tempdir().unwrap();
    let fetched = fetch_artifact(tmp.path()).await;

    let options = GenerateOptions {
        read_only: true,
        include_events: false,
        ..Default::default()
    };
    let server = pipeline::generate(&fetched, Some(ADDRESS), "mainnet", options).unwrap();
    assert!(server.write_tools.is_empty());
    assert_eq!(server.tool_count, server.read_tools.len());
    assert_eq!(server.resource_count, 0);

    let readme = &server.file("README.md").unwrap().content;
    assert!(!readme.contains("transfer_from"));
    assert!(!readme.contains("## Resources"));

    let manifest =
        ServerManifest::from_json(&server.file(MANIFEST_FILE).unwrap().content).unwrap();
    let (_, mapped) = manifest.contract().unwrap();
    assert!(mapped.tools.iter().all(|t| t.is_read()));
    assert!(mapped.resources.is_empty());
}

#[tokio::test]
async fn test_inspect_and_validate_artifact() {
    let tmp = tempfile::tempdir().unwrap();
    let fetched = fetch_artifact(tmp.path()).await;

    let report = pipeline::inspect(&fetched).unwrap();
    assert_eq!(report.standard.as_deref(), Some("ERC721"));
    assert_eq!(report.function_count, 10);
    assert_eq!(report.compiler_version.as_deref(), Some("0.8.24+commit.e11b9ed9"));

    let validation = pipeline::validate(&fetched.abi_json(), true);
    assert!(validation.is_valid());
}

#[tokio::test]
async fn test_unknown_source_lists_attempts() {
    let config = Config::default();
    let options = FetchOptions::from_config(&config);
    let err = pipeline::fetch("not a source", &options, &config)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "source_not_found");
    assert!(err.to_string().contains("no fetcher can handle this source"));
}
