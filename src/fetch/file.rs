//! Local ABI files: bare arrays and Hardhat, Truffle, Foundry or solc metadata artifacts

use serde_json::Value;
use std::path::Path;

use super::{is_address, FetchResult, SourceKind};
use crate::error::{Error, Result};

/// What could be pulled out of an ABI document.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedAbi {
    pub abi: Vec<Value>,
    pub contract_name: Option<String>,
    pub compiler_version: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FileFetcher;

impl FileFetcher {
    pub fn can_handle(source: &str) -> bool {
        if is_address(source) || source.starts_with("http://") || source.starts_with("https://") {
            return false;
        }
        source.ends_with(".json")
            || source.ends_with(".abi")
            || source.contains('/')
            || source.contains('\\')
            || source.starts_with('.')
    }

    pub async fn fetch(&self, source: &str) -> Result<FetchResult> {
        let path = Path::new(source);
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::FileNotFound(source.to_string()))
            }
            Err(e) => return Err(Error::Io(e)),
        };

        let value: Value = serde_json::from_str(&content)
            .map_err(|e| Error::parse(format!("invalid JSON in {}: {}", source, e)))?;
        let mut result = fetch_from_value(&value)?;
        result.source_location = path
            .canonicalize()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| source.to_string());
        Ok(result)
    }
}

/// Build a fetch result from an in-memory document.
pub fn fetch_from_value(value: &Value) -> Result<FetchResult> {
    let extracted = extract_abi(value)?;
    let mut result = FetchResult::new(extracted.abi, SourceKind::File, "<value>");
    result.contract_name = extracted.contract_name;
    result.compiler_version = extracted.compiler_version;
    Ok(result)
}

pub fn extract_abi(value: &Value) -> Result<ExtractedAbi> {
    let extracted = match value {
        Value::Array(entries) => ExtractedAbi {
            abi: entries.clone(),
            contract_name: None,
            compiler_version: None,
        },
        Value::Object(map) => {
            if let Some(abi) = map.get("abi") {
                let metadata = map.get("metadata").and_then(metadata_object);
                ExtractedAbi {
                    abi: abi_entries(abi)?,
                    contract_name: str_field(value, "contractName")
                        .or_else(|| metadata.as_ref().and_then(compilation_target)),
                    compiler_version: value
                        .pointer("/compiler/version")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .or_else(|| metadata.as_ref().and_then(compiler_version)),
                }
            } else if let Some(abi) = value.pointer("/output/abi") {
                ExtractedAbi {
                    abi: abi_entries(abi)?,
                    contract_name: compilation_target(value),
                    compiler_version: compiler_version(value),
                }
            } else {
                return Err(Error::parse(
                    "JSON object has no `abi` field (expected an ABI array or a compiler artifact)",
                ));
            }
        }
        _ => return Err(Error::parse("expected a JSON array or artifact object")),
    };

    if extracted.abi.is_empty() {
        return Err(Error::parse("ABI is empty"));
    }
    Ok(extracted)
}

/// The `abi` field may itself be JSON-encoded in a string.
fn abi_entries(abi: &Value) -> Result<Vec<Value>> {
    match abi {
        Value::Array(entries) => Ok(entries.clone()),
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Array(entries)) => Ok(entries),
            Ok(_) => Err(Error::parse("`abi` string does not contain a JSON array")),
            Err(e) => Err(Error::parse(format!("`abi` string is not valid JSON: {}", e))),
        },
        _ => Err(Error::parse("`abi` must be an array")),
    }
}

/// Foundry stores solc metadata either inline or as a JSON string.
fn metadata_object(metadata: &Value) -> Option<Value> {
    match metadata {
        Value::Object(_) => Some(metadata.clone()),
        Value::String(text) => serde_json::from_str(text).ok(),
        _ => None,
    }
}

fn compiler_version(metadata: &Value) -> Option<String> {
    metadata
        .pointer("/compiler/version")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// First contract named in `settings.compilationTarget`.
pub(crate) fn compilation_target(metadata: &Value) -> Option<String> {
    metadata
        .pointer("/settings/compilationTarget")?
        .as_object()?
        .values()
        .next()?
        .as_str()
        .map(str::to_string)
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn entry() -> Value {
        json!({"type": "function", "name": "transfer", "inputs": [], "outputs": []})
    }

    #[test]
    fn test_can_handle() {
        assert!(FileFetcher::can_handle("abi.json"));
        assert!(FileFetcher::can_handle("./Token"));
        assert!(FileFetcher::can_handle("out/Token.sol/Token.json"));
        assert!(FileFetcher::can_handle("C:\\abis\\token"));
        assert!(FileFetcher::can_handle("token.abi"));
        assert!(!FileFetcher::can_handle("https://example.com/abi.json"));
        assert!(!FileFetcher::can_handle("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"));
        assert!(!FileFetcher::can_handle("token"));
    }

    #[test]
    fn test_bare_array() {
        let extracted = extract_abi(&json!([entry()])).unwrap();
        assert_eq!(extracted.abi.len(), 1);
        assert!(extracted.contract_name.is_none());
    }

    #[test]
    fn test_hardhat_artifact() {
        let artifact = json!({
            "contractName": "MyToken",
            "abi": [entry()],
            "compiler": {"version": "0.8.20"}
        });
        let extracted = extract_abi(&artifact).unwrap();
        assert_eq!(extracted.contract_name.as_deref(), Some("MyToken"));
        assert_eq!(extracted.compiler_version.as_deref(), Some("0.8.20"));
    }

    #[test]
    fn test_foundry_artifact_with_string_metadata() {
        let metadata = json!({
            "compiler": {"version": "0.8.24+commit.e11b9ed9"},
            "settings": {"compilationTarget": {"src/Vault.sol": "Vault"}}
        });
        let artifact = json!({
            "abi": [entry()],
            "metadata": metadata.to_string()
        });
        let extracted = extract_abi(&artifact).unwrap();
        assert_eq!(extracted.contract_name.as_deref(), Some("Vault"));
        assert_eq!(
            extracted.compiler_version.as_deref(),
            Some("0.8.24+commit.e11b9ed9")
        );
    }

    #[test]
    fn test_solc_metadata() {
        let metadata = json!({
            "compiler": {"version": "0.8.20+commit.a1b79de6"},
            "output": {"abi": [entry()]},
            "settings": {"compilationTarget": {"Token.sol": "MyToken"}}
        });
        let extracted = extract_abi(&metadata).unwrap();
        assert_eq!(extracted.contract_name.as_deref(), Some("MyToken"));
        assert_eq!(extracted.abi.len(), 1);
    }

    #[test]
    fn test_abi_as_string() {
        let artifact = json!({"abi": json!([entry()]).to_string()});
        assert_eq!(extract_abi(&artifact).unwrap().abi.len(), 1);
    }

    #[test]
    fn test_errors() {
        let err = extract_abi(&json!({"bytecode": "0x"})).unwrap_err();
        assert!(err.to_string().contains("abi"));
        let err = extract_abi(&json!([])).unwrap_err();
        assert!(err.to_string().contains("empty"));
        assert!(extract_abi(&json!(42)).is_err());
    }

    #[test]
    fn test_from_value_location() {
        let result = fetch_from_value(&json!([entry()])).unwrap();
        assert_eq!(result.source_location, "<value>");
        assert_eq!(result.source_kind, SourceKind::File);
    }

    #[tokio::test]
    async fn test_fetch_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "{}", json!({"contractName": "T", "abi": [entry()]})).unwrap();
        let result = FileFetcher
            .fetch(&file.path().to_string_lossy())
            .await
            .unwrap();
        assert_eq!(result.contract_name.as_deref(), Some("T"));
        assert_ne!(result.source_location, "<value>");
    }

    #[tokio::test]
    async fn test_invalid_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "not json").unwrap();
        let err = FileFetcher
            .fetch(&file.path().to_string_lossy())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "parse_error");
    }
}
