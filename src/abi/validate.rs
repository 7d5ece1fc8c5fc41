//! Non-throwing structural validation of ABI documents

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;

use super::parser::json_kind;
use crate::error::{Error, Result};
use crate::mapper::types::{parse_type, SolidityType};

const ENTRY_TYPES: &[&str] = &["function", "event", "error", "constructor", "fallback", "receive"];
const MUTABILITIES: &[&str] = &["pure", "view", "nonpayable", "payable"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One finding. `index` is the ABI entry it refers to, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub index: Option<usize>,
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        match self.index {
            Some(i) => write!(f, "{} [entry {}]: {}", level, i, self.message),
            None => write!(f, "{}: {}", level, self.message),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub entry_count: usize,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// True when no error-severity issue was found.
    pub fn is_valid(&self) -> bool {
        !self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    /// Fail with the error-severity issues, if there are any.
    pub fn ensure_valid(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(Error::Validation(self.errors().cloned().collect()))
        }
    }

    fn error(&mut self, index: Option<usize>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            index,
            severity: Severity::Error,
            message: message.into(),
        });
    }

    fn warning(&mut self, index: Option<usize>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            index,
            severity: Severity::Warning,
            message: message.into(),
        });
    }
}

/// Identifiers start with a letter, `_` or `$` and continue alphanumeric.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// `0x` followed by exactly 40 hex digits.
pub fn is_valid_address(address: &str) -> bool {
    address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .is_some_and(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Report every structural problem in an ABI document without stopping.
///
/// Strict mode adds warnings for duplicate signatures, unnamed function
/// parameters, tuples without components, unrecognized types, events with more
/// than three indexed parameters, and an empty ABI.
pub fn validate_abi(abi: &Value, strict: bool) -> ValidationReport {
    let mut report = ValidationReport::default();

    let entries = match abi.as_array() {
        Some(entries) => entries,
        None => {
            report.error(
                None,
                format!("ABI must be a JSON array, got {}", json_kind(abi)),
            );
            return report;
        }
    };
    report.entry_count = entries.len();

    if strict && entries.is_empty() {
        report.warning(None, "ABI is empty");
    }

    let mut seen_signatures = HashSet::new();

    for (index, entry) in entries.iter().enumerate() {
        let obj = match entry.as_object() {
            Some(obj) => obj,
            None => {
                report.error(
                    Some(index),
                    format!("entry must be an object, got {}", json_kind(entry)),
                );
                continue;
            }
        };

        let entry_type = match obj.get("type") {
            None => "function",
            Some(Value::String(t)) => t.as_str(),
            Some(other) => {
                report.error(
                    Some(index),
                    format!("'type' must be a string, got {}", json_kind(other)),
                );
                continue;
            }
        };

        if !ENTRY_TYPES.contains(&entry_type) {
            report.error(Some(index), format!("unknown entry type '{}'", entry_type));
            continue;
        }

        if let Some(value) = obj.get("stateMutability") {
            match value.as_str() {
                Some(m) if MUTABILITIES.contains(&m) => {}
                _ => report.error(
                    Some(index),
                    format!("invalid stateMutability {}", value),
                ),
            }
        }

        if !matches!(entry_type, "function" | "event" | "error") {
            continue;
        }

        let name = obj.get("name").and_then(Value::as_str).unwrap_or_default();
        if name.is_empty() {
            report.error(Some(index), format!("{} is missing a name", entry_type));
        } else if !is_valid_identifier(name) {
            report.error(
                Some(index),
                format!("'{}' is not a valid identifier", name),
            );
        }

        for key in ["inputs", "outputs"] {
            if let Some(params) = obj.get(key) {
                check_parameters(&mut report, index, key, params, strict, entry_type);
            }
        }

        if strict {
            let types = signature_types(obj);
            if entry_type == "function" {
                let signature = format!("{}({})", name, types.join(","));
                if !seen_signatures.insert(signature.clone()) {
                    report.warning(
                        Some(index),
                        format!("duplicate function signature {}", signature),
                    );
                }
            }
            if entry_type == "event" {
                let anonymous = obj.get("anonymous").and_then(Value::as_bool).unwrap_or(false);
                let indexed = obj
                    .get("inputs")
                    .and_then(Value::as_array)
                    .map(|inputs| {
                        inputs
                            .iter()
                            .filter(|p| p.get("indexed").and_then(Value::as_bool) == Some(true))
                            .count()
                    })
                    .unwrap_or(0);
                if !anonymous && indexed > 3 {
                    report.warning(
                        Some(index),
                        format!("event '{}' has {} indexed parameters (max 3)", name, indexed),
                    );
                }
            }
        }
    }

    report
}

fn check_parameters(
    report: &mut ValidationReport,
    index: usize,
    key: &str,
    params: &Value,
    strict: bool,
    entry_type: &str,
) {
    let Some(items) = params.as_array() else {
        report.error(Some(index), format!("'{}' must be an array", key));
        return;
    };

    for (i, param) in items.iter().enumerate() {
        let Some(obj) = param.as_object() else {
            report.error(Some(index), format!("{}[{}] must be an object", key, i));
            continue;
        };
        let Some(ty) = obj.get("type").and_then(Value::as_str) else {
            report.error(Some(index), format!("{}[{}] is missing a 'type'", key, i));
            continue;
        };

        if !strict {
            continue;
        }

        let name = obj.get("name").and_then(Value::as_str).unwrap_or_default();
        if entry_type == "function" && key == "inputs" && name.is_empty() {
            report.warning(Some(index), format!("{}[{}] has no name", key, i));
        }

        let components = obj.get("components").and_then(Value::as_array);
        if ty.starts_with("tuple") && components.is_none_or(|c| c.is_empty()) {
            report.warning(
                Some(index),
                format!("{}[{}] is a tuple without components", key, i),
            );
        }
        if !ty.starts_with("tuple") && contains_unknown(&parse_type(ty, &[])) {
            report.warning(
                Some(index),
                format!("{}[{}] has unrecognized type '{}'", key, i, ty),
            );
        }
        if let Some(components) = components {
            check_parameters(
                report,
                index,
                &format!("{}[{}].components", key, i),
                &Value::Array(components.clone()),
                strict,
                "tuple",
            );
        }
    }
}

fn contains_unknown(ty: &SolidityType) -> bool {
    match ty {
        SolidityType::Unknown(_) => true,
        SolidityType::Array { element, .. } => contains_unknown(element),
        SolidityType::Tuple(fields) => fields.iter().any(|f| contains_unknown(&f.ty)),
        _ => false,
    }
}

fn signature_types(obj: &Map<String, Value>) -> Vec<String> {
    obj.get("inputs")
        .and_then(Value::as_array)
        .map(|inputs| {
            inputs
                .iter()
                .map(|p| {
                    p.get("type")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string()
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_abi_has_no_issues() {
        let abi = json!([
            {"type": "function", "name": "transfer", "inputs": [
                {"name": "to", "type": "address"},
                {"name": "amount", "type": "uint256"}
            ], "outputs": [{"name": "", "type": "bool"}], "stateMutability": "nonpayable"},
            {"type": "event", "name": "Transfer", "inputs": []}
        ]);
        let report = validate_abi(&abi, true);
        assert!(report.is_valid());
        assert!(report.issues.is_empty(), "{:?}", report.issues);
        assert_eq!(report.entry_count, 2);
    }

    #[test]
    fn test_collects_every_error() {
        let abi = json!([
            "not an object",
            {"type": "weird", "name": "x"},
            {"type": "function", "inputs": []},
            {"type": "function", "name": "2bad"},
            {"type": "function", "name": "f", "stateMutability": "readonly"},
            {"type": "function", "name": "g", "inputs": [{"name": "x"}]}
        ]);
        let report = validate_abi(&abi, false);
        assert!(!report.is_valid());
        let indices: Vec<Option<usize>> = report.errors().map(|i| i.index).collect();
        assert_eq!(
            indices,
            vec![Some(0), Some(1), Some(2), Some(3), Some(4), Some(5)]
        );
    }

    #[test]
    fn test_top_level_must_be_array() {
        let report = validate_abi(&json!({"abi": []}), false);
        assert_eq!(report.errors().count(), 1);
        assert_eq!(report.entry_count, 0);
    }

    #[test]
    fn test_strict_mode_warnings() {
        let abi = json!([
            {"type": "function", "name": "f", "inputs": [{"name": "", "type": "uint256"}]},
            {"type": "function", "name": "f", "inputs": [{"name": "a", "type": "uint256"}]},
            {"type": "function", "name": "g", "inputs": [{"name": "t", "type": "tuple"}]},
            {"type": "function", "name": "h", "inputs": [{"name": "x", "type": "fixed128x18"}]},
            {"type": "event", "name": "E", "inputs": [
                {"name": "a", "type": "uint8", "indexed": true},
                {"name": "b", "type": "uint8", "indexed": true},
                {"name": "c", "type": "uint8", "indexed": true},
                {"name": "d", "type": "uint8", "indexed": true}
            ]}
        ]);
        let report = validate_abi(&abi, true);
        assert!(report.is_valid());
        let messages: Vec<String> = report.warnings().map(|w| w.message.clone()).collect();
        assert!(messages.iter().any(|m| m.contains("has no name")));
        assert!(messages.iter().any(|m| m.contains("duplicate function signature f(uint256)")));
        assert!(messages.iter().any(|m| m.contains("tuple without components")));
        assert!(messages.iter().any(|m| m.contains("unrecognized type 'fixed128x18'")));
        assert!(messages.iter().any(|m| m.contains("4 indexed parameters")));

        let lenient = validate_abi(&abi, false);
        assert!(lenient.issues.is_empty());
    }

    #[test]
    fn test_empty_abi_warns_in_strict_mode() {
        let report = validate_abi(&json!([]), true);
        assert_eq!(report.warnings().count(), 1);
        assert!(report.is_valid());
    }

    #[test]
    fn test_identifier_rules() {
        assert!(is_valid_identifier("balanceOf"));
        assert!(is_valid_identifier("_owner"));
        assert!(is_valid_identifier("$ref"));
        assert!(!is_valid_identifier("1st"));
        assert!(!is_valid_identifier("has space"));
        assert!(!is_valid_identifier(""));
    }

    #[test]
    fn test_address_rules() {
        assert!(is_valid_address("0x742d35Cc6634C0532925a3b844Bc454e4438f44e"));
        assert!(!is_valid_address("742d35Cc6634C0532925a3b844Bc454e4438f44e"));
        assert!(!is_valid_address("0x742d35Cc6634C0532925a3b844Bc454e4438f44"));
        assert!(!is_valid_address("0xZZ2d35Cc6634C0532925a3b844Bc454e4438f44e"));
    }

    #[test]
    fn test_ensure_valid_carries_errors_only() {
        let report = validate_abi(
            &json!([
                {"type": "function", "name": "f", "inputs": [], "outputs": [], "stateMutability": "view"},
                {"type": "bogus"}
            ]),
            true,
        );
        let err = report.ensure_valid().unwrap_err();
        assert_eq!(err.kind(), "validation_error");
        match err {
            Error::Validation(issues) => {
                assert!(!issues.is_empty());
                assert!(issues.iter().all(|i| i.severity == Severity::Error));
            }
            other => panic!("unexpected error: {other}"),
        }

        let ok = validate_abi(&json!([]), true);
        assert!(ok.ensure_valid().is_ok());
    }
}
