//! Conversion of raw ABI JSON into typed records

use serde_json::{Map, Value};

use super::standards::detect_standard;
use super::types::{AbiError, Event, Function, Parameter, ParsedContract, StateMutability};
use crate::error::{Error, Result};

/// Parse an ABI document (a JSON array of entries).
///
/// Entries without a `type` are treated as functions. Constructor, fallback and
/// receive entries only set flags; unrecognized entry types are skipped.
///
/// # Errors
///
/// Returns a parse error for a non-array document, a non-object entry, or an
/// entry whose required fields are missing. Entry errors carry the index and type.
pub fn parse_abi(abi: &Value) -> Result<ParsedContract> {
    let entries = abi
        .as_array()
        .ok_or_else(|| Error::parse(format!("ABI must be a JSON array, got {}", json_kind(abi))))?;

    let mut contract = ParsedContract {
        functions: Vec::new(),
        events: Vec::new(),
        errors: Vec::new(),
        has_constructor: false,
        has_fallback: false,
        has_receive: false,
        standard: None,
        raw: abi.clone(),
    };

    for (index, entry) in entries.iter().enumerate() {
        let obj = entry.as_object().ok_or_else(|| Error::Parse {
            index: Some(index),
            entry_type: None,
            message: format!("entry must be an object, got {}", json_kind(entry)),
        })?;

        let entry_type = obj
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("function");

        let located = |e: Error| attach_location(e, index, entry_type);

        match entry_type {
            "function" => contract.functions.push(parse_function(obj).map_err(located)?),
            "event" => contract.events.push(parse_event(obj).map_err(located)?),
            "error" => contract.errors.push(parse_error(obj).map_err(located)?),
            "constructor" => contract.has_constructor = true,
            "fallback" => contract.has_fallback = true,
            "receive" => contract.has_receive = true,
            other => {
                tracing::debug!(index, entry_type = other, "skipping unrecognized ABI entry");
            }
        }
    }

    contract.standard = detect_standard(&contract.function_names(), &contract.event_names());
    Ok(contract)
}

/// Errors that already name their entry pass through untouched.
fn attach_location(err: Error, index: usize, entry_type: &str) -> Error {
    match err {
        Error::Parse {
            index: Some(_), ..
        } => err,
        Error::Parse { message, .. } => Error::Parse {
            index: Some(index),
            entry_type: Some(entry_type.to_string()),
            message,
        },
        other => Error::Parse {
            index: Some(index),
            entry_type: Some(entry_type.to_string()),
            message: other.to_string(),
        },
    }
}

pub fn parse_function(entry: &Map<String, Value>) -> Result<Function> {
    Ok(Function {
        name: required_name(entry, "function")?,
        inputs: parse_parameters(entry, "inputs")?,
        outputs: parse_parameters(entry, "outputs")?,
        state_mutability: resolve_mutability(entry)?,
    })
}

pub fn parse_event(entry: &Map<String, Value>) -> Result<Event> {
    Ok(Event {
        name: required_name(entry, "event")?,
        inputs: parse_parameters(entry, "inputs")?,
        anonymous: entry
            .get("anonymous")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    })
}

pub fn parse_error(entry: &Map<String, Value>) -> Result<AbiError> {
    Ok(AbiError {
        name: required_name(entry, "error")?,
        inputs: parse_parameters(entry, "inputs")?,
    })
}

/// Parse one parameter, recursing into tuple components.
pub fn parse_parameter(value: &Value) -> Result<Parameter> {
    let obj = value
        .as_object()
        .ok_or_else(|| Error::parse("parameter must be an object"))?;

    let ty = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::parse("parameter is missing a string 'type'"))?;

    let components = match obj.get("components") {
        Some(Value::Array(items)) => items
            .iter()
            .map(parse_parameter)
            .collect::<Result<Vec<_>>>()?,
        Some(Value::Null) | None => Vec::new(),
        Some(_) => return Err(Error::parse("'components' must be an array")),
    };

    Ok(Parameter {
        name: obj
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        ty: ty.to_string(),
        indexed: obj.get("indexed").and_then(Value::as_bool),
        internal_type: obj
            .get("internalType")
            .and_then(Value::as_str)
            .map(str::to_string),
        components,
    })
}

/// Legacy `payable`/`constant` flags win over `stateMutability`, and `payable` wins
/// over `constant`.
pub fn resolve_mutability(entry: &Map<String, Value>) -> Result<StateMutability> {
    let flag = |key: &str| entry.get(key).and_then(Value::as_bool).unwrap_or(false);

    if flag("payable") {
        return Ok(StateMutability::Payable);
    }
    if flag("constant") {
        return Ok(StateMutability::View);
    }

    match entry.get("stateMutability").and_then(Value::as_str) {
        Some(s) => s.parse().map_err(Error::parse),
        None => Ok(StateMutability::NonPayable),
    }
}

fn required_name(entry: &Map<String, Value>, what: &str) -> Result<String> {
    match entry.get("name").and_then(Value::as_str) {
        Some(name) if !name.is_empty() => Ok(name.to_string()),
        _ => Err(Error::parse(format!("{} entry is missing a 'name'", what))),
    }
}

fn parse_parameters(entry: &Map<String, Value>, key: &str) -> Result<Vec<Parameter>> {
    match entry.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                parse_parameter(item).map_err(|e| match e {
                    Error::Parse { message, .. } => {
                        Error::parse(format!("{}[{}]: {}", key, i, message))
                    }
                    other => other,
                })
            })
            .collect(),
        Some(Value::Null) | None => Ok(Vec::new()),
        Some(_) => Err(Error::parse(format!("'{}' must be an array", key))),
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::Standard;
    use serde_json::json;

    #[test]
    fn test_parse_balance_of() {
        let abi = json!([{
            "type": "function",
            "name": "balanceOf",
            "inputs": [{"name": "a", "type": "address"}],
            "outputs": [{"name": "", "type": "uint256"}],
            "stateMutability": "view"
        }]);
        let contract = parse_abi(&abi).unwrap();
        assert_eq!(contract.functions.len(), 1);
        let f = &contract.functions[0];
        assert_eq!(f.name, "balanceOf");
        assert!(f.is_read_only());
        assert_eq!(f.inputs[0].ty, "address");
        assert_eq!(f.outputs[0].ty, "uint256");
        assert!(f.outputs[0].name.is_empty());
    }

    #[test]
    fn test_missing_type_defaults_to_function() {
        let abi = json!([{"name": "owner", "inputs": [], "outputs": [], "constant": true}]);
        let contract = parse_abi(&abi).unwrap();
        assert_eq!(contract.functions[0].name, "owner");
        assert_eq!(
            contract.functions[0].state_mutability,
            StateMutability::View
        );
    }

    #[test]
    fn test_legacy_flags_take_precedence() {
        let abi = json!([
            {"type": "function", "name": "a", "constant": true, "stateMutability": "nonpayable"},
            {"type": "function", "name": "b", "payable": true, "stateMutability": "view"},
            {"type": "function", "name": "c", "payable": true, "constant": true},
            {"type": "function", "name": "d"}
        ]);
        let contract = parse_abi(&abi).unwrap();
        let m: Vec<StateMutability> = contract
            .functions
            .iter()
            .map(|f| f.state_mutability)
            .collect();
        assert_eq!(
            m,
            vec![
                StateMutability::View,
                StateMutability::Payable,
                StateMutability::Payable,
                StateMutability::NonPayable
            ]
        );
    }

    #[test]
    fn test_special_entries_set_flags() {
        let abi = json!([
            {"type": "constructor", "inputs": []},
            {"type": "fallback"},
            {"type": "receive", "stateMutability": "payable"},
            {"type": "somethingNew", "name": "x"}
        ]);
        let contract = parse_abi(&abi).unwrap();
        assert!(contract.has_constructor);
        assert!(contract.has_fallback);
        assert!(contract.has_receive);
        assert!(contract.functions.is_empty());
    }

    #[test]
    fn test_non_array_is_error() {
        let err = parse_abi(&json!({"abi": []})).unwrap_err();
        assert!(err.to_string().contains("must be a JSON array"));
    }

    #[test]
    fn test_non_object_entry_reports_index() {
        let err = parse_abi(&json!([{"type": "fallback"}, 42])).unwrap_err();
        match err {
            Error::Parse { index, .. } => assert_eq!(index, Some(1)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_sub_parser_error_is_located() {
        let abi = json!([
            {"type": "function", "name": "ok"},
            {"type": "event", "inputs": []}
        ]);
        match parse_abi(&abi).unwrap_err() {
            Error::Parse {
                index,
                entry_type,
                message,
            } => {
                assert_eq!(index, Some(1));
                assert_eq!(entry_type.as_deref(), Some("event"));
                assert!(message.contains("missing a 'name'"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parameter_without_type_is_error() {
        let abi = json!([{"type": "function", "name": "f", "inputs": [{"name": "x"}]}]);
        let err = parse_abi(&abi).unwrap_err();
        assert!(err.to_string().contains("inputs[0]"));
    }

    #[test]
    fn test_invalid_state_mutability_is_error() {
        let abi = json!([{"type": "function", "name": "f", "stateMutability": "readonly"}]);
        assert!(parse_abi(&abi).is_err());
    }

    #[test]
    fn test_nested_tuple_components() {
        let abi = json!([{
            "type": "function",
            "name": "fill",
            "inputs": [{
                "name": "order",
                "type": "tuple",
                "components": [
                    {"name": "maker", "type": "address"},
                    {"name": "legs", "type": "tuple[]", "components": [
                        {"name": "token", "type": "address"},
                        {"name": "amount", "type": "uint256"}
                    ]}
                ]
            }],
            "outputs": [],
            "stateMutability": "nonpayable"
        }]);
        let contract = parse_abi(&abi).unwrap();
        let order = &contract.functions[0].inputs[0];
        assert_eq!(order.components.len(), 2);
        assert_eq!(order.components[1].components.len(), 2);
        assert_eq!(
            contract.functions[0].signature(),
            "fill((address,(address,uint256)[]))"
        );
    }

    #[test]
    fn test_events_and_errors() {
        let abi = json!([
            {"type": "event", "name": "Transfer", "anonymous": false, "inputs": [
                {"name": "from", "type": "address", "indexed": true},
                {"name": "to", "type": "address", "indexed": true},
                {"name": "value", "type": "uint256", "indexed": false}
            ]},
            {"type": "error", "name": "InsufficientBalance", "inputs": [
                {"name": "needed", "type": "uint256"}
            ]}
        ]);
        let contract = parse_abi(&abi).unwrap();
        assert_eq!(contract.events[0].indexed_inputs().len(), 2);
        assert_eq!(contract.errors[0].name, "InsufficientBalance");
        assert!(contract.standard.is_none());
    }

    #[test]
    fn test_names_survive_parsing() {
        let abi = json!([
            {"type": "function", "name": "totalSupply", "outputs": [{"type": "uint256"}], "stateMutability": "view"},
            {"type": "function", "name": "balanceOf", "inputs": [{"type": "address"}], "stateMutability": "view"},
            {"type": "function", "name": "transfer", "inputs": [{"type": "address"}, {"type": "uint256"}]},
            {"type": "function", "name": "transferFrom", "inputs": [{"type": "address"}, {"type": "address"}, {"type": "uint256"}]},
            {"type": "function", "name": "approve", "inputs": [{"type": "address"}, {"type": "uint256"}]},
            {"type": "function", "name": "allowance", "inputs": [{"type": "address"}, {"type": "address"}], "stateMutability": "view"},
            {"type": "event", "name": "Transfer", "inputs": []},
            {"type": "event", "name": "Approval", "inputs": []}
        ]);
        let contract = parse_abi(&abi).unwrap();
        let names: Vec<&str> = contract.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["totalSupply", "balanceOf", "transfer", "transferFrom", "approve", "allowance"]
        );
        assert_eq!(contract.standard, Some(Standard::Erc20));
        assert_eq!(contract.read_functions().count(), 3);
        assert_eq!(contract.write_functions().count(), 3);
    }
}
