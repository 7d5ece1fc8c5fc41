//! Conversion between tool-call JSON and ABI-encoded values
//!
//! Inputs arrive as JSON (integers as decimal strings or numbers, addresses and
//! bytes as 0x-hex, tuples as objects or positional arrays). Outputs go back as
//! JSON with integers rendered as decimal strings so no precision is lost.

use alloy::dyn_abi::{DynSolType, DynSolValue};
use alloy::primitives::B256;
use serde_json::{Map, Value};

use super::TxError;
use crate::abi::{Event, Function, Parameter};
use crate::mapper::types::{output_key, tuple_field_keys};

/// Resolve a declared parameter into its dynamic ABI type.
pub fn resolve(param: &Parameter) -> Result<DynSolType, TxError> {
    let canonical = param.canonical_type();
    DynSolType::parse(&canonical)
        .map_err(|e| TxError::UnsupportedType(format!("{canonical}: {e}")))
}

/// Same parameter with its last array dimension removed.
fn element_param(param: &Parameter) -> Parameter {
    let mut element = param.clone();
    if let Some(open) = param.ty.rfind('[') {
        element.ty = param.ty[..open].to_string();
    }
    element
}

/// Coerce one JSON argument into a value of the parameter's type.
pub fn coerce_json(param: &Parameter, value: &Value) -> Result<DynSolValue, TxError> {
    let ty = resolve(param)?;
    coerce_with(param, &ty, value)
}

fn coerce_with(param: &Parameter, ty: &DynSolType, value: &Value) -> Result<DynSolValue, TxError> {
    let label = if param.name.is_empty() { param.ty.as_str() } else { param.name.as_str() };

    match ty {
        DynSolType::Array(inner) | DynSolType::FixedArray(inner, _) => {
            let items = json_array(value, label)?;
            if let DynSolType::FixedArray(_, len) = ty {
                if items.len() != *len {
                    return Err(TxError::InvalidArgument(format!(
                        "{label}: expected {len} elements, got {}",
                        items.len()
                    )));
                }
            }
            let element = element_param(param);
            let values = items
                .iter()
                .map(|item| coerce_with(&element, inner, item))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(match ty {
                DynSolType::FixedArray(..) => DynSolValue::FixedArray(values),
                _ => DynSolValue::Array(values),
            })
        }
        DynSolType::Tuple(types) => {
            if types.len() != param.components.len() {
                return Err(TxError::UnsupportedType(format!(
                    "{label}: tuple components do not match its type"
                )));
            }
            let keys = tuple_field_keys(param.components.iter().map(|c| c.name.as_str()));
            let fields = param.components.iter().zip(types).enumerate();
            let values = match value {
                Value::Object(map) => fields
                    .map(|(i, (component, ty))| {
                        let key = &keys[i];
                        let field = map.get(key).ok_or_else(|| {
                            TxError::InvalidArgument(format!("{label}: missing field '{key}'"))
                        })?;
                        coerce_with(component, ty, field)
                    })
                    .collect::<Result<Vec<_>, _>>()?,
                Value::Array(items) if items.len() == types.len() => fields
                    .map(|(i, (component, ty))| coerce_with(component, ty, &items[i]))
                    .collect::<Result<Vec<_>, _>>()?,
                _ => {
                    return Err(TxError::InvalidArgument(format!(
                        "{label}: expected an object with {} fields",
                        types.len()
                    )))
                }
            };
            Ok(DynSolValue::Tuple(values))
        }
        _ => {
            let text = match value {
                Value::String(s) => s.trim().to_string(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null => {
                    return Err(TxError::InvalidArgument(format!("{label}: value is required")))
                }
                other => {
                    return Err(TxError::InvalidArgument(format!(
                        "{label}: cannot use {other} as {}",
                        param.canonical_type()
                    )))
                }
            };
            ty.coerce_str(&text).map_err(|e| {
                TxError::InvalidArgument(format!("{label}: '{text}' is not a valid {ty}: {e}"))
            })
        }
    }
}

/// Arrays may also arrive JSON-encoded inside a string.
fn json_array(value: &Value, label: &str) -> Result<Vec<Value>, TxError> {
    match value {
        Value::Array(items) => Ok(items.clone()),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Array(items)) => Ok(items),
            _ => Err(TxError::InvalidArgument(format!("{label}: expected an array"))),
        },
        _ => Err(TxError::InvalidArgument(format!("{label}: expected an array"))),
    }
}

/// Encode calldata for `function`. `keys[i]` is the argument name of input `i`.
pub fn encode_call(
    function: &Function,
    keys: &[String],
    args: &Map<String, Value>,
) -> Result<Vec<u8>, TxError> {
    let values = function
        .inputs
        .iter()
        .zip(keys)
        .map(|(param, key)| {
            let value = args.get(key).ok_or_else(|| {
                TxError::InvalidArgument(format!("missing required argument '{key}'"))
            })?;
            coerce_json(param, value)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(encode_values(function, values))
}

pub fn encode_values(function: &Function, values: Vec<DynSolValue>) -> Vec<u8> {
    let mut data = function.selector().to_vec();
    data.extend(DynSolValue::Tuple(values).abi_encode_params());
    data
}

/// Decode return data into JSON shaped like the tool's return schema.
pub fn decode_outputs(function: &Function, data: &[u8]) -> Result<Value, TxError> {
    if function.outputs.is_empty() {
        return Ok(Value::Null);
    }
    let types = function
        .outputs
        .iter()
        .map(resolve)
        .collect::<Result<Vec<_>, _>>()?;
    let decoded = DynSolType::Tuple(types)
        .abi_decode_params(data)
        .map_err(|e| TxError::Abi(format!("cannot decode {} output: {e}", function.name)))?;
    let values = match decoded {
        DynSolValue::Tuple(values) => values,
        other => vec![other],
    };

    if let [single] = function.outputs.as_slice() {
        return Ok(values.first().map(|v| named_json(single, v)).unwrap_or(Value::Null));
    }
    let mut out = Map::new();
    for (i, (param, value)) in function.outputs.iter().zip(&values).enumerate() {
        out.insert(output_key(&param.name, i), named_json(param, value));
    }
    Ok(Value::Object(out))
}

/// Decode a log into fields keyed by `names` (one per event input).
pub fn decode_log(
    event: &Event,
    names: &[String],
    topics: &[B256],
    data: &[u8],
) -> Result<Map<String, Value>, TxError> {
    let mut indexed_topics = topics.iter().skip(usize::from(!event.anonymous));

    let data_params: Vec<&Parameter> = event.data_inputs();
    let data_types = data_params
        .iter()
        .map(|p| resolve(p))
        .collect::<Result<Vec<_>, _>>()?;
    let decoded = DynSolType::Tuple(data_types)
        .abi_decode_params(data)
        .map_err(|e| TxError::Abi(format!("cannot decode {} log data: {e}", event.name)))?;
    let mut data_values = match decoded {
        DynSolValue::Tuple(values) => values.into_iter(),
        other => vec![other].into_iter(),
    };

    let mut fields = Map::new();
    for (param, name) in event.inputs.iter().zip(names) {
        let value = if param.is_indexed() {
            let topic = indexed_topics.next().ok_or_else(|| {
                TxError::Abi(format!("{} log is missing topic for '{name}'", event.name))
            })?;
            decode_topic(param, topic)?
        } else {
            let value = data_values.next().ok_or_else(|| {
                TxError::Abi(format!("{} log is missing data for '{name}'", event.name))
            })?;
            named_json(param, &value)
        };
        fields.insert(name.clone(), value);
    }
    Ok(fields)
}

/// Indexed dynamic values are stored as their keccak hash, so only static
/// types can be recovered from a topic.
fn decode_topic(param: &Parameter, topic: &B256) -> Result<Value, TxError> {
    let ty = resolve(param)?;
    if ty.is_dynamic() || matches!(ty, DynSolType::Tuple(_) | DynSolType::FixedArray(..)) {
        return Ok(Value::String(format!("{topic:#x}")));
    }
    let value = ty
        .abi_decode(topic.as_slice())
        .map_err(|e| TxError::Abi(format!("cannot decode topic {topic:#x}: {e}")))?;
    Ok(to_json(&value))
}

/// JSON for a value, naming tuple fields after the parameter's components.
pub fn named_json(param: &Parameter, value: &DynSolValue) -> Value {
    match value {
        DynSolValue::Tuple(values) if !param.components.is_empty() && !param.ty.ends_with(']') => {
            let mut object = Map::new();
            let keys = tuple_field_keys(param.components.iter().map(|c| c.name.as_str()));
            for ((component, v), key) in param.components.iter().zip(values).zip(keys) {
                object.insert(key, named_json(component, v));
            }
            Value::Object(object)
        }
        DynSolValue::Array(values) | DynSolValue::FixedArray(values) => {
            let element = element_param(param);
            Value::Array(values.iter().map(|v| named_json(&element, v)).collect())
        }
        other => to_json(other),
    }
}

/// Plain JSON for a value. Integers become decimal strings, addresses are checksummed.
pub fn to_json(value: &DynSolValue) -> Value {
    match value {
        DynSolValue::Bool(b) => Value::Bool(*b),
        DynSolValue::Int(i, _) => Value::String(i.to_string()),
        DynSolValue::Uint(u, _) => Value::String(u.to_string()),
        DynSolValue::FixedBytes(word, size) => {
            Value::String(format!("0x{}", hex::encode(&word[..*size])))
        }
        DynSolValue::Address(a) => Value::String(a.to_checksum(None)),
        DynSolValue::Function(f) => Value::String(format!("0x{}", hex::encode(f.as_slice()))),
        DynSolValue::Bytes(b) => Value::String(format!("0x{}", hex::encode(b))),
        DynSolValue::String(s) => Value::String(s.clone()),
        DynSolValue::Array(values)
        | DynSolValue::FixedArray(values)
        | DynSolValue::Tuple(values) => Value::Array(values.iter().map(to_json).collect()),
        #[allow(unreachable_patterns)]
        _ => Value::Null,
    }
}
