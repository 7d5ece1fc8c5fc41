//! Solidity type normalization, JSON-schema generation and Rust type hints
//!
//! Type strings are parsed into a [`SolidityType`] tree. Array dimensions are
//! peeled off one trailing group at a time, so `uint256[2][]` is a dynamic array
//! whose element is `uint256[2]`. Schema generation and type hints are plain
//! structural recursion over that tree.

use serde_json::{json, Map, Value};

use super::naming::{camel_to_readable, unique_keys};
use crate::abi::Parameter;

/// A named field of a tuple type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TupleField {
    /// Declared component name, possibly empty
    pub name: String,
    pub ty: SolidityType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolidityType {
    Address,
    Bool,
    String,
    /// Unsigned integer with bit width (8..=256)
    Uint(u16),
    /// Signed integer with bit width (8..=256)
    Int(u16),
    /// Dynamic `bytes`
    Bytes,
    /// `bytesN` with N in 1..=32
    FixedBytes(u8),
    /// `T[]` (length `None`) or `T[N]`
    Array {
        element: Box<SolidityType>,
        length: Option<usize>,
    },
    Tuple(Vec<TupleField>),
    /// Anything without a mapping, kept verbatim
    Unknown(String),
}

/// Parse a declared type string. `components` are the tuple's child parameters.
pub fn parse_type(raw: &str, components: &[Parameter]) -> SolidityType {
    let ty = raw.trim();

    if let Some(without_bracket) = ty.strip_suffix(']') {
        return match without_bracket.rfind('[') {
            Some(open) => {
                let inner = &without_bracket[..open];
                let dim = &without_bracket[open + 1..];
                let length = if dim.is_empty() {
                    Some(None)
                } else {
                    dim.parse::<usize>().ok().map(Some)
                };
                match length {
                    Some(length) if !inner.is_empty() => SolidityType::Array {
                        element: Box::new(parse_type(inner, components)),
                        length,
                    },
                    _ => SolidityType::Unknown(ty.to_string()),
                }
            }
            None => SolidityType::Unknown(ty.to_string()),
        };
    }

    if ty == "tuple" {
        return SolidityType::Tuple(
            components
                .iter()
                .map(|c| TupleField {
                    name: c.name.clone(),
                    ty: parse_type(&c.ty, &c.components),
                })
                .collect(),
        );
    }

    match ty {
        "address" | "address payable" => SolidityType::Address,
        "bool" => SolidityType::Bool,
        "string" => SolidityType::String,
        "bytes" => SolidityType::Bytes,
        "uint" => SolidityType::Uint(256),
        "int" => SolidityType::Int(256),
        _ => parse_sized(ty).unwrap_or_else(|| SolidityType::Unknown(ty.to_string())),
    }
}

fn parse_sized(ty: &str) -> Option<SolidityType> {
    if let Some(bits) = ty.strip_prefix("uint") {
        return valid_int_width(bits).map(SolidityType::Uint);
    }
    if let Some(bits) = ty.strip_prefix("int") {
        return valid_int_width(bits).map(SolidityType::Int);
    }
    if let Some(size) = ty.strip_prefix("bytes") {
        return size
            .parse::<u8>()
            .ok()
            .filter(|n| (1..=32).contains(n))
            .map(SolidityType::FixedBytes);
    }
    None
}

fn valid_int_width(bits: &str) -> Option<u16> {
    bits.parse::<u16>()
        .ok()
        .filter(|b| (8..=256).contains(b) && b % 8 == 0)
}

impl SolidityType {
    /// Canonical type string, e.g. `uint256[2][]` or `(address,uint256)`.
    pub fn canonical(&self) -> String {
        match self {
            SolidityType::Address => "address".to_string(),
            SolidityType::Bool => "bool".to_string(),
            SolidityType::String => "string".to_string(),
            SolidityType::Uint(bits) => format!("uint{}", bits),
            SolidityType::Int(bits) => format!("int{}", bits),
            SolidityType::Bytes => "bytes".to_string(),
            SolidityType::FixedBytes(n) => format!("bytes{}", n),
            SolidityType::Array { element, length } => match length {
                Some(n) => format!("{}[{}]", element.canonical(), n),
                None => format!("{}[]", element.canonical()),
            },
            SolidityType::Tuple(fields) => {
                let inner: Vec<String> = fields.iter().map(|f| f.ty.canonical()).collect();
                format!("({})", inner.join(","))
            }
            SolidityType::Unknown(raw) => raw.clone(),
        }
    }

    /// Innermost non-array type name, with canonical size (`uint` → `uint256`).
    pub fn base_type(&self) -> String {
        match self {
            SolidityType::Array { element, .. } => element.base_type(),
            SolidityType::Tuple(_) => "tuple".to_string(),
            other => other.canonical(),
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, SolidityType::Array { .. })
    }

    /// Fixed length of the outermost array dimension.
    pub fn array_length(&self) -> Option<usize> {
        match self {
            SolidityType::Array { length, .. } => *length,
            _ => None,
        }
    }

    pub fn element(&self) -> Option<&SolidityType> {
        match self {
            SolidityType::Array { element, .. } => Some(element),
            _ => None,
        }
    }

    pub fn is_tuple(&self) -> bool {
        matches!(self, SolidityType::Tuple(_))
    }

    pub fn tuple_fields(&self) -> &[TupleField] {
        match self {
            SolidityType::Tuple(fields) => fields,
            _ => &[],
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, SolidityType::Unknown(_))
    }
}

/// JSON schema for a type. The description is `description` if given, otherwise
/// derived from `name`.
pub fn to_json_schema(ty: &SolidityType, name: Option<&str>, description: Option<&str>) -> Value {
    let mut schema = base_schema(ty);

    let description = description
        .map(str::to_string)
        .or_else(|| name.filter(|n| !n.is_empty()).map(camel_to_readable));

    if let (Some(desc), Some(obj)) = (description, schema.as_object_mut()) {
        match ty {
            SolidityType::Unknown(_) => {
                let note = obj
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                obj.insert("description".into(), json!(format!("{} ({})", desc, note)));
            }
            _ => {
                obj.insert("description".into(), json!(desc));
            }
        }
    }

    schema
}

fn base_schema(ty: &SolidityType) -> Value {
    match ty {
        SolidityType::Address => json!({
            "type": "string",
            "pattern": "^0x[a-fA-F0-9]{40}$"
        }),
        SolidityType::Bool => json!({"type": "boolean"}),
        SolidityType::String => json!({"type": "string"}),
        SolidityType::Uint(_) => json!({
            "type": "string",
            "pattern": "^[0-9]+$"
        }),
        SolidityType::Int(_) => json!({
            "type": "string",
            "pattern": "^-?[0-9]+$"
        }),
        SolidityType::Bytes => json!({
            "type": "string",
            "pattern": "^0x([a-fA-F0-9]{2})*$"
        }),
        SolidityType::FixedBytes(n) => json!({
            "type": "string",
            "pattern": format!("^0x[a-fA-F0-9]{{{}}}$", *n as usize * 2)
        }),
        SolidityType::Array { element, length } => {
            let mut schema = Map::new();
            schema.insert("type".into(), json!("array"));
            schema.insert("items".into(), to_json_schema(element, None, None));
            if let Some(n) = length {
                schema.insert("minItems".into(), json!(n));
                schema.insert("maxItems".into(), json!(n));
            }
            Value::Object(schema)
        }
        SolidityType::Tuple(fields) => {
            let mut properties = Map::new();
            let mut required = Vec::with_capacity(fields.len());
            let keys = tuple_field_keys(fields.iter().map(|f| f.name.as_str()));
            for (field, key) in fields.iter().zip(keys) {
                properties.insert(key.clone(), to_json_schema(&field.ty, Some(&key), None));
                required.push(json!(key));
            }
            json!({
                "type": "object",
                "properties": properties,
                "required": required,
                "additionalProperties": false
            })
        }
        SolidityType::Unknown(raw) => json!({
            "type": "string",
            "description": format!("Unknown Solidity type: {}", raw)
        }),
    }
}

/// Property names for a tuple's components, sanitized like top-level
/// parameters. Unnamed components become `field_<i>`.
pub fn tuple_field_keys<'a, I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    unique_keys(names, |i| format!("field_{}", i))
}

/// Rust type a generated binding would use for this Solidity type.
pub fn rust_type_hint(ty: &SolidityType) -> String {
    match ty {
        SolidityType::Address => "Address".to_string(),
        SolidityType::Bool => "bool".to_string(),
        SolidityType::String => "String".to_string(),
        SolidityType::Uint(bits) => int_hint('u', *bits, "U256"),
        SolidityType::Int(bits) => int_hint('i', *bits, "I256"),
        SolidityType::Bytes => "Bytes".to_string(),
        SolidityType::FixedBytes(n) => format!("FixedBytes<{}>", n),
        SolidityType::Array { element, length } => match length {
            Some(n) => format!("[{}; {}]", rust_type_hint(element), n),
            None => format!("Vec<{}>", rust_type_hint(element)),
        },
        SolidityType::Tuple(fields) => {
            let inner: Vec<String> = fields.iter().map(|f| rust_type_hint(&f.ty)).collect();
            if inner.len() == 1 {
                format!("({},)", inner[0])
            } else {
                format!("({})", inner.join(", "))
            }
        }
        SolidityType::Unknown(_) => "serde_json::Value".to_string(),
    }
}

fn int_hint(prefix: char, bits: u16, wide: &str) -> String {
    match bits {
        0..=8 => format!("{}8", prefix),
        9..=16 => format!("{}16", prefix),
        17..=32 => format!("{}32", prefix),
        33..=64 => format!("{}64", prefix),
        65..=128 => format!("{}128", prefix),
        _ => wide.to_string(),
    }
}

/// Object schema for a list of parameters. Unnamed parameters become `arg<i>`
/// and colliding keys are suffixed.
pub fn map_function_params(params: &[Parameter]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::with_capacity(params.len());
    let keys = unique_keys(params.iter().map(|p| p.name.as_str()), |i| format!("arg{}", i));
    for (param, key) in params.iter().zip(keys) {
        let ty = parse_type(&param.ty, &param.components);
        properties.insert(key.clone(), to_json_schema(&ty, Some(&key), None));
        required.push(json!(key));
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

/// Return-value schema: `null` for no outputs, the output's own schema for one,
/// and an object keyed by name (or `output<i>`) for several.
pub fn map_function_outputs(outputs: &[Parameter]) -> Value {
    match outputs {
        [] => json!({"type": "null"}),
        [single] => {
            let ty = parse_type(&single.ty, &single.components);
            to_json_schema(&ty, Some(&single.name), None)
        }
        many => {
            let mut properties = Map::new();
            let mut required = Vec::with_capacity(many.len());
            for (i, output) in many.iter().enumerate() {
                let key = output_key(&output.name, i);
                let ty = parse_type(&output.ty, &output.components);
                properties.insert(key.clone(), to_json_schema(&ty, Some(&key), None));
                required.push(json!(key));
            }
            json!({
                "type": "object",
                "properties": properties,
                "required": required
            })
        }
    }
}

/// Key used for a function output in multi-value results.
pub fn output_key(name: &str, index: usize) -> String {
    if name.is_empty() {
        format!("output{}", index)
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn depth(schema: &Value) -> usize {
        match schema.get("items") {
            Some(items) => 1 + depth(items),
            None => 0,
        }
    }

    #[test]
    fn test_scalar_normalization() {
        assert_eq!(parse_type("uint", &[]), SolidityType::Uint(256));
        assert_eq!(parse_type("int", &[]), SolidityType::Int(256));
        assert_eq!(parse_type(" uint8 ", &[]), SolidityType::Uint(8));
        assert_eq!(parse_type("bytes", &[]), SolidityType::Bytes);
        assert_eq!(parse_type("bytes32", &[]), SolidityType::FixedBytes(32));
        assert_eq!(parse_type("address payable", &[]), SolidityType::Address);
        assert_eq!(parse_type("uint7", &[]), SolidityType::Unknown("uint7".into()));
        assert_eq!(parse_type("bytes33", &[]), SolidityType::Unknown("bytes33".into()));
        assert!(parse_type("fixed128x18", &[]).is_unknown());
    }

    #[test]
    fn test_nested_array_peels_one_dimension() {
        let ty = parse_type("uint256[2][]", &[]);
        assert!(ty.is_array());
        assert_eq!(ty.array_length(), None);
        let inner = ty.element().unwrap();
        assert_eq!(inner.array_length(), Some(2));
        assert_eq!(inner.element(), Some(&SolidityType::Uint(256)));
        assert_eq!(ty.base_type(), "uint256");
        assert_eq!(ty.canonical(), "uint256[2][]");
    }

    #[test]
    fn test_array_depth_matches_schema_depth() {
        for (ty, expected) in [
            ("address", 0),
            ("address[]", 1),
            ("uint8[3][]", 2),
            ("bool[][][4]", 3),
        ] {
            let schema = to_json_schema(&parse_type(ty, &[]), None, None);
            assert_eq!(depth(&schema), expected, "{}", ty);
        }
    }

    #[test]
    fn test_fixed_array_bounds() {
        let schema = to_json_schema(&parse_type("address[3]", &[]), None, None);
        assert_eq!(schema["minItems"], 3);
        assert_eq!(schema["maxItems"], 3);
        assert_eq!(schema["items"]["pattern"], "^0x[a-fA-F0-9]{40}$");
    }

    #[test]
    fn test_malformed_array_is_unknown() {
        assert!(parse_type("uint256[x]", &[]).is_unknown());
        assert!(parse_type("[]", &[]).is_unknown());
    }

    #[test]
    fn test_tuple_schema_requires_every_field() {
        let components = vec![
            Parameter::new("maker", "address"),
            Parameter::new("amount", "uint256"),
            Parameter::new("", "bool"),
        ];
        let ty = parse_type("tuple", &components);
        let schema = to_json_schema(&ty, Some("order"), None);
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["additionalProperties"], false);
        let required = schema["required"].as_array().unwrap();
        assert_eq!(required.len(), 3);
        assert!(schema["properties"]["field_2"].is_object());
        assert_eq!(schema["description"], "Order");
    }

    #[test]
    fn test_tuple_array_uses_components() {
        let components = vec![Parameter::new("id", "uint256")];
        let ty = parse_type("tuple[]", &components);
        assert_eq!(ty.canonical(), "(uint256)[]");
        let schema = to_json_schema(&ty, None, None);
        assert_eq!(schema["items"]["properties"]["id"]["type"], "string");
    }

    #[test]
    fn test_integer_schemas_are_strings() {
        let u = to_json_schema(&SolidityType::Uint(256), Some("amount"), None);
        assert_eq!(u["type"], "string");
        assert_eq!(u["pattern"], "^[0-9]+$");
        assert_eq!(u["description"], "Amount");

        let i = to_json_schema(&SolidityType::Int(24), None, Some("Tick"));
        assert_eq!(i["pattern"], "^-?[0-9]+$");
        assert_eq!(i["description"], "Tick");
    }

    #[test]
    fn test_bytes_patterns() {
        let fixed = to_json_schema(&SolidityType::FixedBytes(4), None, None);
        assert_eq!(fixed["pattern"], "^0x[a-fA-F0-9]{8}$");
        let dynamic = to_json_schema(&SolidityType::Bytes, None, None);
        assert_eq!(dynamic["pattern"], "^0x([a-fA-F0-9]{2})*$");
    }

    #[test]
    fn test_unknown_type_description() {
        let schema = to_json_schema(&parse_type("fixed128x18", &[]), None, None);
        assert!(schema["description"]
            .as_str()
            .unwrap()
            .contains("Unknown Solidity type"));

        let named = to_json_schema(&parse_type("fixed128x18", &[]), Some("rate"), None);
        let desc = named["description"].as_str().unwrap();
        assert!(desc.starts_with("Rate"));
        assert!(desc.contains("Unknown Solidity type: fixed128x18"));
    }

    #[test]
    fn test_rust_type_hints() {
        assert_eq!(rust_type_hint(&parse_type("uint8", &[])), "u8");
        assert_eq!(rust_type_hint(&parse_type("uint24", &[])), "u32");
        assert_eq!(rust_type_hint(&parse_type("int64", &[])), "i64");
        assert_eq!(rust_type_hint(&parse_type("uint128", &[])), "u128");
        assert_eq!(rust_type_hint(&parse_type("uint256", &[])), "U256");
        assert_eq!(rust_type_hint(&parse_type("int256", &[])), "I256");
        assert_eq!(rust_type_hint(&parse_type("address[]", &[])), "Vec<Address>");
        assert_eq!(rust_type_hint(&parse_type("bytes32[2]", &[])), "[FixedBytes<32>; 2]");
        let pair = parse_type(
            "tuple",
            &[Parameter::new("a", "address"), Parameter::new("b", "bool")],
        );
        assert_eq!(rust_type_hint(&pair), "(Address, bool)");
        assert_eq!(rust_type_hint(&parse_type("fixed", &[])), "serde_json::Value");
    }

    #[test]
    fn test_map_function_params_names_unnamed_args() {
        let schema = map_function_params(&[
            Parameter::new("", "address"),
            Parameter::new("amount", "uint256"),
        ]);
        assert!(schema["properties"]["arg0"].is_object());
        assert!(schema["properties"]["amount"].is_object());
        assert_eq!(schema["required"], json!(["arg0", "amount"]));
    }

    #[test]
    fn test_map_function_outputs() {
        assert_eq!(map_function_outputs(&[]), json!({"type": "null"}));

        let single = map_function_outputs(&[Parameter::new("", "uint256")]);
        assert_eq!(single["type"], "string");

        let many = map_function_outputs(&[
            Parameter::new("", "uint256"),
            Parameter::new("owner", "address"),
        ]);
        assert_eq!(many["type"], "object");
        assert!(many["properties"]["output0"].is_object());
        assert!(many["properties"]["owner"].is_object());
    }

    #[test]
    fn test_map_function_params_keys_are_unique() {
        let schema = map_function_params(&[
            Parameter::new("", "uint256"),
            Parameter::new("arg0", "address"),
        ]);
        assert_eq!(schema["required"], json!(["arg0", "arg0_2"]));
        assert_eq!(schema["properties"]["arg0"]["pattern"], "^[0-9]+$");
        assert_eq!(schema["properties"]["arg0_2"]["pattern"], "^0x[a-fA-F0-9]{40}$");
    }

    #[test]
    fn test_tuple_component_keys_are_sanitized() {
        let ty = parse_type(
            "tuple",
            &[
                Parameter::new("type", "uint8"),
                Parameter::new("max-level", "uint16"),
                Parameter::new("", "bool"),
            ],
        );
        let schema = to_json_schema(&ty, None, None);
        assert_eq!(schema["required"], json!(["type_", "max_level", "field_2"]));
    }
}
