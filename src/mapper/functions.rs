//! Contract functions → MCP tool definitions

use serde::Serialize;
use serde_json::{json, Map, Value};

use super::naming::{camel_to_readable, sanitize_identifier, sanitize_param_name, UniqueNames};
use super::types::{map_function_outputs, output_key, parse_type, rust_type_hint, to_json_schema};
use crate::abi::{Function, Parameter};

/// Arguments every write tool accepts on top of the contract's own parameters.
pub const CONTROL_ARGS: &[&str] = &[
    "simulate",
    "dry_run",
    "value",
    "gas_limit",
    "gas_price",
    "max_fee_per_gas",
    "max_priority_fee_per_gas",
];

/// Tools every server exposes alongside the contract's functions.
pub const GET_GAS_PRICES: &str = "get_gas_prices";
pub const QUERY_EVENTS: &str = "query_events";
pub const BUILTIN_TOOLS: &[&str] = &[GET_GAS_PRICES, QUERY_EVENTS];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    Read,
    Write,
    WritePayable,
}

impl ToolCategory {
    pub fn is_write(&self) -> bool {
        !matches!(self, ToolCategory::Read)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolCategory::Read => "read",
            ToolCategory::Write => "write",
            ToolCategory::WritePayable => "write_payable",
        }
    }
}

/// One input or output of a tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappedParam {
    /// Identifier-safe name used as the JSON argument key
    pub name: String,
    /// Name as declared in the ABI (may be empty)
    pub original_name: String,
    /// Canonical Solidity type
    pub solidity_type: String,
    pub rust_type: String,
    pub description: String,
    pub schema: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappedTool {
    pub name: String,
    pub original_name: String,
    pub category: ToolCategory,
    pub params: Vec<MappedParam>,
    pub outputs: Vec<MappedParam>,
    pub return_schema: Value,
    pub input_schema: Map<String, Value>,
    pub description: String,
    /// Rust-style signature, e.g. `fn transfer(to: Address, amount: U256) -> bool`
    pub signature: String,
    /// Canonical ABI signature, e.g. `transfer(address,uint256)`
    pub abi_signature: String,
    pub selector: String,
}

impl MappedTool {
    pub fn is_read(&self) -> bool {
        self.category == ToolCategory::Read
    }

    pub fn is_payable(&self) -> bool {
        self.category == ToolCategory::WritePayable
    }
}

/// Map every function, suffixing overloads `_2`, `_3`… in declaration order.
/// Functions that would shadow a built-in tool are suffixed the same way.
pub fn map_functions(functions: &[Function], simulate_default: bool) -> Vec<MappedTool> {
    let mut names = UniqueNames::new();
    for builtin in BUILTIN_TOOLS {
        names.reserve(builtin);
    }
    functions
        .iter()
        .map(|f| {
            let mut tool = map_function(f, simulate_default);
            tool.name = names.claim(tool.name);
            tool
        })
        .collect()
}

pub fn map_function(function: &Function, simulate_default: bool) -> MappedTool {
    let category = if function.is_read_only() {
        ToolCategory::Read
    } else if function.is_payable() {
        ToolCategory::WritePayable
    } else {
        ToolCategory::Write
    };

    let mut keys = UniqueNames::new();
    let params = map_params(&function.inputs, |p, i| {
        let mut key = if p.name.is_empty() {
            format!("arg{}", i)
        } else {
            sanitize_param_name(&p.name)
        };
        if CONTROL_ARGS.contains(&key.as_str()) {
            key.push('_');
        }
        keys.claim(key)
    });
    let outputs = map_params(&function.outputs, |p, i| {
        if p.name.is_empty() {
            output_key(&p.name, i)
        } else {
            sanitize_param_name(&p.name)
        }
    });
    let name = sanitize_identifier(&function.name);

    MappedTool {
        input_schema: input_schema(&params, category, simulate_default),
        return_schema: map_function_outputs(&function.outputs),
        description: describe(function, category),
        signature: rust_signature(&name, &params, &outputs, category),
        abi_signature: function.signature(),
        selector: function.selector_hex(),
        original_name: function.name.clone(),
        name,
        category,
        params,
        outputs,
    }
}

fn map_params<F>(params: &[Parameter], mut key: F) -> Vec<MappedParam>
where
    F: FnMut(&Parameter, usize) -> String,
{
    params
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let name = key(p, i);
            let ty = parse_type(&p.ty, &p.components);
            let description = camel_to_readable(&name);
            MappedParam {
                schema: to_json_schema(&ty, None, Some(&description)),
                solidity_type: ty.canonical(),
                rust_type: rust_type_hint(&ty),
                original_name: p.name.clone(),
                description,
                name,
            }
        })
        .collect()
}

fn input_schema(
    params: &[MappedParam],
    category: ToolCategory,
    simulate_default: bool,
) -> Map<String, Value> {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for param in params {
        properties.insert(param.name.clone(), param.schema.clone());
        required.push(Value::String(param.name.clone()));
    }

    if category.is_write() {
        properties.insert(
            "simulate".into(),
            json!({
                "type": "boolean",
                "default": simulate_default,
                "description": "Simulate with eth_call before sending the transaction"
            }),
        );
        properties.insert(
            "dry_run".into(),
            json!({
                "type": "boolean",
                "default": false,
                "description": "Stop after simulation without signing or sending"
            }),
        );
        properties.insert("gas_limit".into(), wei_schema("Gas limit override"));
        properties.insert("gas_price".into(), wei_schema("Legacy gas price override in wei"));
        properties.insert(
            "max_fee_per_gas".into(),
            wei_schema("EIP-1559 max fee per gas override in wei"),
        );
        properties.insert(
            "max_priority_fee_per_gas".into(),
            wei_schema("EIP-1559 priority fee override in wei"),
        );
    }
    if category == ToolCategory::WritePayable {
        properties.insert(
            "value".into(),
            wei_schema("Amount of native currency to send, in wei"),
        );
    }

    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("object".into()));
    schema.insert("properties".into(), Value::Object(properties));
    schema.insert("required".into(), Value::Array(required));
    schema
}

fn wei_schema(description: &str) -> Value {
    json!({
        "type": "string",
        "pattern": "^[0-9]+$",
        "description": description
    })
}

fn describe(function: &Function, category: ToolCategory) -> String {
    let mut description = camel_to_readable(&function.name);

    if !function.inputs.is_empty() {
        let inputs: Vec<String> = function
            .inputs
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let name = if p.name.is_empty() { format!("arg{}", i) } else { p.name.clone() };
                format!("{} ({})", name, p.canonical_type())
            })
            .collect();
        description.push_str(&format!(". Inputs: {}", inputs.join(", ")));
    }
    if !function.outputs.is_empty() {
        let outputs: Vec<String> = function.outputs.iter().map(|p| p.canonical_type()).collect();
        description.push_str(&format!(". Returns: {}", outputs.join(", ")));
    }
    description.push('.');

    match category {
        ToolCategory::Read => description.push_str(" Read-only call, no gas required."),
        ToolCategory::Write => {
            description.push_str(" Write operation: changes contract state and requires gas.")
        }
        ToolCategory::WritePayable => description.push_str(
            " Write operation: changes contract state and requires gas. \
             Payable: accepts ETH (native currency) via the `value` argument.",
        ),
    }
    description
}

fn rust_signature(
    name: &str,
    params: &[MappedParam],
    outputs: &[MappedParam],
    category: ToolCategory,
) -> String {
    let mut args: Vec<String> = params
        .iter()
        .map(|p| format!("{}: {}", p.name, p.rust_type))
        .collect();
    if category.is_write() {
        args.push("simulate: Option<bool>".to_string());
    }
    if category == ToolCategory::WritePayable {
        args.push("value: Option<U256>".to_string());
    }

    let ret = match outputs {
        [] => String::new(),
        [single] => format!(" -> {}", single.rust_type),
        many => {
            let types: Vec<&str> = many.iter().map(|p| p.rust_type.as_str()).collect();
            format!(" -> ({})", types.join(", "))
        }
    };
    format!("fn {}({}){}", name, args.join(", "), ret)
}
