//! Typed records for parsed ABI entries

use alloy::primitives::keccak256;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use super::standards::Standard;

/// A function, event, or error parameter. Tuples carry their components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed: Option<bool>,
    #[serde(
        rename = "internalType",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub internal_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Parameter>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            indexed: None,
            internal_type: None,
            components: Vec::new(),
        }
    }

    pub fn is_indexed(&self) -> bool {
        self.indexed.unwrap_or(false)
    }

    /// Type as it appears in a canonical signature; tuples expand to `(a,b)`.
    pub fn canonical_type(&self) -> String {
        match self.ty.strip_prefix("tuple") {
            Some(suffix) => {
                let inner: Vec<String> =
                    self.components.iter().map(|c| c.canonical_type()).collect();
                format!("({}){}", inner.join(","), suffix)
            }
            None => canonical_scalar(&self.ty),
        }
    }
}

fn canonical_scalar(ty: &str) -> String {
    let (base, suffix) = match ty.find('[') {
        Some(pos) => ty.split_at(pos),
        None => (ty, ""),
    };
    let base = match base {
        "uint" => "uint256",
        "int" => "int256",
        "address payable" => "address",
        other => other,
    };
    format!("{}{}", base, suffix)
}

/// Function state mutability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateMutability {
    Pure,
    View,
    NonPayable,
    Payable,
}

impl StateMutability {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateMutability::Pure => "pure",
            StateMutability::View => "view",
            StateMutability::NonPayable => "nonpayable",
            StateMutability::Payable => "payable",
        }
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self, StateMutability::Pure | StateMutability::View)
    }
}

impl FromStr for StateMutability {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pure" => Ok(StateMutability::Pure),
            "view" => Ok(StateMutability::View),
            "nonpayable" => Ok(StateMutability::NonPayable),
            "payable" => Ok(StateMutability::Payable),
            other => Err(format!("invalid stateMutability '{}'", other)),
        }
    }
}

impl fmt::Display for StateMutability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn signature_of(name: &str, params: &[Parameter]) -> String {
    let types: Vec<String> = params.iter().map(|p| p.canonical_type()).collect();
    format!("{}({})", name, types.join(","))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Function {
    pub name: String,
    pub inputs: Vec<Parameter>,
    pub outputs: Vec<Parameter>,
    pub state_mutability: StateMutability,
}

impl Function {
    pub fn is_read_only(&self) -> bool {
        self.state_mutability.is_read_only()
    }

    pub fn is_payable(&self) -> bool {
        self.state_mutability == StateMutability::Payable
    }

    pub fn requires_gas(&self) -> bool {
        !self.is_read_only()
    }

    /// Canonical signature, e.g. `transfer(address,uint256)`.
    pub fn signature(&self) -> String {
        signature_of(&self.name, &self.inputs)
    }

    pub fn selector(&self) -> [u8; 4] {
        let hash = keccak256(self.signature().as_bytes());
        [hash[0], hash[1], hash[2], hash[3]]
    }

    pub fn selector_hex(&self) -> String {
        format!("0x{}", hex::encode(self.selector()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub name: String,
    pub inputs: Vec<Parameter>,
    pub anonymous: bool,
}

impl Event {
    pub fn indexed_inputs(&self) -> Vec<&Parameter> {
        self.inputs.iter().filter(|p| p.is_indexed()).collect()
    }

    pub fn data_inputs(&self) -> Vec<&Parameter> {
        self.inputs.iter().filter(|p| !p.is_indexed()).collect()
    }

    pub fn signature(&self) -> String {
        signature_of(&self.name, &self.inputs)
    }

    /// First log topic (keccak of the signature) as 0x-hex.
    pub fn topic_hex(&self) -> String {
        format!("0x{}", hex::encode(keccak256(self.signature().as_bytes())))
    }
}

/// A custom error declared by the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AbiError {
    pub name: String,
    pub inputs: Vec<Parameter>,
}

impl AbiError {
    pub fn signature(&self) -> String {
        signature_of(&self.name, &self.inputs)
    }

    pub fn selector(&self) -> [u8; 4] {
        let hash = keccak256(self.signature().as_bytes());
        [hash[0], hash[1], hash[2], hash[3]]
    }
}

/// Everything extracted from one ABI document. Immutable once produced.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedContract {
    pub functions: Vec<Function>,
    pub events: Vec<Event>,
    pub errors: Vec<AbiError>,
    pub has_constructor: bool,
    pub has_fallback: bool,
    pub has_receive: bool,
    pub standard: Option<Standard>,
    /// The original document, kept for embedding in generated output
    #[serde(skip)]
    pub raw: Value,
}

impl ParsedContract {
    pub fn read_functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter().filter(|f| f.is_read_only())
    }

    pub fn write_functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter().filter(|f| !f.is_read_only())
    }

    /// First function with the given name (overloads resolve to the first declared).
    pub fn get_function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn get_event(&self, name: &str) -> Option<&Event> {
        self.events.iter().find(|e| e.name == name)
    }

    pub fn function_names(&self) -> HashSet<&str> {
        self.functions.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn event_names(&self) -> HashSet<&str> {
        self.events.iter().map(|e| e.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer() -> Function {
        Function {
            name: "transfer".to_string(),
            inputs: vec![
                Parameter::new("to", "address"),
                Parameter::new("amount", "uint256"),
            ],
            outputs: vec![Parameter::new("", "bool")],
            state_mutability: StateMutability::NonPayable,
        }
    }

    #[test]
    fn test_function_signature_and_selector() {
        let f = transfer();
        assert_eq!(f.signature(), "transfer(address,uint256)");
        assert_eq!(f.selector(), [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(f.selector_hex(), "0xa9059cbb");
        assert!(f.requires_gas());
        assert!(!f.is_payable());
    }

    #[test]
    fn test_tuple_canonical_type() {
        let mut order = Parameter::new("orders", "tuple[]");
        order.components = vec![
            Parameter::new("maker", "address"),
            Parameter::new("amount", "uint"),
        ];
        assert_eq!(order.canonical_type(), "(address,uint256)[]");
        assert_eq!(Parameter::new("x", "int[3]").canonical_type(), "int256[3]");
    }

    #[test]
    fn test_event_topic_and_split() {
        let mut from = Parameter::new("from", "address");
        from.indexed = Some(true);
        let mut to = Parameter::new("to", "address");
        to.indexed = Some(true);
        let event = Event {
            name: "Transfer".to_string(),
            inputs: vec![from, to, Parameter::new("value", "uint256")],
            anonymous: false,
        };
        assert_eq!(event.indexed_inputs().len(), 2);
        assert_eq!(event.data_inputs().len(), 1);
        assert_eq!(
            event.topic_hex(),
            "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
    }

    #[test]
    fn test_mutability_parsing() {
        assert_eq!("view".parse::<StateMutability>(), Ok(StateMutability::View));
        assert!("constant".parse::<StateMutability>().is_err());
        assert!(StateMutability::Pure.is_read_only());
        assert!(!StateMutability::Payable.is_read_only());
    }
}
