//! ABI parsing, standard detection and validation

pub mod parser;
pub mod standards;
pub mod types;
pub mod validate;

pub use parser::parse_abi;
pub use standards::{detect_standard, Standard};
pub use types::{AbiError, Event, Function, Parameter, ParsedContract, StateMutability};
pub use validate::{
    is_valid_address, is_valid_identifier, validate_abi, Severity, ValidationIssue,
    ValidationReport,
};
