//! Mapping of parsed ABI entries to MCP tools and resources

pub mod events;
pub mod functions;
pub mod naming;
pub mod types;

pub use events::{map_event, map_events, EventField, MappedResource};
pub use functions::{map_function, map_functions, MappedParam, MappedTool, ToolCategory};
pub use types::{parse_type, rust_type_hint, to_json_schema, SolidityType, TupleField};

use crate::abi::ParsedContract;

/// Tools and resources derived from one contract.
#[derive(Debug, Clone)]
pub struct MappedContract {
    pub tools: Vec<MappedTool>,
    pub resources: Vec<MappedResource>,
}

impl MappedContract {
    pub fn read_tools(&self) -> impl Iterator<Item = &MappedTool> {
        self.tools.iter().filter(|t| t.is_read())
    }

    pub fn write_tools(&self) -> impl Iterator<Item = &MappedTool> {
        self.tools.iter().filter(|t| !t.is_read())
    }
}

/// Map every function and event of a contract. Tool order follows the ABI.
pub fn map_contract(contract: &ParsedContract, simulate_default: bool) -> MappedContract {
    MappedContract {
        tools: map_functions(&contract.functions, simulate_default),
        resources: map_events(&contract.events),
    }
}
