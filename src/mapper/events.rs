//! Contract events → MCP resource definitions

use serde::Serialize;
use serde_json::Value;

use super::naming::{camel_to_readable, sanitize_identifier, unique_keys, UniqueNames};
use super::types::{parse_type, to_json_schema};
use crate::abi::Event;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventField {
    pub name: String,
    pub original_name: String,
    pub solidity_type: String,
    pub indexed: bool,
    pub schema: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappedResource {
    pub name: String,
    pub original_name: String,
    /// `events://<name>`
    pub uri: String,
    pub fields: Vec<EventField>,
    /// `get_<name>_events`
    pub accessor: String,
    pub description: String,
    pub abi_signature: String,
    pub topic: String,
    pub anonymous: bool,
}

impl MappedResource {
    /// Fields that can be filtered on through log topics.
    pub fn indexed_fields(&self) -> impl Iterator<Item = &EventField> {
        self.fields.iter().filter(|f| f.indexed)
    }

    pub fn data_fields(&self) -> impl Iterator<Item = &EventField> {
        self.fields.iter().filter(|f| !f.indexed)
    }
}

pub fn map_events(events: &[Event]) -> Vec<MappedResource> {
    let mut names = UniqueNames::new();
    events
        .iter()
        .map(|e| {
            let mut resource = map_event(e);
            let unique = names.claim(resource.name.clone());
            if unique != resource.name {
                resource.uri = format!("events://{}", unique);
                resource.accessor = format!("get_{}_events", unique);
                resource.name = unique;
            }
            resource
        })
        .collect()
}

pub fn map_event(event: &Event) -> MappedResource {
    let name = sanitize_identifier(&event.name);

    let keys = unique_keys(event.inputs.iter().map(|p| p.name.as_str()), |i| {
        format!("field{}", i)
    });
    let fields: Vec<EventField> = event
        .inputs
        .iter()
        .zip(keys)
        .map(|(p, field_name)| {
            let ty = parse_type(&p.ty, &p.components);
            EventField {
                schema: to_json_schema(&ty, Some(&field_name), None),
                solidity_type: ty.canonical(),
                original_name: p.name.clone(),
                indexed: p.is_indexed(),
                name: field_name,
            }
        })
        .collect();

    let mut description = format!("{} event", camel_to_readable(&event.name));
    let indexed: Vec<&str> = fields
        .iter()
        .filter(|f| f.indexed)
        .map(|f| f.name.as_str())
        .collect();
    let data: Vec<&str> = fields
        .iter()
        .filter(|f| !f.indexed)
        .map(|f| f.name.as_str())
        .collect();
    if !indexed.is_empty() {
        description.push_str(&format!(". Indexed: {}", indexed.join(", ")));
    }
    if !data.is_empty() {
        description.push_str(&format!(". Data: {}", data.join(", ")));
    }
    if event.anonymous {
        description.push_str(". Anonymous (no signature topic)");
    }

    MappedResource {
        uri: format!("events://{}", name),
        accessor: format!("get_{}_events", name),
        original_name: event.name.clone(),
        abi_signature: event.signature(),
        topic: event.topic_hex(),
        anonymous: event.anonymous,
        description,
        fields,
        name,
    }
}
