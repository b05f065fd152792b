//! Structured-data (JSON-LD) validation.
//!
//! Each block is checked on its own; a problem in one block never stops the
//! others. Arrays are validated element by element under the array's block
//! index.

pub mod rules;

pub use rules::RuleSet;

use serde_json::{Map, Value};

use crate::findings::{Finding, FindingKind};
use crate::parsers::jsonld::{self, RawBlock};

/// Accepted `@context` values, compared as exact strings.
pub const SCHEMA_ORG_CONTEXTS: [&str; 2] = ["https://schema.org", "http://schema.org"];

/// Validates blocks in order and returns their findings in generation order.
pub fn validate<I>(blocks: I, rules: &RuleSet) -> Vec<Finding>
where
    I: IntoIterator,
    I::Item: Into<RawBlock>,
{
    let mut findings = Vec::new();

    for block in blocks {
        let RawBlock { index, content } = block.into();
        match content {
            Err(detail) => findings.push(Finding::in_block(index, FindingKind::InvalidJson { detail })),
            Ok(Value::Object(object)) => validate_object(index, &object, rules, &mut findings),
            Ok(Value::Array(items)) => {
                for item in &items {
                    match item {
                        Value::Object(object) => {
                            validate_object(index, object, rules, &mut findings)
                        }
                        other => findings.push(not_an_object(index, other)),
                    }
                }
            }
            Ok(other) => findings.push(not_an_object(index, &other)),
        }
    }

    ::log::debug!("Schema validation produced {} findings", findings.len());
    findings
}

/// Finds every JSON-LD region in `source` and validates it, unparseable
/// regions included.
pub fn validate_source(source: &str, rules: &RuleSet) -> Vec<Finding> {
    validate(jsonld::scan_source(source), rules)
}

fn not_an_object(index: usize, value: &Value) -> Finding {
    let found = match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    };
    Finding::in_block(index, FindingKind::NotAnObject { found })
}

fn validate_object(
    index: usize,
    object: &Map<String, Value>,
    rules: &RuleSet,
    findings: &mut Vec<Finding>,
) {
    match object.get("@context") {
        None => findings.push(Finding::in_block(index, FindingKind::MissingContext)),
        Some(Value::String(context)) if SCHEMA_ORG_CONTEXTS.contains(&context.as_str()) => {}
        Some(other) => findings.push(Finding::in_block(
            index,
            FindingKind::UnexpectedContext {
                found: other.to_string(),
            },
        )),
    }

    let type_names = type_names(object.get("@type"));
    if object.get("@type").is_none() {
        findings.push(Finding::in_block(index, FindingKind::MissingType));
    }

    // Serialising a Map cannot fail
    let text = Value::Object(object.clone()).to_string();
    for marker in rules.placeholders_in(&text) {
        findings.push(Finding::in_block(
            index,
            FindingKind::Placeholder {
                marker: marker.to_string(),
            },
        ));
    }

    for type_name in &type_names {
        if let Some(note) = rules.deprecation(type_name) {
            findings.push(Finding::in_block(
                index,
                FindingKind::DeprecatedType {
                    type_name: type_name.to_string(),
                    note: note.to_string(),
                },
            ));
        }
    }

    for type_name in &type_names {
        if let Some(note) = rules.restriction(type_name) {
            findings.push(Finding::in_block(
                index,
                FindingKind::RestrictedType {
                    type_name: type_name.to_string(),
                    note: note.to_string(),
                },
            ));
        }
    }
}

/// `@type` may be a single name or a list of names
fn type_names(value: Option<&Value>) -> Vec<&str> {
    match value {
        Some(Value::String(name)) => vec![name.as_str()],
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}
