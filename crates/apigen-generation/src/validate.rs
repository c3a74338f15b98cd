//! Schema compliance checking for composed tools.

use crate::schema::strip_visible;
use apigen_core::{SchemaValidator, ToolRecord};
use jsonschema::{Draft, JSONSchema};
use serde_json::Value;

/// Checks schemas against the JSON Schema Draft 7 meta-schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSchemaValidator;

impl JsonSchemaValidator {
    pub fn new() -> Self {
        Self
    }
}

impl SchemaValidator for JsonSchemaValidator {
    fn check_compliance(&self, schema: &Value) -> Result<(), Vec<String>> {
        JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(schema)
            .map(|_| ())
            .map_err(|e| vec![e.to_string()])
    }
}

/// Check every parameter group of `tool`, with `visible` stripped, plus the
/// shape of its name. Returns the violations, prefixed by group.
pub fn check_tool(tool: &ToolRecord, validator: &dyn SchemaValidator) -> Result<(), Vec<String>> {
    let mut violations = Vec::new();

    if !ToolRecord::is_valid_name(&tool.name) {
        violations.push(format!(
            "name: '{}' is not of the form VENDOR__RESOURCE__VERB",
            tool.name
        ));
    }

    for (group, schema) in tool.parameters.groups() {
        if let Err(found) = validator.check_compliance(&strip_visible(schema)) {
            violations.extend(found.into_iter().map(|v| format!("{}: {}", group, v)));
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}
