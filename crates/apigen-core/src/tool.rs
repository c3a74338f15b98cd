//! Work items and tool records produced by the generation pipeline.

use crate::endpoint::{EndpointSource, NormalizedEndpoint};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// The four parameter groups of a tool, each an object schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    #[serde(default = "ParameterSchema::empty_group", alias = "headers")]
    pub header: Value,
    #[serde(default = "ParameterSchema::empty_group")]
    pub path: Value,
    #[serde(default = "ParameterSchema::empty_group")]
    pub query: Value,
    #[serde(default = "ParameterSchema::empty_group")]
    pub body: Value,
}

impl ParameterSchema {
    pub const GROUPS: [&'static str; 4] = ["header", "path", "query", "body"];

    /// The shape used for a group with no parameters.
    pub fn empty_group() -> Value {
        json!({
            "type": "object",
            "properties": {},
            "required": [],
            "visible": [],
        })
    }

    pub fn empty() -> Self {
        Self {
            header: Self::empty_group(),
            path: Self::empty_group(),
            query: Self::empty_group(),
            body: Self::empty_group(),
        }
    }

    /// Build from a generator response; absent or null groups become empty groups.
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        let mut value = value;
        if let Some(obj) = value.as_object_mut() {
            obj.retain(|_, v| !v.is_null());
        }
        serde_json::from_value(value)
    }

    pub fn groups(&self) -> [(&'static str, &Value); 4] {
        [
            ("header", &self.header),
            ("path", &self.path),
            ("query", &self.query),
            ("body", &self.body),
        ]
    }

    pub fn groups_mut(&mut self) -> [(&'static str, &mut Value); 4] {
        [
            ("header", &mut self.header),
            ("path", &mut self.path),
            ("query", &mut self.query),
            ("body", &mut self.body),
        ]
    }
}

impl Default for ParameterSchema {
    fn default() -> Self {
        Self::empty()
    }
}

/// What the schema generator is told about an endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    pub method: String,
    pub path: String,
    pub description: String,
    pub parameters: Vec<Value>,
    pub request_body: Option<Value>,
}

impl From<&NormalizedEndpoint> for EndpointDescriptor {
    fn from(ep: &NormalizedEndpoint) -> Self {
        Self {
            method: ep.method.clone(),
            path: ep.path.clone(),
            description: ep.description.clone().unwrap_or_default(),
            parameters: ep.parameters.clone(),
            request_body: ep.request_body.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkStatus {
    Pending,
    SchemaGenerated,
    Failed,
}

/// One selected endpoint moving through schema synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    #[serde(rename = "endpointId")]
    pub endpoint_id: String,
    pub endpoint: NormalizedEndpoint,
    pub status: WorkStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<ParameterSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkItem {
    pub fn pending(endpoint: NormalizedEndpoint) -> Self {
        Self {
            endpoint_id: endpoint.id.clone(),
            endpoint,
            status: WorkStatus::Pending,
            schema: None,
            error: None,
        }
    }

    /// Record a generated schema. Only pending items move; finished items never revert.
    pub fn complete(&mut self, schema: ParameterSchema) {
        if self.status == WorkStatus::Pending {
            self.schema = Some(schema);
            self.status = WorkStatus::SchemaGenerated;
        }
    }

    /// Record a generation failure. Only pending items move.
    pub fn fail(&mut self, error: impl Into<String>) {
        if self.status == WorkStatus::Pending {
            self.error = Some(error.into());
            self.status = WorkStatus::Failed;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolData {
    pub method: String,
    pub path: String,
    pub server_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolMetadata {
    pub source: EndpointSource,
    pub confidence: f64,
}

/// A callable tool definition, the final output of generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRecord {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub tags: [String; 4],
    pub visibility: String,
    pub active: bool,
    pub protocol: String,
    pub protocol_data: ProtocolData,
    pub parameters: ParameterSchema,
    pub metadata: ToolMetadata,
}

impl ToolRecord {
    /// Whether `name` has the `VENDOR__RESOURCE__VERB` shape.
    pub fn is_valid_name(name: &str) -> bool {
        let parts: Vec<&str> = name.split("__").collect();
        parts.len() == 3
            && parts.iter().all(|p| {
                !p.is_empty()
                    && p.chars()
                        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
            })
    }
}
