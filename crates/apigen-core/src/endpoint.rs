//! Endpoint records produced by the discovery pipeline.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Where a raw endpoint record came from.
///
/// The variant order is also the precedence order used by deduplication:
/// a structured document beats a regex hit, which beats a language-model guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointSource {
    Openapi,
    Regex,
    Llm,
}

impl EndpointSource {
    /// Higher wins when two records share a canonical key.
    pub fn precedence(self) -> u8 {
        match self {
            EndpointSource::Openapi => 3,
            EndpointSource::Regex => 2,
            EndpointSource::Llm => 1,
        }
    }

    /// Whether `self` should replace a record that came from `other`.
    ///
    /// Ties keep the record that was seen first.
    pub fn outranks(self, other: EndpointSource) -> bool {
        self.precedence() > other.precedence()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EndpointSource::Openapi => "openapi",
            EndpointSource::Regex => "regex",
            EndpointSource::Llm => "llm",
        }
    }
}

impl fmt::Display for EndpointSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An endpoint as found by one of the extraction strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEndpoint {
    #[serde(default)]
    pub server: String,
    pub method: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Value>,
    #[serde(
        rename = "requestBody",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub request_body: Option<Value>,
    pub source: EndpointSource,
}

impl RawEndpoint {
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        source: EndpointSource,
    ) -> Self {
        Self {
            server: String::new(),
            method: method.into(),
            path: path.into(),
            description: None,
            parameters: Vec::new(),
            request_body: None,
            source,
        }
    }

    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = server.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.description = (!description.trim().is_empty()).then_some(description);
        self
    }

    pub fn with_parameters(mut self, parameters: Vec<Value>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_request_body(mut self, body: Value) -> Self {
        self.request_body = Some(body);
        self
    }
}

/// A deduplicated endpoint with its stable id, resource group and trust score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedEndpoint {
    pub id: String,
    pub server: String,
    pub method: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Value>,
    #[serde(
        rename = "requestBody",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub request_body: Option<Value>,
    pub source: EndpointSource,
    pub confidence: f64,
    pub resource: String,
}

impl NormalizedEndpoint {
    /// Description to show for the endpoint, synthesised when none was found.
    pub fn summary(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| format!("{} {}", self.method, self.path))
    }

    /// Whether the request body declares any content types.
    pub fn has_body_content(&self) -> bool {
        self.request_body
            .as_ref()
            .and_then(|b| b.get("content"))
            .and_then(Value::as_object)
            .is_some_and(|c| !c.is_empty())
    }
}

/// Summary statistics over a catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogStats {
    pub total_endpoints: usize,
    pub resource_count: usize,
    pub by_source: BTreeMap<EndpointSource, usize>,
    pub by_resource: BTreeMap<String, usize>,
    pub mean_confidence: f64,
}

/// Endpoints grouped by resource, in discovery order within each group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub resources: BTreeMap<String, Vec<NormalizedEndpoint>>,
    pub stats: CatalogStats,
}

impl Catalog {
    pub fn find(&self, id: &str) -> Option<&NormalizedEndpoint> {
        self.endpoints().find(|ep| ep.id == id)
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &NormalizedEndpoint> {
        self.resources.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.stats.total_endpoints
    }

    pub fn is_empty(&self) -> bool {
        self.stats.total_endpoints == 0
    }
}

/// Where a crawled page was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageOrigin {
    Sitemap,
    Crawl,
}

/// A fetched documentation page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub url: String,
    pub content: String,
    pub origin: PageOrigin,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_source_precedence() {
        assert!(EndpointSource::Openapi.outranks(EndpointSource::Regex));
        assert!(EndpointSource::Regex.outranks(EndpointSource::Llm));
        assert!(!EndpointSource::Llm.outranks(EndpointSource::Llm));
        assert!(!EndpointSource::Regex.outranks(EndpointSource::Openapi));
    }

    #[test]
    fn test_raw_endpoint_serialization() {
        let ep = RawEndpoint::new("GET", "/v1/users", EndpointSource::Regex)
            .with_description("   ")
            .with_request_body(json!({"content": {}}));

        let value = serde_json::to_value(&ep).unwrap();
        assert_eq!(value["source"], "regex");
        assert!(value.get("description").is_none());
        assert!(value.get("requestBody").is_some());
    }

    #[test]
    fn test_stats_source_keys_serialize_as_strings() {
        let mut stats = CatalogStats::default();
        stats.by_source.insert(EndpointSource::Openapi, 2);

        let value = serde_json::to_value(&stats).unwrap();
        assert_eq!(value["by_source"]["openapi"], 2);
    }
}
