//! Structured API description parsing (OpenAPI 3 and Swagger 2).
//!
//! Documents are walked as loose JSON values rather than deserialised into a
//! typed model, so partial or slightly off-standard documents still yield
//! whatever operations they describe.

use apigen_core::{EndpointSource, RawEndpoint};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::debug;

/// HTTP methods recognised as operations under a path item.
pub const OPERATION_METHODS: [&str; 7] = ["get", "post", "put", "delete", "patch", "head", "options"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// `.json` files are JSON; everything else is read as YAML, which also accepts JSON.
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => DocumentFormat::Json,
            _ => DocumentFormat::Yaml,
        }
    }
}

/// Parse a document and extract its operations.
///
/// Fails when the text is not a mapping in the given format or has no `paths`
/// mapping; callers fall back to unstructured extraction in that case.
pub fn parse_document(content: &str, format: DocumentFormat) -> anyhow::Result<Vec<RawEndpoint>> {
    let document: Value = match format {
        DocumentFormat::Json => serde_json::from_str(content)?,
        DocumentFormat::Yaml => serde_yaml::from_str(content)?,
    };

    endpoints_from_document(&document)
        .ok_or_else(|| anyhow::anyhow!("document has no 'paths' mapping"))
}

/// Extract every `path × method` operation of a parsed document.
///
/// Returns `None` when the document has no `paths` mapping.
pub fn endpoints_from_document(document: &Value) -> Option<Vec<RawEndpoint>> {
    let paths = document.get("paths")?.as_object()?;
    let server = server_url(document);

    let mut endpoints = Vec::new();
    for (path, item) in paths {
        let Some(item) = item.as_object() else {
            debug!("Skipping non-mapping path item: {}", path);
            continue;
        };
        let shared_parameters = parameter_list(item.get("parameters"));

        for method in OPERATION_METHODS {
            let Some(operation) = item.get(method).and_then(Value::as_object) else {
                continue;
            };

            let mut endpoint = RawEndpoint::new(method.to_uppercase(), path, EndpointSource::Openapi)
                .with_server(server.clone())
                .with_parameters(merge_parameters(
                    parameter_list(operation.get("parameters")),
                    &shared_parameters,
                ));

            if let Some(description) = operation_description(operation) {
                endpoint = endpoint.with_description(description);
            }
            if let Some(body) = operation.get("requestBody").filter(|b| !b.is_null()) {
                endpoint = endpoint.with_request_body(body.clone());
            }

            endpoints.push(endpoint);
        }
    }

    debug!("Parsed {} operations", endpoints.len());
    Some(endpoints)
}

/// `servers[0].url` (OpenAPI 3) or `scheme://host basePath` (Swagger 2).
fn server_url(document: &Value) -> String {
    if let Some(url) = document
        .get("servers")
        .and_then(Value::as_array)
        .and_then(|servers| servers.first())
        .and_then(|server| server.get("url"))
        .and_then(Value::as_str)
    {
        return url.to_string();
    }

    let Some(host) = document.get("host").and_then(Value::as_str) else {
        return String::new();
    };
    let scheme = document
        .get("schemes")
        .and_then(Value::as_array)
        .and_then(|schemes| schemes.first())
        .and_then(Value::as_str)
        .unwrap_or("https");
    let base_path = document
        .get("basePath")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim_end_matches('/');

    format!("{}://{}{}", scheme, host, base_path)
}

fn operation_description(operation: &Map<String, Value>) -> Option<String> {
    ["summary", "description"]
        .iter()
        .filter_map(|key| operation.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|text| !text.is_empty())
        .map(str::to_string)
}

fn parameter_list(value: Option<&Value>) -> Vec<Value> {
    value
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn parameter_identity(parameter: &Value) -> Option<(&str, &str)> {
    Some((
        parameter.get("name")?.as_str()?,
        parameter.get("in")?.as_str()?,
    ))
}

/// Operation parameters win over path-item parameters with the same name and location.
fn merge_parameters(mut own: Vec<Value>, shared: &[Value]) -> Vec<Value> {
    for parameter in shared {
        let overridden = parameter_identity(parameter).is_some_and(|identity| {
            own.iter()
                .any(|p| parameter_identity(p) == Some(identity))
        });
        if !overridden {
            own.push(parameter.clone());
        }
    }
    own
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FLIGHTS_YAML: &str = r#"
openapi: 3.0.0
info:
  title: Example
  version: "1.0"
servers:
  - url: https://api.example.com
paths:
  /v1/flights/search:
    parameters:
      - name: X-Trace
        in: header
    get:
      summary: Search flights. Returns matching itineraries.
      parameters:
        - name: origin
          in: query
          required: true
  /v1/bookings:
    post:
      description: Create a booking
      requestBody:
        content:
          application/json:
            schema:
              type: object
"#;

    #[test]
    fn test_parse_openapi3_yaml() {
        let endpoints = parse_document(FLIGHTS_YAML, DocumentFormat::Yaml).unwrap();
        assert_eq!(endpoints.len(), 2);

        let search = endpoints.iter().find(|e| e.method == "GET").unwrap();
        assert_eq!(search.path, "/v1/flights/search");
        assert_eq!(search.server, "https://api.example.com");
        assert_eq!(search.source, EndpointSource::Openapi);
        assert_eq!(
            search.description.as_deref(),
            Some("Search flights. Returns matching itineraries.")
        );
        assert_eq!(search.parameters.len(), 2);

        let booking = endpoints.iter().find(|e| e.method == "POST").unwrap();
        assert_eq!(booking.description.as_deref(), Some("Create a booking"));
        assert!(booking.request_body.is_some());
    }

    #[test]
    fn test_parse_swagger2_json() {
        let document = json!({
            "swagger": "2.0",
            "host": "petstore.example.org",
            "basePath": "/v2/",
            "schemes": ["http"],
            "paths": {
                "/pets/{petId}": {
                    "get": {"operationId": "getPet"},
                    "delete": {"summary": "  "},
                    "x-extension": {"ignored": true}
                }
            }
        });

        let endpoints =
            parse_document(&document.to_string(), DocumentFormat::Json).unwrap();
        assert_eq!(endpoints.len(), 2);
        assert!(endpoints.iter().all(|e| e.server == "http://petstore.example.org/v2"));
        assert!(endpoints.iter().all(|e| e.description.is_none()));
    }

    #[test]
    fn test_operation_parameters_override_path_item() {
        let document = json!({
            "paths": {
                "/items/{id}": {
                    "parameters": [
                        {"name": "id", "in": "path", "description": "shared"},
                        {"name": "locale", "in": "query"}
                    ],
                    "get": {
                        "parameters": [{"name": "id", "in": "path", "description": "own"}]
                    }
                }
            }
        });

        let endpoints = endpoints_from_document(&document).unwrap();
        let parameters = &endpoints[0].parameters;
        assert_eq!(parameters.len(), 2);
        assert_eq!(parameters[0]["description"], "own");
        assert_eq!(parameters[1]["name"], "locale");
        assert_eq!(endpoints[0].server, "");
    }

    #[test]
    fn test_unstructured_documents_fail() {
        assert!(parse_document("GET /api/users lists users", DocumentFormat::Yaml).is_err());
        assert!(parse_document("{\"openapi\": \"3.0.0\"}", DocumentFormat::Json).is_err());
        assert!(parse_document("not json", DocumentFormat::Json).is_err());
    }

    #[test]
    fn test_format_for_path() {
        assert_eq!(DocumentFormat::for_path(Path::new("api.JSON")), DocumentFormat::Json);
        assert_eq!(DocumentFormat::for_path(Path::new("api.yml")), DocumentFormat::Yaml);
        assert_eq!(DocumentFormat::for_path(Path::new("notes.txt")), DocumentFormat::Yaml);
    }
}
