//! Endpoint extraction through a language model.

use crate::extractor::truncate_chars;
use anyhow::{Context, anyhow};
use apigen_core::{CompletionModel, EndpointExtractor, EndpointSource, RawEndpoint, strip_code_fences};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

const SYSTEM_PROMPT: &str = "Extract all API endpoints from the provided documentation.
For each endpoint, identify:
- HTTP method (GET, POST, PUT, DELETE, etc.)
- Path (e.g., /api/v1/resource)
- Description
- Any parameters mentioned

Respond with JSON only, in the form:
{\"endpoints\": [{\"method\": \"GET\", \"path\": \"/api/v1/resource\", \"description\": \"...\", \"parameters\": []}]}";

/// [`EndpointExtractor`] that prompts a [`CompletionModel`] and parses its JSON reply.
pub struct LlmEndpointExtractor {
    model: Arc<dyn CompletionModel>,
    content_limit: usize,
}

impl LlmEndpointExtractor {
    pub fn new(model: Arc<dyn CompletionModel>, content_limit: usize) -> Self {
        Self {
            model,
            content_limit,
        }
    }
}

#[async_trait]
impl EndpointExtractor for LlmEndpointExtractor {
    async fn extract(&self, text: &str) -> anyhow::Result<Vec<RawEndpoint>> {
        let content = truncate_chars(text, self.content_limit);
        let reply = self
            .model
            .complete(SYSTEM_PROMPT, content)
            .await
            .with_context(|| format!("model '{}' failed", self.model.name()))?;
        parse_endpoint_reply(&reply)
    }
}

/// Parse `{"endpoints": [...]}` or a bare array. Entries without a path are skipped.
pub fn parse_endpoint_reply(reply: &str) -> anyhow::Result<Vec<RawEndpoint>> {
    let value: Value = serde_json::from_str(strip_code_fences(reply))
        .context("model reply is not valid JSON")?;

    let entries = match &value {
        Value::Array(entries) => entries,
        Value::Object(map) => map
            .get("endpoints")
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow!("model reply has no 'endpoints' array"))?,
        _ => return Err(anyhow!("model reply is neither an object nor an array")),
    };

    Ok(entries.iter().filter_map(endpoint_from_entry).collect())
}

fn endpoint_from_entry(entry: &Value) -> Option<RawEndpoint> {
    let path = entry.get("path")?.as_str()?.trim();
    if path.is_empty() {
        return None;
    }
    let method = entry
        .get("method")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or("GET")
        .to_uppercase();

    let mut endpoint = RawEndpoint::new(method, path, EndpointSource::Llm);
    if let Some(server) = entry.get("server").and_then(Value::as_str) {
        endpoint = endpoint.with_server(server);
    }
    if let Some(description) = entry.get("description").and_then(Value::as_str) {
        endpoint = endpoint.with_description(description);
    }
    if let Some(parameters) = entry.get("parameters").and_then(Value::as_array) {
        endpoint = endpoint.with_parameters(parameters.clone());
    }
    if let Some(body) = entry.get("requestBody").filter(|b| b.is_object()) {
        endpoint = endpoint.with_request_body(body.clone());
    }
    Some(endpoint)
}
