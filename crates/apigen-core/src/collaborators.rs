//! Seams to the systems the pipelines depend on but do not implement.
//!
//! Every collaborator is handed to a pipeline at construction time so a run can
//! be driven entirely by deterministic fakes.

use crate::endpoint::RawEndpoint;
use crate::tool::{EndpointDescriptor, ParameterSchema};
use async_trait::async_trait;
use serde_json::Value;

/// Retrieves a page or sitemap body by URL.
///
/// Timeouts and retries are the implementation's business.
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> anyhow::Result<String>;
}

/// Extracts endpoints from unstructured text. An empty result is not an error.
#[async_trait]
pub trait EndpointExtractor: Send + Sync {
    async fn extract(&self, text: &str) -> anyhow::Result<Vec<RawEndpoint>>;
}

/// Synthesises the four-group parameter schema for an endpoint.
#[async_trait]
pub trait SchemaGenerator: Send + Sync {
    async fn generate(&self, endpoint: &EndpointDescriptor) -> anyhow::Result<ParameterSchema>;
}

/// Checks a single schema for compliance with the schema-description standard.
pub trait SchemaValidator: Send + Sync {
    /// `Ok(())` when compliant, otherwise the list of violations.
    fn check_compliance(&self, schema: &Value) -> Result<(), Vec<String>>;
}

/// A text-in, text-out language model call.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, system: &str, user: &str) -> anyhow::Result<String>;
}

/// Strip a surrounding markdown code fence (```` ``` ```` or ```` ```json ````) from a model reply.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().trim_end_matches("```").trim()
}
