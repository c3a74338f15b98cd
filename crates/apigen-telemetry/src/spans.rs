//! Span creation helpers for node executions and collaborator calls

use crate::attributes::*;

/// Span covering one node execution. The executor enters it for the node's duration.
pub fn node_span(graph: &str, node: &str, session_id: &str) -> tracing::Span {
    tracing::info_span!(
        "execute_node",
        { APIGEN_GRAPH } = %graph,
        { APIGEN_NODE } = %node,
        { APIGEN_SESSION_ID } = %session_id,
    )
}

/// Attributes for tracing a call into an external collaborator
#[derive(Debug, Clone)]
pub struct CollaboratorCall<'a> {
    /// e.g. "http_fetcher", "endpoint_extractor", "schema_generator"
    pub collaborator: &'a str,
    pub operation: &'a str,
    /// URL, file or endpoint id the call was about
    pub subject: &'a str,
    pub outcome: Result<(), String>,
}

/// Record a collaborator call as a span, nested under the current node span.
pub fn trace_collaborator_call(call: CollaboratorCall<'_>) {
    let outcome = match &call.outcome {
        Ok(()) => "ok".to_string(),
        Err(e) => format!("error: {}", e),
    };

    let span = tracing::debug_span!(
        "call_collaborator",
        { APIGEN_COLLABORATOR } = %call.collaborator,
        { APIGEN_OPERATION } = %call.operation,
        { APIGEN_SUBJECT } = %call.subject,
        { APIGEN_OUTCOME } = %outcome,
    );

    // Enter and immediately exit the span (it's recorded)
    let _guard = span.enter();
}

/// Helper to safely serialize to JSON string
pub fn safe_serialize<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "<not serializable>".to_string())
}
