//! Assembling tool records from work items with generated schemas.

use crate::naming::{Verb, display_name, tool_name, vendor_label};
use apigen_core::config::GenerationConfig;
use apigen_core::{ProtocolData, ToolMetadata, ToolRecord, WorkItem, WorkStatus, path};

pub const VISIBILITY_PUBLIC: &str = "public";
pub const PROTOCOL_REST: &str = "rest";

/// The tool for a work item, or `None` unless its schema was generated.
///
/// `server_override` replaces the endpoint's own server in the vendor label and
/// the protocol data.
pub fn compose_tool(
    item: &WorkItem,
    server_override: Option<&str>,
    config: &GenerationConfig,
) -> Option<ToolRecord> {
    if item.status != WorkStatus::SchemaGenerated {
        return None;
    }
    let schema = item.schema.clone()?;
    let endpoint = &item.endpoint;

    let server_url = server_override
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(&endpoint.server)
        .to_string();
    let vendor = vendor_label(Some(&server_url));
    let resource = path::resource_of(&endpoint.path);
    let verb = Verb::derive(&endpoint.method, &endpoint.path);
    let version =
        path::version_of(&endpoint.path).unwrap_or_else(|| config.default_version_tag.clone());

    Some(ToolRecord {
        name: tool_name(&vendor, &resource, verb),
        display_name: display_name(
            endpoint.description.as_deref(),
            verb,
            &resource,
            config.display_name_max_len,
        ),
        description: endpoint.summary(),
        tags: [
            vendor,
            resource,
            version.to_lowercase(),
            endpoint.method.to_lowercase(),
        ],
        visibility: VISIBILITY_PUBLIC.to_string(),
        active: true,
        protocol: PROTOCOL_REST.to_string(),
        protocol_data: ProtocolData {
            method: endpoint.method.to_uppercase(),
            path: endpoint.path.clone(),
            server_url,
        },
        parameters: schema,
        metadata: ToolMetadata {
            source: endpoint.source,
            confidence: endpoint.confidence,
        },
    })
}
