//! Generation graph nodes.

use crate::compose::compose_tool;
use crate::schema::enhance_parameters;
use crate::validate::check_tool;
use apigen_core::config::GenerationConfig;
use apigen_core::{
    EndpointDescriptor, ErrorKind, GenerationPatch, GenerationStatus, PipelineState, Result,
    RunError, SchemaGenerator, SchemaValidator, StatePatch, ToolRecord, WorkItem, WorkStatus,
};
use apigen_graph::Node;
use apigen_telemetry::{CollaboratorCall, trace_collaborator_call};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const PLAN_WORK: &str = "plan_work";
pub const SCHEMA_SYNTHESIS: &str = "schema_synthesis";
pub const COMPOSE_TOOL: &str = "compose_tool";
pub const VALIDATE: &str = "validate";
pub const AGGREGATE_TOOLS: &str = "aggregate_tools";
pub const FINALIZE: &str = "finalize";

/// One pending work item per selected endpoint found in the catalog.
pub struct PlanWork;

#[async_trait]
impl Node for PlanWork {
    fn name(&self) -> &str {
        PLAN_WORK
    }

    async fn run(&self, state: &PipelineState) -> Result<StatePatch> {
        let state = state.as_generation()?;
        let selection = &state.selection;

        let mut work_items: Vec<WorkItem> = Vec::new();
        let mut errors = Vec::new();

        for id in &selection.endpoint_ids {
            if work_items.iter().any(|item| &item.endpoint_id == id) {
                debug!(endpoint_id = %id, "Endpoint selected twice");
                continue;
            }
            match selection.catalog.find(id) {
                Some(endpoint) => work_items.push(WorkItem::pending(endpoint.clone())),
                None => {
                    warn!(endpoint_id = %id, "Selected endpoint is not in the catalog");
                    errors.push(RunError::new(
                        ErrorKind::Selection,
                        PLAN_WORK,
                        id.clone(),
                        "endpoint id is not in the catalog",
                    ));
                }
            }
        }

        info!(work_items = work_items.len(), unknown = errors.len(), "Work planned");
        Ok(GenerationPatch {
            work_items: Some(work_items),
            errors: Some(state.errors_with(errors)),
            ..Default::default()
        }
        .into())
    }
}

/// Generates and enhances a parameter schema for every pending work item.
///
/// A failed generation marks only that item as failed.
pub struct SchemaSynthesis {
    generator: Arc<dyn SchemaGenerator>,
}

impl SchemaSynthesis {
    pub fn new(generator: Arc<dyn SchemaGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl Node for SchemaSynthesis {
    fn name(&self) -> &str {
        SCHEMA_SYNTHESIS
    }

    async fn run(&self, state: &PipelineState) -> Result<StatePatch> {
        let state = state.as_generation()?;
        let mut work_items = state.generation.work_items.clone();
        let mut errors = Vec::new();

        for item in work_items
            .iter_mut()
            .filter(|item| item.status == WorkStatus::Pending)
        {
            let descriptor = EndpointDescriptor::from(&item.endpoint);
            let result = self.generator.generate(&descriptor).await;
            trace_collaborator_call(CollaboratorCall {
                collaborator: "schema_generator",
                operation: "generate",
                subject: &item.endpoint_id,
                outcome: result.as_ref().map(|_| ()).map_err(|e| e.to_string()),
            });

            match result {
                Ok(mut schema) => {
                    enhance_parameters(&mut schema, &item.endpoint);
                    item.complete(schema);
                    debug!(endpoint_id = %item.endpoint_id, "Schema generated");
                }
                Err(e) => {
                    let message = format!("{:#}", e);
                    warn!(endpoint_id = %item.endpoint_id, error = %message, "Schema generation failed");
                    errors.push(RunError::new(
                        ErrorKind::SchemaSynthesis,
                        SCHEMA_SYNTHESIS,
                        item.endpoint_id.clone(),
                        message.clone(),
                    ));
                    item.fail(message);
                }
            }
        }

        let generated = work_items
            .iter()
            .filter(|item| item.status == WorkStatus::SchemaGenerated)
            .count();
        info!(generated, failed = errors.len(), "Schema synthesis finished");

        Ok(GenerationPatch {
            work_items: Some(work_items),
            errors: Some(state.errors_with(errors)),
            ..Default::default()
        }
        .into())
    }
}

/// Builds a tool record for every work item with a generated schema.
pub struct ComposeTool {
    config: GenerationConfig,
}

impl ComposeTool {
    pub fn new(config: GenerationConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Node for ComposeTool {
    fn name(&self) -> &str {
        COMPOSE_TOOL
    }

    async fn run(&self, state: &PipelineState) -> Result<StatePatch> {
        let state = state.as_generation()?;
        let server_override = state.selection.server_url.as_deref();

        let tools: Vec<ToolRecord> = state
            .generation
            .work_items
            .iter()
            .filter_map(|item| compose_tool(item, server_override, &self.config))
            .collect();

        info!(tools = tools.len(), "Tools composed");
        Ok(GenerationPatch {
            tools: Some(tools),
            ..Default::default()
        }
        .into())
    }
}

/// Drops tools whose schema groups fail the compliance check.
pub struct Validate {
    validator: Arc<dyn SchemaValidator>,
}

impl Validate {
    pub fn new(validator: Arc<dyn SchemaValidator>) -> Self {
        Self { validator }
    }
}

#[async_trait]
impl Node for Validate {
    fn name(&self) -> &str {
        VALIDATE
    }

    async fn run(&self, state: &PipelineState) -> Result<StatePatch> {
        let state = state.as_generation()?;
        let (tools, errors) = check_tools(&state.generation.tools, self.validator.as_ref(), VALIDATE);

        info!(valid = tools.len(), dropped = errors.len(), "Tools validated");
        Ok(GenerationPatch {
            tools: Some(tools),
            errors: Some(state.errors_with(errors)),
            ..Default::default()
        }
        .into())
    }
}

/// Split `tools` into the compliant ones and a validation error per rejected tool.
fn check_tools(
    tools: &[ToolRecord],
    validator: &dyn SchemaValidator,
    stage: &str,
) -> (Vec<ToolRecord>, Vec<RunError>) {
    let mut valid = Vec::new();
    let mut errors = Vec::new();

    for tool in tools {
        let result = check_tool(tool, validator);
        trace_collaborator_call(CollaboratorCall {
            collaborator: "schema_validator",
            operation: "check_compliance",
            subject: &tool.name,
            outcome: result.as_ref().map_err(|v| v.join("; ")).copied(),
        });

        match result {
            Ok(()) => valid.push(tool.clone()),
            Err(violations) => {
                let message = violations.join("; ");
                warn!(tool = %tool.name, stage = %stage, error = %message, "Tool failed validation");
                errors.push(RunError::new(ErrorKind::Validation, stage, tool.name.clone(), message));
            }
        }
    }

    (valid, errors)
}

fn sort_by_name(tools: &mut [ToolRecord]) {
    tools.sort_by(|a, b| a.name.cmp(&b.name));
}

/// Orders tools by name for review.
pub struct AggregateTools;

#[async_trait]
impl Node for AggregateTools {
    fn name(&self) -> &str {
        AGGREGATE_TOOLS
    }

    async fn run(&self, state: &PipelineState) -> Result<StatePatch> {
        let mut tools = state.as_generation()?.generation.tools.clone();
        sort_by_name(&mut tools);

        info!(tools = tools.len(), "Tools aggregated");
        Ok(GenerationPatch {
            tools: Some(tools),
            ..Default::default()
        }
        .into())
    }
}

/// Applies the review. Edited tools go through the same compliance check as
/// generated ones before they are emitted.
pub struct Finalize {
    validator: Arc<dyn SchemaValidator>,
}

impl Finalize {
    pub fn new(validator: Arc<dyn SchemaValidator>) -> Self {
        Self { validator }
    }
}

#[async_trait]
impl Node for Finalize {
    fn name(&self) -> &str {
        FINALIZE
    }

    async fn run(&self, state: &PipelineState) -> Result<StatePatch> {
        let state = state.as_generation()?;
        let review = state.generation.review.as_ref();

        if review.is_some_and(|r| !r.approved) {
            info!(errors = state.generation.errors.len(), "Tools rejected at review");
            return Ok(GenerationPatch {
                tools: Some(Vec::new()),
                status: Some(GenerationStatus::Rejected),
                final_count: Some(0),
                ..Default::default()
            }
            .into());
        }

        let (tools, errors) = match review.and_then(|r| r.edited_tools.as_deref()) {
            Some(edited) => {
                debug!(tools = edited.len(), "Using reviewed tool list");
                let (mut tools, errors) = check_tools(edited, self.validator.as_ref(), FINALIZE);
                sort_by_name(&mut tools);
                (tools, errors)
            }
            None => (state.generation.tools.clone(), Vec::new()),
        };
        let errors = state.errors_with(errors);

        info!(tools = tools.len(), errors = errors.len(), "Generation completed");
        Ok(GenerationPatch {
            final_count: Some(tools.len()),
            tools: Some(tools),
            errors: Some(errors),
            status: Some(GenerationStatus::Completed),
            ..Default::default()
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::JsonSchemaValidator;
    use apigen_core::{
        Catalog, EndpointSource, GenerationState, NormalizedEndpoint, ParameterSchema, Review,
        Selection,
    };
    use serde_json::{Value, json};

    fn endpoint(id: &str, method: &str, path: &str) -> NormalizedEndpoint {
        NormalizedEndpoint {
            id: id.into(),
            server: "https://api.example.com".into(),
            method: method.into(),
            path: path.into(),
            description: None,
            parameters: vec![],
            request_body: None,
            source: EndpointSource::Openapi,
            confidence: 0.65,
            resource: apigen_core::path::resource_of(path),
        }
    }

    fn catalog() -> Catalog {
        let mut catalog = Catalog::default();
        catalog.resources.insert(
            "flights".into(),
            vec![endpoint("aaaaaaaaaaaa", "GET", "/v1/flights/search")],
        );
        catalog.resources.insert(
            "bookings".into(),
            vec![endpoint("bbbbbbbbbbbb", "POST", "/v1/bookings")],
        );
        catalog.stats.total_endpoints = 2;
        catalog
    }

    fn state_with(ids: &[&str]) -> GenerationState {
        GenerationState::new(Selection::new(catalog(), ids.iter().copied()))
    }

    fn patch(patch: StatePatch) -> GenerationPatch {
        match patch {
            StatePatch::Generation(p) => p,
            other => panic!("unexpected {} patch", other.kind()),
        }
    }

    async fn step(state: &mut GenerationState, node: &dyn Node) {
        let mut wrapped = PipelineState::from(state.clone());
        let patch = node.run(&wrapped).await.unwrap();
        wrapped.merge(patch).unwrap();
        *state = wrapped.as_generation().unwrap().clone();
    }

    struct FailFor(&'static str);

    #[async_trait]
    impl SchemaGenerator for FailFor {
        async fn generate(&self, endpoint: &EndpointDescriptor) -> anyhow::Result<ParameterSchema> {
            if endpoint.path == self.0 {
                anyhow::bail!("model timed out");
            }
            Ok(ParameterSchema {
                query: json!({"type": "object", "properties": {"q": {"type": "string"}}}),
                ..ParameterSchema::empty()
            })
        }
    }

    #[tokio::test]
    async fn test_plan_records_unknown_ids() {
        let state = state_with(&["aaaaaaaaaaaa", "missing", "aaaaaaaaaaaa"]);
        let p = patch(PlanWork.run(&PipelineState::from(state)).await.unwrap());

        let items = p.work_items.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].status, WorkStatus::Pending);

        let errors = p.errors.unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::Selection);
        assert_eq!(errors[0].subject, "missing");
    }

    #[tokio::test]
    async fn test_synthesis_isolates_failures() {
        let mut state = state_with(&["aaaaaaaaaaaa", "bbbbbbbbbbbb"]);
        step(&mut state, &PlanWork).await;

        let node = SchemaSynthesis::new(Arc::new(FailFor("/v1/bookings")));
        let p = patch(node.run(&PipelineState::from(state)).await.unwrap());

        let items = p.work_items.unwrap();
        assert_eq!(items[0].status, WorkStatus::SchemaGenerated);
        assert_eq!(items[1].status, WorkStatus::Failed);
        assert_eq!(items[1].error.as_deref(), Some("model timed out"));

        let schema = items[0].schema.as_ref().unwrap();
        assert_eq!(schema.query["visible"], json!(["q"]));
        assert_eq!(schema.query["additionalProperties"], false);
        assert_eq!(schema.body, ParameterSchema::empty_group());

        let errors = p.errors.unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::SchemaSynthesis);
        assert_eq!(errors[0].subject, "bbbbbbbbbbbb");
    }

    #[tokio::test]
    async fn test_compose_validate_aggregate() {
        let mut state = state_with(&["bbbbbbbbbbbb", "aaaaaaaaaaaa"]);
        state.selection.server_url = Some("https://api.example.com".into());
        let nodes: [&dyn Node; 4] = [
            &PlanWork,
            &SchemaSynthesis::new(Arc::new(FailFor("/nowhere"))),
            &ComposeTool::new(GenerationConfig::default()),
            &Validate::new(Arc::new(JsonSchemaValidator::new())),
        ];
        for node in nodes {
            step(&mut state, node).await;
        }

        let names: Vec<&str> = state.generation.tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["EXAMPLE__BOOKINGS__CREATE", "EXAMPLE__FLIGHTS__SEARCH"]);
        assert!(state.generation.errors.is_empty());

        state.generation.tools.reverse();
        let p = patch(AggregateTools.run(&PipelineState::from(state)).await.unwrap());
        let sorted: Vec<String> = p.tools.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(sorted, vec!["EXAMPLE__BOOKINGS__CREATE", "EXAMPLE__FLIGHTS__SEARCH"]);
    }

    #[tokio::test]
    async fn test_validate_drops_rejected_tools() {
        struct RejectQuery;

        impl SchemaValidator for RejectQuery {
            fn check_compliance(&self, schema: &Value) -> std::result::Result<(), Vec<String>> {
                if schema["properties"].get("q").is_some() {
                    Err(vec!["q is not allowed".into()])
                } else {
                    Ok(())
                }
            }
        }

        let mut state = state_with(&["aaaaaaaaaaaa"]);
        let nodes: [&dyn Node; 3] = [
            &PlanWork,
            &SchemaSynthesis::new(Arc::new(FailFor("/nowhere"))),
            &ComposeTool::new(GenerationConfig::default()),
        ];
        for node in nodes {
            step(&mut state, node).await;
        }
        assert_eq!(state.generation.tools.len(), 1);

        let p = patch(
            Validate::new(Arc::new(RejectQuery))
                .run(&PipelineState::from(state))
                .await
                .unwrap(),
        );
        assert!(p.tools.unwrap().is_empty());
        let errors = p.errors.unwrap();
        assert_eq!(errors[0].kind, ErrorKind::Validation);
        assert_eq!(errors[0].subject, "EXAMPLE__FLIGHTS__SEARCH");
        assert_eq!(errors[0].message, "query: q is not allowed");
    }

    #[tokio::test]
    async fn test_finalize_review_outcomes() {
        let finalize = Finalize::new(Arc::new(JsonSchemaValidator::new()));
        let mut state = state_with(&[]);
        step(&mut state, &PlanWork).await;

        let p = patch(finalize.run(&PipelineState::from(state.clone())).await.unwrap());
        assert_eq!(p.status, Some(GenerationStatus::Completed));
        assert_eq!(p.final_count, Some(0));

        state.generation.review = Some(Review::reject());
        let p = patch(finalize.run(&PipelineState::from(state.clone())).await.unwrap());
        assert_eq!(p.status, Some(GenerationStatus::Rejected));
        assert_eq!(p.final_count, Some(0));
    }

    #[tokio::test]
    async fn test_finalize_checks_edited_tools() {
        let mut state = state_with(&["aaaaaaaaaaaa", "bbbbbbbbbbbb"]);
        let nodes: [&dyn Node; 3] = [
            &PlanWork,
            &SchemaSynthesis::new(Arc::new(FailFor("/nowhere"))),
            &ComposeTool::new(GenerationConfig::default()),
        ];
        for node in nodes {
            step(&mut state, node).await;
        }

        let mut edited = state.generation.tools.clone();
        edited[0].name = "not a valid name!".into();
        edited[1].parameters.query = json!({"type": "banana"});
        let mut kept = state.generation.tools[1].clone();
        kept.name = "EXAMPLE__FLIGHTS__LIST".into();
        edited.push(kept);
        state.generation.review = Some(Review::with_edits(edited));

        let finalize = Finalize::new(Arc::new(JsonSchemaValidator::new()));
        let p = patch(finalize.run(&PipelineState::from(state)).await.unwrap());

        assert_eq!(p.status, Some(GenerationStatus::Completed));
        assert_eq!(p.final_count, Some(1));
        let names: Vec<String> = p.tools.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["EXAMPLE__FLIGHTS__LIST"]);

        let errors = p.errors.unwrap();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.kind == ErrorKind::Validation && e.stage == FINALIZE));
        assert!(errors[0].message.starts_with("name:"));
        assert!(errors[1].message.starts_with("query:"));
    }
}
