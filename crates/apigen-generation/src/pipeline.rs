//! The generation graph and the pipeline facade over its executor.

use crate::nodes::{
    AGGREGATE_TOOLS, AggregateTools, COMPOSE_TOOL, ComposeTool, FINALIZE, Finalize, PLAN_WORK,
    PlanWork, SCHEMA_SYNTHESIS, SchemaSynthesis, VALIDATE, Validate,
};
use crate::validate::JsonSchemaValidator;
use apigen_core::{
    ApiGenConfig, Error, GenerationPatch, GenerationState, PipelineState, Result, Review,
    SchemaGenerator, SchemaValidator, Selection,
};
use apigen_graph::{
    CheckpointStore, Graph, GraphExecutor, InMemoryCheckpointStore, NodeEventStream,
    collect_events,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub const GRAPH_NAME: &str = "generation";

/// plan → synthesize → compose → validate → aggregate → finalize, suspending
/// after aggregation for review.
pub fn build_generation_graph(
    generator: Arc<dyn SchemaGenerator>,
    validator: Arc<dyn SchemaValidator>,
    config: &ApiGenConfig,
) -> Result<Graph> {
    Graph::builder(GRAPH_NAME)
        .node(PlanWork)
        .node(SchemaSynthesis::new(generator))
        .node(ComposeTool::new(config.generation.clone()))
        .node(Validate::new(validator.clone()))
        .node(AggregateTools)
        .node(Finalize::new(validator))
        .start(PLAN_WORK)
        .edge(PLAN_WORK, SCHEMA_SYNTHESIS)
        .edge(SCHEMA_SYNTHESIS, COMPOSE_TOOL)
        .edge(COMPOSE_TOOL, VALIDATE)
        .edge(VALIDATE, AGGREGATE_TOOLS)
        .edge(AGGREGATE_TOOLS, FINALIZE)
        .edge_to_end(FINALIZE)
        .interrupt_after(AGGREGATE_TOOLS)
        .build()
}

/// Runs generation sessions.
pub struct GenerationPipeline {
    executor: GraphExecutor,
}

impl GenerationPipeline {
    pub fn builder() -> GenerationPipelineBuilder {
        GenerationPipelineBuilder::new()
    }

    pub fn executor(&self) -> &GraphExecutor {
        &self.executor
    }

    /// Start a session and stream its node events.
    pub async fn run(&self, selection: Selection, session_id: &str) -> Result<NodeEventStream> {
        self.executor
            .run(GenerationState::new(selection).into(), session_id)
            .await
    }

    /// Run a new session up to review and return its id and state.
    pub async fn generate(&self, selection: Selection) -> Result<(String, GenerationState)> {
        let session_id = Uuid::new_v4().to_string();
        collect_events(self.run(selection, &session_id).await?).await?;
        let state = self.get_state(&session_id).await?;
        Ok((session_id, state))
    }

    /// Resume a suspended session with the reviewer's decision and finish it.
    pub async fn review(&self, session_id: &str, review: Review) -> Result<GenerationState> {
        info!(session_id = %session_id, approved = review.approved, "Review received");
        let patch = GenerationPatch {
            review: Some(review),
            ..Default::default()
        };
        collect_events(self.executor.resume(session_id, patch.into()).await?).await?;
        self.get_state(session_id).await
    }

    /// Generate and approve without edits.
    pub async fn generate_approved(&self, selection: Selection) -> Result<GenerationState> {
        let (session_id, _) = self.generate(selection).await?;
        self.review(&session_id, Review::approve()).await
    }

    pub async fn get_state(&self, session_id: &str) -> Result<GenerationState> {
        match self.executor.get_state(session_id).await? {
            PipelineState::Generation(state) => Ok(state),
            other => Err(Error::StateMismatch(format!(
                "session '{}' holds {} state",
                session_id,
                other.kind()
            ))),
        }
    }
}

pub struct GenerationPipelineBuilder {
    generator: Option<Arc<dyn SchemaGenerator>>,
    validator: Option<Arc<dyn SchemaValidator>>,
    store: Option<Arc<dyn CheckpointStore>>,
    config: ApiGenConfig,
}

impl GenerationPipelineBuilder {
    pub fn new() -> Self {
        Self {
            generator: None,
            validator: None,
            store: None,
            config: ApiGenConfig::default(),
        }
    }

    pub fn generator(mut self, generator: Arc<dyn SchemaGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Defaults to a [`JsonSchemaValidator`].
    pub fn validator(mut self, validator: Arc<dyn SchemaValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Defaults to an [`InMemoryCheckpointStore`].
    pub fn checkpoint_store(mut self, store: Arc<dyn CheckpointStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(mut self, config: ApiGenConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<GenerationPipeline> {
        let generator = self
            .generator
            .ok_or_else(|| Error::config_error("Schema generator is required"))?;
        let validator = self
            .validator
            .unwrap_or_else(|| Arc::new(JsonSchemaValidator::new()));
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryCheckpointStore::new()));

        let graph = build_generation_graph(generator, validator, &self.config)?;
        Ok(GenerationPipeline {
            executor: GraphExecutor::new(graph, store),
        })
    }
}

impl Default for GenerationPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
