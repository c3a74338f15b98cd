//! The discovery graph and the pipeline facade over its executor.

use crate::crawler::WebCrawler;
use crate::fetcher::ReqwestFetcher;
use crate::nodes::{
    CLASSIFY_INPUT, ClassifyInput, DISCOVER_FROM_WEB, DiscoverFromWeb, ENDPOINT_EXTRACTOR,
    ExtractEndpoints, NORMALIZE_AND_DEDUP, NormalizeAndDedup, PARSE_FILES, ParseFiles,
    SUMMARIZE_FOR_UI, SummarizeForUi,
};
use apigen_core::{
    ApiGenConfig, DiscoveryInput, DiscoveryPatch, DiscoveryState, EndpointExtractor, Error,
    ErrorKind, HttpFetcher, InputType, PipelineState, Result, RunError,
};
use apigen_graph::{
    CheckpointStore, Graph, GraphExecutor, InMemoryCheckpointStore, NodeEventStream, Target,
    collect_events,
};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

pub const GRAPH_NAME: &str = "discovery";

fn route_on_input_type(state: &PipelineState) -> Result<String> {
    Ok(state
        .as_discovery()?
        .discovery
        .input_type
        .map(|t| t.as_str().to_string())
        .unwrap_or_default())
}

/// classify → (parse files | crawl → extract) → normalize → summarize, suspending
/// after the summary so a caller can select endpoints.
pub fn build_discovery_graph(
    fetcher: Arc<dyn HttpFetcher>,
    extractor: Arc<dyn EndpointExtractor>,
    config: &ApiGenConfig,
) -> Result<Graph> {
    let crawler = WebCrawler::new(fetcher, config.crawl.clone());

    Graph::builder(GRAPH_NAME)
        .node(ClassifyInput)
        .node(ParseFiles::new(extractor.clone()))
        .node(DiscoverFromWeb::new(crawler))
        .node(ExtractEndpoints::new(extractor))
        .node(NormalizeAndDedup)
        .node(SummarizeForUi)
        .start(CLASSIFY_INPUT)
        .conditional_edge(
            CLASSIFY_INPUT,
            route_on_input_type,
            [
                (InputType::File.as_str(), Target::node(PARSE_FILES)),
                (InputType::Url.as_str(), Target::node(DISCOVER_FROM_WEB)),
            ],
        )
        .edge(PARSE_FILES, NORMALIZE_AND_DEDUP)
        .edge(DISCOVER_FROM_WEB, ENDPOINT_EXTRACTOR)
        .edge(ENDPOINT_EXTRACTOR, NORMALIZE_AND_DEDUP)
        .edge(NORMALIZE_AND_DEDUP, SUMMARIZE_FOR_UI)
        .edge_to_end(SUMMARIZE_FOR_UI)
        .interrupt_after(SUMMARIZE_FOR_UI)
        .build()
}

/// Runs discovery sessions.
pub struct DiscoveryPipeline {
    executor: GraphExecutor,
}

impl DiscoveryPipeline {
    pub fn builder() -> DiscoveryPipelineBuilder {
        DiscoveryPipelineBuilder::new()
    }

    pub fn executor(&self) -> &GraphExecutor {
        &self.executor
    }

    /// Start a session and stream its node events.
    pub async fn run(&self, input: DiscoveryInput, session_id: &str) -> Result<NodeEventStream> {
        self.executor
            .run(DiscoveryState::new(input).into(), session_id)
            .await
    }

    /// Run a new session up to the catalog and return its id and state.
    pub async fn discover(&self, input: DiscoveryInput) -> Result<(String, DiscoveryState)> {
        let session_id = Uuid::new_v4().to_string();
        collect_events(self.run(input, &session_id).await?).await?;
        let state = self.get_state(&session_id).await?;
        Ok((session_id, state))
    }

    pub async fn resume(&self, session_id: &str, patch: DiscoveryPatch) -> Result<NodeEventStream> {
        self.executor.resume(session_id, patch.into()).await
    }

    /// Record the selected endpoint ids and complete the session.
    ///
    /// Ids missing from the catalog are dropped and reported as selection errors.
    pub async fn select<I, S>(&self, session_id: &str, endpoint_ids: I) -> Result<DiscoveryState>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let state = self.get_state(session_id).await?;
        let catalog = state.discovery.catalog.as_ref().ok_or_else(|| Error::NotResumable {
            session_id: session_id.to_string(),
            reason: "no catalog has been built yet".to_string(),
        })?;

        let mut selected = Vec::new();
        let mut errors = Vec::new();
        for id in endpoint_ids.into_iter().map(Into::into) {
            if catalog.find(&id).is_some() {
                if !selected.contains(&id) {
                    selected.push(id);
                }
            } else {
                warn!(session_id = %session_id, endpoint_id = %id, "Unknown endpoint selected");
                errors.push(RunError::new(
                    ErrorKind::Selection,
                    "select",
                    id,
                    "endpoint id is not in the catalog",
                ));
            }
        }

        info!(session_id = %session_id, selected = selected.len(), "Endpoints selected");
        let patch = DiscoveryPatch {
            selected_ids: Some(selected),
            errors: Some(state.errors_with(errors)),
            ..Default::default()
        };
        collect_events(self.resume(session_id, patch).await?).await?;
        self.get_state(session_id).await
    }

    pub async fn get_state(&self, session_id: &str) -> Result<DiscoveryState> {
        match self.executor.get_state(session_id).await? {
            PipelineState::Discovery(state) => Ok(state),
            other => Err(Error::StateMismatch(format!(
                "session '{}' holds {} state",
                session_id,
                other.kind()
            ))),
        }
    }
}

pub struct DiscoveryPipelineBuilder {
    fetcher: Option<Arc<dyn HttpFetcher>>,
    extractor: Option<Arc<dyn EndpointExtractor>>,
    store: Option<Arc<dyn CheckpointStore>>,
    config: ApiGenConfig,
}

impl DiscoveryPipelineBuilder {
    pub fn new() -> Self {
        Self {
            fetcher: None,
            extractor: None,
            store: None,
            config: ApiGenConfig::default(),
        }
    }

    /// Defaults to a [`ReqwestFetcher`] built from the crawl configuration.
    pub fn fetcher(mut self, fetcher: Arc<dyn HttpFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn EndpointExtractor>) -> Self {
        self.extractor = Some(extractor);
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

    pub fn build(self) -> Result<DiscoveryPipeline> {
        let extractor = self
            .extractor
            .ok_or_else(|| Error::config_error("Endpoint extractor is required"))?;
        let fetcher = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(ReqwestFetcher::new(&self.config.crawl)?),
        };
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryCheckpointStore::new()));

        let graph = build_discovery_graph(fetcher, extractor, &self.config)?;
        Ok(DiscoveryPipeline {
            executor: GraphExecutor::new(graph, store),
        })
    }
}

impl Default for DiscoveryPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
