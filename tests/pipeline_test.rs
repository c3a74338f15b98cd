// End-to-end tests
// Discovery over an OpenAPI file, selection, then generation and review, sharing one checkpoint log

use apigen_core::{
    ApiGenConfig, DiscoveryInput, EndpointDescriptor, EndpointExtractor, GenerationStatus,
    HttpFetcher, ParameterSchema, PipelineState, RawEndpoint, Review, SchemaGenerator,
};
use apigen_discovery::DiscoveryPipeline;
use apigen_generation::GenerationPipeline;
use apigen_graph::{CheckpointStore, InMemoryCheckpointStore, RESUME, RunStatus, START};
use apigen_telemetry::{TelemetryOptions, init_telemetry};
use async_trait::async_trait;
use futures::StreamExt;
use std::io::Write;
use std::sync::{Arc, Once};

static TELEMETRY: Once = Once::new();

fn init_logging() {
    TELEMETRY.call_once(|| {
        init_telemetry(TelemetryOptions::default());
    });
}

const TRAVEL_SPEC: &str = r#"{
  "openapi": "3.0.0",
  "info": {"title": "Example Travel API", "version": "1.0"},
  "servers": [{"url": "https://api.example.com"}],
  "paths": {
    "/v1/flights/search": {
      "get": {
        "summary": "Search flights",
        "parameters": [{"name": "origin", "in": "query", "schema": {"type": "string"}}]
      }
    },
    "/v1/bookings": {
      "post": {
        "summary": "Create a booking",
        "requestBody": {"content": {"application/json": {"schema": {"type": "object"}}}}
      }
    }
  }
}"#;

struct Offline;

#[async_trait]
impl HttpFetcher for Offline {
    async fn fetch(&self, url: &str) -> anyhow::Result<String> {
        anyhow::bail!("offline: {}", url)
    }
}

struct NothingExtracted;

#[async_trait]
impl EndpointExtractor for NothingExtracted {
    async fn extract(&self, _text: &str) -> anyhow::Result<Vec<RawEndpoint>> {
        Ok(Vec::new())
    }
}

struct AlwaysSucceeds;

#[async_trait]
impl SchemaGenerator for AlwaysSucceeds {
    async fn generate(&self, _endpoint: &EndpointDescriptor) -> anyhow::Result<ParameterSchema> {
        Ok(ParameterSchema::empty())
    }
}

fn pipelines(store: Arc<dyn CheckpointStore>) -> (DiscoveryPipeline, GenerationPipeline) {
    let discovery = DiscoveryPipeline::builder()
        .fetcher(Arc::new(Offline))
        .extractor(Arc::new(NothingExtracted))
        .checkpoint_store(store.clone())
        .config(ApiGenConfig::test_defaults())
        .build()
        .unwrap();
    let generation = GenerationPipeline::builder()
        .generator(Arc::new(AlwaysSucceeds))
        .checkpoint_store(store)
        .config(ApiGenConfig::test_defaults())
        .build()
        .unwrap();
    (discovery, generation)
}

fn spec_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    file.write_all(TRAVEL_SPEC.as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn test_discover_select_generate() {
    init_logging();
    let store = Arc::new(InMemoryCheckpointStore::new());
    let (discovery, generation) = pipelines(store.clone());
    let spec = spec_file();

    let (discovery_session, found) = discovery
        .discover(DiscoveryInput::from_files([spec.path()]))
        .await
        .unwrap();
    let flights_id = found.discovery.catalog.as_ref().unwrap().resources["flights"][0]
        .id
        .clone();

    let selected = discovery.select(&discovery_session, [flights_id]).await.unwrap();
    let selection = selected.selection().unwrap();

    let (generation_session, suspended) = generation.generate(selection).await.unwrap();
    assert_eq!(suspended.generation.tools.len(), 1);

    let done = generation
        .review(&generation_session, Review::approve())
        .await
        .unwrap();
    assert_eq!(done.generation.status, Some(GenerationStatus::Completed));
    assert!(done.generation.errors.is_empty());
    assert_eq!(done.generation.tools.len(), 1);
    assert_eq!(done.generation.tools[0].name, "EXAMPLE__FLIGHTS__SEARCH");

    let mut sessions = store.session_ids().unwrap();
    sessions.sort();
    let mut expected = vec![discovery_session.clone(), generation_session.clone()];
    expected.sort();
    assert_eq!(sessions, expected);
}

#[tokio::test]
async fn test_event_stream_and_checkpoint_log() {
    init_logging();
    let store = Arc::new(InMemoryCheckpointStore::new());
    let (discovery, _) = pipelines(store.clone());
    let spec = spec_file();

    let mut stream = discovery
        .run(DiscoveryInput::from_files([spec.path()]), "session-a")
        .await
        .unwrap();
    let mut nodes = Vec::new();
    while let Some(event) = stream.next().await {
        nodes.push(event.unwrap().node);
    }
    drop(stream);

    assert_eq!(
        nodes,
        vec!["classify_input", "parse_files", "normalize_and_dedup", "summarize_for_ui"]
    );

    let history = store.history("session-a").await.unwrap();
    let logged: Vec<&str> = history.iter().map(|c| c.node_name.as_str()).collect();
    assert_eq!(
        logged,
        vec![START, "classify_input", "parse_files", "normalize_and_dedup", "summarize_for_ui"]
    );
    assert_eq!(history.last().unwrap().status, RunStatus::Interrupted);
    assert!(history[..history.len() - 1]
        .iter()
        .all(|c| c.status == RunStatus::Running));

    let state = discovery.select("session-a", Vec::<String>::new()).await.unwrap();
    assert!(state.discovery.selected_ids.is_empty());

    let last = store.latest("session-a").await.unwrap().unwrap();
    assert_eq!(last.node_name, RESUME);
    assert_eq!(last.status, RunStatus::Completed);
    assert!(last.next_node.is_none());
}

#[tokio::test]
async fn test_concurrent_sessions_are_isolated() {
    init_logging();
    let store = Arc::new(InMemoryCheckpointStore::new());
    let (discovery, generation) = pipelines(store.clone());
    let discovery = Arc::new(discovery);
    let generation = Arc::new(generation);
    let spec = spec_file();
    let spec_path = spec.path().to_path_buf();

    let (_, found) = discovery
        .discover(DiscoveryInput::from_files([spec_path.clone()]))
        .await
        .unwrap();
    let catalog = found.discovery.catalog.clone().unwrap();
    let ids: Vec<String> = catalog.endpoints().map(|e| e.id.clone()).collect();

    let mut handles = Vec::new();
    for id in ids.clone() {
        let generation = generation.clone();
        let selection = apigen_core::Selection::new(catalog.clone(), [id]);
        handles.push(tokio::spawn(async move {
            generation.generate_approved(selection).await
        }));
    }

    let mut names = Vec::new();
    for handle in handles {
        let state = handle.await.unwrap().unwrap();
        assert_eq!(state.generation.final_count, Some(1));
        names.push(state.generation.tools[0].name.clone());
    }
    names.sort();
    assert_eq!(names, vec!["EXAMPLE__BOOKINGS__CREATE", "EXAMPLE__FLIGHTS__SEARCH"]);

    // one discovery session plus one generation session per endpoint
    assert_eq!(store.session_ids().unwrap().len(), 1 + ids.len());
    for session_id in store.session_ids().unwrap() {
        let latest = store.latest(&session_id).await.unwrap().unwrap();
        assert!(matches!(
            latest.state,
            PipelineState::Discovery(_) | PipelineState::Generation(_)
        ));
    }
}
