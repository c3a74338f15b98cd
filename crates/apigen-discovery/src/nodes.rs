//! Discovery graph nodes.

use crate::catalog::build_catalog;
use crate::crawler::WebCrawler;
use crate::dedup::normalize_and_dedup;
use crate::extractor::{PatternExtractor, page_text};
use crate::spec_parser::{DocumentFormat, parse_document};
use apigen_core::{
    DiscoveryPatch, EndpointExtractor, Error, ErrorKind, InputType, PipelineState, RawEndpoint,
    Result, RunError, StatePatch,
};
use apigen_graph::Node;
use apigen_telemetry::{CollaboratorCall, trace_collaborator_call};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const CLASSIFY_INPUT: &str = "classify_input";
pub const PARSE_FILES: &str = "parse_files";
pub const DISCOVER_FROM_WEB: &str = "discover_from_web";
pub const ENDPOINT_EXTRACTOR: &str = "endpoint_extractor";
pub const NORMALIZE_AND_DEDUP: &str = "normalize_and_dedup";
pub const SUMMARIZE_FOR_UI: &str = "summarize_for_ui";

/// Decides between the file and URL branches.
pub struct ClassifyInput;

#[async_trait]
impl Node for ClassifyInput {
    fn name(&self) -> &str {
        CLASSIFY_INPUT
    }

    async fn run(&self, state: &PipelineState) -> Result<StatePatch> {
        let input = &state.as_discovery()?.input;
        let has_files = !input.files.is_empty();
        let has_url = input
            .root_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty());

        let input_type = match (has_files, has_url) {
            (true, false) => InputType::File,
            (false, true) => InputType::Url,
            (true, true) => {
                return Err(Error::AmbiguousInput(
                    "both input files and a root URL were supplied".to_string(),
                ));
            }
            (false, false) => {
                return Err(Error::AmbiguousInput(
                    "neither input files nor a root URL were supplied".to_string(),
                ));
            }
        };

        info!(input_type = %input_type.as_str(), "Input classified");
        Ok(DiscoveryPatch {
            input_type: Some(input_type),
            ..Default::default()
        }
        .into())
    }
}

/// Parses API description files, falling back to unstructured extraction per file.
pub struct ParseFiles {
    extractor: Arc<dyn EndpointExtractor>,
}

impl ParseFiles {
    pub fn new(extractor: Arc<dyn EndpointExtractor>) -> Self {
        Self { extractor }
    }

    /// Endpoints of one file, or the reason it yielded none.
    async fn parse_file(&self, path: &std::path::Path) -> std::result::Result<Vec<RawEndpoint>, String> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("failed to read file: {}", e))?;

        let structured_failure = match parse_document(&content, DocumentFormat::for_path(path)) {
            Ok(endpoints) if !endpoints.is_empty() => {
                info!(file = %path.display(), endpoints = endpoints.len(), "Parsed API description");
                return Ok(endpoints);
            }
            Ok(_) => "description lists no operations".to_string(),
            Err(e) => e.to_string(),
        };
        debug!(file = %path.display(), reason = %structured_failure, "Falling back to unstructured extraction");

        let subject = path.display().to_string();
        let result = self.extractor.extract(&content).await;
        trace_collaborator_call(CollaboratorCall {
            collaborator: "endpoint_extractor",
            operation: "extract",
            subject: &subject,
            outcome: result.as_ref().map(|_| ()).map_err(|e| e.to_string()),
        });

        match result {
            Ok(endpoints) if !endpoints.is_empty() => {
                info!(file = %subject, endpoints = endpoints.len(), "Extracted endpoints from unstructured file");
                Ok(endpoints)
            }
            Ok(_) => Err(format!(
                "structured parse failed ({}) and extraction found no endpoints",
                structured_failure
            )),
            Err(e) => Err(format!(
                "structured parse failed ({}) and extraction failed: {}",
                structured_failure, e
            )),
        }
    }
}

#[async_trait]
impl Node for ParseFiles {
    fn name(&self) -> &str {
        PARSE_FILES
    }

    async fn run(&self, state: &PipelineState) -> Result<StatePatch> {
        let state = state.as_discovery()?;
        let files = &state.input.files;

        let mut endpoints = state.discovery.endpoints_raw.clone();
        let mut errors = Vec::new();
        let before = endpoints.len();

        for path in files {
            match self.parse_file(path).await {
                Ok(found) => endpoints.extend(found),
                Err(message) => {
                    warn!(file = %path.display(), error = %message, "Failed to parse file");
                    errors.push(RunError::new(
                        ErrorKind::Parse,
                        PARSE_FILES,
                        path.display().to_string(),
                        message,
                    ));
                }
            }
        }

        if endpoints.len() == before {
            return Err(Error::Parse(format!(
                "no endpoints found in {} input file(s)",
                files.len()
            )));
        }

        Ok(DiscoveryPatch {
            endpoints_raw: Some(endpoints),
            errors: Some(state.errors_with(errors)),
            ..Default::default()
        }
        .into())
    }
}

/// Crawls the documentation site named by the input.
pub struct DiscoverFromWeb {
    crawler: WebCrawler,
}

impl DiscoverFromWeb {
    pub fn new(crawler: WebCrawler) -> Self {
        Self { crawler }
    }
}

#[async_trait]
impl Node for DiscoverFromWeb {
    fn name(&self) -> &str {
        DISCOVER_FROM_WEB
    }

    async fn run(&self, state: &PipelineState) -> Result<StatePatch> {
        let state = state.as_discovery()?;
        let root_url = state.input.root_url.as_deref().unwrap_or_default().trim();

        let outcome = self.crawler.crawl(root_url).await;

        Ok(DiscoveryPatch {
            pages: Some(outcome.pages),
            errors: Some(state.errors_with(outcome.errors)),
            ..Default::default()
        }
        .into())
    }
}

/// Regex extraction per page, with the language model for pages regex misses.
pub struct ExtractEndpoints {
    extractor: Arc<dyn EndpointExtractor>,
}

impl ExtractEndpoints {
    pub fn new(extractor: Arc<dyn EndpointExtractor>) -> Self {
        Self { extractor }
    }
}

#[async_trait]
impl Node for ExtractEndpoints {
    fn name(&self) -> &str {
        ENDPOINT_EXTRACTOR
    }

    async fn run(&self, state: &PipelineState) -> Result<StatePatch> {
        let state = state.as_discovery()?;
        let server = state.input.server_override().unwrap_or_default();
        let patterns = PatternExtractor::new().with_server(server);

        let mut endpoints = state.discovery.endpoints_raw.clone();
        let mut errors = Vec::new();

        if state.discovery.pages.is_empty() {
            let root = state.input.root_url.clone().unwrap_or_default();
            warn!(root = %root, "No pages to extract endpoints from");
            errors.push(RunError::new(
                ErrorKind::Extraction,
                ENDPOINT_EXTRACTOR,
                root,
                "crawl produced no pages",
            ));
        }

        for page in &state.discovery.pages {
            let matched = patterns.extract(&page.content);
            if !matched.is_empty() {
                debug!(url = %page.url, endpoints = matched.len(), "Regex matches");
                endpoints.extend(matched);
                continue;
            }

            let text = page_text(&page.content);
            let result = self.extractor.extract(&text).await;
            trace_collaborator_call(CollaboratorCall {
                collaborator: "endpoint_extractor",
                operation: "extract",
                subject: &page.url,
                outcome: result.as_ref().map(|_| ()).map_err(|e| e.to_string()),
            });

            let message = match result {
                Ok(found) if !found.is_empty() => {
                    debug!(url = %page.url, endpoints = found.len(), "Model extraction");
                    endpoints.extend(found.into_iter().map(|endpoint| {
                        if endpoint.server.is_empty() {
                            endpoint.with_server(server)
                        } else {
                            endpoint
                        }
                    }));
                    continue;
                }
                Ok(_) => "no endpoints found on page".to_string(),
                Err(e) => format!("extraction failed: {}", e),
            };

            warn!(url = %page.url, error = %message, "Extraction yielded nothing");
            errors.push(RunError::new(
                ErrorKind::Extraction,
                ENDPOINT_EXTRACTOR,
                page.url.clone(),
                message,
            ));
        }

        info!(
            pages = state.discovery.pages.len(),
            endpoints = endpoints.len(),
            "Extracted raw endpoints"
        );

        Ok(DiscoveryPatch {
            endpoints_raw: Some(endpoints),
            errors: Some(state.errors_with(errors)),
            ..Default::default()
        }
        .into())
    }
}

pub struct NormalizeAndDedup;

#[async_trait]
impl Node for NormalizeAndDedup {
    fn name(&self) -> &str {
        NORMALIZE_AND_DEDUP
    }

    async fn run(&self, state: &PipelineState) -> Result<StatePatch> {
        let state = state.as_discovery()?;
        let normalized =
            normalize_and_dedup(&state.discovery.endpoints_raw, state.input.server_override());

        info!(
            raw = state.discovery.endpoints_raw.len(),
            unique = normalized.len(),
            "Normalized endpoints"
        );

        Ok(DiscoveryPatch {
            endpoints_normalized: Some(normalized),
            ..Default::default()
        }
        .into())
    }
}

pub struct SummarizeForUi;

#[async_trait]
impl Node for SummarizeForUi {
    fn name(&self) -> &str {
        SUMMARIZE_FOR_UI
    }

    async fn run(&self, state: &PipelineState) -> Result<StatePatch> {
        let state = state.as_discovery()?;
        let catalog = build_catalog(&state.discovery.endpoints_normalized);

        info!(
            endpoints = catalog.len(),
            resources = catalog.stats.resource_count,
            "Created catalog"
        );

        Ok(DiscoveryPatch {
            catalog: Some(catalog),
            ..Default::default()
        }
        .into())
    }
}
