//! Endpoint discovery
//!
//! Turns API description files or a documentation site into a catalog of
//! deduplicated, confidence-scored endpoints, grouped by resource.
//!
//! ```text
//! classify_input ─┬─ file ─> parse_files ─────────────────────────┐
//!                 └─ url ──> discover_from_web ─> endpoint_extractor ┴─> normalize_and_dedup ─> summarize_for_ui ⏸
//! ```

pub mod catalog;
pub mod crawler;
pub mod dedup;
pub mod extractor;
pub mod fetcher;
pub mod llm;
pub mod nodes;
pub mod pipeline;
pub mod scoring;
pub mod spec_parser;

pub use catalog::build_catalog;
pub use crawler::{CrawlOutcome, WebCrawler};
pub use dedup::{canonical_key, endpoint_id, normalize_and_dedup};
pub use extractor::PatternExtractor;
pub use fetcher::ReqwestFetcher;
pub use llm::LlmEndpointExtractor;
pub use pipeline::{DiscoveryPipeline, DiscoveryPipelineBuilder, GRAPH_NAME, build_discovery_graph};
pub use scoring::confidence;
pub use spec_parser::{DocumentFormat, parse_document};
