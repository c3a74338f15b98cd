//! Core types for apigen
//!
//! This crate provides the data model shared by the discovery and generation
//! pipelines: endpoint records, catalogs, work items, tool records, pipeline
//! state with its patch/merge rules, and the collaborator traits.

pub mod collaborators;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod path;
pub mod report;
pub mod state;
pub mod tool;

// Re-exports
pub use collaborators::{
    CompletionModel, EndpointExtractor, HttpFetcher, SchemaGenerator, SchemaValidator,
    strip_code_fences,
};
pub use config::ApiGenConfig;
pub use endpoint::{
    Catalog, CatalogStats, EndpointSource, NormalizedEndpoint, Page, PageOrigin, RawEndpoint,
};
pub use error::{Error, Result};
pub use report::{ErrorKind, RunError};
pub use state::{
    DiscoveryData, DiscoveryInput, DiscoveryPatch, DiscoveryState, GenerationData,
    GenerationPatch, GenerationState, GenerationStatus, InputType, PipelineState, Review,
    Selection, StatePatch,
};
pub use tool::{
    EndpointDescriptor, ParameterSchema, ProtocolData, ToolMetadata, ToolRecord, WorkItem,
    WorkStatus,
};
