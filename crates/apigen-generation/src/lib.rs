//! Tool generation for apigen
//!
//! Turns a selection of catalog endpoints into validated tool records:
//!
//! ```text
//! plan_work → schema_synthesis → compose_tool → validate → aggregate_tools ⏸ → finalize
//! ```
//!
//! The run suspends after `aggregate_tools` until a [`Review`](apigen_core::Review)
//! is supplied through [`GenerationPipeline::review`].

pub mod compose;
pub mod llm;
pub mod naming;
pub mod nodes;
pub mod pipeline;
pub mod schema;
pub mod validate;

pub use compose::compose_tool;
pub use llm::{LlmSchemaGenerator, parse_schema_reply};
pub use naming::{Verb, display_name, tool_name, vendor_label};
pub use pipeline::{GRAPH_NAME, GenerationPipeline, GenerationPipelineBuilder, build_generation_graph};
pub use schema::{enhance_parameters, enhance_schema, strip_visible};
pub use validate::{JsonSchemaValidator, check_tool};
