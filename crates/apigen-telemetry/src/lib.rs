//! Tracing and OpenTelemetry setup for apigen
//!
//! Provides subscriber initialisation plus span helpers for node executions and
//! collaborator calls, so every run can be followed per session.

pub mod attributes;
pub mod spans;
pub mod tracer;

pub use spans::{CollaboratorCall, node_span, safe_serialize, trace_collaborator_call};
pub use tracer::{TelemetryOptions, init_telemetry, register_span_processor, tracer_provider};
