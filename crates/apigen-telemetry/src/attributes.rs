//! Span attribute names.

pub const SYSTEM_NAME: &str = "apigen";

pub const APIGEN_GRAPH: &str = "apigen.graph";
pub const APIGEN_NODE: &str = "apigen.node";
pub const APIGEN_SESSION_ID: &str = "apigen.session_id";

pub const APIGEN_COLLABORATOR: &str = "apigen.collaborator";
pub const APIGEN_OPERATION: &str = "apigen.operation";
pub const APIGEN_SUBJECT: &str = "apigen.subject";
pub const APIGEN_OUTCOME: &str = "apigen.outcome";
