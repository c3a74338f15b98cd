//! Pipeline graph engine
//!
//! A [`Graph`] is a set of named [`Node`]s connected by linear or conditional
//! edges. A [`GraphExecutor`] runs it for a session, checkpointing the merged
//! state after every node, and can suspend at interrupt points until the caller
//! resumes the session with a state patch.

pub mod checkpoint;
pub mod executor;
pub mod graph;
pub mod node;

pub use checkpoint::{
    Checkpoint, CheckpointStore, InMemoryCheckpointStore, RunStatus, store_from_config,
};
#[cfg(feature = "sqlite")]
pub use checkpoint::database::SqliteCheckpointStore;
pub use executor::{GraphExecutor, NodeEvent, NodeEventStream, collect_events};
pub use graph::{Edge, Graph, GraphBuilder, RESUME, RouteFn, START, Target};
pub use node::{FnNode, Node};
