//! Checkpoints: the persisted state of a session after each node.

mod inmemory;

#[cfg(feature = "sqlite")]
pub mod database;

pub use inmemory::InMemoryCheckpointStore;

use apigen_core::config::CheckpointConfig;
use apigen_core::{Error, PipelineState, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Lifecycle of a run as recorded in its latest checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    /// Suspended at an interrupt point, waiting for a resume patch
    Interrupted,
    Completed,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Interrupted => "interrupted",
            RunStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "running" => Ok(RunStatus::Running),
            "interrupted" => Ok(RunStatus::Interrupted),
            "completed" => Ok(RunStatus::Completed),
            other => Err(Error::checkpoint(format!("unknown run status '{}'", other))),
        }
    }
}

/// Snapshot of a session's state after a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub session_id: String,
    pub graph: String,
    /// Node that produced this state, or one of the `__start__`/`__resume__` markers
    pub node_name: String,
    /// Node to run next; `None` when the graph reached its end
    pub next_node: Option<String>,
    pub status: RunStatus,
    pub state: PipelineState,
    pub timestamp: DateTime<Utc>,
}

impl Checkpoint {
    pub fn new(
        session_id: impl Into<String>,
        graph: impl Into<String>,
        node_name: impl Into<String>,
        next_node: Option<String>,
        status: RunStatus,
        state: PipelineState,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            graph: graph.into(),
            node_name: node_name.into(),
            next_node,
            status,
            state,
            timestamp: Utc::now(),
        }
    }
}

/// Append-only checkpoint storage, keyed by session id.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn append(&self, checkpoint: Checkpoint) -> Result<()>;

    /// The most recent checkpoint of the session, if any.
    async fn latest(&self, session_id: &str) -> Result<Option<Checkpoint>>;

    /// All checkpoints of the session, oldest first.
    async fn history(&self, session_id: &str) -> Result<Vec<Checkpoint>>;
}

/// Build the store named by `[checkpoint] provider`.
pub async fn store_from_config(config: &CheckpointConfig) -> Result<Arc<dyn CheckpointStore>> {
    match config.provider.as_str() {
        "in-memory" => Ok(Arc::new(InMemoryCheckpointStore::new())),
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let url = config.connection_string.as_deref().ok_or_else(|| {
                Error::config_error("checkpoint.connection_string is required for sqlite")
            })?;
            Ok(Arc::new(database::SqliteCheckpointStore::new(url).await?))
        }
        other => Err(Error::config_error(format!(
            "checkpoint provider '{}' is not available in this build",
            other
        ))),
    }
}
