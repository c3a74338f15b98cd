//! Database models for checkpoint storage

use crate::checkpoint::{Checkpoint, RunStatus};
use apigen_core::{Error, Result};
use chrono::{DateTime, Utc};

/// Checkpoint model for database storage
#[derive(Debug, Clone, sqlx::FromRow)]
pub(super) struct CheckpointRow {
    pub id: i64,
    pub session_id: String,
    pub graph: String,
    pub node_name: String,
    pub next_node: Option<String>,
    pub status: String,
    pub state: String,      // JSON string
    pub created_at: String, // RFC 3339
}

impl CheckpointRow {
    pub fn into_checkpoint(self) -> Result<Checkpoint> {
        let timestamp = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| {
                Error::checkpoint(format!(
                    "checkpoint {} has invalid timestamp '{}': {}",
                    self.id, self.created_at, e
                ))
            })?
            .with_timezone(&Utc);

        Ok(Checkpoint {
            session_id: self.session_id,
            graph: self.graph,
            node_name: self.node_name,
            next_node: self.next_node,
            status: self.status.parse::<RunStatus>()?,
            state: serde_json::from_str(&self.state)?,
            timestamp,
        })
    }
}
