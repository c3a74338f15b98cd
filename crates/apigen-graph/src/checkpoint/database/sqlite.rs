//! SQLite-backed checkpoint store

use super::models::CheckpointRow;
use crate::checkpoint::{Checkpoint, CheckpointStore};
use apigen_core::{Error, Result};
use async_trait::async_trait;
use sqlx::{Pool, Sqlite};

const SELECT_COLUMNS: &str =
    "SELECT id, session_id, graph, node_name, next_node, status, state, created_at FROM checkpoints";

/// SQLite-backed checkpoint store
pub struct SqliteCheckpointStore {
    pool: Pool<Sqlite>,
}

fn db_error(e: sqlx::Error) -> Error {
    Error::checkpoint(format!("database error: {}", e))
}

impl SqliteCheckpointStore {
    /// Connect and run migrations.
    ///
    /// In-memory databases (`sqlite::memory:`) are limited to one connection so
    /// every query sees the same database.
    pub async fn new(database_url: &str) -> Result<Self> {
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(db_error)?;

        super::migrations::run_migrations(&pool)
            .await
            .map_err(db_error)?;

        Ok(Self { pool })
    }

    /// Create from an existing pool. Migrations must already have run.
    pub fn from_pool(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    async fn append(&self, checkpoint: Checkpoint) -> Result<()> {
        let state = serde_json::to_string(&checkpoint.state)?;

        sqlx::query(
            "INSERT INTO checkpoints (session_id, graph, node_name, next_node, status, state, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&checkpoint.session_id)
        .bind(&checkpoint.graph)
        .bind(&checkpoint.node_name)
        .bind(&checkpoint.next_node)
        .bind(checkpoint.status.as_str())
        .bind(state)
        .bind(checkpoint.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn latest(&self, session_id: &str) -> Result<Option<Checkpoint>> {
        let row: Option<CheckpointRow> = sqlx::query_as(&format!(
            "{} WHERE session_id = ? ORDER BY id DESC LIMIT 1",
            SELECT_COLUMNS
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(CheckpointRow::into_checkpoint).transpose()
    }

    async fn history(&self, session_id: &str) -> Result<Vec<Checkpoint>> {
        let rows: Vec<CheckpointRow> = sqlx::query_as(&format!(
            "{} WHERE session_id = ? ORDER BY id ASC",
            SELECT_COLUMNS
        ))
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(CheckpointRow::into_checkpoint).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::RunStatus;
    use apigen_core::{GenerationState, PipelineState, Selection};

    #[tokio::test]
    async fn test_sqlite_store_persists_history() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("checkpoints.db").display());
        let store = SqliteCheckpointStore::new(&url).await.unwrap();

        let state = GenerationState::new(Selection::new(Default::default(), ["abc"]));
        for (node, status) in [
            ("__start__", RunStatus::Running),
            ("plan_work", RunStatus::Running),
            ("aggregate_tools", RunStatus::Interrupted),
        ] {
            store
                .append(Checkpoint::new(
                    "sess",
                    "generation",
                    node,
                    Some("finalize".to_string()),
                    status,
                    state.clone().into(),
                ))
                .await
                .unwrap();
        }

        let latest = store.latest("sess").await.unwrap().unwrap();
        assert_eq!(latest.node_name, "aggregate_tools");
        assert_eq!(latest.status, RunStatus::Interrupted);
        assert_eq!(latest.state, PipelineState::from(state));

        assert_eq!(store.history("sess").await.unwrap().len(), 3);
        assert!(store.latest("other").await.unwrap().is_none());
    }
}
