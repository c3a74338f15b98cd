//! Database migrations for checkpoint storage

use sqlx::{Pool, Sqlite};

/// SQL for creating the checkpoints table
const CREATE_CHECKPOINTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS checkpoints (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL,
    graph TEXT NOT NULL,
    node_name TEXT NOT NULL,
    next_node TEXT,
    status TEXT NOT NULL,
    state TEXT NOT NULL,
    created_at TEXT NOT NULL
);
"#;

const CREATE_SESSION_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_checkpoints_session ON checkpoints (session_id, id);
"#;

/// Run all migrations
pub async fn run_migrations(pool: &Pool<Sqlite>) -> Result<(), sqlx::Error> {
    sqlx::query(CREATE_CHECKPOINTS_TABLE).execute(pool).await?;
    sqlx::query(CREATE_SESSION_INDEX).execute(pool).await?;
    Ok(())
}
