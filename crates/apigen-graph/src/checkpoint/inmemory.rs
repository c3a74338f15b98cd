use super::{Checkpoint, CheckpointStore};
use apigen_core::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Process-local checkpoint store. Contents are lost when the process exits.
#[derive(Clone, Default)]
pub struct InMemoryCheckpointStore {
    sessions: Arc<RwLock<HashMap<String, Vec<Checkpoint>>>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_ids(&self) -> Result<Vec<String>> {
        let sessions = self.sessions.read().map_err(poisoned)?;
        let mut ids: Vec<String> = sessions.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

fn poisoned<T>(_: T) -> Error {
    Error::checkpoint("checkpoint store lock poisoned")
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn append(&self, checkpoint: Checkpoint) -> Result<()> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        sessions
            .entry(checkpoint.session_id.clone())
            .or_default()
            .push(checkpoint);
        Ok(())
    }

    async fn latest(&self, session_id: &str) -> Result<Option<Checkpoint>> {
        let sessions = self.sessions.read().map_err(poisoned)?;
        Ok(sessions
            .get(session_id)
            .and_then(|history| history.last())
            .cloned())
    }

    async fn history(&self, session_id: &str) -> Result<Vec<Checkpoint>> {
        let sessions = self.sessions.read().map_err(poisoned)?;
        Ok(sessions.get(session_id).cloned().unwrap_or_default())
    }
}
