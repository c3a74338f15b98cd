//! Graph execution with per-node checkpoints, interrupts and resume.

use crate::checkpoint::{Checkpoint, CheckpointStore, RunStatus};
use crate::graph::{Graph, RESUME, START, Target};
use apigen_core::{Error, PipelineState, Result, StatePatch};
use apigen_telemetry::node_span;
use async_stream::stream;
use dashmap::DashMap;
use futures::stream::{Stream, StreamExt};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::Instrument;

/// Emitted once per completed node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeEvent {
    pub node: String,
    pub patch: StatePatch,
}

pub type NodeEventStream = Box<dyn Stream<Item = Result<NodeEvent>> + Send + Unpin>;

type SessionLocks = DashMap<String, Arc<Mutex<()>>>;

/// Exclusive access to one session. Dropping it removes the session's lock
/// entry unless another caller is already waiting on it.
struct SessionGuard {
    locks: Arc<SessionLocks>,
    session_id: String,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        // the map entry and this guard are the only holders when nobody waits
        self.locks
            .remove_if(self.session_id.as_str(), |_, lock| Arc::strong_count(lock) <= 2);
    }
}

/// Drives a [`Graph`] for any number of sessions.
///
/// Runs of the same session are serialised: a second `run`/`resume` waits until
/// the stream of the first one has been dropped. Distinct sessions never share
/// state.
#[derive(Clone)]
pub struct GraphExecutor {
    graph: Arc<Graph>,
    store: Arc<dyn CheckpointStore>,
    locks: Arc<SessionLocks>,
}

impl GraphExecutor {
    pub fn new(graph: Graph, store: Arc<dyn CheckpointStore>) -> Self {
        Self {
            graph: Arc::new(graph),
            store,
            locks: Arc::new(DashMap::new()),
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn store(&self) -> Arc<dyn CheckpointStore> {
        self.store.clone()
    }

    async fn lock_session(&self, session_id: &str) -> SessionGuard {
        let lock = self
            .locks
            .entry(session_id.to_string())
            .or_default()
            .clone();
        SessionGuard {
            locks: self.locks.clone(),
            session_id: session_id.to_string(),
            _guard: lock.lock_owned().await,
        }
    }

    /// Start a new session from `initial` and stream one event per completed node.
    ///
    /// The stream ends at the graph's end, after an interrupt point, or after the
    /// first error.
    pub async fn run(&self, initial: PipelineState, session_id: &str) -> Result<NodeEventStream> {
        let guard = self.lock_session(session_id).await;

        if self.store.latest(session_id).await?.is_some() {
            return Err(Error::checkpoint(format!(
                "session '{}' already exists",
                session_id
            )));
        }

        let start = self.graph.start().to_string();
        self.store
            .append(Checkpoint::new(
                session_id,
                self.graph.name(),
                START,
                Some(start.clone()),
                RunStatus::Running,
                initial.clone(),
            ))
            .await?;

        tracing::info!(
            graph = %self.graph.name(),
            session_id = %session_id,
            "starting run"
        );

        Ok(self.drive(guard, session_id, initial, Target::Node(start)))
    }

    /// Merge `patch` into a session suspended at an interrupt point and continue
    /// from the node after it.
    pub async fn resume(&self, session_id: &str, patch: StatePatch) -> Result<NodeEventStream> {
        let guard = self.lock_session(session_id).await;

        let latest = self
            .store
            .latest(session_id)
            .await?
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;

        if latest.status != RunStatus::Interrupted {
            return Err(Error::NotResumable {
                session_id: session_id.to_string(),
                reason: format!("run is {} at node '{}'", latest.status, latest.node_name),
            });
        }

        let mut state = latest.state;
        state.merge(patch)?;

        let next = Target::from(latest.next_node);
        let status = if next.is_end() {
            RunStatus::Completed
        } else {
            RunStatus::Running
        };
        self.store
            .append(Checkpoint::new(
                session_id,
                self.graph.name(),
                RESUME,
                next.as_node().map(str::to_string),
                status,
                state.clone(),
            ))
            .await?;

        tracing::info!(
            graph = %self.graph.name(),
            session_id = %session_id,
            next = %next,
            "resuming run"
        );

        Ok(self.drive(guard, session_id, state, next))
    }

    /// Latest persisted state of the session.
    pub async fn get_state(&self, session_id: &str) -> Result<PipelineState> {
        Ok(self.checkpoint(session_id).await?.state)
    }

    /// Latest checkpoint of the session.
    pub async fn checkpoint(&self, session_id: &str) -> Result<Checkpoint> {
        self.store
            .latest(session_id)
            .await?
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))
    }

    fn drive(
        &self,
        guard: SessionGuard,
        session_id: &str,
        state: PipelineState,
        next: Target,
    ) -> NodeEventStream {
        let graph = self.graph.clone();
        let store = self.store.clone();
        let session_id = session_id.to_string();

        Box::new(Box::pin(stream! {
            let _guard = guard;
            let mut state = state;
            let mut next = next;

            while let Target::Node(node_name) = next {
                let Some(node) = graph.node(&node_name) else {
                    yield Err(Error::graph_definition(format!("node '{}' is not defined", node_name)));
                    return;
                };

                let span = node_span(graph.name(), &node_name, &session_id);
                let patch = match node.run(&state).instrument(span).await {
                    Ok(patch) => patch,
                    Err(e) => {
                        tracing::error!(
                            graph = %graph.name(),
                            session_id = %session_id,
                            node = %node_name,
                            error = %e,
                            "node failed"
                        );
                        yield Err(e.in_node(&node_name));
                        return;
                    }
                };

                if let Err(e) = state.merge(patch.clone()) {
                    yield Err(e.in_node(&node_name));
                    return;
                }

                let following = match graph.next(&node_name, &state) {
                    Ok(target) => target,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };

                let interrupted = graph.is_interrupt_after(&node_name);
                let status = if interrupted {
                    RunStatus::Interrupted
                } else if following.is_end() {
                    RunStatus::Completed
                } else {
                    RunStatus::Running
                };

                let checkpoint = Checkpoint::new(
                    session_id.clone(),
                    graph.name(),
                    node_name.clone(),
                    following.as_node().map(str::to_string),
                    status,
                    state.clone(),
                );
                if let Err(e) = store.append(checkpoint).await {
                    yield Err(e);
                    return;
                }

                tracing::debug!(
                    session_id = %session_id,
                    node = %node_name,
                    keys = ?patch.keys(),
                    status = %status,
                    "node completed"
                );

                yield Ok(NodeEvent { node: node_name.clone(), patch });

                if interrupted {
                    tracing::info!(
                        graph = %graph.name(),
                        session_id = %session_id,
                        node = %node_name,
                        "run suspended at interrupt point"
                    );
                    return;
                }

                next = following;
            }
        }))
    }
}

/// Drain a node event stream, stopping at the first error.
pub async fn collect_events(mut stream: NodeEventStream) -> Result<Vec<NodeEvent>> {
    let mut events = Vec::new();
    while let Some(event) = stream.next().await {
        events.push(event?);
    }
    Ok(events)
}
