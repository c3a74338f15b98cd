use apigen_core::{PipelineState, Result, StatePatch};
use async_trait::async_trait;

/// A step of a pipeline graph.
///
/// A node reads the current state and returns a patch; it keeps nothing between
/// invocations. Failures that concern one of several independent items must be
/// recorded in the patch as data. Returning `Err` aborts the run.
#[async_trait]
pub trait Node: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, state: &PipelineState) -> Result<StatePatch>;
}

type NodeFn = dyn Fn(&PipelineState) -> Result<StatePatch> + Send + Sync;

/// A node backed by a synchronous function of the state.
pub struct FnNode {
    name: String,
    func: Box<NodeFn>,
}

impl FnNode {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&PipelineState) -> Result<StatePatch> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Box::new(func),
        }
    }
}

#[async_trait]
impl Node for FnNode {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, state: &PipelineState) -> Result<StatePatch> {
        (self.func)(state)
    }
}
