//! Graph definition: nodes, linear and conditional edges, interrupt points.

use crate::node::Node;
use apigen_core::{Error, PipelineState, Result};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Node name recorded in the checkpoint written before the first node runs.
pub const START: &str = "__start__";

/// Node name recorded in the checkpoint written when a suspended run is resumed.
pub const RESUME: &str = "__resume__";

/// Where control goes after a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Node(String),
    End,
}

impl Target {
    pub fn node(name: impl Into<String>) -> Self {
        Target::Node(name.into())
    }

    pub fn as_node(&self) -> Option<&str> {
        match self {
            Target::Node(name) => Some(name),
            Target::End => None,
        }
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Target::End)
    }
}

impl From<Option<String>> for Target {
    fn from(value: Option<String>) -> Self {
        value.map(Target::Node).unwrap_or(Target::End)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Node(name) => write!(f, "{}", name),
            Target::End => write!(f, "END"),
        }
    }
}

/// Routing function for a conditional edge; returns a branch key.
pub type RouteFn = Arc<dyn Fn(&PipelineState) -> Result<String> + Send + Sync>;

/// Outgoing edge of a node.
#[derive(Clone)]
pub enum Edge {
    Linear(Target),
    Conditional {
        route: RouteFn,
        branches: BTreeMap<String, Target>,
    },
}

impl fmt::Debug for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edge::Linear(target) => f.debug_tuple("Linear").field(target).finish(),
            Edge::Conditional { branches, .. } => f
                .debug_struct("Conditional")
                .field("branches", branches)
                .finish_non_exhaustive(),
        }
    }
}

impl Edge {
    fn targets(&self) -> Vec<&Target> {
        match self {
            Edge::Linear(target) => vec![target],
            Edge::Conditional { branches, .. } => branches.values().collect(),
        }
    }
}

/// A validated pipeline graph.
pub struct Graph {
    name: String,
    start: String,
    nodes: HashMap<String, Arc<dyn Node>>,
    edges: HashMap<String, Edge>,
    interrupt_after: HashSet<String>,
}

impl Graph {
    pub fn builder(name: impl Into<String>) -> GraphBuilder {
        GraphBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn node(&self, name: &str) -> Option<Arc<dyn Node>> {
        self.nodes.get(name).cloned()
    }

    pub fn node_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.nodes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn is_interrupt_after(&self, node: &str) -> bool {
        self.interrupt_after.contains(node)
    }

    /// Resolve the successor of `from` against the state produced by `from`.
    ///
    /// A routing key with no matching branch is a definition error.
    pub fn next(&self, from: &str, state: &PipelineState) -> Result<Target> {
        let edge = self.edges.get(from).ok_or_else(|| {
            Error::graph_definition(format!("node '{}' has no outgoing edge", from))
        })?;

        match edge {
            Edge::Linear(target) => Ok(target.clone()),
            Edge::Conditional { route, branches } => {
                let key = route(state)?;
                branches.get(&key).cloned().ok_or_else(|| {
                    Error::graph_definition(format!(
                        "routing key '{}' after node '{}' matches no branch (expected one of: {})",
                        key,
                        from,
                        branches.keys().cloned().collect::<Vec<_>>().join(", ")
                    ))
                })
            }
        }
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("name", &self.name)
            .field("start", &self.start)
            .field("nodes", &self.node_names())
            .field("edges", &self.edges)
            .field("interrupt_after", &self.interrupt_after)
            .finish()
    }
}

/// Builder for [`Graph`]. All structural checks happen in [`GraphBuilder::build`].
pub struct GraphBuilder {
    name: String,
    start: Option<String>,
    nodes: Vec<Arc<dyn Node>>,
    edges: Vec<(String, Edge)>,
    interrupt_after: Vec<String>,
}

impl GraphBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: None,
            nodes: Vec::new(),
            edges: Vec::new(),
            interrupt_after: Vec::new(),
        }
    }

    pub fn node(mut self, node: impl Node + 'static) -> Self {
        self.nodes.push(Arc::new(node));
        self
    }

    pub fn shared_node(mut self, node: Arc<dyn Node>) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn start(mut self, node: impl Into<String>) -> Self {
        self.start = Some(node.into());
        self
    }

    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges
            .push((from.into(), Edge::Linear(Target::Node(to.into()))));
        self
    }

    pub fn edge_to_end(mut self, from: impl Into<String>) -> Self {
        self.edges.push((from.into(), Edge::Linear(Target::End)));
        self
    }

    /// Route on a key computed from the state. Each branch maps a key to a target.
    pub fn conditional_edge<F, I, K>(mut self, from: impl Into<String>, route: F, branches: I) -> Self
    where
        F: Fn(&PipelineState) -> Result<String> + Send + Sync + 'static,
        I: IntoIterator<Item = (K, Target)>,
        K: Into<String>,
    {
        let branches = branches
            .into_iter()
            .map(|(key, target)| (key.into(), target))
            .collect();
        self.edges.push((
            from.into(),
            Edge::Conditional {
                route: Arc::new(route),
                branches,
            },
        ));
        self
    }

    /// Suspend the run after `node` completes.
    pub fn interrupt_after(mut self, node: impl Into<String>) -> Self {
        self.interrupt_after.push(node.into());
        self
    }

    pub fn build(self) -> Result<Graph> {
        let mut nodes: HashMap<String, Arc<dyn Node>> = HashMap::new();
        for node in self.nodes {
            let name = node.name().to_string();
            if name == START || name == RESUME {
                return Err(Error::graph_definition(format!(
                    "node name '{}' is reserved",
                    name
                )));
            }
            if nodes.insert(name.clone(), node).is_some() {
                return Err(Error::graph_definition(format!(
                    "duplicate node '{}' in graph '{}'",
                    name, self.name
                )));
            }
        }

        let start = self.start.ok_or_else(|| {
            Error::graph_definition(format!("graph '{}' has no start node", self.name))
        })?;
        if !nodes.contains_key(&start) {
            return Err(Error::graph_definition(format!(
                "start node '{}' is not defined",
                start
            )));
        }

        let mut edges = HashMap::new();
        for (from, edge) in self.edges {
            if !nodes.contains_key(&from) {
                return Err(Error::graph_definition(format!(
                    "edge from undefined node '{}'",
                    from
                )));
            }
            if let Edge::Conditional { branches, .. } = &edge
                && branches.is_empty()
            {
                return Err(Error::graph_definition(format!(
                    "conditional edge from '{}' has no branches",
                    from
                )));
            }
            for target in edge.targets() {
                if let Target::Node(to) = target
                    && !nodes.contains_key(to)
                {
                    return Err(Error::graph_definition(format!(
                        "edge from '{}' targets undefined node '{}'",
                        from, to
                    )));
                }
            }
            if edges.insert(from.clone(), edge).is_some() {
                return Err(Error::graph_definition(format!(
                    "node '{}' has more than one outgoing edge",
                    from
                )));
            }
        }

        let mut names: Vec<&String> = nodes.keys().collect();
        names.sort();
        for name in names {
            if !edges.contains_key(name) {
                return Err(Error::graph_definition(format!(
                    "node '{}' has no outgoing edge",
                    name
                )));
            }
        }

        for name in &self.interrupt_after {
            if !nodes.contains_key(name) {
                return Err(Error::graph_definition(format!(
                    "interrupt point '{}' is not a node",
                    name
                )));
            }
        }

        Ok(Graph {
            name: self.name,
            start,
            nodes,
            edges,
            interrupt_after: self.interrupt_after.into_iter().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::FnNode;
    use apigen_core::{DiscoveryInput, DiscoveryState, InputType, StatePatch};

    fn noop(name: &str) -> FnNode {
        FnNode::new(name, |state| Ok(StatePatch::empty_for(state)))
    }

    fn route_on_input(state: &PipelineState) -> Result<String> {
        let state = state.as_discovery()?;
        Ok(state
            .discovery
            .input_type
            .map(|t| t.as_str().to_string())
            .unwrap_or_default())
    }

    fn state_with(input_type: Option<InputType>) -> PipelineState {
        let mut state = DiscoveryState::new(DiscoveryInput::from_url("https://docs.example.com"));
        state.discovery.input_type = input_type;
        state.into()
    }

    #[test]
    fn test_build_linear_graph() {
        let graph = Graph::builder("linear")
            .node(noop("a"))
            .node(noop("b"))
            .start("a")
            .edge("a", "b")
            .edge_to_end("b")
            .interrupt_after("b")
            .build()
            .unwrap();

        let state = state_with(None);
        assert_eq!(graph.next("a", &state).unwrap(), Target::node("b"));
        assert_eq!(graph.next("b", &state).unwrap(), Target::End);
        assert!(graph.is_interrupt_after("b"));
        assert!(!graph.is_interrupt_after("a"));
        assert_eq!(graph.node_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_conditional_routing() {
        let graph = Graph::builder("routed")
            .node(noop("classify"))
            .node(noop("files"))
            .node(noop("web"))
            .start("classify")
            .conditional_edge(
                "classify",
                route_on_input,
                [("file", Target::node("files")), ("url", Target::node("web"))],
            )
            .edge_to_end("files")
            .edge_to_end("web")
            .build()
            .unwrap();

        let next = graph
            .next("classify", &state_with(Some(InputType::Url)))
            .unwrap();
        assert_eq!(next, Target::node("web"));

        let err = graph.next("classify", &state_with(None)).unwrap_err();
        assert!(matches!(err, Error::GraphDefinition(_)));
    }

    #[test]
    fn test_build_rejects_malformed_graphs() {
        let missing_start = Graph::builder("g").node(noop("a")).edge_to_end("a").build();
        assert!(matches!(missing_start, Err(Error::GraphDefinition(_))));

        let dangling = Graph::builder("g")
            .node(noop("a"))
            .start("a")
            .edge("a", "ghost")
            .build();
        assert!(matches!(dangling, Err(Error::GraphDefinition(_))));

        let no_edge = Graph::builder("g")
            .node(noop("a"))
            .node(noop("b"))
            .start("a")
            .edge("a", "b")
            .build();
        assert!(matches!(no_edge, Err(Error::GraphDefinition(_))));

        let duplicate = Graph::builder("g")
            .node(noop("a"))
            .node(noop("a"))
            .start("a")
            .edge_to_end("a")
            .build();
        assert!(matches!(duplicate, Err(Error::GraphDefinition(_))));

        let bad_interrupt = Graph::builder("g")
            .node(noop("a"))
            .start("a")
            .edge_to_end("a")
            .interrupt_after("b")
            .build();
        assert!(matches!(bad_interrupt, Err(Error::GraphDefinition(_))));

        let reserved = Graph::builder("g")
            .node(noop(START))
            .start(START)
            .edge_to_end(START)
            .build();
        assert!(matches!(reserved, Err(Error::GraphDefinition(_))));
    }
}
