use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a pipeline run or a checkpoint operation.
///
/// Per-item failures (a page that could not be fetched, a schema the generator
/// could not produce, ...) are never reported through this type; nodes record them
/// as [`RunError`](crate::RunError) values in the pipeline state instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Ambiguous input: {0}")]
    AmbiguousInput(String),

    #[error("Graph definition error: {0}")]
    GraphDefinition(String),

    #[error("Failed to parse input: {0}")]
    Parse(String),

    #[error("State mismatch: {0}")]
    StateMismatch(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Session '{session_id}' cannot be resumed: {reason}")]
    NotResumable { session_id: String, reason: String },

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Node '{node}' failed: {source}")]
    NodeFailed {
        node: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Helper for creating configuration errors
    ///
    /// # Example
    /// ```
    /// use apigen_core::Error;
    /// let err = Error::config_error("max_pages must be positive");
    /// ```
    pub fn config_error(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Helper for creating graph definition errors
    pub fn graph_definition(msg: impl Into<String>) -> Self {
        Error::GraphDefinition(msg.into())
    }

    /// Helper for creating checkpoint store errors
    pub fn checkpoint(msg: impl Into<String>) -> Self {
        Error::Checkpoint(msg.into())
    }

    /// Wrap an error raised inside a node with the node's name.
    pub fn in_node(self, node: impl Into<String>) -> Self {
        match self {
            Error::NodeFailed { .. } => self,
            other => Error::NodeFailed {
                node: node.into(),
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, looking through node wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::NodeFailed { source, .. } => source.root(),
            other => other,
        }
    }
}
