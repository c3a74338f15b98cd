//! Recoverable failures, recorded as data alongside a run's output.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A file could not be parsed and the fallback found nothing in it.
    Parse,
    /// A page could not be fetched.
    Crawl,
    /// A page or file yielded no endpoints, or the extractor failed on it.
    Extraction,
    /// The schema generator failed for a work item.
    SchemaSynthesis,
    /// A generated schema failed the compliance check.
    Validation,
    /// A selected endpoint id is not in the catalog.
    Selection,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Parse => "parse",
            ErrorKind::Crawl => "crawl",
            ErrorKind::Extraction => "extraction",
            ErrorKind::SchemaSynthesis => "schema_synthesis",
            ErrorKind::Validation => "validation",
            ErrorKind::Selection => "selection",
        };
        f.write_str(s)
    }
}

/// A per-item failure that did not abort the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunError {
    pub kind: ErrorKind,
    /// Node that recorded the failure.
    pub stage: String,
    /// The file, URL, endpoint id or tool name the failure concerns.
    pub subject: String,
    pub message: String,
}

impl RunError {
    pub fn new(
        kind: ErrorKind,
        stage: impl Into<String>,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            stage: stage.into(),
            subject: subject.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}/{}] {}: {}",
            self.stage, self.kind, self.subject, self.message
        )
    }
}
