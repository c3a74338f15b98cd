//! Regex extraction of `METHOD /path` tokens from documentation pages.

use apigen_core::{EndpointSource, RawEndpoint};
use regex::Regex;
use scraper::Html;
use std::sync::LazyLock;

/// Tried in order on every page.
const ENDPOINT_PATTERNS: [&str; 3] = [
    r"(?i)\b(GET|POST|PUT|DELETE|PATCH)\s+(/api/[\w\-/{}]+)",
    r"(?i)\b(GET|POST|PUT|DELETE|PATCH)\s+(/v\d+/[\w\-/{}]+)",
    r"(?i)`(GET|POST|PUT|DELETE|PATCH)\s+([^`]+)`",
];

static PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    ENDPOINT_PATTERNS
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
});

/// Matches endpoint mentions in raw page content.
#[derive(Debug, Clone, Default)]
pub struct PatternExtractor {
    server: String,
}

impl PatternExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Server recorded on every extracted endpoint.
    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = server.into();
        self
    }

    /// All matches, pattern by pattern, in document order within each pattern.
    pub fn extract(&self, content: &str) -> Vec<RawEndpoint> {
        let mut endpoints = Vec::new();
        for pattern in PATTERNS.iter() {
            for cap in pattern.captures_iter(content) {
                let (Some(method), Some(path)) = (cap.get(1), cap.get(2)) else {
                    continue;
                };
                let path = path.as_str().trim();
                if !path.starts_with('/') {
                    continue;
                }
                endpoints.push(
                    RawEndpoint::new(method.as_str().to_uppercase(), path, EndpointSource::Regex)
                        .with_server(self.server.clone()),
                );
            }
        }
        endpoints
    }
}

/// Visible text of an HTML page with whitespace collapsed. Plain text passes through.
pub fn page_text(content: &str) -> String {
    let document = Html::parse_document(content);
    document
        .root_element()
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// At most `limit` characters of `text`.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}
