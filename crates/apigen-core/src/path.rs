//! Helpers for reading meaning out of URL path templates.
//!
//! Both pipelines group and name endpoints by the shape of their path, so the
//! segment rules live here rather than in either pipeline crate.

/// Fallback resource name for paths without a meaningful segment.
pub const DEFAULT_RESOURCE: &str = "other";

/// Split a path into its non-empty segments.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').map(str::trim).filter(|s| !s.is_empty())
}

/// Whether a segment is a version marker such as `v1` or `v2.1`.
pub fn is_version_segment(segment: &str) -> bool {
    let Some(rest) = segment
        .strip_prefix('v')
        .or_else(|| segment.strip_prefix('V'))
    else {
        return false;
    };

    !rest.is_empty()
        && rest.starts_with(|c: char| c.is_ascii_digit())
        && rest.chars().all(|c| c.is_ascii_digit() || c == '.')
}

/// Whether a segment is a path template parameter (`{id}` or `:id`).
pub fn is_template_segment(segment: &str) -> bool {
    (segment.starts_with('{') && segment.ends_with('}')) || segment.starts_with(':')
}

/// Whether a segment looks like it identifies a single item.
///
/// Template parameters, purely numeric literals and UUID-shaped literals count.
pub fn is_identifier_segment(segment: &str) -> bool {
    if is_template_segment(segment) {
        return true;
    }
    if !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }
    is_uuid_like(segment)
}

fn is_uuid_like(segment: &str) -> bool {
    let groups: Vec<&str> = segment.split('-').collect();
    let expected = [8, 4, 4, 4, 12];
    groups.len() == expected.len()
        && groups
            .iter()
            .zip(expected)
            .all(|(g, len)| g.len() == len && g.chars().all(|c| c.is_ascii_hexdigit()))
}

/// The resource an endpoint belongs to: the first segment that is not an
/// `api` prefix, a version marker or a template parameter.
pub fn resource_of(path: &str) -> String {
    segments(path)
        .find(|s| {
            !s.eq_ignore_ascii_case("api") && !is_version_segment(s) && !is_template_segment(s)
        })
        .map(|s| s.to_lowercase())
        .unwrap_or_else(|| DEFAULT_RESOURCE.to_string())
}

/// The first version segment of a path, lower-cased.
pub fn version_of(path: &str) -> Option<String> {
    segments(path)
        .find(|s| is_version_segment(s))
        .map(str::to_lowercase)
}

/// Canonical form of a path: query string and all whitespace removed.
pub fn canonical_path(path: &str) -> String {
    let without_query = path.split('?').next().unwrap_or_default();
    without_query.chars().filter(|c| !c.is_whitespace()).collect()
}
