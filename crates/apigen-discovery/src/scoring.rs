//! Confidence scoring for normalized endpoints.

use apigen_core::{EndpointSource, RawEndpoint};

const DESCRIPTION_BONUS: f64 = 0.2;
const PARAMETER_BONUS: f64 = 0.15;

/// Base trust of an extraction strategy.
pub fn source_weight(source: EndpointSource) -> f64 {
    match source {
        EndpointSource::Openapi => 0.65,
        EndpointSource::Regex => 0.5,
        EndpointSource::Llm => 0.4,
    }
}

/// `source weight + description bonus + parameter bonus`, clipped to `[0, 1]`.
pub fn confidence(endpoint: &RawEndpoint) -> f64 {
    let mut score = source_weight(endpoint.source);

    if endpoint
        .description
        .as_deref()
        .is_some_and(|d| !d.trim().is_empty())
    {
        score += DESCRIPTION_BONUS;
    }

    let has_body = endpoint
        .request_body
        .as_ref()
        .is_some_and(|b| b.as_object().is_some_and(|o| !o.is_empty()));
    if !endpoint.parameters.is_empty() || has_body {
        score += PARAMETER_BONUS;
    }

    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_source_ordering() {
        assert!(source_weight(EndpointSource::Openapi) > source_weight(EndpointSource::Regex));
        assert!(source_weight(EndpointSource::Regex) > source_weight(EndpointSource::Llm));
    }

    #[test]
    fn test_bonuses_and_clipping() {
        let bare = RawEndpoint::new("GET", "/users", EndpointSource::Regex);
        assert!((confidence(&bare) - 0.5).abs() < 1e-9);

        let full = RawEndpoint::new("POST", "/users", EndpointSource::Openapi)
            .with_description("Create a user")
            .with_request_body(json!({"content": {"application/json": {}}}));
        assert!((confidence(&full) - 1.0).abs() < 1e-9);

        let empty_body = RawEndpoint::new("POST", "/users", EndpointSource::Llm)
            .with_request_body(json!({}));
        assert!((confidence(&empty_body) - 0.4).abs() < 1e-9);

        for source in [EndpointSource::Openapi, EndpointSource::Regex, EndpointSource::Llm] {
            let endpoint = RawEndpoint::new("GET", "/a", source)
                .with_description("d")
                .with_parameters(vec![json!({"name": "q"})]);
            let score = confidence(&endpoint);
            assert!((0.0..=1.0).contains(&score));
        }
    }
}
