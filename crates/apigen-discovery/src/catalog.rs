//! Grouping of normalized endpoints into the catalog shown for selection.

use apigen_core::{Catalog, CatalogStats, NormalizedEndpoint};
use std::collections::BTreeMap;

/// Group endpoints by resource, keeping input order inside each group.
pub fn build_catalog(endpoints: &[NormalizedEndpoint]) -> Catalog {
    let mut resources: BTreeMap<String, Vec<NormalizedEndpoint>> = BTreeMap::new();
    let mut stats = CatalogStats {
        total_endpoints: endpoints.len(),
        ..CatalogStats::default()
    };

    for endpoint in endpoints {
        *stats.by_source.entry(endpoint.source).or_default() += 1;
        *stats.by_resource.entry(endpoint.resource.clone()).or_default() += 1;
        resources
            .entry(endpoint.resource.clone())
            .or_default()
            .push(endpoint.clone());
    }

    stats.resource_count = resources.len();
    if !endpoints.is_empty() {
        stats.mean_confidence =
            endpoints.iter().map(|e| e.confidence).sum::<f64>() / endpoints.len() as f64;
    }

    Catalog { resources, stats }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::normalize_and_dedup;
    use apigen_core::{EndpointSource, RawEndpoint};

    #[test]
    fn test_groups_and_stats() {
        let endpoints = normalize_and_dedup(
            &[
                RawEndpoint::new("GET", "/v1/flights/search", EndpointSource::Openapi),
                RawEndpoint::new("POST", "/v1/bookings", EndpointSource::Openapi),
                RawEndpoint::new("GET", "/v1/bookings/{id}", EndpointSource::Regex),
            ],
            None,
        );

        let catalog = build_catalog(&endpoints);
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.stats.resource_count, 2);
        assert_eq!(catalog.stats.by_resource["bookings"], 2);
        assert_eq!(catalog.stats.by_source[&EndpointSource::Openapi], 2);
        assert_eq!(catalog.resources["bookings"][0].method, "POST");
        assert!(catalog.find(&endpoints[0].id).is_some());

        let expected = (0.65 + 0.65 + 0.5) / 3.0;
        assert!((catalog.stats.mean_confidence - expected).abs() < 1e-9);
    }

    #[test]
    fn test_empty_catalog() {
        let catalog = build_catalog(&[]);
        assert!(catalog.is_empty());
        assert_eq!(catalog.stats.mean_confidence, 0.0);
    }
}
