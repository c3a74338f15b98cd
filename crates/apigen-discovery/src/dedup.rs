//! Canonicalisation and deduplication of raw endpoint records.

use crate::scoring::confidence;
use apigen_core::path::{canonical_path, resource_of};
use apigen_core::{NormalizedEndpoint, RawEndpoint};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Length of the hex id derived from a canonical key.
pub const ID_LEN: usize = 12;

/// `server|method|path` with a lower-cased method and canonical path.
pub fn canonical_key(server: &str, method: &str, path: &str) -> String {
    format!(
        "{}|{}|{}",
        server.trim(),
        method.trim().to_lowercase(),
        canonical_path(path)
    )
}

/// Stable short id: the first [`ID_LEN`] hex digits of the key's SHA-256.
pub fn endpoint_id(canonical_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_key.as_bytes());
    let mut id = hex::encode(hasher.finalize());
    id.truncate(ID_LEN);
    id
}

/// Collapse raw records to one endpoint per canonical key.
///
/// The surviving record is the one with the highest source precedence; on a tie
/// the first seen wins. Output keeps first-seen key order. Records whose path is
/// empty after canonicalisation are dropped. `server_override` replaces every
/// record's own server.
pub fn normalize_and_dedup(
    raw: &[RawEndpoint],
    server_override: Option<&str>,
) -> Vec<NormalizedEndpoint> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut survivors: Vec<&RawEndpoint> = Vec::new();
    let mut keys: Vec<String> = Vec::new();

    for endpoint in raw {
        if canonical_path(&endpoint.path).is_empty() {
            continue;
        }
        let server = server_override.unwrap_or(&endpoint.server);
        let key = canonical_key(server, &endpoint.method, &endpoint.path);

        match positions.get(&key) {
            Some(&index) => {
                if endpoint.source.outranks(survivors[index].source) {
                    survivors[index] = endpoint;
                }
            }
            None => {
                positions.insert(key.clone(), survivors.len());
                survivors.push(endpoint);
                keys.push(key);
            }
        }
    }

    survivors
        .into_iter()
        .zip(keys)
        .map(|(endpoint, key)| normalize(endpoint, &key, server_override))
        .collect()
}

fn normalize(endpoint: &RawEndpoint, key: &str, server_override: Option<&str>) -> NormalizedEndpoint {
    let path = canonical_path(&endpoint.path);
    NormalizedEndpoint {
        id: endpoint_id(key),
        server: server_override
            .unwrap_or(&endpoint.server)
            .trim()
            .to_string(),
        method: endpoint.method.trim().to_uppercase(),
        resource: resource_of(&path),
        path,
        description: endpoint
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string),
        parameters: endpoint.parameters.clone(),
        request_body: endpoint.request_body.clone(),
        source: endpoint.source,
        confidence: confidence(endpoint),
    }
}
