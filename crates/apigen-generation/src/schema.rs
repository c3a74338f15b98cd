//! Post-processing of generated parameter schemas.
//!
//! Generated groups are completed with the metadata the tool format expects
//! (`required`, `visible`, `additionalProperties`) before composition, and the
//! `visible` extension is stripped again before a compliance check.

use apigen_core::{NormalizedEndpoint, ParameterSchema};
use serde_json::{Value, json};

/// Keywords whose value is a single subschema.
const SUBSCHEMA_KEYWORDS: [&str; 3] = ["items", "additionalProperties", "not"];

/// Keywords whose value is a list of subschemas.
const COMBINATOR_KEYWORDS: [&str; 3] = ["allOf", "oneOf", "anyOf"];

/// Keywords whose value maps names to subschemas.
const SCHEMA_MAP_KEYWORDS: [&str; 4] = ["properties", "patternProperties", "definitions", "$defs"];

fn is_object_schema(schema: &Value) -> bool {
    match schema.get("type") {
        Some(Value::String(t)) => t == "object",
        Some(Value::Array(types)) => types.iter().any(|t| t == "object"),
        _ => false,
    }
}

fn is_array_schema(schema: &Value) -> bool {
    schema.get("type").and_then(Value::as_str) == Some("array")
}

/// Fill in `visible`, `required` and `additionalProperties` on every object
/// schema reachable through properties, array items and combinators.
///
/// `flexible` is the `additionalProperties` default for this level; nested
/// objects are always strict.
pub fn enhance_schema(schema: &mut Value, flexible: bool) {
    let is_object = is_object_schema(schema);
    let is_array = is_array_schema(schema);
    let Some(obj) = schema.as_object_mut() else {
        return;
    };

    if is_object {
        let names: Vec<Value> = obj
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| props.keys().cloned().map(Value::String).collect())
            .unwrap_or_default();

        obj.entry("visible").or_insert_with(|| Value::Array(names));
        obj.entry("required").or_insert_with(|| json!([]));
        obj.entry("additionalProperties")
            .or_insert(Value::Bool(flexible));

        if let Some(props) = obj.get_mut("properties").and_then(Value::as_object_mut) {
            for prop in props.values_mut() {
                enhance_schema(prop, false);
            }
        }
    } else if is_array && let Some(items) = obj.get_mut("items") {
        enhance_schema(items, false);
    }

    for keyword in COMBINATOR_KEYWORDS {
        if let Some(Value::Array(branches)) = obj.get_mut(keyword) {
            for branch in branches {
                enhance_schema(branch, flexible);
            }
        }
    }
}

/// Enhance every generated group of `schema` for `endpoint`.
///
/// Groups that are exactly the empty-group shape are left as they are. The body
/// group of an endpoint whose request body declares content accepts extra
/// properties at its top level.
pub fn enhance_parameters(schema: &mut ParameterSchema, endpoint: &NormalizedEndpoint) {
    let empty = ParameterSchema::empty_group();
    let flexible_body = endpoint.has_body_content();

    for (group, value) in schema.groups_mut() {
        if *value == empty {
            continue;
        }
        enhance_schema(value, group == "body" && flexible_body);
    }
}

/// A copy of `schema` with the `visible` extension removed from every schema
/// object. Properties that happen to be named `visible` are kept.
pub fn strip_visible(schema: &Value) -> Value {
    let mut stripped = schema.clone();
    strip_in_place(&mut stripped);
    stripped
}

fn strip_in_place(schema: &mut Value) {
    let Some(obj) = schema.as_object_mut() else {
        return;
    };
    obj.remove("visible");

    for keyword in SUBSCHEMA_KEYWORDS {
        if let Some(sub) = obj.get_mut(keyword) {
            match sub {
                Value::Array(items) => items.iter_mut().for_each(strip_in_place),
                other => strip_in_place(other),
            }
        }
    }
    for keyword in COMBINATOR_KEYWORDS {
        if let Some(Value::Array(branches)) = obj.get_mut(keyword) {
            branches.iter_mut().for_each(strip_in_place);
        }
    }
    for keyword in SCHEMA_MAP_KEYWORDS {
        if let Some(Value::Object(map)) = obj.get_mut(keyword) {
            map.values_mut().for_each(strip_in_place);
        }
    }
}
