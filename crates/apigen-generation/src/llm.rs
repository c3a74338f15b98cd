//! Parameter schema synthesis through a language model.

use anyhow::{Context, anyhow};
use apigen_core::{
    CompletionModel, EndpointDescriptor, ParameterSchema, SchemaGenerator, strip_code_fences,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

const SYSTEM_PROMPT: &str = "Generate a JSON Schema parameter schema for the given API endpoint.

Organize parameters as an object with exactly these top-level groups:
- \"header\" for HTTP headers
- \"path\" for path parameters
- \"query\" for query string parameters
- \"body\" for the request body

Each group is an object schema with:
- \"type\": \"object\"
- \"properties\": one entry per parameter, each with a \"type\" and a \"description\"
- \"required\": array of required property names (may be empty)
- \"visible\": array of property names to show to users
- \"additionalProperties\": false, or true only if the API accepts extra fields

Use enum, format, pattern, minimum/maximum, minLength/maxLength and default where the
documentation supports them. Do not include a \"$schema\" field.
Respond with JSON only.";

/// [`SchemaGenerator`] that prompts a [`CompletionModel`] with the endpoint's
/// method, path, description, parameters and request body.
pub struct LlmSchemaGenerator {
    model: Arc<dyn CompletionModel>,
}

impl LlmSchemaGenerator {
    pub fn new(model: Arc<dyn CompletionModel>) -> Self {
        Self { model }
    }
}

fn user_prompt(endpoint: &EndpointDescriptor) -> anyhow::Result<String> {
    let parameters = serde_json::to_string(&endpoint.parameters)?;
    let request_body = serde_json::to_string(endpoint.request_body.as_ref().unwrap_or(&Value::Null))?;
    Ok(format!(
        "Endpoint: {} {}\nDescription: {}\nParameters: {}\nRequest Body: {}",
        endpoint.method, endpoint.path, endpoint.description, parameters, request_body
    ))
}

#[async_trait]
impl SchemaGenerator for LlmSchemaGenerator {
    async fn generate(&self, endpoint: &EndpointDescriptor) -> anyhow::Result<ParameterSchema> {
        let prompt = user_prompt(endpoint)?;
        let reply = self
            .model
            .complete(SYSTEM_PROMPT, &prompt)
            .await
            .with_context(|| format!("model '{}' failed", self.model.name()))?;
        parse_schema_reply(&reply)
    }
}

/// Parse a four-group schema, also accepted when wrapped in `{"parameters": ...}`.
pub fn parse_schema_reply(reply: &str) -> anyhow::Result<ParameterSchema> {
    let mut value: Value =
        serde_json::from_str(strip_code_fences(reply)).context("model reply is not valid JSON")?;

    if value.get("parameters").is_some_and(Value::is_object) {
        value = value["parameters"].take();
    }
    let Some(groups) = value.as_object_mut() else {
        return Err(anyhow!("model reply is not a JSON object"));
    };
    groups.remove("$schema");

    for (group, schema) in groups.iter() {
        if !schema.is_null() && !schema.is_object() {
            return Err(anyhow!("group '{}' is not an object schema", group));
        }
    }

    ParameterSchema::from_value(value).context("model reply does not match the parameter groups")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct ScriptedModel {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CompletionModel for ScriptedModel {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, _system: &str, user: &str) -> anyhow::Result<String> {
            self.prompts.lock().unwrap().push(user.to_string());
            Ok(self.reply.clone())
        }
    }

    fn descriptor() -> EndpointDescriptor {
        EndpointDescriptor {
            method: "GET".into(),
            path: "/v1/flights/search".into(),
            description: "Search flights".into(),
            parameters: vec![json!({"name": "origin", "in": "query"})],
            request_body: None,
        }
    }

    #[tokio::test]
    async fn test_generate_prompts_and_parses() {
        let model = Arc::new(ScriptedModel {
            reply: "```json\n{\"query\": {\"type\": \"object\", \"properties\": \
                    {\"origin\": {\"type\": \"string\"}}, \"required\": [\"origin\"]}}\n```"
                .to_string(),
            prompts: Mutex::new(Vec::new()),
        });
        let generator = LlmSchemaGenerator::new(model.clone());

        let schema = generator.generate(&descriptor()).await.unwrap();

        assert_eq!(schema.query["required"], json!(["origin"]));
        assert_eq!(schema.body, ParameterSchema::empty_group());

        let prompt = model.prompts.lock().unwrap()[0].clone();
        assert!(prompt.starts_with("Endpoint: GET /v1/flights/search"));
        assert!(prompt.contains("\"origin\""));
        assert!(prompt.ends_with("Request Body: null"));
    }

    #[test]
    fn test_parse_wrapped_reply() {
        let schema = parse_schema_reply(
            r#"{"parameters": {"path": {"type": "object", "properties": {"id": {"type": "string"}}}}, "$schema": "x"}"#,
        )
        .unwrap();
        assert!(schema.path["properties"]["id"].is_object());
    }

    #[test]
    fn test_parse_rejects_malformed_groups() {
        assert!(parse_schema_reply("no schema for you").is_err());
        assert!(parse_schema_reply("[]").is_err());
        assert!(parse_schema_reply(r#"{"query": "q"}"#).is_err());
    }
}
