use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Model used for both gateway operations, served through OpenRouter.
pub const DEFAULT_MODEL: &str = "google/gemini-2.5-flash";

#[derive(Clone, Debug, Serialize)]
pub enum Provider {
    OpenRouter {
        /// Name of the environment variable holding the API key, not the key itself.
        api_key_env: String,
        base_url: String,
    },
}

/// One piece of a multimodal user message. Serialized in the OpenAI-style
/// parts format: `{"type":"text",...}` or `{"type":"image_url",...}`.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ImageUrl {
    pub url: String,
}

/// Message content is either a bare string (system prompts, text-only turns)
/// or a list of parts when an image rides along with the instruction.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatMessage {
    pub role: String,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn text(role: &str, content: impl Into<String>) -> Self {
        ChatMessage {
            role: role.to_string(),
            content: MessageContent::Text(content.into()),
        }
    }
}

/// A JSON-schema node. Recursive so that nested objects (macros inside the
/// nutrition schema, per-day meals inside the plan schema) can be declared
/// with the same type that declares their parents.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct JsonSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<HashMap<String, JsonSchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<JsonSchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "additionalProperties")]
    pub additional_properties: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#enum: Option<Vec<String>>,
}

impl JsonSchema {
    pub fn string() -> Self {
        JsonSchema {
            schema_type: "string".to_string(),
            ..Default::default()
        }
    }

    pub fn number() -> Self {
        JsonSchema {
            schema_type: "number".to_string(),
            ..Default::default()
        }
    }

    pub fn array(items: JsonSchema) -> Self {
        JsonSchema {
            schema_type: "array".to_string(),
            items: Some(Box::new(items)),
            ..Default::default()
        }
    }

    /// Object node with `additionalProperties: false`, as strict
    /// structured-output mode requires.
    pub fn object(properties: HashMap<String, JsonSchema>, required: &[&str]) -> Self {
        JsonSchema {
            schema_type: "object".to_string(),
            properties: Some(properties),
            required: Some(required.iter().map(|s| s.to_string()).collect()),
            additional_properties: Some(false),
            ..Default::default()
        }
    }

    pub fn described(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JsonSchemaDefinition {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
    pub schema: JsonSchema,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub format_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_schema: Option<JsonSchemaDefinition>,
}

impl ResponseFormat {
    pub fn json_schema(definition: JsonSchemaDefinition) -> Self {
        ResponseFormat {
            format_type: "json_schema".to_string(),
            json_schema: Some(definition),
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatCompletionResponseMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatCompletionChoice {
    pub message: ChatCompletionResponseMessage,
    pub finish_reason: Option<String>,
    pub index: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatCompletionUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: Option<u32>,
    pub total_tokens: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: Option<String>,
    pub created: u64,
    pub model: String,
    pub choices: Vec<ChatCompletionChoice>,
    pub usage: Option<ChatCompletionUsage>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_multimodal_message_serialization() {
        let message = ChatMessage {
            role: "user".to_string(),
            content: MessageContent::Parts(vec![
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: "data:image/png;base64,AAAA".to_string(),
                    },
                },
                ContentPart::Text {
                    text: "Analyze this meal.".to_string(),
                },
            ]),
        };

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(
            value,
            json!({
                "role": "user",
                "content": [
                    {"type": "image_url", "image_url": {"url": "data:image/png;base64,AAAA"}},
                    {"type": "text", "text": "Analyze this meal."}
                ]
            })
        );
    }

    #[test]
    fn test_text_message_serializes_as_plain_string() {
        let message = ChatMessage::text("system", "You are a nutritionist.");
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["content"], json!("You are a nutritionist."));
    }

    #[test]
    fn test_object_schema_serialization() {
        let mut properties = HashMap::new();
        properties.insert("summary".to_string(), JsonSchema::string());
        properties.insert("items".to_string(), JsonSchema::array(JsonSchema::string()));
        let schema = JsonSchema::object(properties, &["summary", "items"]);

        let value = serde_json::to_value(&schema).unwrap();
        assert_eq!(value["type"], "object");
        assert_eq!(value["additionalProperties"], json!(false));
        assert_eq!(value["properties"]["items"]["type"], "array");
        assert_eq!(value["properties"]["items"]["items"]["type"], "string");
        let required = value["required"].as_array().unwrap();
        assert_eq!(required.len(), 2);
    }
}
