use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::api_connection::endpoints::{
    ChatCompletionRequest, ChatMessage, ContentPart, ImageUrl, JsonSchema, JsonSchemaDefinition,
    MessageContent, Provider, ResponseFormat, DEFAULT_MODEL,
};
use crate::gateway::{extract_json_content, GatewayError};
use crate::history::{HistoryEntry, HistoryStore, MealHistoryItem};

/// Image MIME types the analyzer accepts. Anything else is rejected before
/// the backend is contacted.
pub const RECOGNIZED_IMAGE_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/gif",
    "image/heic",
];

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MacroNutrients {
    /// kcal; the other three are grams.
    pub calories: f64,
    pub protein: f64,
    pub carbohydrates: f64,
    pub fat: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Micronutrient {
    pub name: String,
    /// Free-form quantity string (e.g. "150mg"), not parsed further.
    pub amount: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NutritionalInfo {
    pub food_items: Vec<String>,
    pub macros: MacroNutrients,
    pub vitamins: Vec<Micronutrient>,
    pub minerals: Vec<Micronutrient>,
    pub summary: String,
}

impl NutritionalInfo {
    /// Schema checks serde cannot express: the estimated macros must be
    /// non-negative quantities.
    fn validate(&self) -> Result<(), GatewayError> {
        let macros = [
            ("calories", self.macros.calories),
            ("protein", self.macros.protein),
            ("carbohydrates", self.macros.carbohydrates),
            ("fat", self.macros.fat),
        ];
        for (name, value) in macros {
            if !value.is_finite() || value < 0.0 {
                return Err(GatewayError::MalformedResponse(format!(
                    "macro '{}' is not a non-negative number: {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

fn micronutrient_list_schema() -> JsonSchema {
    let mut properties = HashMap::new();
    properties.insert("name".to_string(), JsonSchema::string());
    properties.insert(
        "amount".to_string(),
        JsonSchema::string().described("Estimated amount as a quantity string, e.g. '150mg'."),
    );
    JsonSchema::array(JsonSchema::object(properties, &["name", "amount"]))
}

fn get_nutritional_info_schema() -> JsonSchemaDefinition {
    let mut macros_properties = HashMap::new();
    macros_properties.insert("calories".to_string(), JsonSchema::number());
    macros_properties.insert("protein".to_string(), JsonSchema::number());
    macros_properties.insert("carbohydrates".to_string(), JsonSchema::number());
    macros_properties.insert("fat".to_string(), JsonSchema::number());

    let mut properties = HashMap::new();
    properties.insert(
        "foodItems".to_string(),
        JsonSchema::array(JsonSchema::string()),
    );
    properties.insert(
        "macros".to_string(),
        JsonSchema::object(
            macros_properties,
            &["calories", "protein", "carbohydrates", "fat"],
        ),
    );
    properties.insert("vitamins".to_string(), micronutrient_list_schema());
    properties.insert("minerals".to_string(), micronutrient_list_schema());
    properties.insert("summary".to_string(), JsonSchema::string());

    JsonSchemaDefinition {
        name: "nutritional_info_schema".to_string(),
        strict: Some(true),
        schema: JsonSchema::object(
            properties,
            &["foodItems", "macros", "vitamins", "minerals", "summary"],
        ),
    }
}

/// Analyzes a meal photo and returns its estimated nutritional breakdown.
///
/// On success the result is also appended to the history store, together with
/// the submitted image re-encoded as a data URI. On any failure the store is
/// left untouched. One attempt only; resubmission is the caller's call.
pub async fn analyze_meal(
    provider: &Provider,
    history: &HistoryStore,
    image_bytes: &[u8],
    mime_type: &str,
) -> Result<NutritionalInfo, GatewayError> {
    if image_bytes.is_empty() {
        return Err(GatewayError::InvalidInput(
            "Please select an image first.".to_string(),
        ));
    }
    if !RECOGNIZED_IMAGE_MIME_TYPES.contains(&mime_type) {
        return Err(GatewayError::InvalidInput(format!(
            "Unsupported image type: {}",
            mime_type
        )));
    }

    let image_data_url = format!(
        "data:{};base64,{}",
        mime_type,
        general_purpose::STANDARD.encode(image_bytes)
    );

    let instruction = "Analyze the nutritional content of the meal in this image. \
Identify all food items, estimate the total macronutrients in grams (protein, carbohydrates, fat) \
and total calories. Also list the most significant vitamins and minerals with their estimated \
amounts (e.g., '150mg'). Provide a brief, encouraging summary of the meal's healthiness. \
Ensure your response strictly follows the provided JSON schema.";

    let request = ChatCompletionRequest {
        model: DEFAULT_MODEL.to_string(),
        messages: vec![ChatMessage {
            role: "user".to_string(),
            content: MessageContent::Parts(vec![
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image_data_url.clone(),
                    },
                },
                ContentPart::Text {
                    text: instruction.to_string(),
                },
            ]),
        }],
        response_format: Some(ResponseFormat::json_schema(get_nutritional_info_schema())),
        temperature: Some(0.2),
        max_tokens: Some(2048),
    };

    let response = provider.call_chat_completion(request).await.map_err(|e| {
        eprintln!("Error analyzing meal image: {}", e);
        GatewayError::AnalysisFailed(e)
    })?;

    let content = extract_json_content(&response)?;
    let analysis: NutritionalInfo = serde_json::from_str(&content).map_err(|e| {
        eprintln!("Meal analysis payload failed schema validation: {}", e);
        GatewayError::MalformedResponse(e.to_string())
    })?;
    analysis.validate()?;

    let (id, timestamp) = history.stamp("meal");
    history.append(HistoryEntry::Meal(MealHistoryItem {
        id,
        timestamp,
        image_data_url,
        nutritional_info: analysis.clone(),
    }));

    Ok(analysis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_image_is_rejected_locally() {
        let provider = Provider::openrouter("KEY_THAT_MUST_NOT_MATTER");
        let history = HistoryStore::new();
        let result = analyze_meal(&provider, &history, &[], "image/jpeg").await;
        assert!(matches!(result, Err(GatewayError::InvalidInput(_))));
        assert!(history.list().meals.is_empty());
    }

    #[tokio::test]
    async fn test_unrecognized_mime_is_rejected_locally() {
        let provider = Provider::openrouter("KEY_THAT_MUST_NOT_MATTER");
        let history = HistoryStore::new();
        let result = analyze_meal(&provider, &history, &[1, 2, 3], "application/pdf").await;
        assert!(matches!(result, Err(GatewayError::InvalidInput(_))));
        assert!(history.list().meals.is_empty());
    }

    #[test]
    fn test_schema_requires_all_five_top_level_fields() {
        let definition = get_nutritional_info_schema();
        let mut required = definition.schema.required.clone().unwrap();
        required.sort();
        assert_eq!(
            required,
            vec!["foodItems", "macros", "minerals", "summary", "vitamins"]
        );
        assert_eq!(definition.strict, Some(true));
    }

    #[test]
    fn test_payload_with_empty_arrays_decodes() {
        let payload = r#"{
            "foodItems": [],
            "macros": {"calories": 0, "protein": 0, "carbohydrates": 0, "fat": 0},
            "vitamins": [],
            "minerals": [],
            "summary": "Nothing recognizable on the plate."
        }"#;
        let info: NutritionalInfo = serde_json::from_str(payload).unwrap();
        assert!(info.food_items.is_empty());
        assert!(info.validate().is_ok());
    }

    #[test]
    fn test_payload_missing_field_is_rejected() {
        // No "summary" key: serde must refuse the document outright.
        let payload = r#"{
            "foodItems": ["Apple"],
            "macros": {"calories": 95, "protein": 0.5, "carbohydrates": 25, "fat": 0.3},
            "vitamins": [],
            "minerals": []
        }"#;
        assert!(serde_json::from_str::<NutritionalInfo>(payload).is_err());
    }

    #[test]
    fn test_negative_macro_is_rejected() {
        let payload = r#"{
            "foodItems": ["Apple"],
            "macros": {"calories": -95, "protein": 0.5, "carbohydrates": 25, "fat": 0.3},
            "vitamins": [],
            "minerals": [],
            "summary": "A healthy snack."
        }"#;
        let info: NutritionalInfo = serde_json::from_str(payload).unwrap();
        assert!(matches!(
            info.validate(),
            Err(GatewayError::MalformedResponse(_))
        ));
    }
}
