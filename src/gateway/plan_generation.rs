use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::api_connection::endpoints::{
    ChatCompletionRequest, ChatMessage, JsonSchema, JsonSchemaDefinition, Provider, ResponseFormat,
    DEFAULT_MODEL,
};
use crate::gateway::{extract_json_content, GatewayError};
use crate::history::{HistoryEntry, HistoryStore, PlanHistoryItem};

/// Canonical weekday keys, in display order. Plan responses must carry
/// exactly these keys, spelling- and case-exact, in both maps.
pub const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            _ => Err(format!("unknown gender '{}' (expected male, female or other)", s)),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
    VeryActive,
}

impl ActivityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityLevel::Sedentary => "sedentary",
            ActivityLevel::Light => "light",
            ActivityLevel::Moderate => "moderate",
            ActivityLevel::Active => "active",
            ActivityLevel::VeryActive => "very_active",
        }
    }
}

impl FromStr for ActivityLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sedentary" => Ok(ActivityLevel::Sedentary),
            "light" => Ok(ActivityLevel::Light),
            "moderate" => Ok(ActivityLevel::Moderate),
            "active" => Ok(ActivityLevel::Active),
            "very_active" => Ok(ActivityLevel::VeryActive),
            _ => Err(format!(
                "unknown activity level '{}' (expected sedentary, light, moderate, active or very_active)",
                s
            )),
        }
    }
}

impl fmt::Display for ActivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the user tells the coach about themselves. Height, weight and age are
/// free-form strings (unit left to the user, e.g. "180cm" or "5ft 11in") and
/// are not numerically validated at this layer.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserMetrics {
    pub height: String,
    pub weight: String,
    pub age: String,
    pub gender: Option<Gender>,
    pub activity_level: Option<ActivityLevel>,
}

impl UserMetrics {
    fn is_complete(&self) -> bool {
        !self.height.trim().is_empty()
            && !self.weight.trim().is_empty()
            && !self.age.trim().is_empty()
            && self.gender.is_some()
            && self.activity_level.is_some()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Meal {
    pub breakfast: String,
    pub lunch: String,
    pub dinner: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snacks: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersonalizedPlan {
    pub summary: String,
    pub meal_plan: HashMap<String, Meal>,
    pub workout_plan: HashMap<String, String>,
}

impl PersonalizedPlan {
    /// Both plan maps must contain exactly the seven canonical weekday keys.
    fn validate(&self) -> Result<(), GatewayError> {
        check_weekday_keys("mealPlan", self.meal_plan.keys())?;
        check_weekday_keys("workoutPlan", self.workout_plan.keys())?;
        Ok(())
    }
}

fn check_weekday_keys<'a>(
    map_name: &str,
    keys: impl Iterator<Item = &'a String> + Clone,
) -> Result<(), GatewayError> {
    for day in WEEKDAYS {
        if !keys.clone().any(|k| k == day) {
            return Err(GatewayError::MalformedResponse(format!(
                "{} is missing the '{}' key",
                map_name, day
            )));
        }
    }
    if let Some(stray) = keys.clone().find(|k| !WEEKDAYS.contains(&k.as_str())) {
        return Err(GatewayError::MalformedResponse(format!(
            "{} contains an unexpected key '{}'",
            map_name, stray
        )));
    }
    Ok(())
}

fn get_plan_schema() -> JsonSchemaDefinition {
    let mut meal_properties = HashMap::new();
    meal_properties.insert("breakfast".to_string(), JsonSchema::string());
    meal_properties.insert("lunch".to_string(), JsonSchema::string());
    meal_properties.insert("dinner".to_string(), JsonSchema::string());
    meal_properties.insert("snacks".to_string(), JsonSchema::string());
    let meal_schema = JsonSchema::object(meal_properties, &["breakfast", "lunch", "dinner"]);

    let mut meal_plan_properties = HashMap::new();
    let mut workout_plan_properties = HashMap::new();
    for day in WEEKDAYS {
        meal_plan_properties.insert(day.to_string(), meal_schema.clone());
        workout_plan_properties.insert(
            day.to_string(),
            JsonSchema::string().described("Workout for the day, or a rest-day note."),
        );
    }

    let mut properties = HashMap::new();
    properties.insert("summary".to_string(), JsonSchema::string());
    properties.insert(
        "mealPlan".to_string(),
        JsonSchema::object(meal_plan_properties, &WEEKDAYS),
    );
    properties.insert(
        "workoutPlan".to_string(),
        JsonSchema::object(workout_plan_properties, &WEEKDAYS),
    );

    JsonSchemaDefinition {
        name: "personalized_plan_schema".to_string(),
        strict: Some(true),
        schema: JsonSchema::object(properties, &["summary", "mealPlan", "workoutPlan"]),
    }
}

fn build_plan_prompt(metrics: &UserMetrics, goal: &str) -> String {
    // gender/activity presence is checked before this is called
    let gender = metrics.gender.map(|g| g.as_str()).unwrap_or("unspecified");
    let activity = metrics
        .activity_level
        .map(|a| a.as_str())
        .unwrap_or("unspecified");
    format!(
        "As an expert AI nutritionist and personal trainer, create a personalized plan for a user with the following details:
- Metrics: Height {}, Weight {}, Age {}, Gender {}, Activity Level: {}.
- Primary Goal: \"{}\"

Generate a comprehensive 7-day meal plan (Monday to Sunday) and a 7-day workout plan (Monday to Sunday).
- The meal plan should include breakfast, lunch, dinner, and optional snacks for each day. Meals should be healthy and align with the user's goal.
- The workout plan should be a mix of activities suitable for their goal and activity level. Include rest days.
- Provide a brief, motivational summary of the overall plan.
- Ensure your response strictly follows the provided JSON schema.",
        metrics.height, metrics.weight, metrics.age, gender, activity, goal
    )
}

/// Generates a 7-day meal and workout plan tailored to the user's metrics and
/// goal. The goal is embedded verbatim and may be written in any language.
///
/// Incomplete metrics or an empty goal are rejected locally: the backend is
/// never contacted and no history entry is created. On success the plan is
/// appended to the history store along with the inputs that produced it.
pub async fn generate_plan(
    provider: &Provider,
    history: &HistoryStore,
    metrics: &UserMetrics,
    goal: &str,
) -> Result<PersonalizedPlan, GatewayError> {
    if !metrics.is_complete() || goal.trim().is_empty() {
        return Err(GatewayError::InvalidInput(
            "Please fill in all fields before generating a plan.".to_string(),
        ));
    }

    let request = ChatCompletionRequest {
        model: DEFAULT_MODEL.to_string(),
        messages: vec![ChatMessage::text("user", build_plan_prompt(metrics, goal))],
        response_format: Some(ResponseFormat::json_schema(get_plan_schema())),
        temperature: Some(0.4),
        max_tokens: Some(4096),
    };

    let response = provider.call_chat_completion(request).await.map_err(|e| {
        eprintln!("Error generating personalized plan: {}", e);
        GatewayError::PlanFailed(e)
    })?;

    let content = extract_json_content(&response)?;
    let plan: PersonalizedPlan = serde_json::from_str(&content).map_err(|e| {
        eprintln!("Plan payload failed schema validation: {}", e);
        GatewayError::MalformedResponse(e.to_string())
    })?;
    plan.validate()?;

    let (id, timestamp) = history.stamp("plan");
    history.append(HistoryEntry::Plan(PlanHistoryItem {
        id,
        timestamp,
        metrics: metrics.clone(),
        goal: goal.to_string(),
        plan: plan.clone(),
    }));

    Ok(plan)
}
