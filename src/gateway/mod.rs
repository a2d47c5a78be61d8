pub mod meal_analysis;
pub mod plan_generation;

use std::error::Error;
use std::fmt;

use crate::api_connection::connection::ApiConnectionError;

pub use meal_analysis::analyze_meal;
pub use plan_generation::generate_plan;

/// Stable user-facing message for a failed analysis. Transport details stay
/// in the operator log.
pub const ANALYSIS_FAILED_MESSAGE: &str =
    "Failed to analyze meal. The AI model may be temporarily unavailable or the API key may be invalid.";
pub const PLAN_FAILED_MESSAGE: &str =
    "Failed to generate a plan. The AI model may be temporarily unavailable or the API key may be invalid.";

#[derive(Debug)]
pub enum GatewayError {
    /// Required input missing or unusable. Raised locally, before any network
    /// activity; the backend is never contacted and history is untouched.
    InvalidInput(String),
    /// The backend replied, but the payload does not honor the declared
    /// output schema. Never applied partially to history.
    MalformedResponse(String),
    /// Transport failure, backend unavailability, or invalid credentials
    /// while analyzing a meal.
    AnalysisFailed(ApiConnectionError),
    /// Same failure class, raised while generating a plan.
    PlanFailed(ApiConnectionError),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::InvalidInput(message) => write!(f, "{}", message),
            GatewayError::MalformedResponse(detail) => {
                write!(f, "The AI response did not match the expected format: {}", detail)
            }
            GatewayError::AnalysisFailed(_) => write!(f, "{}", ANALYSIS_FAILED_MESSAGE),
            GatewayError::PlanFailed(_) => write!(f, "{}", PLAN_FAILED_MESSAGE),
        }
    }
}

impl Error for GatewayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            GatewayError::AnalysisFailed(err) | GatewayError::PlanFailed(err) => Some(err),
            _ => None,
        }
    }
}

/// Pulls the model's text out of the first choice and strips the markdown
/// code fences some models wrap around JSON despite the schema contract.
pub(crate) fn extract_json_content(
    response: &crate::api_connection::endpoints::ChatCompletionResponse,
) -> Result<String, GatewayError> {
    let choice = response.choices.first().ok_or_else(|| {
        GatewayError::MalformedResponse("no response choices received".to_string())
    })?;

    let mut content = choice.message.content.trim().to_string();
    if content.starts_with("```json") && content.ends_with("```") {
        content = content
            .trim_start_matches("```json")
            .trim_end_matches("```")
            .trim()
            .to_string();
    } else if content.starts_with("```") && content.ends_with("```") {
        content = content
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim()
            .to_string();
    }

    if content.is_empty() {
        return Err(GatewayError::MalformedResponse(
            "response content is empty".to_string(),
        ));
    }
    Ok(content)
}
