pub mod connection;
pub mod endpoints;

pub use connection::{ApiConnectionError, OPENROUTER_BASE_URL};
pub use endpoints::{ChatCompletionRequest, ChatMessage, Provider, DEFAULT_MODEL};
