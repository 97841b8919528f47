//! Automated assistant integration.
//!
//! The hub consumes the assistant through the [`ResponseGenerator`] trait;
//! [`OpenAiClient`] is the production implementation over an OpenAI-compatible
//! chat-completion API.

mod openai;

pub use openai::OpenAiClient;

use async_trait::async_trait;
use thiserror::Error;

/// Error from the response-generation capability.
#[derive(Error, Debug)]
pub enum GenerationError {
    /// The HTTP request failed.
    #[error("request failed: {0}")]
    Request(String),

    /// The API returned a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the API, if any.
        message: String,
    },

    /// The API returned no usable completion.
    #[error("no response generated")]
    EmptyResponse,
}

/// A capability that turns conversational context plus a new message into a
/// reply. Implementations must be safe to call from detached tasks.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// Generate a reply from the recent conversation and the new message.
    async fn generate(
        &self,
        context: &[String],
        new_message: &str,
    ) -> Result<String, GenerationError>;
}
