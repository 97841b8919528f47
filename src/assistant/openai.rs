//! OpenAI-compatible chat-completion client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{GenerationError, ResponseGenerator};

/// Connect timeout in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Total request timeout in seconds. The hub enforces its own deadline on top
/// of this.
const TOTAL_TIMEOUT_SECS: u64 = 60;

/// System prompt framing the assistant as a group-chat participant.
const SYSTEM_PROMPT: &str = "You are a helpful AI assistant in a group chat. \
    Keep your responses concise, friendly, and relevant to the conversation. \
    You can see the recent conversation history to provide context-aware responses.";

/// Number of context messages to include in the prompt.
const HISTORY_LIMIT: usize = 10;

/// Maximum completion tokens requested per reply.
const MAX_TOKENS: u32 = 150;

/// Sampling temperature.
const TEMPERATURE: f32 = 0.7;

/// Fallback reply when the API produces a blank completion.
const BLANK_REPLY_FALLBACK: &str = "I'm here to help! What would you like to discuss?";

/// Chat-completion API client.
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatTurn<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatTurn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

impl OpenAiClient {
    /// Create a new client.
    ///
    /// Returns None when the API key is empty, in which case the assistant is
    /// simply unavailable.
    pub fn new(
        api_key: impl Into<String>,
        api_base: impl Into<String>,
        model: impl Into<String>,
    ) -> Option<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return None;
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(TOTAL_TIMEOUT_SECS))
            .build()
            .ok()?;

        Some(Self {
            client,
            api_key,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    /// Build the prompt: system framing, at most the last [`HISTORY_LIMIT`]
    /// context entries, then the new message.
    fn build_turns<'a>(context: &'a [String], new_message: &'a str) -> Vec<ChatTurn<'a>> {
        let mut turns = vec![ChatTurn {
            role: "system",
            content: SYSTEM_PROMPT,
        }];

        let start = context.len().saturating_sub(HISTORY_LIMIT);
        for entry in &context[start..] {
            turns.push(ChatTurn {
                role: "user",
                content: entry,
            });
        }

        turns.push(ChatTurn {
            role: "user",
            content: new_message,
        });
        turns
    }
}

#[async_trait]
impl ResponseGenerator for OpenAiClient {
    async fn generate(
        &self,
        context: &[String],
        new_message: &str,
    ) -> Result<String, GenerationError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: Self::build_turns(context, new_message),
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        debug!(model = %self.model, turns = request.messages.len(), "requesting completion");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        let reply = body
            .choices
            .into_iter()
            .next()
            .ok_or(GenerationError::EmptyResponse)?
            .message
            .content
            .trim()
            .to_string();

        if reply.is_empty() {
            return Ok(BLANK_REPLY_FALLBACK.to_string());
        }
        Ok(reply)
    }
}
