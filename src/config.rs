//! Configuration module for chathub.

use serde::Deserialize;
use std::path::Path;

use crate::{ChatHubError, Result};

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origins. Empty means allow any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Whether to serve static files.
    #[serde(default)]
    pub serve_static: bool,
    /// Path to static files directory.
    #[serde(default = "default_static_path")]
    pub static_path: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_static_path() -> String {
    "static".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
            serve_static: false,
            static_path: default_static_path(),
        }
    }
}

/// Chat engine limits.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Maximum number of members per room.
    #[serde(default = "default_max_clients_per_room")]
    pub max_clients_per_room: usize,
    /// Maximum message content length in bytes.
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,
    /// Number of recent messages replayed to a newly admitted client.
    #[serde(default = "default_history_replay_limit")]
    pub history_replay_limit: usize,
}

fn default_max_clients_per_room() -> usize {
    50
}

fn default_max_message_length() -> usize {
    1000
}

fn default_history_replay_limit() -> usize {
    50
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_clients_per_room: default_max_clients_per_room(),
            max_message_length: default_max_message_length(),
            history_replay_limit: default_history_replay_limit(),
        }
    }
}

/// Assistant configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AssistantConfig {
    /// API key. Empty means the assistant is unavailable.
    #[serde(default)]
    pub api_key: String,
    /// Base URL of the OpenAI-compatible API.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// Timeout for one generation call, in seconds.
    #[serde(default = "default_assistant_timeout")]
    pub timeout_secs: u64,
    /// Number of recent messages gathered as conversational context.
    #[serde(default = "default_context_limit")]
    pub context_limit: usize,
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_assistant_timeout() -> u64 {
    30
}

fn default_context_limit() -> usize {
    10
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: default_api_base(),
            model: default_model(),
            timeout_secs: default_assistant_timeout(),
            context_limit: default_context_limit(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/chathub.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Chat engine limits.
    #[serde(default)]
    pub chat: ChatConfig,
    /// Assistant configuration.
    #[serde(default)]
    pub assistant: AssistantConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ChatHubError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| ChatHubError::Validation(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `CHATHUB_OPENAI_API_KEY` (preferred) or `OPENAI_API_KEY`: assistant API key
    /// - `CHATHUB_OPENAI_MODEL`: assistant model
    pub fn apply_env_overrides(&mut self) {
        for key in ["CHATHUB_OPENAI_API_KEY", "OPENAI_API_KEY"] {
            if let Ok(api_key) = std::env::var(key) {
                if !api_key.is_empty() {
                    self.assistant.api_key = api_key;
                    break;
                }
            }
        }
        if let Ok(model) = std::env::var("CHATHUB_OPENAI_MODEL") {
            if !model.is_empty() {
                self.assistant.model = model;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.chat.max_clients_per_room == 0 {
            return Err(ChatHubError::Validation(
                "chat.max_clients_per_room must be at least 1".to_string(),
            ));
        }
        if self.chat.max_message_length == 0 {
            return Err(ChatHubError::Validation(
                "chat.max_message_length must be at least 1".to_string(),
            ));
        }
        if self.assistant.timeout_secs == 0 {
            return Err(ChatHubError::Validation(
                "assistant.timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
