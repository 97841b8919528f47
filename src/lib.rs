//! chathub - real-time group chat hub
//!
//! Clients join named rooms over WebSocket connections and receive every
//! message broadcast to the room in arrival order, optionally augmented by an
//! automated GPT assistant participant.

pub mod assistant;
pub mod chat;
pub mod config;
pub mod error;
pub mod logging;
pub mod web;

pub use assistant::{GenerationError, OpenAiClient, ResponseGenerator};
pub use chat::{ChatRequest, ClientSession, Hub, HubStats, Message, MessageKind, Room};
pub use config::Config;
pub use error::{ChatHubError, Result};
