//! KOLScope AI: chat completion client and generative profile fallback.

pub mod client;
pub mod error;
pub mod extract;
pub mod generator;
pub mod prompt;

pub use client::{ChatMessage, CompletionClient, CompletionRequest, OpenAiChatClient};
pub use error::{AiError, Result};
pub use extract::{extract_json_object, parse_object_reply};
pub use generator::{GenerationSettings, ProfileGenerator};
