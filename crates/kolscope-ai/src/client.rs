//! Chat completion client.
//!
//! Speaks the OpenAI-compatible `/chat/completions` protocol, which the Azure
//! model inference endpoint and most hosted gateways accept.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use crate::error::{AiError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// One-shot text completion. Implementations make a single attempt.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

pub struct OpenAiChatClient {
    client: Client,
    api_key: String,
    api_base_url: String,
}

impl OpenAiChatClient {
    pub fn new(api_key: impl Into<String>, api_base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent("kolscope/0.1")
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl CompletionClient for OpenAiChatClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.api_base_url);
        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Api { status, body });
        }

        let chat: ChatResponse = response.json().await?;
        chat.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(AiError::EmptyReply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "gpt-4o".to_string(),
            messages: vec![ChatMessage::system("sys"), ChatMessage::user("hi")],
            temperature: 1.0,
            max_tokens: 4000,
            top_p: 1.0,
        }
    }

    #[tokio::test]
    async fn complete_returns_first_choice_content() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .match_body(Matcher::PartialJson(json!({
                "model": "gpt-4o",
                "max_tokens": 4000
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "choices": [{"message": {"role": "assistant", "content": "{\"a\": 1}"}}]
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let client = OpenAiChatClient::new("test-key", &server.url(), Duration::from_secs(5)).unwrap();
        let reply = client.complete(&request()).await.unwrap();
        assert_eq!(reply, "{\"a\": 1}");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn complete_surfaces_api_errors() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body("unauthorized")
            .create_async()
            .await;

        let client = OpenAiChatClient::new("bad", &server.url(), Duration::from_secs(5)).unwrap();
        let err = client.complete(&request()).await.unwrap_err();
        assert!(matches!(err, AiError::Api { status: 401, .. }));
    }

    #[tokio::test]
    async fn complete_without_choices_is_empty_reply() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"choices": []}).to_string())
            .create_async()
            .await;

        let client = OpenAiChatClient::new("k", &server.url(), Duration::from_secs(5)).unwrap();
        let err = client.complete(&request()).await.unwrap_err();
        assert!(matches!(err, AiError::EmptyReply));
    }
}
