use std::sync::Arc;
use std::time::Duration;

use kolscope_core::GeneratedProfile;
use kolscope_core::config::AiConfig;
use tracing::{debug, warn};

use crate::client::{ChatMessage, CompletionClient, CompletionRequest, OpenAiChatClient};
use crate::error::Result;
use crate::extract::parse_object_reply;
use crate::prompt::build_profile_prompt;

/// Fixed decoding parameters for profile generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub model: String,
    pub system_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
}

impl From<&AiConfig> for GenerationSettings {
    fn from(config: &AiConfig) -> Self {
        Self {
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            top_p: config.top_p,
        }
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self::from(&AiConfig::default())
    }
}

/// Generative fallback: one completion per subject, never raises.
#[derive(Clone)]
pub struct ProfileGenerator {
    client: Arc<dyn CompletionClient>,
    settings: GenerationSettings,
}

impl ProfileGenerator {
    pub fn new(client: Arc<dyn CompletionClient>, settings: GenerationSettings) -> Self {
        Self { client, settings }
    }

    /// Generator backed by the configured OpenAI-compatible endpoint.
    pub fn from_config(config: &AiConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = OpenAiChatClient::new(
            api_key,
            &config.base_url,
            Duration::from_secs(config.timeout_secs),
        )?;
        Ok(Self::new(Arc::new(client), GenerationSettings::from(config)))
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    fn request_for(&self, prompt: String) -> CompletionRequest {
        CompletionRequest {
            model: self.settings.model.clone(),
            messages: vec![
                ChatMessage::system(self.settings.system_prompt.clone()),
                ChatMessage::user(prompt),
            ],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            top_p: self.settings.top_p,
        }
    }

    /// Ask the completion service for a profile.
    ///
    /// Transport failures, missing braces and undecodable JSON all come back
    /// as a profile holding only `error`.
    pub async fn generate(
        &self,
        subject: &str,
        known_affiliation: &str,
        known_locations: &[String],
        known_collaborators: &[String],
    ) -> GeneratedProfile {
        let prompt = build_profile_prompt(
            subject,
            known_affiliation,
            known_locations,
            known_collaborators,
        );
        let request = self.request_for(prompt);

        let reply = match self.client.complete(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(subject = %subject, error = %e, "profile completion failed");
                return GeneratedProfile::failed(e.to_string());
            }
        };

        match parse_object_reply(&reply) {
            Ok(fields) => {
                debug!(subject = %subject, fields = fields.len(), "profile generated");
                GeneratedProfile::from_fields(fields)
            }
            Err(e) => {
                warn!(subject = %subject, error = %e, "unusable profile reply");
                GeneratedProfile::failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AiError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedClient {
        reply: std::result::Result<String, String>,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedClient {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing(body: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(body.to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn complete(&self, request: &CompletionRequest) -> Result<String> {
            self.seen.lock().unwrap().push(request.clone());
            match &self.reply {
                Ok(reply) => Ok(reply.clone()),
                Err(body) => Err(AiError::Api {
                    status: 503,
                    body: body.clone(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn generate_parses_fenced_reply() {
        let client = ScriptedClient::replying(
            "Sure!\n```json\n{\"full_name\": \"Dr. Jane Roe\", \"primary_affiliation\": \"UCSF\"}\n```",
        );
        let generator = ProfileGenerator::new(client.clone(), GenerationSettings::default());

        let profile = generator
            .generate("Jane Roe", "UCSF", &[], &["John Doe".to_string()])
            .await;

        assert!(!profile.is_failed());
        assert_eq!(profile.get_str("full_name"), Some("Dr. Jane Roe"));
        assert_eq!(profile.affiliation().as_deref(), Some("UCSF"));

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let request = &seen[0];
        assert_eq!(request.model, "gpt-4o");
        assert_eq!(request.max_tokens, 4000);
        assert_eq!(request.messages[0].role, "system");
        assert!(request.messages[1].content.contains("Dr. Jane Roe"));
    }

    #[tokio::test]
    async fn transport_failure_becomes_error_field() {
        let client = ScriptedClient::failing("overloaded");
        let generator = ProfileGenerator::new(client.clone(), GenerationSettings::default());

        let profile = generator.generate("Jane Roe", "UCSF", &[], &[]).await;
        assert!(profile.is_failed());
        assert!(profile.error().unwrap().contains("overloaded"));
        assert_eq!(profile.fields().len(), 1);
        assert_eq!(client.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unbalanced_reply_becomes_error_field() {
        let client = ScriptedClient::replying("{\"full_name\": {\"x\": 1}");
        let generator = ProfileGenerator::new(client, GenerationSettings::default());

        let profile = generator.generate("Jane Roe", "UCSF", &[], &[]).await;
        assert!(profile.is_failed());
    }

    #[tokio::test]
    async fn reply_without_braces_becomes_error_field() {
        let client = ScriptedClient::replying("I have no information about this person.");
        let generator = ProfileGenerator::new(client, GenerationSettings::default());

        let profile = generator.generate("Jane Roe", "UCSF", &[], &[]).await;
        assert_eq!(profile.error(), Some("no JSON object boundaries in reply"));
    }
}
