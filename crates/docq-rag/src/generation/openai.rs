//! OpenAI compatible chat completions client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::GenerationConfig;
use crate::error::{Error, Result};

use super::prompt::PromptBuilder;
use super::AnswerGenerator;

/// Client for the `/chat/completions` endpoint. Generation requests are not
/// retried; the caller sees the failure and asks again if they want to.
pub struct OpenAiGenerator {
    client: Client,
    config: GenerationConfig,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

impl ChatMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

impl OpenAiGenerator {
    /// The generator shares the embedding credential; both talk to the same
    /// account.
    pub fn new(config: GenerationConfig, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                Error::configuration("no generation credential configured, set OPENAI_API_KEY")
            })
    }

    /// System prompt, then the prior turns verbatim, then the grounded
    /// question as the final user message.
    fn build_messages(
        &self,
        question: &str,
        context: &str,
        history: &[(String, String)],
    ) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::new("system", PromptBuilder::system_prompt())];
        for (user, assistant) in history {
            messages.push(ChatMessage::new("user", user.clone()));
            messages.push(ChatMessage::new("assistant", assistant.clone()));
        }
        messages.push(ChatMessage::new(
            "user",
            PromptBuilder::build_qa_prompt(question, context),
        ));
        messages
    }
}

#[async_trait]
impl AnswerGenerator for OpenAiGenerator {
    async fn generate(
        &self,
        question: &str,
        context: &str,
        history: &[(String, String)],
    ) -> Result<String> {
        let key = self.api_key()?;
        let messages = self.build_messages(question, context, history);
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages: &messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let url = format!("{}/chat/completions", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::generation(format!("generation request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::generation(format!(
                "generation service returned HTTP {status}: {body}"
            )));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::generation(format!("unreadable generation response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| Error::generation("generation service returned no choices"))
    }

    fn name(&self) -> &str {
        &self.config.model
    }
}
