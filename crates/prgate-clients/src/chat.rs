//! OpenAI-compatible chat-completions model.

use async_trait::async_trait;
use prgate_core::{CollaboratorError, CollaboratorResult, ReviewModel};
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::{check_status, decode_error, transport, ClientError};
use crate::USER_AGENT;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const SYSTEM_PROMPT: &str =
    "You are a meticulous senior code reviewer. Reply with a single JSON object only.";

/// Connection settings for [`ChatCompletionsModel`].
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl ChatConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct Completion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

/// [`ReviewModel`] that posts to `{base_url}/chat/completions`.
#[derive(Clone)]
pub struct ChatCompletionsModel {
    config: ChatConfig,
    http: reqwest::Client,
}

impl std::fmt::Debug for ChatCompletionsModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsModel")
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.model)
            .finish_non_exhaustive()
    }
}

impl ChatCompletionsModel {
    pub fn new(config: ChatConfig) -> Result<Self, ClientError> {
        if config.api_key.trim().is_empty() {
            return Err(ClientError::Missing("model API key"));
        }
        if config.model.trim().is_empty() {
            return Err(ClientError::Missing("model name"));
        }
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { config, http })
    }
}

#[async_trait]
impl ReviewModel for ChatCompletionsModel {
    fn model_id(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, prompt: &str) -> CollaboratorResult<String> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let body = json!({
            "model": self.config.model,
            "temperature": 0,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
        });
        let response = self
            .http
            .post(url)
            .header(AUTHORIZATION, format!("Bearer {}", self.config.api_key))
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        let response = check_status(response).await?;
        let status = response.status().as_u16();
        let completion: Completion = response
            .json()
            .await
            .map_err(|e| decode_error("chat completion", e))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| CollaboratorError::Http {
                status,
                body: "completion has no message content".to_string(),
            })?;
        debug!(model = %self.config.model, reply_chars = content.len(), "Model replied");
        Ok(content)
    }
}
