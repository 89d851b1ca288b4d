use anyhow::{anyhow, Result};
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, ResponseFormat,
    },
    Client,
};
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub api_base: Option<String>,
    pub model: String,
    pub max_tokens: u16,
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: None,
            model: "gpt-4o-mini".to_string(),
            max_tokens: 1024,
            temperature: 0.1,
        }
    }
}

/// Shared by every LLM-backed stage; one instance per service.
pub struct LlmClient {
    client: Client<OpenAIConfig>,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            anyhow::bail!("LLM API key is empty");
        }

        let mut openai_config = OpenAIConfig::new().with_api_key(&config.api_key);
        if let Some(ref base) = config.api_base {
            openai_config = openai_config.with_api_base(base);
        }

        Ok(Self {
            client: Client::with_config(openai_config),
            config,
        })
    }

    /// Sends one system + user exchange and parses the reply as a JSON object.
    pub async fn complete_json(&self, system: &str, user: &str) -> Result<Value> {
        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system)
                    .build()?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user)
                    .build()?,
            ),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.config.model)
            .messages(messages)
            .max_tokens(self.config.max_tokens)
            .temperature(self.config.temperature)
            .response_format(ResponseFormat::JsonObject)
            .build()?;

        let response = self.client.chat().create(request).await?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| anyhow!("No response content from LLM"))?;

        parse_json_reply(&content)
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

/// Accepts a bare object or one wrapped in a markdown code fence.
pub(crate) fn parse_json_reply(content: &str) -> Result<Value> {
    let trimmed = content.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    let value: Value = serde_json::from_str(body)
        .map_err(|e| anyhow!("Failed to parse LLM output: {} - raw: {}", e, content))?;

    if !value.is_object() {
        anyhow::bail!("LLM output is not a JSON object: {}", content);
    }
    Ok(value)
}
