//! Gemini integration through its OpenAI-compatible endpoint.

use std::{sync::Arc, time::Duration};

use anyhow::anyhow;
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
};
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use tracing::{debug, instrument};

use crate::base::{config::Config, types::Res};

use super::{GenericLlmClient, LlmClient};

// Extra methods on `LlmClient` applied by the gemini implementation.

impl LlmClient {
    pub fn gemini(config: &Config) -> Self {
        let client = GeminiLlmClient::new(config);
        Self { inner: Arc::new(client) }
    }
}

// Specific implementations.

/// Gemini LLM client implementation.
#[derive(Clone)]
pub struct GeminiLlmClient {
    client: Client<OpenAIConfig>,
}

impl GeminiLlmClient {
    /// Create a new Gemini LLM client.
    #[instrument(name = "GeminiLlmClient::new", skip_all)]
    pub fn new(config: &Config) -> Self {
        let cfg = OpenAIConfig::new()
            .with_api_key(config.gemini_api_key.clone().unwrap_or_default())
            .with_api_base(&config.gemini_api_base);

        // Each request is sent once; failures go straight back to the caller.
        let no_retries = ExponentialBackoffBuilder::new().with_max_elapsed_time(Some(Duration::ZERO)).build();

        Self {
            client: Client::with_config(cfg).with_backoff(no_retries),
        }
    }
}

#[async_trait]
impl GenericLlmClient for GeminiLlmClient {
    #[instrument(name = "GeminiLlmClient::generate_content", skip(self, prompt))]
    async fn generate_content(&self, model: &str, prompt: &str) -> Res<String> {
        let message = ChatCompletionRequestUserMessageArgs::default().content(prompt).build()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(vec![ChatCompletionRequestMessage::from(message)])
            .build()?;

        let response = self.client.chat().create(request).await?;

        debug!("Gemini returned {} choices.", response.choices.len());

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("Gemini returned no text."))
    }
}

// Tests.
