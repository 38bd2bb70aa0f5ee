use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
        ResponseFormat as OpenAiResponseFormat,
    },
    Client,
};
use std::time::Instant;
use tokio::runtime::Runtime;

use crate::error::Result;
use crate::types::{ChatCompletion, CompletionRequest, LlmConfig, ResponseFormat, Usage};

/// The LLM text-completion collaborator: prompt in, text out
pub trait LlmClient: Send + Sync {
    /// Model used when a request doesn't name one
    fn model(&self) -> &str;

    /// Run a single completion
    fn complete(&self, request: &CompletionRequest) -> Result<ChatCompletion>;
}

/// OpenAI (or OpenAI-compatible) chat completions client
///
/// Owns its own tokio runtime and exposes a blocking API. Construct it outside
/// of an async context, e.g. inside `spawn_blocking`.
pub struct OpenAiClient {
    config: LlmConfig,
    client: Client<OpenAIConfig>,
    runtime: Runtime,
}

impl OpenAiClient {
    /// Create a client from config
    ///
    /// Resolves the API key up front so a missing credential surfaces before
    /// any prompt is sent.
    pub fn new(config: LlmConfig) -> Result<Self> {
        let api_key = config.resolve_api_key()?;
        let mut openai_config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(base_url) = &config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }

        let client = Client::with_config(openai_config);
        let runtime = Runtime::new()?;
        tracing::debug!(model = %config.model, base_url = ?config.base_url, "created LLM client");

        Ok(Self {
            config,
            client,
            runtime,
        })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn build_messages(request: &CompletionRequest) -> Result<Vec<ChatCompletionRequestMessage>> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system.clone())
                    .build()?,
            ));
        }
        messages.push(ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.prompt.clone())
                .build()?,
        ));
        Ok(messages)
    }
}

impl LlmClient for OpenAiClient {
    fn model(&self) -> &str {
        &self.config.model
    }

    fn complete(&self, request: &CompletionRequest) -> Result<ChatCompletion> {
        let start = Instant::now();
        let model = request.model.as_deref().unwrap_or(&self.config.model);
        let temperature = self.config.temperature.unwrap_or(request.temperature);

        let mut request_builder = CreateChatCompletionRequestArgs::default();
        request_builder
            .model(model)
            .messages(Self::build_messages(request)?)
            .temperature(temperature);

        if let Some(max_tokens) = request.max_tokens {
            request_builder.max_tokens(max_tokens);
        }
        if request.response_format == ResponseFormat::Json {
            request_builder.response_format(OpenAiResponseFormat::JsonObject);
        }

        let openai_request = request_builder.build()?;

        let response = self
            .runtime
            .block_on(async { self.client.chat().create(openai_request).await })?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default()
            .trim()
            .to_string();

        let usage = response
            .usage
            .map(|u| Usage::new(u.prompt_tokens as u64, u.completion_tokens as u64));

        let json = match request.response_format {
            ResponseFormat::Json => match serde_json::from_str(&content) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!("Failed to parse JSON from model output: {}", e);
                    None
                }
            },
            ResponseFormat::Text => None,
        };

        tracing::debug!(
            model,
            chars = content.len(),
            elapsed = ?start.elapsed(),
            "completion finished"
        );

        Ok(ChatCompletion {
            content,
            model: model.to_string(),
            usage,
            json,
        })
    }
}
