// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI completion provider.
//!
//! Implements [`CompletionProvider`] over the Chat Completions API with
//! strict JSON-schema structured output. The instructions travel as the
//! system message, followed by the trimmed conversation history.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use propcare_config::PropcareConfig;
use propcare_core::types::{
    AdapterType, CompletionRequest, CompletionResponse, HealthStatus,
};
use propcare_core::{CompletionProvider, PluginAdapter, PropcareError};
use tracing::{debug, info};

use crate::client::OpenAiClient;
use crate::types::{ChatMessage, ChatRequest, ResponseFormat};

/// Completion provider backed by OpenAI.
pub struct OpenAiProvider {
    client: OpenAiClient,
    model: String,
}

impl OpenAiProvider {
    /// Builds the provider from `[openai]`.
    ///
    /// The API key comes from `openai.api_key`, then `OPENAI_API_KEY`.
    pub fn new(config: &PropcareConfig) -> Result<Self, PropcareError> {
        let api_key = config.openai.resolved_api_key().ok_or_else(|| {
            PropcareError::Config(
                "OpenAI API key not found. Set openai.api_key in config or OPENAI_API_KEY environment variable.".into(),
            )
        })?;
        let client = OpenAiClient::new(
            &api_key,
            &config.openai.base_url,
            Duration::from_secs(config.openai.timeout_secs),
        )?;

        info!(model = %config.openai.model, "OpenAI provider initialized");
        Ok(Self::with_client(client, config.openai.model.clone()))
    }

    pub fn with_client(client: OpenAiClient, model: String) -> Self {
        Self { client, model }
    }

    fn to_chat_request(&self, request: CompletionRequest) -> ChatRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(ChatMessage {
            role: "system".to_string(),
            content: request.instructions,
        });
        messages.extend(request.messages.into_iter().map(|m| ChatMessage {
            role: m.role.to_string(),
            content: m.content,
        }));

        ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: request.temperature,
            response_format: ResponseFormat::strict_schema(
                request.schema_name,
                request.output_schema,
            ),
        }
    }
}

#[async_trait]
impl PluginAdapter for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, PropcareError> {
        // No test request: it would cost tokens.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), PropcareError> {
        debug!("OpenAI provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, PropcareError> {
        let chat_request = self.to_chat_request(request);
        let response = self.client.create_chat_completion(&chat_request).await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| PropcareError::Provider {
                message: "response contained no choices".into(),
                source: None,
            })?;

        if let Some(refusal) = choice.message.refusal {
            return Err(PropcareError::Provider {
                message: format!("model refused: {refusal}"),
                source: None,
            });
        }

        let content = choice.message.content.unwrap_or_default();
        if content.trim().is_empty() {
            return Err(PropcareError::Provider {
                message: format!(
                    "response contained no content (finish_reason: {})",
                    choice.finish_reason.as_deref().unwrap_or("unknown")
                ),
                source: None,
            });
        }

        if let Some(usage) = &response.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "chat completion usage"
            );
        }

        Ok(CompletionResponse {
            id: response.id,
            model: response.model,
            content,
        })
    }
}
