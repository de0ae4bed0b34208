// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted completion provider.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use propcare_core::types::{AdapterType, CompletionRequest, CompletionResponse, HealthStatus};
use propcare_core::{CompletionProvider, PluginAdapter, PropcareError};

/// Builds the JSON text of a structured turn.
pub fn turn_json(
    reply: &str,
    category: &str,
    urgency: &str,
    status: &str,
    notify: bool,
    summary: &str,
) -> String {
    serde_json::json!({
        "tenant_reply": reply,
        "category": category,
        "urgency": urgency,
        "status": status,
        "should_notify_manager": notify,
        "summary_for_ticket": summary,
    })
    .to_string()
}

fn default_turn() -> String {
    turn_json(
        "Thanks, can you tell me a bit more about the problem?",
        "other",
        "P3",
        "intake",
        false,
        "",
    )
}

enum Scripted {
    Text(String),
    Error(String),
}

/// A completion provider that replays queued outputs in FIFO order.
///
/// When the queue is empty a routine intake turn is returned. Every request
/// is recorded for later inspection.
pub struct MockCompletion {
    script: Arc<Mutex<VecDeque<Scripted>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockCompletion {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Pre-load raw response texts.
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            script: Arc::new(Mutex::new(
                responses.into_iter().map(Scripted::Text).collect(),
            )),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn push_response(&self, text: impl Into<String>) {
        self.script.lock().await.push_back(Scripted::Text(text.into()));
    }

    /// Queue a provider failure for the next call.
    pub async fn push_error(&self, message: impl Into<String>) {
        self.script
            .lock()
            .await
            .push_back(Scripted::Error(message.into()));
    }

    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

impl Default for MockCompletion {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockCompletion {
    fn name(&self) -> &str {
        "mock-completion"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, PropcareError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), PropcareError> {
        Ok(())
    }
}

#[async_trait]
impl CompletionProvider for MockCompletion {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, PropcareError> {
        self.requests.lock().await.push(request);
        let next = self.script.lock().await.pop_front();
        match next {
            Some(Scripted::Error(message)) => Err(PropcareError::Provider {
                message,
                source: None,
            }),
            Some(Scripted::Text(content)) => Ok(response(content)),
            None => Ok(response(default_turn())),
        }
    }
}

fn response(content: String) -> CompletionResponse {
    CompletionResponse {
        id: format!("mock-{}", uuid::Uuid::new_v4()),
        model: "mock-model".to_string(),
        content,
    }
}
