// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Completion service adapter trait.

use async_trait::async_trait;

use crate::error::PropcareError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{CompletionRequest, CompletionResponse};

/// Adapter for the LLM completion service.
///
/// Implementations return the raw text the model produced. Structural
/// validation against the output schema happens in the orchestrator, so a
/// provider only fails on transport or API errors.
#[async_trait]
pub trait CompletionProvider: PluginAdapter {
    /// Sends a completion request and returns the full response.
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, PropcareError>;
}
