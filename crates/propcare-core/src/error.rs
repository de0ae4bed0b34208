// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for PropCare triage.

use thiserror::Error;

/// The primary error type used across all PropCare adapter traits and core operations.
///
/// Dedupe collisions on the notification outbox are deliberately absent:
/// they are reported as [`EnqueueOutcome::Duplicate`](crate::types::EnqueueOutcome),
/// never as an error.
#[derive(Debug, Error)]
pub enum PropcareError {
    /// Configuration errors (invalid TOML, missing credentials, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed completion output or invalid turn input. The turn is aborted
    /// before anything is persisted.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Durable store errors (connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Completion service errors (transport failure, API error status).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Delivery service errors. Retryable from the worker's point of view.
    #[error("delivery error: {message}")]
    Delivery {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// No renderer exists for an outbox row's event type.
    #[error("unknown event type: {0}")]
    UnknownEventType(String),

    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PropcareError {
    /// Shorthand for a [`PropcareError::Validation`] with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        PropcareError::Validation {
            message: message.into(),
        }
    }

    /// Returns true if the error should be retried by the delivery worker.
    ///
    /// Everything except an unknown event type is considered transient: the
    /// worker reschedules the row with backoff instead of dropping it.
    pub fn is_retryable_delivery(&self) -> bool {
        !matches!(self, PropcareError::UnknownEventType(_))
    }
}
