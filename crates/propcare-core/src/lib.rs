// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for PropCare maintenance triage.
//!
//! Provides the error type, domain types, and adapter traits shared by the
//! orchestrator, the durable store, the completion client, and the
//! notification delivery worker.

pub mod error;
pub mod traits;
pub mod types;

pub use error::PropcareError;
pub use types::{AdapterType, HealthStatus};

pub use traits::{
    CompletionProvider, MailTransport, NotificationOutbox, PluginAdapter, SessionStore,
    StorageAdapter, TicketStore,
};
