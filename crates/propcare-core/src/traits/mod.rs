// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! External collaborators (completion service, delivery service) extend the
//! [`PluginAdapter`] base trait. Store traits are plain `Send + Sync` seams so
//! the orchestrator and worker can be handed any backend.

pub mod adapter;
pub mod mail;
pub mod provider;
pub mod storage;

pub use adapter::PluginAdapter;
pub use mail::MailTransport;
pub use provider::CompletionProvider;
pub use storage::{NotificationOutbox, SessionStore, StorageAdapter, TicketStore};
