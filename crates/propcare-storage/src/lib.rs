// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite durable store for PropCare.
//!
//! WAL-mode SQLite with embedded migrations and a single-writer connection via
//! `tokio-rusqlite`. Typed query modules cover tickets, triage sessions, and the
//! notification outbox; [`SqliteStorage`] exposes them through the core store traits.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::Database;
pub use models::OutboxCounts;
