// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound HTTP API for tenant chat.
//!
//! Each POST /v1/chat request runs one turn of the triage orchestrator
//! against a persisted session and returns the assistant's reply.

pub mod handlers;
pub mod server;

pub use handlers::{ChatRequest, ChatResponse, ErrorResponse, HealthResponse};
pub use server::{GatewayState, build_router, start_server};
