// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for PropCare.
//!
//! Scripted doubles for the completion and delivery services, plus a harness
//! that wires them to a temporary SQLite store.

pub mod harness;
pub mod mock_completion;
pub mod mock_mailer;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_completion::{MockCompletion, turn_json};
pub use mock_mailer::MockMailer;
