// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Maintenance triage: the emergency policy and the per-turn orchestrator.
//!
//! [`detect_emergency`] is a pure keyword classifier. [`TurnOrchestrator`]
//! drives one conversational turn: it makes sure the session has a ticket,
//! asks the completion service for a structured turn, lets the policy
//! override it, writes the ticket, and queues a notification when staff
//! must act.

pub mod notify;
pub mod orchestrator;
pub mod policy;
pub mod prompt;

pub use orchestrator::{TriageSettings, TurnOrchestrator, TurnOutcome, TurnStage};
pub use policy::{EmergencyAssessment, EmergencyType, detect_emergency};
