// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across adapter traits and the triage pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::PropcareError;

/// Canonical timestamp format for persisted values.
///
/// Fixed-width UTC with millisecond precision, so lexical order equals
/// temporal order in SQL comparisons.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Formats a UTC instant in [`TIMESTAMP_FORMAT`].
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Provider,
    Storage,
    Mail,
}

// --- Conversation ---

/// Author of a conversation message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single transcript entry. Content is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Creates a message, rejecting blank content.
    pub fn new(role: Role, content: impl Into<String>) -> Result<Self, PropcareError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(PropcareError::validation(format!(
                "{role} message content must not be empty"
            )));
        }
        Ok(Self { role, content })
    }

    /// Creates a tenant message.
    pub fn user(content: impl Into<String>) -> Result<Self, PropcareError> {
        Self::new(Role::User, content)
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Result<Self, PropcareError> {
        Self::new(Role::Assistant, content)
    }
}

/// Tenant and property identity captured when a session starts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantIdentity {
    pub tenant_name: Option<String>,
    pub tenant_email: Option<String>,
    pub tenant_phone: Option<String>,
    pub property_address: Option<String>,
    pub unit: Option<String>,
}

/// Per-session triage state.
///
/// `ticket_id` is bound once, on the first turn, and every later turn of
/// the session operates on that same ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageState {
    pub session_id: String,
    pub identity: TenantIdentity,
    pub messages: Vec<Message>,
    pub ticket_id: Option<i64>,
    pub ticket_created: bool,
}

impl TriageState {
    /// Starts a new session with no messages and no ticket.
    pub fn new(session_id: impl Into<String>, identity: TenantIdentity) -> Self {
        Self {
            session_id: session_id.into(),
            identity,
            messages: Vec::new(),
            ticket_id: None,
            ticket_created: false,
        }
    }

    /// The most recent tenant message, if any.
    pub fn latest_user_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }

    /// The last `n` messages of the transcript.
    pub fn recent_messages(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }
}

// --- Ticket ---

/// Ticket urgency, ordered `Emergency > Urgent > Soon > Routine`.
///
/// Serializes as the `P0`..`P3` codes exchanged with the completion
/// service; `Display`/`FromStr` use the persisted column values.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
pub enum Urgency {
    #[serde(rename = "P3")]
    #[strum(serialize = "P3_ROUTINE")]
    Routine,
    #[serde(rename = "P2")]
    #[strum(serialize = "P2_SOON")]
    Soon,
    #[serde(rename = "P1")]
    #[strum(serialize = "P1_URGENT")]
    Urgent,
    #[serde(rename = "P0")]
    #[strum(serialize = "P0_EMERGENCY")]
    Emergency,
}

/// Ticket lifecycle status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TicketStatus {
    Intake,
    ActionRequired,
    Resolved,
}

/// Maintenance trade category.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Category {
    Plumbing,
    Electrical,
    Hvac,
    Appliance,
    Other,
}

/// A durable issue record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub summary: String,
    pub urgency: Urgency,
    pub status: TicketStatus,
    pub category: Option<Category>,
    /// Newline-delimited, append-only log of timestamped tenant statements.
    pub issue_details: Option<String>,
    #[serde(flatten)]
    pub identity: TenantIdentity,
    pub source: String,
    pub created_at: String,
    pub updated_at: String,
    pub last_activity_at: String,
    pub resolved_at: Option<String>,
}

/// Fields for creating a ticket.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub summary: String,
    pub urgency: Urgency,
    pub status: TicketStatus,
    pub identity: TenantIdentity,
    pub source: String,
}

/// Fields rewritten on every turn.
#[derive(Debug, Clone)]
pub struct TicketUpdate {
    pub summary: String,
    pub urgency: Urgency,
    pub status: TicketStatus,
    pub category: Category,
    pub issue_details: String,
}

// --- Completion ---

/// Structured output the completion service must produce each turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageTurn {
    pub tenant_reply: String,
    pub category: Category,
    pub urgency: Urgency,
    pub status: TicketStatus,
    pub should_notify_manager: bool,
    pub summary_for_ticket: String,
}

/// A request to the completion service.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Instructions (system prompt plus the non-tenant-facing context block).
    pub instructions: String,
    /// Trimmed conversation history.
    pub messages: Vec<Message>,
    pub temperature: f32,
    /// Name of the output schema, as required by structured-output APIs.
    pub schema_name: String,
    /// JSON Schema the returned text must conform to.
    pub output_schema: serde_json::Value,
}

/// Raw response text from the completion service.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub id: String,
    pub model: String,
    pub content: String,
}

// --- Outbox ---

/// Lifecycle of an outbox row.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OutboxStatus {
    /// Waiting for delivery (including rows rescheduled after a failure).
    Pending,
    /// Delivered.
    Sent,
    /// Permanently failed; will not be claimed again.
    Dead,
}

/// A notification to enqueue.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub event_type: String,
    pub ticket_id: i64,
    pub to_email: String,
    pub payload: serde_json::Value,
    pub dedupe_key: String,
}

/// Result of an enqueue call. A dedupe-key collision is a success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// A new pending row was inserted with this ID.
    Inserted(i64),
    /// A row with the same dedupe key already exists; nothing was written.
    Duplicate,
}

/// A durable outbox row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub id: i64,
    pub event_type: String,
    pub ticket_id: i64,
    pub to_email: String,
    pub payload: serde_json::Value,
    pub dedupe_key: String,
    pub status: OutboxStatus,
    pub attempt_count: u32,
    pub next_attempt_at: String,
    pub locked_at: Option<String>,
    pub locked_by: Option<String>,
    pub last_error: Option<String>,
    pub created_at: String,
    pub sent_at: Option<String>,
}

/// An email ready to hand to a mail transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub reply_to: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn urgency_orders_emergency_highest() {
        assert!(Urgency::Emergency > Urgency::Urgent);
        assert!(Urgency::Urgent > Urgency::Soon);
        assert!(Urgency::Soon > Urgency::Routine);
    }

    #[test]
    fn urgency_uses_codes_on_the_wire_and_labels_in_storage() {
        let json = serde_json::to_string(&Urgency::Emergency).unwrap();
        assert_eq!(json, "\"P0\"");
        assert_eq!(Urgency::Emergency.to_string(), "P0_EMERGENCY");
        assert_eq!(Urgency::from_str("P2_SOON").unwrap(), Urgency::Soon);
    }

    #[test]
    fn ticket_status_snake_case() {
        assert_eq!(TicketStatus::ActionRequired.to_string(), "action_required");
        let parsed: TicketStatus = serde_json::from_str("\"action_required\"").unwrap();
        assert_eq!(parsed, TicketStatus::ActionRequired);
    }

    #[test]
    fn blank_message_is_rejected() {
        assert!(Message::user("   ").is_err());
        assert!(Message::assistant("").is_err());
        assert_eq!(Message::user("leak").unwrap().role, Role::User);
    }

    #[test]
    fn latest_user_text_skips_assistant_messages() {
        let mut state = TriageState::new("s1", TenantIdentity::default());
        state.messages.push(Message::user("first").unwrap());
        state.messages.push(Message::assistant("reply").unwrap());
        assert_eq!(state.latest_user_text(), Some("first"));

        state.messages.push(Message::user("second").unwrap());
        assert_eq!(state.latest_user_text(), Some("second"));
    }

    #[test]
    fn recent_messages_keeps_tail() {
        let mut state = TriageState::new("s1", TenantIdentity::default());
        for i in 0..20 {
            state.messages.push(Message::user(format!("m{i}")).unwrap());
        }
        let tail = state.recent_messages(12);
        assert_eq!(tail.len(), 12);
        assert_eq!(tail[0].content, "m8");
        assert_eq!(tail[11].content, "m19");
        assert_eq!(state.recent_messages(50).len(), 20);
    }

    #[test]
    fn triage_turn_rejects_unknown_urgency() {
        let raw = r#"{
            "tenant_reply": "ok",
            "category": "plumbing",
            "urgency": "P9",
            "status": "intake",
            "should_notify_manager": false,
            "summary_for_ticket": ""
        }"#;
        assert!(serde_json::from_str::<TriageTurn>(raw).is_err());
    }

    #[test]
    fn timestamps_are_fixed_width() {
        let at = chrono::DateTime::parse_from_rfc3339("2026-03-01T08:05:09Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(format_timestamp(at), "2026-03-01T08:05:09.000Z");
    }
}
