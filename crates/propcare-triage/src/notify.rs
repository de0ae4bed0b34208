// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket events raised into the notification outbox.

use propcare_core::types::{EnqueueOutcome, NewNotification, Ticket};
use propcare_core::{NotificationOutbox, PropcareError};
use serde_json::{Value, json};
use tracing::debug;

use crate::policy::EmergencyType;

pub const TICKET_CREATED: &str = "ticket.created";
pub const TICKET_ACTION_REQUIRED: &str = "ticket.action_required";
pub const TICKET_EMERGENCY: &str = "ticket.emergency";

/// `{event_type}:{ticket_id}[:{suffix}]`.
pub fn dedupe_key(event_type: &str, ticket_id: i64, suffix: Option<&str>) -> String {
    match suffix {
        Some(s) if !s.is_empty() => format!("{event_type}:{ticket_id}:{s}"),
        _ => format!("{event_type}:{ticket_id}"),
    }
}

/// Snapshot of the ticket fields staff need, taken at enqueue time.
pub fn ticket_payload(ticket: &Ticket, emergency: Option<EmergencyType>) -> Value {
    let mut payload = json!({
        "ticket": {
            "id": ticket.id,
            "summary": ticket.summary,
            "urgency": ticket.urgency.to_string(),
            "status": ticket.status.to_string(),
            "category": ticket.category.map(|c| c.to_string()),
            "property_address": ticket.identity.property_address,
            "unit": ticket.identity.unit,
            "tenant_name": ticket.identity.tenant_name,
            "tenant_email": ticket.identity.tenant_email,
            "tenant_phone": ticket.identity.tenant_phone,
            "issue_details": ticket.issue_details,
        }
    });
    if let (Some(kind), Some(obj)) = (emergency, payload.as_object_mut()) {
        obj.insert("emergency_type".into(), Value::String(kind.to_string()));
    }
    payload
}

/// Enqueues a ticket event addressed to `to_email`.
///
/// Emergency events carry the hazard type as the dedupe suffix, so a new
/// kind of hazard on the same ticket raises a fresh notification while a
/// repeated one does not.
pub async fn enqueue_ticket_event(
    outbox: &dyn NotificationOutbox,
    event_type: &str,
    ticket: &Ticket,
    to_email: &str,
    emergency: Option<EmergencyType>,
) -> Result<EnqueueOutcome, PropcareError> {
    let suffix = emergency.map(|e| e.to_string());
    let notification = NewNotification {
        event_type: event_type.to_string(),
        ticket_id: ticket.id,
        to_email: to_email.to_string(),
        payload: ticket_payload(ticket, emergency),
        dedupe_key: dedupe_key(event_type, ticket.id, suffix.as_deref()),
    };

    let outcome = outbox.enqueue(&notification).await?;
    if outcome == EnqueueOutcome::Duplicate {
        debug!(
            ticket_id = ticket.id,
            event_type,
            dedupe_key = %notification.dedupe_key,
            "notification already queued"
        );
    }
    Ok(outcome)
}
