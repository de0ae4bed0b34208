// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plain-text email bodies for ticket events.
//!
//! Renderers read the ticket snapshot stored in the outbox payload. Absent
//! or blank fields print as `(n/a)` so a partial payload still produces a
//! readable message.

use std::fmt::Write;

use propcare_core::PropcareError;
use propcare_core::types::{OutboundEmail, OutboxEntry};
use serde_json::Value;

const NOT_AVAILABLE: &str = "(n/a)";

/// Subject and body for an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub subject: String,
    pub body: String,
}

/// Renders an outbox row into an email addressed to its `to_email`.
pub fn render_entry(entry: &OutboxEntry, reply_to: Option<&str>) -> Result<OutboundEmail, PropcareError> {
    let rendered = render_event(&entry.event_type, &entry.payload)?;
    Ok(OutboundEmail {
        to: entry.to_email.clone(),
        subject: rendered.subject,
        body: rendered.body,
        reply_to: reply_to.map(str::to_string),
    })
}

/// Dispatches on `event_type`. Unknown types are [`PropcareError::UnknownEventType`].
pub fn render_event(event_type: &str, payload: &Value) -> Result<Rendered, PropcareError> {
    let snapshot = Snapshot::new(payload);
    match event_type {
        "ticket.created" => Ok(ticket_created(&snapshot)),
        "ticket.action_required" => Ok(ticket_action_required(&snapshot)),
        "ticket.emergency" => Ok(ticket_emergency(&snapshot)),
        other => Err(PropcareError::UnknownEventType(other.to_string())),
    }
}

struct Snapshot<'a> {
    ticket: Option<&'a Value>,
    payload: &'a Value,
}

impl<'a> Snapshot<'a> {
    fn new(payload: &'a Value) -> Self {
        Self {
            ticket: payload.get("ticket"),
            payload,
        }
    }

    fn field(&self, key: &str) -> String {
        text(self.ticket.and_then(|t| t.get(key)))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }

    fn id(&self) -> String {
        text(self.ticket.and_then(|t| t.get("id"))).unwrap_or_else(|| "(unknown)".to_string())
    }

    fn emergency_type(&self) -> String {
        text(self.payload.get("emergency_type")).unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn contact_and_property(out: &mut String, s: &Snapshot<'_>) {
    let _ = write!(
        out,
        "Tenant / Contact\n\
         Name:  {}\n\
         Email: {}\n\
         Phone: {}\n\n\
         Property\n\
         Address: {}\n\
         Unit:    {}\n\n",
        s.field("tenant_name"),
        s.field("tenant_email"),
        s.field("tenant_phone"),
        s.field("property_address"),
        s.field("unit"),
    );
}

fn issue_log(out: &mut String, s: &Snapshot<'_>) {
    let _ = write!(out, "Issue log\n{}\n\n", s.field("issue_details"));
}

fn ticket_created(s: &Snapshot<'_>) -> Rendered {
    let urgency = s.field("urgency");
    let mut body = String::from("A new maintenance ticket was created.\n\n");
    contact_and_property(&mut body, s);
    let _ = write!(
        body,
        "Ticket\nSummary: {}\nUrgency: {urgency}\n\n",
        s.field("summary"),
    );
    body.push_str("This is an automated message.\n");

    Rendered {
        subject: format!("[PropCare] Ticket #{} ({urgency}) created", s.id()),
        body,
    }
}

fn ticket_action_required(s: &Snapshot<'_>) -> Rendered {
    let urgency = s.field("urgency");
    let mut body = String::from("A maintenance ticket needs action from property management.\n\n");
    contact_and_property(&mut body, s);
    let _ = write!(
        body,
        "Ticket\nSummary:  {}\nCategory: {}\nUrgency:  {urgency}\nStatus:   {}\n\n",
        s.field("summary"),
        s.field("category"),
        s.field("status"),
    );
    issue_log(&mut body, s);
    body.push_str("This is an automated message.\n");

    Rendered {
        subject: format!("[PropCare] Ticket #{} ({urgency}) needs action", s.id()),
        body,
    }
}

fn ticket_emergency(s: &Snapshot<'_>) -> Rendered {
    let hazard = s.emergency_type();
    let mut body = format!(
        "EMERGENCY reported by a tenant. Follow your emergency procedure now.\n\n\
         Hazard: {hazard}\n\n"
    );
    contact_and_property(&mut body, s);
    let _ = write!(
        body,
        "Ticket\nSummary:  {}\nCategory: {}\nUrgency:  {}\n\n",
        s.field("summary"),
        s.field("category"),
        s.field("urgency"),
    );
    issue_log(&mut body, s);
    body.push_str("This is an automated message.\n");

    Rendered {
        subject: format!("[PropCare] EMERGENCY ({hazard}) Ticket #{}", s.id()),
        body,
    }
}
