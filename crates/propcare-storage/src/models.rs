// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row mapping between SQLite and the core domain types.

use std::str::FromStr;

use rusqlite::Row;
use rusqlite::types::Type;
use serde::Serialize;

use propcare_core::types::{
    Message, OutboxEntry, TenantIdentity, Ticket, TriageState,
};

pub(crate) const TICKET_COLUMNS: &str = "id, summary, urgency, status, category, issue_details, \
     tenant_name, tenant_email, tenant_phone, property_address, unit, source, \
     created_at, updated_at, last_activity_at, resolved_at";

pub(crate) const OUTBOX_COLUMNS: &str = "id, event_type, ticket_id, to_email, payload, dedupe_key, \
     status, attempt_count, next_attempt_at, locked_at, locked_by, last_error, created_at, sent_at";

pub(crate) const SESSION_COLUMNS: &str = "id, tenant_name, tenant_email, tenant_phone, \
     property_address, unit, ticket_id, ticket_created, messages";

/// Per-status row counts for the outbox.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutboxCounts {
    pub pending: i64,
    pub sent: i64,
    pub dead: i64,
    /// Pending rows currently holding a lease.
    pub leased: i64,
}

fn conversion_err(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

/// Reads a TEXT column and parses it with `FromStr`.
fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion_err(idx, e))
}

fn parse_optional_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| s.parse().map_err(|e| conversion_err(idx, e)))
        .transpose()
}

fn json_column<T: serde::de::DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_err(idx, e))
}

/// Maps a row selected with [`TICKET_COLUMNS`].
pub(crate) fn ticket_from_row(row: &Row<'_>) -> rusqlite::Result<Ticket> {
    Ok(Ticket {
        id: row.get(0)?,
        summary: row.get(1)?,
        urgency: parse_column(row, 2)?,
        status: parse_column(row, 3)?,
        category: parse_optional_column(row, 4)?,
        issue_details: row.get(5)?,
        identity: TenantIdentity {
            tenant_name: row.get(6)?,
            tenant_email: row.get(7)?,
            tenant_phone: row.get(8)?,
            property_address: row.get(9)?,
            unit: row.get(10)?,
        },
        source: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
        last_activity_at: row.get(14)?,
        resolved_at: row.get(15)?,
    })
}

/// Maps a row selected with [`OUTBOX_COLUMNS`].
pub(crate) fn outbox_entry_from_row(row: &Row<'_>) -> rusqlite::Result<OutboxEntry> {
    Ok(OutboxEntry {
        id: row.get(0)?,
        event_type: row.get(1)?,
        ticket_id: row.get(2)?,
        to_email: row.get(3)?,
        payload: json_column(row, 4)?,
        dedupe_key: row.get(5)?,
        status: parse_column(row, 6)?,
        attempt_count: row.get(7)?,
        next_attempt_at: row.get(8)?,
        locked_at: row.get(9)?,
        locked_by: row.get(10)?,
        last_error: row.get(11)?,
        created_at: row.get(12)?,
        sent_at: row.get(13)?,
    })
}

/// Maps a row selected with [`SESSION_COLUMNS`].
pub(crate) fn session_from_row(row: &Row<'_>) -> rusqlite::Result<TriageState> {
    let messages: Vec<Message> = json_column(row, 8)?;
    Ok(TriageState {
        session_id: row.get(0)?,
        identity: TenantIdentity {
            tenant_name: row.get(1)?,
            tenant_email: row.get(2)?,
            tenant_phone: row.get(3)?,
            property_address: row.get(4)?,
            unit: row.get(5)?,
        },
        ticket_id: row.get(6)?,
        ticket_created: row.get(7)?,
        messages,
    })
}
