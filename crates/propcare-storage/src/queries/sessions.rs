// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Triage session persistence.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};

use propcare_core::PropcareError;
use propcare_core::types::{TriageState, format_timestamp};

use crate::database::{Database, map_tr_err};
use crate::models::{SESSION_COLUMNS, session_from_row};

/// Load a session by ID.
pub async fn load_session(db: &Database, id: &str) -> Result<Option<TriageState>, PropcareError> {
    let id = id.to_string();
    let sql = format!("SELECT {SESSION_COLUMNS} FROM triage_sessions WHERE id = ?1");
    db.connection()
        .call(move |conn| -> Result<Option<TriageState>, rusqlite::Error> {
            conn.query_row(&sql, params![id], session_from_row).optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Insert or update a session.
///
/// Identity columns are written on insert only. A bound `ticket_id` is never
/// replaced or cleared, and `ticket_created` never flips back to false.
pub async fn save_session(
    db: &Database,
    state: &TriageState,
    now: DateTime<Utc>,
) -> Result<(), PropcareError> {
    let messages = serde_json::to_string(&state.messages).map_err(|e| PropcareError::Storage {
        source: Box::new(e),
    })?;
    let state = state.clone();
    let now = format_timestamp(now);

    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO triage_sessions
                     (id, tenant_name, tenant_email, tenant_phone, property_address, unit,
                      ticket_id, ticket_created, messages, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
                 ON CONFLICT(id) DO UPDATE SET
                     ticket_id = COALESCE(triage_sessions.ticket_id, excluded.ticket_id),
                     ticket_created = MAX(triage_sessions.ticket_created, excluded.ticket_created),
                     messages = excluded.messages,
                     updated_at = excluded.updated_at",
                params![
                    state.session_id,
                    state.identity.tenant_name,
                    state.identity.tenant_email,
                    state.identity.tenant_phone,
                    state.identity.property_address,
                    state.identity.unit,
                    state.ticket_id,
                    state.ticket_created,
                    messages,
                    now,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
