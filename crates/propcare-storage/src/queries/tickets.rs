// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket create/read/update. Tickets are never deleted.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};

use propcare_core::PropcareError;
use propcare_core::types::{NewTicket, Ticket, TicketStatus, TicketUpdate, format_timestamp};

use crate::database::{Database, map_tr_err};
use crate::models::{TICKET_COLUMNS, ticket_from_row};

fn not_found(id: i64) -> PropcareError {
    PropcareError::NotFound {
        entity: "ticket",
        id: id.to_string(),
    }
}

/// Insert a ticket and return the stored record.
pub async fn create_ticket(
    db: &Database,
    ticket: &NewTicket,
    now: DateTime<Utc>,
) -> Result<Ticket, PropcareError> {
    let ticket = ticket.clone();
    let now = format_timestamp(now);
    let sql = format!(
        "INSERT INTO tickets (summary, urgency, status, tenant_name, tenant_email, tenant_phone,
                              property_address, unit, source, created_at, updated_at, last_activity_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10, ?10)
         RETURNING {TICKET_COLUMNS}"
    );
    db.connection()
        .call(move |conn| -> Result<Ticket, rusqlite::Error> {
            conn.query_row(
                &sql,
                params![
                    ticket.summary,
                    ticket.urgency.to_string(),
                    ticket.status.to_string(),
                    ticket.identity.tenant_name,
                    ticket.identity.tenant_email,
                    ticket.identity.tenant_phone,
                    ticket.identity.property_address,
                    ticket.identity.unit,
                    ticket.source,
                    now,
                ],
                ticket_from_row,
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a ticket by ID.
pub async fn get_ticket(db: &Database, id: i64) -> Result<Option<Ticket>, PropcareError> {
    let sql = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = ?1");
    db.connection()
        .call(move |conn| -> Result<Option<Ticket>, rusqlite::Error> {
            conn.query_row(&sql, params![id], ticket_from_row).optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Current issue-detail log of a ticket. Errors if the ticket does not exist.
pub async fn get_issue_details(db: &Database, id: i64) -> Result<Option<String>, PropcareError> {
    let row = db
        .connection()
        .call(move |conn| -> Result<Option<Option<String>>, rusqlite::Error> {
            conn.query_row(
                "SELECT issue_details FROM tickets WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)?;
    row.ok_or_else(|| not_found(id))
}

/// Rewrite the per-turn fields of a ticket in one statement.
///
/// `resolved_at` is stamped the first time the ticket is stored as resolved
/// and cleared when it leaves that status.
pub async fn update_ticket(
    db: &Database,
    id: i64,
    update: &TicketUpdate,
    now: DateTime<Utc>,
) -> Result<Ticket, PropcareError> {
    let update = update.clone();
    let now = format_timestamp(now);
    let resolved = TicketStatus::Resolved.to_string();
    let sql = format!(
        "UPDATE tickets
         SET summary = ?2, urgency = ?3, status = ?4, category = ?5, issue_details = ?6,
             updated_at = ?7, last_activity_at = ?7,
             resolved_at = CASE WHEN ?4 = ?8 THEN COALESCE(resolved_at, ?7) ELSE NULL END
         WHERE id = ?1
         RETURNING {TICKET_COLUMNS}"
    );
    let ticket = db
        .connection()
        .call(move |conn| -> Result<Option<Ticket>, rusqlite::Error> {
            conn.query_row(
                &sql,
                params![
                    id,
                    update.summary,
                    update.urgency.to_string(),
                    update.status.to_string(),
                    update.category.to_string(),
                    update.issue_details,
                    now,
                    resolved,
                ],
                ticket_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)?;
    ticket.ok_or_else(|| not_found(id))
}

/// Number of tickets in the table.
pub async fn count_tickets(db: &Database) -> Result<i64, PropcareError> {
    db.connection()
        .call(|conn| -> Result<i64, rusqlite::Error> {
            conn.query_row("SELECT COUNT(*) FROM tickets", [], |row| row.get(0))
        })
        .await
        .map_err(map_tr_err)
}
