// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification outbox: idempotent enqueue, lease-based claim, and row
//! transitions after a delivery attempt.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use rusqlite::{OptionalExtension, params};

use propcare_core::PropcareError;
use propcare_core::types::{EnqueueOutcome, NewNotification, OutboxEntry, format_timestamp};

use crate::database::{Database, map_tr_err};
use crate::models::{OUTBOX_COLUMNS, OutboxCounts, outbox_entry_from_row};

/// True for a UNIQUE violation, the only constraint that can fire on a
/// well-formed insert into `notification_outbox`.
fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Insert a pending row due at `now`. A `dedupe_key` collision is reported
/// as [`EnqueueOutcome::Duplicate`] and writes nothing.
pub async fn enqueue(
    db: &Database,
    notification: &NewNotification,
    now: DateTime<Utc>,
) -> Result<EnqueueOutcome, PropcareError> {
    let n = notification.clone();
    let payload = serde_json::to_string(&n.payload).map_err(|e| PropcareError::Storage {
        source: Box::new(e),
    })?;
    let now = format_timestamp(now);

    db.connection()
        .call(move |conn| -> Result<EnqueueOutcome, rusqlite::Error> {
            let inserted = conn.execute(
                "INSERT INTO notification_outbox
                     (event_type, ticket_id, to_email, payload, dedupe_key, status,
                      attempt_count, next_attempt_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 'pending', 0, ?6, ?6)",
                params![n.event_type, n.ticket_id, n.to_email, payload, n.dedupe_key, now],
            );
            match inserted {
                Ok(_) => Ok(EnqueueOutcome::Inserted(conn.last_insert_rowid())),
                Err(e) if is_unique_violation(&e) => Ok(EnqueueOutcome::Duplicate),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Lease up to `batch_size` due rows to `worker_id` in a single statement.
///
/// Due means `status = 'pending'`, `next_attempt_at <= now`, and either no
/// lease or a lease taken at or before `now - visibility_timeout`. The
/// `UPDATE .. RETURNING` runs under SQLite's write lock, so two workers can
/// never lease the same row. Rows come back ordered by `next_attempt_at`.
pub async fn claim_due(
    db: &Database,
    worker_id: &str,
    batch_size: u32,
    visibility_timeout: Duration,
    now: DateTime<Utc>,
) -> Result<Vec<OutboxEntry>, PropcareError> {
    let stale_before = stale_before(visibility_timeout, now)?;
    let now = format_timestamp(now);
    let worker_id = worker_id.to_string();
    let sql = format!(
        "UPDATE notification_outbox
         SET locked_at = ?1, locked_by = ?2
         WHERE id IN (
             SELECT id FROM notification_outbox
             WHERE status = 'pending'
               AND next_attempt_at <= ?1
               AND (locked_at IS NULL OR locked_at <= ?3)
             ORDER BY next_attempt_at, id
             LIMIT ?4
         )
         RETURNING {OUTBOX_COLUMNS}"
    );

    let mut rows = db
        .connection()
        .call(move |conn| -> Result<Vec<OutboxEntry>, rusqlite::Error> {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(
                params![now, worker_id, stale_before, batch_size],
                outbox_entry_from_row,
            )?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)?;

    // RETURNING order is unspecified.
    rows.sort_by(|a, b| {
        a.next_attempt_at
            .cmp(&b.next_attempt_at)
            .then(a.id.cmp(&b.id))
    });
    Ok(rows)
}

fn stale_before(
    visibility_timeout: Duration,
    now: DateTime<Utc>,
) -> Result<String, PropcareError> {
    let lease_age = TimeDelta::from_std(visibility_timeout)
        .map_err(|e| PropcareError::Internal(format!("visibility timeout out of range: {e}")))?;
    Ok(format_timestamp(now - lease_age))
}

/// Restart `worker_id`'s lease on a row at `now`, provided the worker still
/// holds it and it has not expired.
///
/// Returns false when the lease was lost; the row must not be sent then,
/// since another worker may already own it.
pub async fn renew_lease(
    db: &Database,
    id: i64,
    worker_id: &str,
    visibility_timeout: Duration,
    now: DateTime<Utc>,
) -> Result<bool, PropcareError> {
    let stale_before = stale_before(visibility_timeout, now)?;
    let now = format_timestamp(now);
    let worker_id = worker_id.to_string();
    let changed = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "UPDATE notification_outbox
                 SET locked_at = ?3
                 WHERE id = ?1 AND locked_by = ?2 AND status = 'pending' AND locked_at > ?4",
                params![id, worker_id, now, stale_before],
            )
        })
        .await
        .map_err(map_tr_err)?;
    Ok(changed == 1)
}

/// Mark a row delivered, clearing its lease and last error. Returns false
/// if `worker_id` no longer holds the lease.
pub async fn mark_sent(
    db: &Database,
    id: i64,
    worker_id: &str,
    now: DateTime<Utc>,
) -> Result<bool, PropcareError> {
    let now = format_timestamp(now);
    let worker_id = worker_id.to_string();
    let changed = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "UPDATE notification_outbox
                 SET status = 'sent', sent_at = ?3, last_error = NULL,
                     locked_at = NULL, locked_by = NULL
                 WHERE id = ?1 AND locked_by = ?2",
                params![id, worker_id, now],
            )
        })
        .await
        .map_err(map_tr_err)?;
    Ok(changed == 1)
}

/// Return a row to pending after a failed attempt. Returns false if
/// `worker_id` no longer holds the lease.
pub async fn reschedule(
    db: &Database,
    id: i64,
    worker_id: &str,
    attempt_count: u32,
    next_attempt_at: DateTime<Utc>,
    error: &str,
) -> Result<bool, PropcareError> {
    let next_attempt_at = format_timestamp(next_attempt_at);
    let worker_id = worker_id.to_string();
    let error = error.to_string();
    let changed = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "UPDATE notification_outbox
                 SET status = 'pending', attempt_count = ?3, next_attempt_at = ?4,
                     last_error = ?5, locked_at = NULL, locked_by = NULL
                 WHERE id = ?1 AND locked_by = ?2",
                params![id, worker_id, attempt_count, next_attempt_at, error],
            )
        })
        .await
        .map_err(map_tr_err)?;
    Ok(changed == 1)
}

/// Dead-letter a row. It will not be claimed again unless requeued.
/// Returns false if `worker_id` no longer holds the lease.
pub async fn mark_dead(
    db: &Database,
    id: i64,
    worker_id: &str,
    error: &str,
) -> Result<bool, PropcareError> {
    let worker_id = worker_id.to_string();
    let error = error.to_string();
    let changed = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "UPDATE notification_outbox
                 SET status = 'dead', last_error = ?3, locked_at = NULL, locked_by = NULL
                 WHERE id = ?1 AND locked_by = ?2",
                params![id, worker_id, error],
            )
        })
        .await
        .map_err(map_tr_err)?;
    Ok(changed == 1)
}

/// Move a dead row back to pending, due at `now`. Returns false if the row
/// does not exist or is not dead.
pub async fn requeue(db: &Database, id: i64, now: DateTime<Utc>) -> Result<bool, PropcareError> {
    let now = format_timestamp(now);
    let changed = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "UPDATE notification_outbox
                 SET status = 'pending', next_attempt_at = ?2, locked_at = NULL, locked_by = NULL
                 WHERE id = ?1 AND status = 'dead'",
                params![id, now],
            )
        })
        .await
        .map_err(map_tr_err)?;
    Ok(changed == 1)
}

/// Fetch one row by ID.
pub async fn get_entry(db: &Database, id: i64) -> Result<Option<OutboxEntry>, PropcareError> {
    let sql = format!("SELECT {OUTBOX_COLUMNS} FROM notification_outbox WHERE id = ?1");
    db.connection()
        .call(move |conn| -> Result<Option<OutboxEntry>, rusqlite::Error> {
            conn.query_row(&sql, params![id], outbox_entry_from_row)
                .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// All rows for a ticket, oldest first.
pub async fn list_for_ticket(
    db: &Database,
    ticket_id: i64,
) -> Result<Vec<OutboxEntry>, PropcareError> {
    let sql = format!(
        "SELECT {OUTBOX_COLUMNS} FROM notification_outbox WHERE ticket_id = ?1 ORDER BY id"
    );
    db.connection()
        .call(move |conn| -> Result<Vec<OutboxEntry>, rusqlite::Error> {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![ticket_id], outbox_entry_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Row counts by status.
pub async fn status_counts(db: &Database) -> Result<OutboxCounts, PropcareError> {
    db.connection()
        .call(|conn| -> Result<OutboxCounts, rusqlite::Error> {
            conn.query_row(
                "SELECT
                     COALESCE(SUM(status = 'pending'), 0),
                     COALESCE(SUM(status = 'sent'), 0),
                     COALESCE(SUM(status = 'dead'), 0),
                     COALESCE(SUM(status = 'pending' AND locked_at IS NOT NULL), 0)
                 FROM notification_outbox",
                [],
                |row| {
                    Ok(OutboxCounts {
                        pending: row.get(0)?,
                        sent: row.get(1)?,
                        dead: row.get(2)?,
                        leased: row.get(3)?,
                    })
                },
            )
        })
        .await
        .map_err(map_tr_err)
}
