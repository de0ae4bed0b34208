// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage traits for the durable store.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::PropcareError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    EnqueueOutcome, NewNotification, NewTicket, OutboxEntry, Ticket, TicketUpdate, TriageState,
};

/// Lifecycle of a storage backend.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), PropcareError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), PropcareError>;
}

/// Ticket persistence. The only path through which tickets are mutated.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Inserts a ticket and returns the stored record.
    async fn create_ticket(&self, ticket: &NewTicket) -> Result<Ticket, PropcareError>;

    /// Fetches a ticket by ID.
    async fn get_ticket(&self, id: i64) -> Result<Option<Ticket>, PropcareError>;

    /// Returns the current issue-detail log of a ticket.
    async fn get_issue_details(&self, id: i64) -> Result<Option<String>, PropcareError>;

    /// Rewrites the per-turn fields in a single write and returns the updated record.
    async fn update_ticket(
        &self,
        id: i64,
        update: &TicketUpdate,
    ) -> Result<Ticket, PropcareError>;
}

/// Durable notification queue with claim-based dequeue.
#[async_trait]
pub trait NotificationOutbox: Send + Sync {
    /// Inserts a pending row. A dedupe-key collision returns
    /// [`EnqueueOutcome::Duplicate`] instead of an error.
    async fn enqueue(
        &self,
        notification: &NewNotification,
    ) -> Result<EnqueueOutcome, PropcareError>;

    /// Atomically leases up to `batch_size` due rows to `worker_id`.
    ///
    /// A row is due when it is pending, `next_attempt_at <= now`, and it is
    /// either unlocked or its lease is older than `visibility_timeout`.
    async fn claim_due(
        &self,
        worker_id: &str,
        batch_size: u32,
        visibility_timeout: Duration,
        now: DateTime<Utc>,
    ) -> Result<Vec<OutboxEntry>, PropcareError>;

    /// Restarts `worker_id`'s lease at `now` if the worker still holds it
    /// and it is younger than `visibility_timeout`. False means the lease
    /// was lost and the row must not be sent.
    async fn renew_lease(
        &self,
        id: i64,
        worker_id: &str,
        visibility_timeout: Duration,
        now: DateTime<Utc>,
    ) -> Result<bool, PropcareError>;

    /// Marks a row delivered and releases its lease. False if `worker_id`
    /// no longer holds the lease.
    async fn mark_sent(
        &self,
        id: i64,
        worker_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, PropcareError>;

    /// Returns a row to pending after a failed attempt.
    async fn reschedule(
        &self,
        id: i64,
        worker_id: &str,
        attempt_count: u32,
        next_attempt_at: DateTime<Utc>,
        error: &str,
    ) -> Result<bool, PropcareError>;

    /// Dead-letters a row that can never be delivered.
    async fn mark_dead(
        &self,
        id: i64,
        worker_id: &str,
        error: &str,
    ) -> Result<bool, PropcareError>;
}

/// Persistence of per-session triage state for the inbound API.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads a session by ID.
    async fn load_session(&self, id: &str) -> Result<Option<TriageState>, PropcareError>;

    /// Inserts or updates a session. An already-bound ticket ID is never cleared.
    async fn save_session(&self, state: &TriageState) -> Result<(), PropcareError>;
}
