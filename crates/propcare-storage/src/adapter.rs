// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the store traits.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use propcare_config::model::StorageConfig;
use propcare_core::types::{
    EnqueueOutcome, NewNotification, NewTicket, OutboxEntry, Ticket, TicketUpdate, TriageState,
};
use propcare_core::{
    AdapterType, HealthStatus, NotificationOutbox, PluginAdapter, PropcareError, SessionStore,
    StorageAdapter, TicketStore,
};

use crate::database::{Database, map_tr_err};
use crate::models::OutboxCounts;
use crate::queries;

/// SQLite-backed store for tickets, sessions, and the outbox.
///
/// The database is opened lazily by [`StorageAdapter::initialize`]; every other
/// call fails with a storage error until then.
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Construct and initialize in one step.
    pub async fn open(config: StorageConfig) -> Result<Self, PropcareError> {
        let storage = Self::new(config);
        storage.initialize().await?;
        Ok(storage)
    }

    fn db(&self) -> Result<&Database, PropcareError> {
        self.db.get().ok_or_else(|| PropcareError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    async fn checkpoint(&self) -> Result<(), PropcareError> {
        if let Some(db) = self.db.get() {
            db.connection()
                .call(|conn| -> Result<(), rusqlite::Error> {
                    conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                    Ok(())
                })
                .await
                .map_err(map_tr_err)?;
            debug!("WAL checkpoint complete");
        }
        Ok(())
    }

    // --- Operator operations (not part of the worker contract) ---

    /// Move a dead-lettered row back to pending.
    pub async fn requeue(&self, id: i64) -> Result<bool, PropcareError> {
        queries::outbox::requeue(self.db()?, id, Utc::now()).await
    }

    pub async fn status_counts(&self) -> Result<OutboxCounts, PropcareError> {
        queries::outbox::status_counts(self.db()?).await
    }

    pub async fn outbox_entry(&self, id: i64) -> Result<Option<OutboxEntry>, PropcareError> {
        queries::outbox::get_entry(self.db()?, id).await
    }

    pub async fn outbox_for_ticket(
        &self,
        ticket_id: i64,
    ) -> Result<Vec<OutboxEntry>, PropcareError> {
        queries::outbox::list_for_ticket(self.db()?, ticket_id).await
    }

    pub async fn ticket_count(&self) -> Result<i64, PropcareError> {
        queries::tickets::count_tickets(self.db()?).await
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, PropcareError> {
        self.db()?
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), PropcareError> {
        self.checkpoint().await
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), PropcareError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| PropcareError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), PropcareError> {
        self.db()?;
        self.checkpoint().await
    }
}

#[async_trait]
impl TicketStore for SqliteStorage {
    async fn create_ticket(&self, ticket: &NewTicket) -> Result<Ticket, PropcareError> {
        queries::tickets::create_ticket(self.db()?, ticket, Utc::now()).await
    }

    async fn get_ticket(&self, id: i64) -> Result<Option<Ticket>, PropcareError> {
        queries::tickets::get_ticket(self.db()?, id).await
    }

    async fn get_issue_details(&self, id: i64) -> Result<Option<String>, PropcareError> {
        queries::tickets::get_issue_details(self.db()?, id).await
    }

    async fn update_ticket(
        &self,
        id: i64,
        update: &TicketUpdate,
    ) -> Result<Ticket, PropcareError> {
        queries::tickets::update_ticket(self.db()?, id, update, Utc::now()).await
    }
}

#[async_trait]
impl NotificationOutbox for SqliteStorage {
    async fn enqueue(
        &self,
        notification: &NewNotification,
    ) -> Result<EnqueueOutcome, PropcareError> {
        queries::outbox::enqueue(self.db()?, notification, Utc::now()).await
    }

    async fn claim_due(
        &self,
        worker_id: &str,
        batch_size: u32,
        visibility_timeout: Duration,
        now: DateTime<Utc>,
    ) -> Result<Vec<OutboxEntry>, PropcareError> {
        queries::outbox::claim_due(self.db()?, worker_id, batch_size, visibility_timeout, now)
            .await
    }

    async fn renew_lease(
        &self,
        id: i64,
        worker_id: &str,
        visibility_timeout: Duration,
        now: DateTime<Utc>,
    ) -> Result<bool, PropcareError> {
        queries::outbox::renew_lease(self.db()?, id, worker_id, visibility_timeout, now).await
    }

    async fn mark_sent(
        &self,
        id: i64,
        worker_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, PropcareError> {
        queries::outbox::mark_sent(self.db()?, id, worker_id, now).await
    }

    async fn reschedule(
        &self,
        id: i64,
        worker_id: &str,
        attempt_count: u32,
        next_attempt_at: DateTime<Utc>,
        error: &str,
    ) -> Result<bool, PropcareError> {
        queries::outbox::reschedule(
            self.db()?,
            id,
            worker_id,
            attempt_count,
            next_attempt_at,
            error,
        )
        .await
    }

    async fn mark_dead(
        &self,
        id: i64,
        worker_id: &str,
        error: &str,
    ) -> Result<bool, PropcareError> {
        queries::outbox::mark_dead(self.db()?, id, worker_id, error).await
    }
}

#[async_trait]
impl SessionStore for SqliteStorage {
    async fn load_session(&self, id: &str) -> Result<Option<TriageState>, PropcareError> {
        queries::sessions::load_session(self.db()?, id).await
    }

    async fn save_session(&self, state: &TriageState) -> Result<(), PropcareError> {
        queries::sessions::save_session(self.db()?, state, Utc::now()).await
    }
}
