// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbox delivery worker.
//!
//! Each pass claims due rows under a lease, renders and sends them one by
//! one, then marks each row sent, rescheduled, or dead. Any number of
//! workers may poll the same outbox; the atomic claim keeps them apart.
//!
//! A batch can take longer than one lease. Before each send the worker
//! renews its lease on that row, and skips the row if the lease has already
//! expired, because another worker may have reclaimed it. Since a send is
//! bounded by `delivery_timeout`, which is shorter than the lease, a renewed
//! lease outlives the send it covers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, TimeDelta, Utc};
use propcare_config::PropcareConfig;
use propcare_core::types::OutboxEntry;
use propcare_core::{MailTransport, NotificationOutbox, PropcareError};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::backoff::next_attempt;
use crate::render::render_entry;

/// Tunables for one worker process, usually from `[worker]` and `[notify]`.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub worker_id: String,
    pub batch_size: u32,
    pub poll_interval: Duration,
    /// Lease length. A row locked longer than this can be claimed again.
    pub visibility_timeout: Duration,
    /// Upper bound on a single send.
    pub delivery_timeout: Duration,
    pub reply_to: Option<String>,
}

impl WorkerSettings {
    pub fn from_config(config: &PropcareConfig) -> Self {
        Self {
            worker_id: config.worker.resolved_worker_id(),
            batch_size: config.worker.batch_size,
            poll_interval: config.worker.poll_interval(),
            visibility_timeout: config.worker.visibility_timeout(),
            delivery_timeout: config.worker.delivery_timeout(),
            reply_to: config.notify.reply_to.clone(),
        }
    }
}

/// Counts for one polling pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    pub claimed: usize,
    pub sent: usize,
    pub retried: usize,
    pub dead: usize,
    /// Rows skipped because their lease expired before their turn came.
    pub lost: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowOutcome {
    Sent,
    Retried,
    Dead,
    Lost,
}

pub struct DeliveryWorker {
    outbox: Arc<dyn NotificationOutbox>,
    mailer: Arc<dyn MailTransport>,
    settings: WorkerSettings,
}

impl DeliveryWorker {
    pub fn new(
        outbox: Arc<dyn NotificationOutbox>,
        mailer: Arc<dyn MailTransport>,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            outbox,
            mailer,
            settings,
        }
    }

    pub fn worker_id(&self) -> &str {
        &self.settings.worker_id
    }

    /// Polls until `cancel` fires. A failed pass is logged and the loop continues.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            worker_id = %self.settings.worker_id,
            batch_size = self.settings.batch_size,
            poll_interval_ms = self.settings.poll_interval.as_millis() as u64,
            "delivery worker started"
        );

        let mut interval = tokio::time::interval(self.settings.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.run_once().await {
                        Ok(report) if report.claimed > 0 => {
                            info!(
                                claimed = report.claimed,
                                sent = report.sent,
                                retried = report.retried,
                                dead = report.dead,
                                lost = report.lost,
                                "delivery pass complete"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => {
                            warn!(error = %e, "delivery pass failed (non-fatal)");
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    info!(worker_id = %self.settings.worker_id, "delivery worker shutting down");
                    break;
                }
            }
        }
    }

    /// Runs one pass at the current time.
    pub async fn run_once(&self) -> Result<PassReport, PropcareError> {
        self.run_once_at(Utc::now()).await
    }

    /// Runs one pass starting at `now`.
    ///
    /// Each row is handled at `now` plus the wall time the pass has spent so
    /// far, so lease checks and retry schedules track a slow batch.
    ///
    /// Only a failed claim is returned as an error. Failures on individual
    /// rows are recorded on the row and counted in the report.
    pub async fn run_once_at(&self, now: DateTime<Utc>) -> Result<PassReport, PropcareError> {
        let started = Instant::now();
        let rows = self
            .outbox
            .claim_due(
                &self.settings.worker_id,
                self.settings.batch_size,
                self.settings.visibility_timeout,
                now,
            )
            .await?;

        let mut report = PassReport {
            claimed: rows.len(),
            ..PassReport::default()
        };
        if rows.is_empty() {
            return Ok(report);
        }
        debug!(worker_id = %self.settings.worker_id, claimed = rows.len(), "claimed outbox rows");

        for entry in &rows {
            let elapsed = TimeDelta::from_std(started.elapsed()).unwrap_or(TimeDelta::zero());
            let row_now = now + elapsed;
            match self.deliver(entry, row_now).await {
                RowOutcome::Sent => report.sent += 1,
                RowOutcome::Retried => report.retried += 1,
                RowOutcome::Dead => report.dead += 1,
                RowOutcome::Lost => report.lost += 1,
            }
        }
        Ok(report)
    }

    async fn deliver(&self, entry: &OutboxEntry, now: DateTime<Utc>) -> RowOutcome {
        let worker_id = self.settings.worker_id.as_str();
        match self
            .outbox
            .renew_lease(entry.id, worker_id, self.settings.visibility_timeout, now)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                warn!(row_id = entry.id, worker_id, "lease expired before send, skipping row");
                return RowOutcome::Lost;
            }
            Err(e) => {
                warn!(row_id = entry.id, error = %e, "could not renew lease, skipping row");
                return RowOutcome::Lost;
            }
        }

        let email = match render_entry(entry, self.settings.reply_to.as_deref()) {
            Ok(email) => email,
            Err(e) => return self.dead_letter(entry, &e).await,
        };

        let result = match tokio::time::timeout(self.settings.delivery_timeout, self.mailer.send(&email)).await {
            Ok(result) => result,
            Err(_) => Err(PropcareError::Timeout {
                duration: self.settings.delivery_timeout,
            }),
        };

        match result {
            Ok(()) => {
                match self.outbox.mark_sent(entry.id, worker_id, now).await {
                    Ok(true) => {}
                    Ok(false) => warn!(row_id = entry.id, worker_id, "sent after losing the lease"),
                    Err(e) => error!(
                        row_id = entry.id,
                        error = %e,
                        "sent but failed to mark row; it will be resent after the lease expires"
                    ),
                }
                info!(
                    row_id = entry.id,
                    ticket_id = entry.ticket_id,
                    event_type = %entry.event_type,
                    to = %entry.to_email,
                    "notification sent"
                );
                RowOutcome::Sent
            }
            Err(e) if !e.is_retryable_delivery() => self.dead_letter(entry, &e).await,
            Err(e) => {
                let (attempt, next_at) = next_attempt(entry.attempt_count, now);
                match self
                    .outbox
                    .reschedule(entry.id, worker_id, attempt, next_at, &e.to_string())
                    .await
                {
                    Ok(true) => {}
                    Ok(false) => {
                        warn!(row_id = entry.id, worker_id, "lease lost, retry left to its holder");
                    }
                    Err(store_err) => {
                        error!(row_id = entry.id, error = %store_err, "failed to reschedule row");
                    }
                }
                warn!(
                    row_id = entry.id,
                    event_type = %entry.event_type,
                    attempt,
                    next_attempt_at = %next_at,
                    error = %e,
                    "delivery failed, rescheduled"
                );
                RowOutcome::Retried
            }
        }
    }

    async fn dead_letter(&self, entry: &OutboxEntry, cause: &PropcareError) -> RowOutcome {
        match self
            .outbox
            .mark_dead(entry.id, &self.settings.worker_id, &cause.to_string())
            .await
        {
            Ok(true) => {}
            Ok(false) => warn!(row_id = entry.id, "lease lost before dead-lettering"),
            Err(store_err) => {
                error!(row_id = entry.id, error = %store_err, "failed to dead-letter row");
            }
        }
        error!(
            row_id = entry.id,
            event_type = %entry.event_type,
            error = %cause,
            "row cannot be delivered, dead-lettered"
        );
        RowOutcome::Dead
    }
}
