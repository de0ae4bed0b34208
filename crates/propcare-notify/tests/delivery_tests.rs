// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery worker retry behavior over a real outbox.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use propcare_core::types::{
    AdapterType, EnqueueOutcome, HealthStatus, NewNotification, NewTicket, OutboundEmail,
    OutboxStatus, TenantIdentity, TicketStatus, Urgency, format_timestamp,
};
use propcare_core::{MailTransport, NotificationOutbox, PluginAdapter, PropcareError, TicketStore};
use propcare_notify::{DeliveryWorker, WorkerSettings};
use propcare_test_utils::{MockMailer, TestHarness};

fn settings(worker_id: &str) -> WorkerSettings {
    WorkerSettings {
        worker_id: worker_id.into(),
        batch_size: 10,
        poll_interval: Duration::from_millis(50),
        visibility_timeout: Duration::from_secs(300),
        delivery_timeout: Duration::from_secs(2),
        reply_to: None,
    }
}

async fn seed(harness: &TestHarness) -> i64 {
    let ticket = harness
        .storage
        .create_ticket(&NewTicket {
            summary: "Burst pipe".into(),
            urgency: Urgency::Emergency,
            status: TicketStatus::ActionRequired,
            identity: TenantIdentity::default(),
            source: "web".into(),
        })
        .await
        .unwrap();
    let outcome = harness
        .storage
        .enqueue(&NewNotification {
            event_type: "ticket.emergency".into(),
            ticket_id: ticket.id,
            to_email: "ops@example.com".into(),
            payload: serde_json::json!({"ticket": {"id": ticket.id}, "emergency_type": "flooding"}),
            dedupe_key: format!("ticket.emergency:{}:flooding", ticket.id),
        })
        .await
        .unwrap();
    match outcome {
        EnqueueOutcome::Inserted(id) => id,
        EnqueueOutcome::Duplicate => panic!("fresh store should not dedupe"),
    }
}

#[tokio::test]
async fn failures_follow_backoff_schedule() {
    let harness = TestHarness::builder()
        .with_mailer_failures(3)
        .build()
        .await
        .unwrap();
    let row_id = seed(&harness).await;
    let worker = DeliveryWorker::new(harness.storage.clone(), harness.mailer.clone(), settings("w1"));

    let mut now = Utc::now() + TimeDelta::seconds(1);
    let expected_delays = [120, 300, 600];
    for (i, delay) in expected_delays.iter().enumerate() {
        let report = worker.run_once_at(now).await.unwrap();
        assert_eq!(report.retried, 1, "pass {i}");

        let row = harness.storage.outbox_entry(row_id).await.unwrap().unwrap();
        assert_eq!(row.attempt_count, i as u32 + 1);
        assert_eq!(row.status, OutboxStatus::Pending);
        assert!(row.locked_at.is_none());
        // Rows are scheduled from the time they were handled, which trails
        // the pass start by however long the pass has run.
        let next = now + TimeDelta::seconds(*delay);
        assert!(row.next_attempt_at >= format_timestamp(next));
        assert!(row.next_attempt_at < format_timestamp(next + TimeDelta::seconds(1)));

        // Not due before the delay elapses.
        assert_eq!(worker.run_once_at(next - TimeDelta::seconds(1)).await.unwrap().claimed, 0);
        now = next + TimeDelta::seconds(1);
    }

    let report = worker.run_once_at(now).await.unwrap();
    assert_eq!(report.sent, 1);
    let row = harness.storage.outbox_entry(row_id).await.unwrap().unwrap();
    assert_eq!(row.status, OutboxStatus::Sent);
    assert!(row.last_error.is_none());
    assert_eq!(harness.mailer.attempts(), 4);
}

#[tokio::test]
async fn two_workers_never_send_the_same_row() {
    let harness = TestHarness::new().await.unwrap();
    for _ in 0..6 {
        seed(&harness).await;
    }
    let a = DeliveryWorker::new(harness.storage.clone(), harness.mailer.clone(), settings("a"));
    let b = DeliveryWorker::new(harness.storage.clone(), harness.mailer.clone(), settings("b"));

    let now = Utc::now() + TimeDelta::seconds(1);
    let (ra, rb) = tokio::join!(a.run_once_at(now), b.run_once_at(now));
    let (ra, rb) = (ra.unwrap(), rb.unwrap());

    assert_eq!(ra.claimed + rb.claimed, 6);
    assert_eq!(harness.mailer.sent().await.len(), 6);
    assert_eq!(harness.storage.status_counts().await.unwrap().sent, 6);
}

#[tokio::test]
async fn stale_lease_is_reclaimed() {
    let harness = TestHarness::new().await.unwrap();
    let row_id = seed(&harness).await;
    let now = Utc::now() + TimeDelta::seconds(1);

    // A worker that claimed the row and then died.
    let claimed = harness
        .storage
        .claim_due("crashed", 10, Duration::from_secs(300), now)
        .await
        .unwrap();
    assert_eq!(claimed.len(), 1);

    let worker = DeliveryWorker::new(harness.storage.clone(), harness.mailer.clone(), settings("w2"));
    assert_eq!(worker.run_once_at(now + TimeDelta::seconds(10)).await.unwrap().claimed, 0);

    let report = worker.run_once_at(now + TimeDelta::seconds(301)).await.unwrap();
    assert_eq!(report.sent, 1);
    let row = harness.storage.outbox_entry(row_id).await.unwrap().unwrap();
    assert_eq!(row.status, OutboxStatus::Sent);
}

/// Records through a [`MockMailer`] after a fixed pause per send.
struct PacedMailer {
    inner: Arc<MockMailer>,
    pause: Duration,
}

#[async_trait]
impl PluginAdapter for PacedMailer {
    fn name(&self) -> &str {
        "paced"
    }
    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }
    fn adapter_type(&self) -> AdapterType {
        AdapterType::Mail
    }
    async fn health_check(&self) -> Result<HealthStatus, PropcareError> {
        Ok(HealthStatus::Healthy)
    }
    async fn shutdown(&self) -> Result<(), PropcareError> {
        Ok(())
    }
}

#[async_trait]
impl MailTransport for PacedMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), PropcareError> {
        tokio::time::sleep(self.pause).await;
        self.inner.send(email).await
    }
}

#[tokio::test]
async fn batch_outliving_its_lease_is_not_resent() {
    let harness = TestHarness::new().await.unwrap();
    for _ in 0..6 {
        seed(&harness).await;
    }
    let mailer = Arc::new(PacedMailer {
        inner: harness.mailer.clone(),
        pause: Duration::from_millis(100),
    });
    let short_lease = |worker_id: &str| WorkerSettings {
        visibility_timeout: Duration::from_millis(250),
        delivery_timeout: Duration::from_millis(200),
        ..settings(worker_id)
    };
    let a = DeliveryWorker::new(harness.storage.clone(), mailer.clone(), short_lease("a"));
    let b = DeliveryWorker::new(harness.storage.clone(), mailer.clone(), short_lease("b"));

    // Six sends take A about 600ms, well past its 250ms lease on the batch.
    // B polls once A's untouched rows have gone stale.
    let (ra, rb) = tokio::join!(a.run_once(), async {
        tokio::time::sleep(Duration::from_millis(320)).await;
        b.run_once().await
    });
    let (ra, rb) = (ra.unwrap(), rb.unwrap());

    assert_eq!(ra.claimed, 6);
    assert!(ra.lost > 0, "A should give up rows whose lease expired: {ra:?}");
    assert_eq!(rb.claimed, ra.lost);
    assert_eq!(ra.sent + rb.sent, 6);
    assert_eq!(harness.mailer.sent().await.len(), 6);
    assert_eq!(harness.storage.status_counts().await.unwrap().sent, 6);
}
