// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests: a tenant turn through the orchestrator, then the
//! delivery worker draining the outbox into the mail transport.
//!
//! Each test creates an isolated TestHarness with a temp SQLite store.

use std::time::Duration;

use chrono::{TimeDelta, Utc};
use propcare_core::types::{Message, OutboxStatus, TenantIdentity, TriageState};
use propcare_notify::{DeliveryWorker, PassReport, WorkerSettings};
use propcare_test_utils::{TestHarness, turn_json};
use propcare_triage::{TriageSettings, TurnOrchestrator};

fn orchestrator(harness: &TestHarness, notify_on_create: bool) -> TurnOrchestrator {
    TurnOrchestrator::new(
        harness.completion.clone(),
        harness.storage.clone(),
        harness.storage.clone(),
        TriageSettings {
            notify_to: Some("ops@example.com".into()),
            notify_on_create,
            ..TriageSettings::default()
        },
    )
}

fn worker(harness: &TestHarness) -> DeliveryWorker {
    DeliveryWorker::new(
        harness.storage.clone(),
        harness.mailer.clone(),
        WorkerSettings {
            worker_id: "e2e-worker".into(),
            batch_size: 10,
            poll_interval: Duration::from_millis(20),
            visibility_timeout: Duration::from_secs(300),
            delivery_timeout: Duration::from_secs(2),
            reply_to: Some("manager@example.com".into()),
        },
    )
}

fn tenant_session(id: &str) -> TriageState {
    TriageState::new(
        id,
        TenantIdentity {
            tenant_name: Some("Dana Ruiz".into()),
            tenant_email: Some("dana@example.com".into()),
            tenant_phone: None,
            property_address: Some("12 Birch St".into()),
            unit: Some("4B".into()),
        },
    )
}

async fn say(orch: &TurnOrchestrator, state: &mut TriageState, text: &str) -> i64 {
    state.messages.push(Message::user(text).unwrap());
    orch.run_turn(state).await.unwrap().ticket_id
}

// ---- Emergency report to manager email ----

#[tokio::test]
async fn gas_report_reaches_manager_inbox() {
    let harness = TestHarness::new().await.unwrap();
    let orch = orchestrator(&harness, false);
    let mut state = tenant_session("e2e-gas");

    let ticket_id = say(&orch, &mut state, "There is a strong gas smell in the hallway").await;

    let report = worker(&harness).run_once().await.unwrap();
    assert_eq!(
        report,
        PassReport {
            claimed: 1,
            sent: 1,
            ..PassReport::default()
        }
    );

    let sent = harness.mailer.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "ops@example.com");
    assert_eq!(sent[0].reply_to.as_deref(), Some("manager@example.com"));
    assert_eq!(
        sent[0].subject,
        format!("[PropCare] EMERGENCY (gas) Ticket #{ticket_id}")
    );
    assert!(sent[0].body.contains("Dana Ruiz"));
    assert!(sent[0].body.contains("12 Birch St"));
    assert!(sent[0].body.contains("user: There is a strong gas smell in the hallway"));

    let rows = harness.storage.outbox_for_ticket(ticket_id).await.unwrap();
    assert_eq!(rows[0].status, OutboxStatus::Sent);
    assert!(rows[0].sent_at.is_some());
}

// ---- Routine conversation never emails ----

#[tokio::test]
async fn routine_intake_sends_nothing() {
    let harness = TestHarness::new().await.unwrap();
    let orch = orchestrator(&harness, false);
    let mut state = tenant_session("e2e-routine");

    say(&orch, &mut state, "The closet door squeaks").await;
    say(&orch, &mut state, "It's the bedroom one").await;

    let report = worker(&harness).run_once().await.unwrap();
    assert_eq!(report, PassReport::default());
    assert!(harness.mailer.sent().await.is_empty());
}

// ---- Escalation across turns ----

#[tokio::test]
async fn action_required_then_new_hazard_sends_two_emails() {
    let harness = TestHarness::builder()
        .with_completions(vec![
            turn_json(
                "I've flagged this for the manager.",
                "plumbing",
                "P1",
                "action_required",
                true,
                "Water heater leaking",
            ),
            turn_json(
                "I've flagged this for the manager.",
                "plumbing",
                "P1",
                "action_required",
                true,
                "Water heater leaking",
            ),
            turn_json(
                "Please stay away from the outlet. Is the power off?",
                "electrical",
                "P0",
                "action_required",
                true,
                "Water reaching outlet",
            ),
        ])
        .build()
        .await
        .unwrap();
    let orch = orchestrator(&harness, false);
    let mut state = tenant_session("e2e-escalate");

    let ticket_id = say(&orch, &mut state, "My water heater is leaking a little").await;
    say(&orch, &mut state, "It is still leaking").await;
    say(&orch, &mut state, "Now there is water near the outlet").await;

    worker(&harness).run_once().await.unwrap();

    let subjects: Vec<String> = harness
        .mailer
        .sent()
        .await
        .into_iter()
        .map(|e| e.subject)
        .collect();
    assert_eq!(subjects.len(), 2);
    assert!(subjects.contains(&format!(
        "[PropCare] Ticket #{ticket_id} (P1_URGENT) needs action"
    )));
    assert!(subjects.contains(&format!(
        "[PropCare] EMERGENCY (electrical) Ticket #{ticket_id}"
    )));
}

// ---- Creation notice ----

#[tokio::test]
async fn creation_notice_is_sent_once_per_ticket() {
    let harness = TestHarness::new().await.unwrap();
    let orch = orchestrator(&harness, true);
    let mut state = tenant_session("e2e-created");

    let ticket_id = say(&orch, &mut state, "The dishwasher won't drain").await;
    say(&orch, &mut state, "It has been two days").await;

    worker(&harness).run_once().await.unwrap();

    let sent = harness.mailer.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].subject,
        format!("[PropCare] Ticket #{ticket_id} (P2_SOON) created")
    );
}

// ---- Delivery outage ----

#[tokio::test]
async fn outage_delays_but_does_not_lose_notification() {
    let harness = TestHarness::builder()
        .with_mailer_failures(1)
        .build()
        .await
        .unwrap();
    let orch = orchestrator(&harness, false);
    let mut state = tenant_session("e2e-outage");
    let ticket_id = say(&orch, &mut state, "Smoke is coming out of the oven").await;
    let worker = worker(&harness);

    let now = Utc::now();
    let first = worker.run_once_at(now).await.unwrap();
    assert_eq!(first.retried, 1);

    let too_early = worker
        .run_once_at(now + TimeDelta::seconds(60))
        .await
        .unwrap();
    assert_eq!(too_early.claimed, 0);

    let retry = worker
        .run_once_at(now + TimeDelta::seconds(121))
        .await
        .unwrap();
    assert_eq!(retry.sent, 1);

    let rows = harness.storage.outbox_for_ticket(ticket_id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, OutboxStatus::Sent);
    assert_eq!(rows[0].attempt_count, 1);
    assert_eq!(harness.mailer.attempts(), 2);
    assert_eq!(harness.mailer.sent().await.len(), 1);
}
