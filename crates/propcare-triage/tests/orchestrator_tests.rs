// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turn orchestrator against a real SQLite store and a scripted completion service.

use std::sync::Arc;

use propcare_core::types::{
    EnqueueOutcome, Message, OutboxStatus, TenantIdentity, TicketStatus, TriageState, Urgency,
};
use propcare_core::{PropcareError, TicketStore};
use propcare_test_utils::{TestHarness, turn_json};
use propcare_triage::{EmergencyType, TriageSettings, TurnOrchestrator};

fn settings() -> TriageSettings {
    TriageSettings {
        notify_to: Some("ops@example.com".into()),
        ..TriageSettings::default()
    }
}

fn orchestrator(harness: &TestHarness, settings: TriageSettings) -> TurnOrchestrator {
    TurnOrchestrator::new(
        harness.completion.clone(),
        harness.storage.clone(),
        harness.storage.clone(),
        settings,
    )
}

fn session(first_message: &str) -> TriageState {
    let mut state = TriageState::new(
        "sess-1",
        TenantIdentity {
            tenant_name: Some("Dana Ruiz".into()),
            tenant_email: Some("dana@example.com".into()),
            tenant_phone: Some("555-0100".into()),
            property_address: Some("12 Birch St".into()),
            unit: Some("4B".into()),
        },
    );
    state.messages.push(Message::user(first_message).unwrap());
    state
}

fn routine_turn() -> String {
    turn_json("Can you send a photo?", "plumbing", "P3", "intake", false, "Slow drain")
}

#[tokio::test]
async fn gas_smell_escalates_regardless_of_model() {
    let harness = TestHarness::builder()
        .with_completions(vec![turn_json(
            "Sounds minor, try opening a window.",
            "appliance",
            "P3",
            "intake",
            false,
            "",
        )])
        .build()
        .await
        .unwrap();
    let orch = orchestrator(&harness, settings());
    let mut state = session("I smell gas near the stove");

    let outcome = orch.run_turn(&mut state).await.unwrap();
    assert!(outcome.new_ticket);
    assert_eq!(outcome.emergency, EmergencyType::Gas);
    assert_eq!(outcome.urgency, Urgency::Emergency);
    assert_eq!(outcome.status, TicketStatus::ActionRequired);
    assert_eq!(outcome.notification, Some(EnqueueOutcome::Inserted(1)));

    let ticket = harness.storage.get_ticket(outcome.ticket_id).await.unwrap().unwrap();
    assert_eq!(ticket.urgency, Urgency::Emergency);
    assert_eq!(ticket.status, TicketStatus::ActionRequired);
    assert!(ticket.summary.starts_with("[EMERGENCY:gas] Possible gas leak."));

    let rows = harness.storage.outbox_for_ticket(outcome.ticket_id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].event_type, "ticket.emergency");
    assert_eq!(rows[0].dedupe_key, format!("ticket.emergency:{}:gas", outcome.ticket_id));
    assert_eq!(rows[0].to_email, "ops@example.com");
    assert_eq!(rows[0].status, OutboxStatus::Pending);
    assert_eq!(rows[0].payload["ticket"]["urgency"], "P0_EMERGENCY");
    assert_eq!(rows[0].payload["emergency_type"], "gas");

    let request = &harness.completion.requests().await[0];
    assert!((request.temperature - 0.2).abs() < f32::EPSILON);
    assert!(request.instructions.contains("emergency_type=gas"));
}

#[tokio::test]
async fn second_turn_reuses_ticket_and_appends_detail() {
    let harness = TestHarness::builder()
        .with_completions(vec![routine_turn(), routine_turn()])
        .build()
        .await
        .unwrap();
    let orch = orchestrator(&harness, settings());
    let mut state = session("The bathroom sink drains slowly");

    let first = orch.run_turn(&mut state).await.unwrap();
    assert!(first.new_ticket);
    assert_eq!(state.ticket_id, Some(first.ticket_id));

    state.messages.push(Message::user("It is worse today").unwrap());
    let second = orch.run_turn(&mut state).await.unwrap();
    assert!(!second.new_ticket);
    assert!(second.ticket_created);
    assert_eq!(second.ticket_id, first.ticket_id);

    assert_eq!(harness.storage.ticket_count().await.unwrap(), 1);
    let details = harness
        .storage
        .get_issue_details(first.ticket_id)
        .await
        .unwrap()
        .unwrap();
    let lines: Vec<&str> = details.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("Z | user: The bathroom sink drains slowly"));
    assert!(lines[1].ends_with("Z | user: It is worse today"));

    // user, assistant, user, assistant
    assert_eq!(state.messages.len(), 4);
    assert_eq!(state.messages[3].content, "Can you send a photo?");
}

#[tokio::test]
async fn completion_failure_leaves_ticket_untouched_and_replay_reuses_it() {
    let harness = TestHarness::new().await.unwrap();
    harness.completion.push_error("upstream 503").await;
    harness.completion.push_response(routine_turn()).await;
    let orch = orchestrator(&harness, settings());
    let mut state = session("Dishwasher will not start");

    let err = orch.run_turn(&mut state).await.unwrap_err();
    assert!(matches!(err, PropcareError::Provider { .. }));
    assert_eq!(state.messages.len(), 1, "no reply appended on failure");
    let ticket_id = state.ticket_id.expect("ticket bound before completion");

    let ticket = harness.storage.get_ticket(ticket_id).await.unwrap().unwrap();
    assert_eq!(ticket.status, TicketStatus::Intake);
    assert_eq!(ticket.urgency, Urgency::Soon);
    assert_eq!(ticket.summary, "Tenant report: Dishwasher will not start");
    assert!(ticket.issue_details.is_none());

    let outcome = orch.run_turn(&mut state).await.unwrap();
    assert!(!outcome.new_ticket);
    assert_eq!(outcome.ticket_id, ticket_id);
    assert_eq!(harness.storage.ticket_count().await.unwrap(), 1);
}

#[tokio::test]
async fn malformed_output_aborts_without_persisting() {
    let harness = TestHarness::builder()
        .with_completions(vec![routine_turn(), r#"{"tenant_reply": 5}"#.to_string()])
        .build()
        .await
        .unwrap();
    let orch = orchestrator(&harness, settings());
    let mut state = session("The heater is making noise");
    let first = orch.run_turn(&mut state).await.unwrap();
    let before = harness.storage.get_ticket(first.ticket_id).await.unwrap().unwrap();

    state.messages.push(Message::user("Now it stopped").unwrap());
    let err = orch.run_turn(&mut state).await.unwrap_err();
    assert!(matches!(err, PropcareError::Validation { .. }));

    let after = harness.storage.get_ticket(first.ticket_id).await.unwrap().unwrap();
    assert_eq!(before.issue_details, after.issue_details);
    assert_eq!(before.updated_at, after.updated_at);
    assert_eq!(state.messages.len(), 3);
}

#[tokio::test]
async fn action_required_notifies_once_per_ticket() {
    let escalate = turn_json(
        "A technician will contact you.",
        "hvac",
        "P1",
        "action_required",
        true,
        "No heat in unit",
    );
    let harness = TestHarness::builder()
        .with_completions(vec![escalate.clone(), escalate])
        .build()
        .await
        .unwrap();
    let orch = orchestrator(&harness, settings());
    let mut state = session("There is no heat at all");

    let first = orch.run_turn(&mut state).await.unwrap();
    assert!(matches!(first.notification, Some(EnqueueOutcome::Inserted(_))));

    state.messages.push(Message::user("Still cold").unwrap());
    let second = orch.run_turn(&mut state).await.unwrap();
    assert_eq!(second.notification, Some(EnqueueOutcome::Duplicate));

    let rows = harness.storage.outbox_for_ticket(first.ticket_id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].event_type, "ticket.action_required");
    assert_eq!(rows[0].dedupe_key, format!("ticket.action_required:{}", first.ticket_id));
    assert!(rows[0].payload.get("emergency_type").is_none());
}

#[tokio::test]
async fn notify_flag_without_action_required_does_not_enqueue() {
    let harness = TestHarness::builder()
        .with_completions(vec![turn_json("Noted.", "other", "P3", "intake", true, "Question")])
        .build()
        .await
        .unwrap();
    let orch = orchestrator(&harness, settings());
    let mut state = session("When is the next inspection?");

    let outcome = orch.run_turn(&mut state).await.unwrap();
    assert_eq!(outcome.notification, None);
    assert!(harness.storage.outbox_for_ticket(outcome.ticket_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_recipient_skips_notification() {
    let harness = TestHarness::new().await.unwrap();
    let orch = orchestrator(&harness, TriageSettings::default());
    let mut state = session("The basement is flooded");

    let outcome = orch.run_turn(&mut state).await.unwrap();
    assert_eq!(outcome.emergency, EmergencyType::Flooding);
    assert_eq!(outcome.status, TicketStatus::ActionRequired);
    assert_eq!(outcome.notification, None);
    assert!(harness.storage.outbox_for_ticket(outcome.ticket_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn ticket_created_event_when_enabled() {
    let harness = TestHarness::new().await.unwrap();
    let orch = orchestrator(
        &harness,
        TriageSettings {
            notify_on_create: true,
            ..settings()
        },
    );
    let mut state = session("Fridge light is out");
    let outcome = orch.run_turn(&mut state).await.unwrap();

    let rows = harness.storage.outbox_for_ticket(outcome.ticket_id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].event_type, "ticket.created");
    assert_eq!(rows[0].payload["ticket"]["status"], "intake");
}

#[tokio::test]
async fn history_is_trimmed_to_window() {
    let harness = TestHarness::new().await.unwrap();
    let orch = orchestrator(&harness, settings());
    let mut state = session("message 0");
    for i in 1..20 {
        state.messages.push(Message::user(format!("message {i}")).unwrap());
    }

    orch.run_turn(&mut state).await.unwrap();
    let request = &harness.completion.requests().await[0];
    assert_eq!(request.messages.len(), 12);
    assert_eq!(request.messages[11].content, "message 19");
    assert!((request.temperature - 0.3).abs() < f32::EPSILON);
    assert_eq!(request.schema_name, "triage_turn");
}

#[tokio::test]
async fn state_without_tenant_message_is_rejected() {
    let harness = TestHarness::new().await.unwrap();
    let orch = orchestrator(&harness, settings());
    let mut state = TriageState::new("empty", TenantIdentity::default());

    let err = orch.run_turn(&mut state).await.unwrap_err();
    assert!(matches!(err, PropcareError::Validation { .. }));
    assert_eq!(harness.storage.ticket_count().await.unwrap(), 0);
    assert_eq!(harness.completion.call_count().await, 0);
}

#[tokio::test]
async fn resolved_status_stamps_resolved_at() {
    let harness = TestHarness::builder()
        .with_completions(vec![
            routine_turn(),
            turn_json("Glad it works.", "plumbing", "P3", "resolved", false, "Fixed"),
        ])
        .build()
        .await
        .unwrap();
    let orch = orchestrator(&harness, settings());
    let mut state = session("Toilet keeps running");
    let first = orch.run_turn(&mut state).await.unwrap();
    let ticket = harness.storage.get_ticket(first.ticket_id).await.unwrap().unwrap();
    assert!(ticket.resolved_at.is_none());

    state.messages.push(Message::user("Jiggling the handle fixed it").unwrap());
    orch.run_turn(&mut state).await.unwrap();
    let ticket = harness.storage.get_ticket(first.ticket_id).await.unwrap().unwrap();
    assert_eq!(ticket.status, TicketStatus::Resolved);
    assert!(ticket.resolved_at.is_some());
}

#[tokio::test]
async fn shared_orchestrator_handles_many_sessions() {
    let harness = TestHarness::new().await.unwrap();
    let orch = Arc::new(orchestrator(&harness, settings()));

    let mut handles = Vec::new();
    for i in 0..5 {
        let orch = orch.clone();
        handles.push(tokio::spawn(async move {
            let mut state = TriageState::new(format!("s{i}"), TenantIdentity::default());
            state.messages.push(Message::user(format!("issue {i}")).unwrap());
            orch.run_turn(&mut state).await.unwrap().ticket_id
        }));
    }
    let mut ids = Vec::new();
    for h in handles {
        ids.push(h.await.unwrap());
    }
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 5);
}
