// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-turn triage state machine.
//!
//! Each call to [`TurnOrchestrator::run_turn`] walks the same fixed sequence
//! of [`TurnStage`]s. Nothing is persisted before the completion output has
//! been parsed, except the ticket itself on the first turn of a session, and
//! that ticket is bound to the session immediately so a replayed turn reuses
//! it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use propcare_config::PropcareConfig;
use propcare_core::types::{
    Category, CompletionRequest, EnqueueOutcome, Message, NewTicket, TicketStatus, TicketUpdate,
    TriageState, TriageTurn, Urgency,
};
use propcare_core::{CompletionProvider, NotificationOutbox, PropcareError, TicketStore};
use strum::Display;
use tracing::{debug, info, warn};

use crate::notify::{
    TICKET_ACTION_REQUIRED, TICKET_CREATED, TICKET_EMERGENCY, enqueue_ticket_event,
};
use crate::policy::{EmergencyAssessment, EmergencyType, detect_emergency};
use crate::prompt;

/// Steps of a turn, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum TurnStage {
    Detect,
    EnsureTicket,
    Complete,
    Reconcile,
    Persist,
    Notify,
    Respond,
}

/// Tunables for the orchestrator, usually taken from `[triage]` and `[notify]`.
#[derive(Debug, Clone)]
pub struct TriageSettings {
    pub history_window: usize,
    pub max_summary_chars: usize,
    pub temperature: f32,
    pub emergency_temperature: f32,
    pub source: String,
    /// Operations inbox. Notifications are skipped when unset.
    pub notify_to: Option<String>,
    pub notify_on_create: bool,
}

impl TriageSettings {
    pub fn from_config(config: &PropcareConfig) -> Self {
        Self {
            history_window: config.triage.history_window,
            max_summary_chars: config.triage.max_summary_chars,
            temperature: config.triage.temperature,
            emergency_temperature: config.triage.emergency_temperature,
            source: config.triage.source.clone(),
            notify_to: config.notify.to_email.clone(),
            notify_on_create: config.notify.on_ticket_created,
        }
    }
}

impl Default for TriageSettings {
    fn default() -> Self {
        Self::from_config(&PropcareConfig::default())
    }
}

/// What a completed turn reports back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub ticket_id: i64,
    /// True once the session has a ticket. Stays true on later turns.
    pub ticket_created: bool,
    /// True only on the turn that inserted the ticket.
    pub new_ticket: bool,
    pub reply: String,
    pub urgency: Urgency,
    pub status: TicketStatus,
    pub category: Category,
    pub emergency: EmergencyType,
    /// `None` when no notification was due or no recipient is configured.
    pub notification: Option<EnqueueOutcome>,
}

/// Runs triage turns against injected collaborators.
///
/// Built once at startup and shared by handle; holds no per-session state.
pub struct TurnOrchestrator {
    completion: Arc<dyn CompletionProvider>,
    tickets: Arc<dyn TicketStore>,
    outbox: Arc<dyn NotificationOutbox>,
    settings: TriageSettings,
}

impl TurnOrchestrator {
    pub fn new(
        completion: Arc<dyn CompletionProvider>,
        tickets: Arc<dyn TicketStore>,
        outbox: Arc<dyn NotificationOutbox>,
        settings: TriageSettings,
    ) -> Self {
        Self {
            completion,
            tickets,
            outbox,
            settings,
        }
    }

    pub fn settings(&self) -> &TriageSettings {
        &self.settings
    }

    /// Runs one turn for the latest tenant message in `state`.
    ///
    /// On success the assistant reply is appended to `state.messages`. On
    /// failure the transcript is left untouched, though `state.ticket_id`
    /// may already be bound if the ticket was created this turn.
    pub async fn run_turn(&self, state: &mut TriageState) -> Result<TurnOutcome, PropcareError> {
        let session_id = state.session_id.clone();
        let fail = |stage: TurnStage| {
            let session_id = session_id.clone();
            move |e: PropcareError| {
                warn!(session_id = %session_id, %stage, error = %e, "triage turn failed");
                e
            }
        };

        // Detect
        let latest = state
            .latest_user_text()
            .map(str::to_owned)
            .ok_or_else(|| PropcareError::validation("turn has no tenant message"))
            .map_err(fail(TurnStage::Detect))?;
        let assessment = detect_emergency(&latest);
        if assessment.is_emergency {
            warn!(
                session_id = %session_id,
                emergency_type = %assessment.emergency_type,
                reason = assessment.reason,
                "emergency detected"
            );
        }

        // Ensure ticket
        let (ticket_id, new_ticket) = match state.ticket_id {
            Some(id) => (id, false),
            None => {
                let id = self
                    .open_ticket(state, &latest)
                    .await
                    .map_err(fail(TurnStage::EnsureTicket))?;
                (id, true)
            }
        };

        // Complete
        let request = CompletionRequest {
            instructions: prompt::instructions(&state.identity, ticket_id, &assessment),
            messages: state
                .recent_messages(self.settings.history_window)
                .to_vec(),
            temperature: if assessment.is_emergency {
                self.settings.emergency_temperature
            } else {
                self.settings.temperature
            },
            schema_name: prompt::SCHEMA_NAME.to_string(),
            output_schema: prompt::output_schema(),
        };
        let response = self
            .completion
            .complete(request)
            .await
            .map_err(fail(TurnStage::Complete))?;
        debug!(
            session_id = %session_id,
            response_id = %response.id,
            model = %response.model,
            "completion received"
        );
        let turn = parse_turn(&response.content).map_err(fail(TurnStage::Complete))?;

        // Reconcile
        let turn = reconcile(turn, &assessment, &latest);
        let reply = Message::assistant(turn.tenant_reply.clone())
            .map_err(fail(TurnStage::Reconcile))?;

        // Persist
        let previous = self
            .tickets
            .get_issue_details(ticket_id)
            .await
            .map_err(fail(TurnStage::Persist))?;
        let update = TicketUpdate {
            summary: turn.summary_for_ticket.clone(),
            urgency: turn.urgency,
            status: turn.status,
            category: turn.category,
            issue_details: append_detail(previous.as_deref(), &detail_line(Utc::now(), &latest)),
        };
        let ticket = self
            .tickets
            .update_ticket(ticket_id, &update)
            .await
            .map_err(fail(TurnStage::Persist))?;

        // Notify
        let mut notification = None;
        if turn.should_notify_manager && turn.status == TicketStatus::ActionRequired {
            match &self.settings.notify_to {
                Some(to) => {
                    let (event_type, emergency) = if assessment.is_emergency {
                        (TICKET_EMERGENCY, Some(assessment.emergency_type))
                    } else {
                        (TICKET_ACTION_REQUIRED, None)
                    };
                    let outcome =
                        enqueue_ticket_event(self.outbox.as_ref(), event_type, &ticket, to, emergency)
                            .await
                            .map_err(fail(TurnStage::Notify))?;
                    notification = Some(outcome);
                }
                None => warn!(
                    ticket_id,
                    "notification due but notify.to_email is not configured"
                ),
            }
        }

        // Respond
        state.messages.push(reply);
        state.ticket_id = Some(ticket_id);
        state.ticket_created = true;

        info!(
            session_id = %session_id,
            ticket_id,
            urgency = %turn.urgency,
            status = %turn.status,
            notified = notification.is_some(),
            "triage turn completed"
        );

        Ok(TurnOutcome {
            ticket_id,
            ticket_created: true,
            new_ticket,
            reply: turn.tenant_reply,
            urgency: turn.urgency,
            status: turn.status,
            category: turn.category,
            emergency: assessment.emergency_type,
            notification,
        })
    }

    /// Inserts the intake ticket and binds it to the session.
    async fn open_ticket(
        &self,
        state: &mut TriageState,
        latest: &str,
    ) -> Result<i64, PropcareError> {
        let ticket = self
            .tickets
            .create_ticket(&NewTicket {
                summary: initial_summary(latest, self.settings.max_summary_chars),
                urgency: Urgency::Soon,
                status: TicketStatus::Intake,
                identity: state.identity.clone(),
                source: self.settings.source.clone(),
            })
            .await?;

        state.ticket_id = Some(ticket.id);
        state.ticket_created = true;
        info!(session_id = %state.session_id, ticket_id = ticket.id, "ticket created");

        if self.settings.notify_on_create
            && let Some(to) = &self.settings.notify_to
        {
            enqueue_ticket_event(self.outbox.as_ref(), TICKET_CREATED, &ticket, to, None).await?;
        }
        Ok(ticket.id)
    }
}

/// `Tenant report: <text>`, cut to `max_chars` characters.
pub fn initial_summary(latest: &str, max_chars: usize) -> String {
    format!("Tenant report: {latest}")
        .trim()
        .chars()
        .take(max_chars)
        .collect()
}

/// Parses and checks the completion service's structured output.
pub fn parse_turn(raw: &str) -> Result<TriageTurn, PropcareError> {
    let mut turn: TriageTurn = serde_json::from_str(raw).map_err(|e| {
        PropcareError::validation(format!("completion output does not match schema: {e}"))
    })?;
    turn.tenant_reply = turn.tenant_reply.trim().to_string();
    turn.summary_for_ticket = turn.summary_for_ticket.trim().to_string();
    if turn.tenant_reply.is_empty() {
        return Err(PropcareError::validation("completion returned an empty tenant_reply"));
    }
    Ok(turn)
}

/// Applies the deterministic overrides. The policy result always wins.
pub fn reconcile(mut turn: TriageTurn, assessment: &EmergencyAssessment, latest: &str) -> TriageTurn {
    if assessment.is_emergency {
        turn.urgency = Urgency::Emergency;
        turn.status = TicketStatus::ActionRequired;
        turn.should_notify_manager = true;
        if turn.summary_for_ticket.is_empty() {
            turn.summary_for_ticket = format!(
                "[EMERGENCY:{}] {} Tenant said: {latest}",
                assessment.emergency_type, assessment.reason
            );
        }
    }
    if turn.summary_for_ticket.is_empty() {
        turn.summary_for_ticket = format!("Tenant report: {latest}");
    }
    turn
}

/// One issue-detail line: `<UTC seconds>Z | user: <text>`.
pub fn detail_line(now: DateTime<Utc>, latest: &str) -> String {
    format!("{}Z | user: {latest}", now.format("%Y-%m-%dT%H:%M:%S"))
}

/// Appends `line` to the existing log. Existing lines are kept as-is.
pub fn append_detail(previous: Option<&str>, line: &str) -> String {
    match previous.map(str::trim) {
        Some(base) if !base.is_empty() => format!("{base}\n{line}"),
        _ => line.to_string(),
    }
}
