// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Instructions and output schema for the completion call.

use std::fmt::Write;

use propcare_core::types::TenantIdentity;
use serde_json::{Value, json};

use crate::policy::{EmergencyAssessment, EmergencyType};

/// Name under which [`output_schema`] is registered with the completion service.
pub const SCHEMA_NAME: &str = "triage_turn";

/// Base instructions sent on every turn.
pub const SYSTEM_PROMPT: &str = "\
You are PropCare, a maintenance triage assistant for residential tenants.

Your job is to understand the tenant's maintenance problem, walk them through safe basic checks when that helps, and escalate to property management when a person needs to act.

SAFETY:
- If the tenant reports fire, smoke, a gas smell, sparking, major flooding, or any immediate danger, tell them to get to safety and contact emergency services. Do not troubleshoot.
- Never suggest opening electrical panels, touching wiring or gas lines, taking apart fixtures or appliances, or using tools or force.

CONVERSATION:
- Ask at most one question per reply.
- Suggest at most one simple, safe step per reply.
- Do not repeat a step the tenant already tried.
- Ask for a photo only when it would change the diagnosis and is safe to take.

OUTPUT:
- tenant_reply: what the tenant sees. Plain, calm, short.
- category: plumbing, electrical, hvac, appliance, or other.
- urgency: P0 (danger now), P1 (same day), P2 (within a few days), P3 (routine).
- status: intake while still gathering facts, action_required when staff must act, resolved when the tenant confirms it is fixed.
- should_notify_manager: true only when staff must act.
- summary_for_ticket: one or two sentences for maintenance staff.";

/// Builds the non-tenant-facing block appended to [`SYSTEM_PROMPT`].
///
/// Lists the identity fields and ticket id. When the emergency policy fired,
/// adds backend directives the model must follow.
pub fn context_block(
    identity: &TenantIdentity,
    ticket_id: i64,
    assessment: &EmergencyAssessment,
) -> String {
    let field = |v: &Option<String>| v.as_deref().unwrap_or("").to_string();

    let mut out = String::from("CONTEXT (not tenant-facing):\n");
    let _ = writeln!(out, "- Tenant name: {}", field(&identity.tenant_name));
    let _ = writeln!(out, "- Tenant email: {}", field(&identity.tenant_email));
    let _ = writeln!(out, "- Tenant phone: {}", field(&identity.tenant_phone));
    let _ = writeln!(out, "- Property address: {}", field(&identity.property_address));
    let _ = writeln!(out, "- Unit: {}", field(&identity.unit));
    let _ = writeln!(out, "- Ticket id: {ticket_id}");

    if assessment.is_emergency {
        out.push_str("\nBACKEND:\n");
        out.push_str("- emergency=true\n");
        let _ = writeln!(out, "- emergency_type={}", assessment.emergency_type);
        out.push_str("RULES:\n");
        out.push_str(
            "- EMERGENCY MODE: give brief safety guidance, stop troubleshooting, \
             and ask exactly ONE safety confirmation question.\n",
        );
        if assessment.emergency_type == EmergencyType::Gas {
            out.push_str(
                "- Tell the tenant to leave the unit and call the gas utility's \
                 emergency line or 911 from outside.\n",
            );
        }
        out.push_str("- Set status=action_required and should_notify_manager=true.\n");
    }

    out
}

/// Full instruction text for one turn.
pub fn instructions(
    identity: &TenantIdentity,
    ticket_id: i64,
    assessment: &EmergencyAssessment,
) -> String {
    format!(
        "{SYSTEM_PROMPT}\n\n{}",
        context_block(identity, ticket_id, assessment)
    )
}

/// Strict JSON schema for a triage turn.
///
/// Every property is required and no extras are allowed, which is what
/// strict structured-output modes demand.
pub fn output_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "tenant_reply": { "type": "string" },
            "category": {
                "type": "string",
                "enum": ["plumbing", "electrical", "hvac", "appliance", "other"]
            },
            "urgency": { "type": "string", "enum": ["P0", "P1", "P2", "P3"] },
            "status": {
                "type": "string",
                "enum": ["intake", "action_required", "resolved"]
            },
            "should_notify_manager": { "type": "boolean" },
            "summary_for_ticket": { "type": "string" }
        },
        "required": [
            "tenant_reply",
            "category",
            "urgency",
            "status",
            "should_notify_manager",
            "summary_for_ticket"
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::detect_emergency;

    fn identity() -> TenantIdentity {
        TenantIdentity {
            tenant_name: Some("Dana Ruiz".into()),
            tenant_email: Some("dana@example.com".into()),
            tenant_phone: None,
            property_address: Some("12 Birch St".into()),
            unit: Some("4B".into()),
        }
    }

    #[test]
    fn context_lists_identity_and_ticket() {
        let block = context_block(&identity(), 42, &detect_emergency("faucet drips"));
        assert!(block.starts_with("CONTEXT (not tenant-facing):\n- Tenant name: Dana Ruiz\n"));
        assert!(block.contains("- Tenant phone: \n"));
        assert!(block.contains("- Unit: 4B\n"));
        assert!(block.contains("- Ticket id: 42\n"));
        assert!(!block.contains("BACKEND"));
    }

    #[test]
    fn emergency_adds_directives() {
        let block = context_block(&identity(), 7, &detect_emergency("I smell gas"));
        assert!(block.contains("- emergency=true\n- emergency_type=gas\n"));
        assert!(block.contains("exactly ONE safety confirmation question"));
        assert!(block.contains("gas utility"));
        assert!(block.contains("status=action_required and should_notify_manager=true"));
    }

    #[test]
    fn gas_line_only_for_gas() {
        let block = context_block(&identity(), 7, &detect_emergency("the basement is flooded"));
        assert!(block.contains("emergency_type=flooding"));
        assert!(!block.contains("gas utility"));
    }

    #[test]
    fn schema_requires_every_property() {
        let schema = output_schema();
        let props = schema["properties"].as_object().unwrap();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(props.len(), required.len());
        for key in props.keys() {
            assert!(required.contains(&key.as_str()), "{key} not required");
        }
        assert_eq!(schema["additionalProperties"], json!(false));
    }

    #[test]
    fn instructions_start_with_system_prompt() {
        let text = instructions(&identity(), 1, &detect_emergency("hello"));
        assert!(text.starts_with(SYSTEM_PROMPT));
        assert!(text.contains("CONTEXT (not tenant-facing):"));
    }
}
