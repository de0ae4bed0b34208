// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic emergency detection.
//!
//! Looks only at the latest tenant message. Matching is phrase membership on
//! a word-normalized copy of the text, so `fire` does not match `fireplace`.
//! Categories are checked in a fixed order and the first hit wins:
//! gas, fire, electrical, flooding, structural.

use serde::Serialize;
use strum::{Display, EnumString};

/// Hazard class reported by [`detect_emergency`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EmergencyType {
    Gas,
    Fire,
    Electrical,
    Flooding,
    Structural,
    None,
}

/// Outcome of the emergency policy for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmergencyAssessment {
    pub is_emergency: bool,
    pub emergency_type: EmergencyType,
    pub reason: &'static str,
}

impl EmergencyAssessment {
    const CLEAR: Self = Self {
        is_emergency: false,
        emergency_type: EmergencyType::None,
        reason: "",
    };

    fn hit(emergency_type: EmergencyType, reason: &'static str) -> Self {
        Self {
            is_emergency: true,
            emergency_type,
            reason,
        }
    }
}

const GAS: &[&str] = &[
    "smell gas",
    "smells like gas",
    "smelling gas",
    "smell of gas",
    "gas smell",
    "gas odor",
    "gas odour",
    "gas leak",
    "leaking gas",
    "gas is leaking",
    "hissing gas",
    "rotten egg",
    "rotten eggs",
];

const FIRE: &[&str] = &[
    "fire",
    "on fire",
    "flames",
    "smoke",
    "smoking",
    "burning smell",
    "smell burning",
    "smells like burning",
    "something burning",
];

const ELECTRICAL_HAZARD: &[&str] = &[
    "spark",
    "sparks",
    "sparking",
    "arcing",
    "shock",
    "shocked",
    "electrocuted",
    "electrocution",
    "melted",
    "melting",
    "scorch",
    "scorched",
];

const ELECTRICAL_LOCATION: &[&str] = &[
    "outlet",
    "outlets",
    "socket",
    "sockets",
    "plug",
    "panel",
    "electrical panel",
    "breaker",
    "breakers",
    "breaker box",
    "fuse box",
    "switch",
    "light switch",
    "wiring",
    "wire",
    "wires",
];

const WATER: &[&str] = &[
    "water",
    "leak",
    "leaking",
    "dripping",
    "drips",
    "wet",
    "soaked",
];

// Bare "light" is left out: indicator and pilot lights on appliances
// that use water are not wiring.
const ELECTRICAL_FIXTURE: &[&str] = &[
    "light fixture",
    "light fixtures",
    "ceiling light",
    "ceiling lights",
    "outlet",
    "socket",
    "panel",
    "breaker",
    "breaker box",
    "fuse box",
    "wiring",
];

/// Water travelling through a light, e.g. "dripping through the light".
const THROUGH_LIGHT: &[&str] = &[
    "through the light",
    "through the lights",
    "through light",
    "from the light",
    "from the lights",
    "out of the light",
    "out of the lights",
    "into the light",
    "into the lights",
    "inside the light",
];

const FLOODING: &[&str] = &[
    "flood",
    "flooding",
    "flooded",
    "burst pipe",
    "pipe burst",
    "pipe has burst",
    "sprinkler burst",
    "water everywhere",
    "water pouring",
    "pouring water",
    "gushing",
    "uncontrolled water",
    "can t stop the water",
    "cannot stop the water",
    "water won t stop",
];

const STRUCTURAL: &[&str] = &[
    "ceiling collapsed",
    "ceiling collapsing",
    "ceiling caving",
    "ceiling sagging",
    "ceiling bulging",
    "caving in",
    "collapsed",
    "collapsing",
    "collapse",
    "structural",
    "wall cracking open",
    "floor gave way",
    "balcony loose",
];

/// Lowercases and replaces every non-alphanumeric run with one space,
/// padding both ends so phrases can be matched on word boundaries.
fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push(' ');
    let mut last_space = true;
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            out.push(c);
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    if !last_space {
        out.push(' ');
    }
    out
}

fn mentions_any(normalized: &str, phrases: &[&str]) -> bool {
    phrases
        .iter()
        .any(|p| normalized.contains(&format!(" {p} ")))
}

/// Classifies the latest tenant message.
///
/// Pure and deterministic: the same text always yields the same assessment.
pub fn detect_emergency(latest_message: &str) -> EmergencyAssessment {
    let text = normalize(latest_message);

    if mentions_any(&text, GAS) {
        return EmergencyAssessment::hit(EmergencyType::Gas, "Possible gas leak.");
    }
    if mentions_any(&text, FIRE) {
        return EmergencyAssessment::hit(EmergencyType::Fire, "Possible fire or smoke.");
    }
    if mentions_any(&text, ELECTRICAL_HAZARD) && mentions_any(&text, ELECTRICAL_LOCATION) {
        return EmergencyAssessment::hit(EmergencyType::Electrical, "Possible electrical hazard.");
    }
    if mentions_any(&text, WATER)
        && (mentions_any(&text, ELECTRICAL_FIXTURE) || mentions_any(&text, THROUGH_LIGHT))
    {
        return EmergencyAssessment::hit(
            EmergencyType::Electrical,
            "Water contact with electrical fixtures.",
        );
    }
    if mentions_any(&text, FLOODING) {
        return EmergencyAssessment::hit(EmergencyType::Flooding, "Major water leak or flooding.");
    }
    if mentions_any(&text, STRUCTURAL) {
        return EmergencyAssessment::hit(EmergencyType::Structural, "Possible structural failure.");
    }
    EmergencyAssessment::CLEAR
}
