// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks semantic constraints serde attributes cannot express. Every rule is
//! evaluated so one run reports all problems.

use crate::diagnostic::ConfigError;
use crate::model::{EmailTransportKind, PropcareConfig};

const MAX_BATCH_SIZE: u32 = 500;

/// Validate a deserialized configuration.
pub fn validate_config(config: &PropcareConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation("storage.database_path must not be empty"));
    }

    let host = config.server.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::validation("server.host must not be empty"));
    } else if host.parse::<std::net::IpAddr>().is_err()
        && !host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        errors.push(ConfigError::validation(format!(
            "server.host `{host}` is not a valid IP address or hostname"
        )));
    }

    if !matches!(
        config.logging.level.as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        errors.push(ConfigError::validation(format!(
            "logging.level must be one of trace, debug, info, warn, error; got `{}`",
            config.logging.level
        )));
    }

    let triage = &config.triage;
    if triage.history_window < 1 {
        errors.push(ConfigError::validation("triage.history_window must be at least 1"));
    }
    if triage.max_summary_chars < 1 {
        errors.push(ConfigError::validation(
            "triage.max_summary_chars must be at least 1",
        ));
    }
    for (name, value) in [
        ("triage.temperature", triage.temperature),
        ("triage.emergency_temperature", triage.emergency_temperature),
    ] {
        if !(0.0..=2.0).contains(&value) {
            errors.push(ConfigError::validation(format!(
                "{name} must be between 0 and 2, got {value}"
            )));
        }
    }

    if config.openai.timeout_secs == 0 {
        errors.push(ConfigError::validation("openai.timeout_secs must be at least 1"));
    }

    let worker = &config.worker;
    if !(1..=MAX_BATCH_SIZE).contains(&worker.batch_size) {
        errors.push(ConfigError::validation(format!(
            "worker.batch_size must be between 1 and {MAX_BATCH_SIZE}, got {}",
            worker.batch_size
        )));
    }
    if worker.poll_interval_ms < 10 {
        errors.push(ConfigError::validation(format!(
            "worker.poll_interval_ms must be at least 10, got {}",
            worker.poll_interval_ms
        )));
    }
    if worker.delivery_timeout_secs < 1 {
        errors.push(ConfigError::validation(
            "worker.delivery_timeout_secs must be at least 1",
        ));
    }
    // The worker renews a row's lease right before sending it, so the lease
    // only has to outlast one bounded send.
    if worker.visibility_timeout_secs <= worker.delivery_timeout_secs {
        errors.push(ConfigError::validation(format!(
            "worker.visibility_timeout_secs ({}) must exceed worker.delivery_timeout_secs ({})",
            worker.visibility_timeout_secs, worker.delivery_timeout_secs
        )));
    }

    if config.email.transport == EmailTransportKind::Smtp
        && config
            .email
            .smtp_host
            .as_deref()
            .is_none_or(|h| h.trim().is_empty())
    {
        errors.push(ConfigError::validation(
            "email.smtp_host is required when email.transport = \"smtp\"",
        ));
    }

    if let Some(to) = &config.notify.to_email
        && !to.contains('@')
    {
        errors.push(ConfigError::validation(format!(
            "notify.to_email `{to}` is not an email address"
        )));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
