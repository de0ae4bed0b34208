// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery-service transports for notification email.

pub mod resend;
pub mod smtp;

use std::sync::Arc;

use propcare_config::model::{EmailConfig, EmailTransportKind};
use propcare_core::{MailTransport, PluginAdapter, PropcareError};
use tracing::info;

pub use resend::ResendMailer;
pub use smtp::SmtpMailer;

/// Builds the transport selected by `email.transport`.
pub fn build_transport(config: &EmailConfig) -> Result<Arc<dyn MailTransport>, PropcareError> {
    let transport: Arc<dyn MailTransport> = match config.transport {
        EmailTransportKind::Resend => {
            let api_key = config.resolved_resend_api_key().ok_or_else(|| {
                PropcareError::Config(
                    "Resend API key not found. Set email.resend_api_key in config or RESEND_API_KEY environment variable.".into(),
                )
            })?;
            Arc::new(ResendMailer::new(&api_key, &config.resend_base_url, &config.from)?)
        }
        EmailTransportKind::Smtp => Arc::new(SmtpMailer::new(config)?),
    };
    info!(transport = transport.name(), "mail transport initialized");
    Ok(transport)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resend_with_key_builds() {
        let config = EmailConfig {
            resend_api_key: Some("re_123".into()),
            ..EmailConfig::default()
        };
        assert_eq!(build_transport(&config).unwrap().name(), "resend");
    }

    #[test]
    fn smtp_without_host_fails() {
        let config = EmailConfig {
            transport: EmailTransportKind::Smtp,
            ..EmailConfig::default()
        };
        assert!(build_transport(&config).is_err());
    }
}
