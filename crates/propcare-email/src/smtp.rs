// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SMTP transport over lettre.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use propcare_config::model::EmailConfig;
use propcare_core::types::{AdapterType, HealthStatus, OutboundEmail};
use propcare_core::{MailTransport, PluginAdapter, PropcareError};
use tracing::debug;

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Port that speaks implicit TLS. Every other port uses STARTTLS.
const IMPLICIT_TLS_PORT: u16 = 465;

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &EmailConfig) -> Result<Self, PropcareError> {
        let host = config
            .smtp_host
            .as_deref()
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| PropcareError::Config("email.smtp_host is required for SMTP".into()))?;
        let from = parse_mailbox(&config.from, "email.from")?;

        let builder = if config.smtp_port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
        }
        .map_err(|e| PropcareError::Config(format!("invalid SMTP relay `{host}`: {e}")))?;

        let mut builder = builder
            .port(config.smtp_port)
            .timeout(Some(SEND_TIMEOUT));
        if let (Some(user), Some(pass)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

fn parse_mailbox(value: &str, field: &str) -> Result<Mailbox, PropcareError> {
    value
        .parse()
        .map_err(|e| PropcareError::Config(format!("{field} `{value}` is not a valid address: {e}")))
}

/// Builds a plain-text message.
pub fn build_message(from: &Mailbox, email: &OutboundEmail) -> Result<Message, PropcareError> {
    let to: Mailbox = email.to.parse().map_err(|e| PropcareError::Delivery {
        message: format!("invalid recipient `{}`: {e}", email.to),
        source: None,
    })?;

    let mut builder = Message::builder()
        .from(from.clone())
        .to(to)
        .subject(email.subject.clone())
        .header(ContentType::TEXT_PLAIN);
    if let Some(reply_to) = &email.reply_to {
        let mailbox: Mailbox = reply_to.parse().map_err(|e| PropcareError::Delivery {
            message: format!("invalid reply-to `{reply_to}`: {e}"),
            source: None,
        })?;
        builder = builder.reply_to(mailbox);
    }

    builder
        .body(email.body.clone())
        .map_err(|e| PropcareError::Delivery {
            message: format!("failed to build message: {e}"),
            source: Some(Box::new(e)),
        })
}

#[async_trait]
impl PluginAdapter for SmtpMailer {
    fn name(&self) -> &str {
        "smtp"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Mail
    }

    async fn health_check(&self) -> Result<HealthStatus, PropcareError> {
        match self.transport.test_connection().await {
            Ok(true) => Ok(HealthStatus::Healthy),
            Ok(false) => Ok(HealthStatus::Degraded("SMTP server refused NOOP".into())),
            Err(e) => Ok(HealthStatus::Unhealthy(format!("SMTP connection failed: {e}"))),
        }
    }

    async fn shutdown(&self) -> Result<(), PropcareError> {
        Ok(())
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), PropcareError> {
        let message = build_message(&self.from, email)?;
        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| PropcareError::Delivery {
                message: format!("SMTP send failed: {e}"),
                source: Some(Box::new(e)),
            })?;
        debug!(code = %response.code(), to = %email.to, "email accepted by SMTP relay");
        Ok(())
    }
}
