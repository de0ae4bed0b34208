// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resend HTTP API transport.

use std::time::Duration;

use async_trait::async_trait;
use propcare_core::types::{AdapterType, HealthStatus, OutboundEmail};
use propcare_core::{MailTransport, PluginAdapter, PropcareError};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Request timeout for one send.
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct SendEmailResponse {
    id: String,
}

/// Sends mail through `POST {base_url}/emails`.
pub struct ResendMailer {
    client: reqwest::Client,
    endpoint: String,
    from: String,
}

impl ResendMailer {
    pub fn new(api_key: &str, base_url: &str, from: &str) -> Result<Self, PropcareError> {
        if from.trim().is_empty() {
            return Err(PropcareError::Config("email.from must not be empty".into()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| PropcareError::Config(format!("invalid Resend API key: {e}")))?,
        );
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|e| PropcareError::Delivery {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/emails", base_url.trim_end_matches('/')),
            from: from.to_string(),
        })
    }
}

#[async_trait]
impl PluginAdapter for ResendMailer {
    fn name(&self) -> &str {
        "resend"
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
impl MailTransport for ResendMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), PropcareError> {
        let body = SendEmailRequest {
            from: &self.from,
            to: [email.to.as_str()],
            subject: &email.subject,
            text: &email.body,
            reply_to: email.reply_to.as_deref(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| PropcareError::Delivery {
                message: if e.is_timeout() {
                    format!("Resend request timed out after {SEND_TIMEOUT:?}")
                } else {
                    format!("Resend request failed: {e}")
                },
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PropcareError::Delivery {
                message: format!("Resend returned {status}: {text}"),
                source: None,
            });
        }

        // The id is only logged; a 2xx without a parseable body still counts as sent.
        match response.json::<SendEmailResponse>().await {
            Ok(sent) => debug!(email_id = %sent.id, to = %email.to, "email accepted by Resend"),
            Err(e) => debug!(error = %e, "Resend accepted email without an id"),
        }
        Ok(())
    }
}
