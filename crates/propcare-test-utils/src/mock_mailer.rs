// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recording mail transport with scriptable failures.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use propcare_core::types::{AdapterType, HealthStatus, OutboundEmail};
use propcare_core::{MailTransport, PluginAdapter, PropcareError};

/// Records every delivered email. Can be told to fail the first N sends.
pub struct MockMailer {
    sent: Arc<Mutex<Vec<OutboundEmail>>>,
    attempts: AtomicUsize,
    fail_first: AtomicUsize,
}

impl MockMailer {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            attempts: AtomicUsize::new(0),
            fail_first: AtomicUsize::new(0),
        }
    }

    /// A mailer whose first `n` sends fail with a delivery error.
    pub fn failing(n: usize) -> Self {
        let mailer = Self::new();
        mailer.fail_first.store(n, Ordering::SeqCst);
        mailer
    }

    /// A mailer that never succeeds.
    pub fn always_failing() -> Self {
        Self::failing(usize::MAX)
    }

    pub async fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().await.clone()
    }

    /// Total send calls, successful or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Default for MockMailer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockMailer {
    fn name(&self) -> &str {
        "mock-mailer"
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
impl MailTransport for MockMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), PropcareError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.fail_first.load(Ordering::SeqCst) {
            return Err(PropcareError::Delivery {
                message: format!("mock delivery failure #{}", attempt + 1),
                source: None,
            });
        }
        self.sent.lock().await.push(email.clone());
        Ok(())
    }
}
