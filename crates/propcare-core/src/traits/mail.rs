// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery service adapter trait.

use async_trait::async_trait;

use crate::error::PropcareError;
use crate::traits::adapter::PluginAdapter;
use crate::types::OutboundEmail;

/// Adapter for sending rendered notifications.
///
/// Success means the delivery service accepted the message; anything else
/// is a [`PropcareError::Delivery`] the worker turns into a retry.
#[async_trait]
pub trait MailTransport: PluginAdapter {
    /// Sends one email.
    async fn send(&self, email: &OutboundEmail) -> Result<(), PropcareError>;
}
