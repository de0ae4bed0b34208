// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key is
//! reported at startup instead of silently falling back to a default.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level PropCare configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PropcareConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Inbound API server settings.
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    /// Completion service settings.
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Turn orchestrator tuning.
    #[serde(default)]
    pub triage: TriageConfig,

    /// Who receives operations notifications.
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Delivery worker settings.
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Delivery service settings.
    #[serde(default)]
    pub email: EmailConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Level for `propcare*` targets (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Inbound API server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Origins allowed by the CORS layer.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

/// SQLite storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    "propcare.db".to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Completion service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OpenAiConfig {
    /// API key. `None` falls back to the `OPENAI_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Caller-side timeout for one completion request.
    #[serde(default = "default_openai_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_openai_base_url(),
            timeout_secs: default_openai_timeout_secs(),
        }
    }
}

impl OpenAiConfig {
    /// The configured key, or `OPENAI_API_KEY` when unset.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_timeout_secs() -> u64 {
    60
}

/// Turn orchestrator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TriageConfig {
    /// Number of most recent messages sent to the completion service.
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Maximum length of the initial ticket summary, in characters.
    #[serde(default = "default_max_summary_chars")]
    pub max_summary_chars: usize,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Temperature used when the emergency policy fired.
    #[serde(default = "default_emergency_temperature")]
    pub emergency_temperature: f32,

    /// Value stored in `tickets.source`.
    #[serde(default = "default_source")]
    pub source: String,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            max_summary_chars: default_max_summary_chars(),
            temperature: default_temperature(),
            emergency_temperature: default_emergency_temperature(),
            source: default_source(),
        }
    }
}

fn default_history_window() -> usize {
    12
}

fn default_max_summary_chars() -> usize {
    5000
}

fn default_temperature() -> f32 {
    0.3
}

fn default_emergency_temperature() -> f32 {
    0.2
}

fn default_source() -> String {
    "web".to_string()
}

/// Notification recipients.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NotifyConfig {
    /// Operations inbox. `None` disables notification enqueue.
    #[serde(default)]
    pub to_email: Option<String>,

    /// Reply-To header on outgoing notifications.
    #[serde(default)]
    pub reply_to: Option<String>,

    /// Also enqueue a `ticket.created` event when a session opens a ticket.
    #[serde(default)]
    pub on_ticket_created: bool,
}

/// Delivery worker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerConfig {
    /// Lease owner name. Generated per process when unset.
    #[serde(default)]
    pub worker_id: Option<String>,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Maximum rows claimed per poll.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Age after which a lease is considered abandoned and the row is claimable again.
    #[serde(default = "default_visibility_timeout_secs")]
    pub visibility_timeout_secs: u64,

    /// Upper bound on a single delivery call.
    #[serde(default = "default_delivery_timeout_secs")]
    pub delivery_timeout_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_id: None,
            poll_interval_ms: default_poll_interval_ms(),
            batch_size: default_batch_size(),
            visibility_timeout_secs: default_visibility_timeout_secs(),
            delivery_timeout_secs: default_delivery_timeout_secs(),
        }
    }
}

impl WorkerConfig {
    /// The configured worker ID, or `<host>-<8 hex>` when unset.
    pub fn resolved_worker_id(&self) -> String {
        if let Some(id) = self.worker_id.as_ref().filter(|id| !id.trim().is_empty()) {
            return id.clone();
        }
        let host = std::env::var("HOSTNAME").unwrap_or_else(|_| "propcare".to_string());
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        format!("{host}-{}", &suffix[..8])
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_secs)
    }

    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery_timeout_secs)
    }
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_batch_size() -> u32 {
    10
}

fn default_visibility_timeout_secs() -> u64 {
    300
}

fn default_delivery_timeout_secs() -> u64 {
    10
}

/// Which delivery service the worker sends through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailTransportKind {
    #[default]
    Resend,
    Smtp,
}

/// Delivery service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmailConfig {
    #[serde(default)]
    pub transport: EmailTransportKind,

    /// From address on outgoing notifications.
    #[serde(default = "default_from")]
    pub from: String,

    /// Resend API key. `None` falls back to `RESEND_API_KEY`.
    #[serde(default)]
    pub resend_api_key: Option<String>,

    #[serde(default = "default_resend_base_url")]
    pub resend_base_url: String,

    #[serde(default)]
    pub smtp_host: Option<String>,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    #[serde(default)]
    pub smtp_username: Option<String>,

    #[serde(default)]
    pub smtp_password: Option<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            transport: EmailTransportKind::default(),
            from: default_from(),
            resend_api_key: None,
            resend_base_url: default_resend_base_url(),
            smtp_host: None,
            smtp_port: default_smtp_port(),
            smtp_username: None,
            smtp_password: None,
        }
    }
}

impl EmailConfig {
    /// The configured Resend key, or `RESEND_API_KEY` when unset.
    pub fn resolved_resend_api_key(&self) -> Option<String> {
        self.resend_api_key
            .clone()
            .or_else(|| std::env::var("RESEND_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }
}

fn default_from() -> String {
    "PropCare <notifications@propcare.local>".to_string()
}

fn default_resend_base_url() -> String {
    "https://api.resend.com".to_string()
}

fn default_smtp_port() -> u16 {
    587
}
