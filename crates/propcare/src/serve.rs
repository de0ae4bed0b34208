// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `propcare serve` command implementation.
//!
//! Opens the SQLite store, builds the completion provider and turn
//! orchestrator, and serves the chat API until SIGINT/SIGTERM. With
//! `--with-worker` a delivery worker runs in the same process.

use std::sync::Arc;

use propcare_config::model::{LoggingConfig, PropcareConfig};
use propcare_core::{PluginAdapter, PropcareError};
use propcare_gateway::{GatewayState, start_server};
use propcare_notify::{DeliveryWorker, WorkerSettings};
use propcare_openai::OpenAiProvider;
use propcare_storage::SqliteStorage;
use propcare_triage::{TriageSettings, TurnOrchestrator};
use tracing::{info, warn};

use crate::shutdown;

/// Runs the `propcare serve` command.
pub async fn run_serve(config: PropcareConfig, with_worker: bool) -> Result<(), PropcareError> {
    init_tracing(&config.logging);

    info!("starting propcare serve");

    let storage = Arc::new(SqliteStorage::open(config.storage.clone()).await?);
    let provider = Arc::new(OpenAiProvider::new(&config)?);
    info!(provider = provider.name(), model = %config.openai.model, "completion provider ready");

    let settings = TriageSettings::from_config(&config);
    if settings.notify_to.is_none() {
        warn!("notify.to_email is not set; manager notifications will be skipped");
    }
    let orchestrator = Arc::new(TurnOrchestrator::new(
        provider,
        storage.clone(),
        storage.clone(),
        settings,
    ));

    let cancel = shutdown::install_signal_handler();

    let worker_handle = if with_worker {
        let mailer = propcare_email::build_transport(&config.email)?;
        let worker = DeliveryWorker::new(
            storage.clone(),
            mailer,
            WorkerSettings::from_config(&config),
        );
        let worker_cancel = cancel.clone();
        Some(tokio::spawn(async move { worker.run(worker_cancel).await }))
    } else {
        None
    };

    let state = GatewayState::new(orchestrator, storage.clone());
    let result = start_server(&config.server, state, cancel.clone()).await;

    // A bind failure returns before any signal; stop the worker too.
    cancel.cancel();
    if let Some(handle) = worker_handle
        && let Err(e) = handle.await
    {
        warn!(error = %e, "delivery worker task failed");
    }

    if let Err(e) = storage.shutdown().await {
        warn!(error = %e, "storage shutdown failed");
    }

    info!("propcare serve stopped");
    result
}

/// Initializes the tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
pub(crate) fn init_tracing(logging: &LoggingConfig) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(&logging.level)));

    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_names(false)
            .init();
    }
}

fn default_filter(level: &str) -> String {
    format!("propcare={level},warn")
}
