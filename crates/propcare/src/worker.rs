// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `propcare worker` command implementation.

use std::sync::Arc;

use propcare_config::model::PropcareConfig;
use propcare_core::{HealthStatus, PluginAdapter, PropcareError};
use propcare_notify::{DeliveryWorker, PassReport, WorkerSettings};
use propcare_storage::SqliteStorage;
use tracing::{info, warn};

use crate::serve::init_tracing;
use crate::shutdown;

/// Runs the delivery worker until SIGINT/SIGTERM, or for a single pass
/// when `once` is set.
pub async fn run_worker(config: PropcareConfig, once: bool) -> Result<(), PropcareError> {
    init_tracing(&config.logging);

    let storage = Arc::new(SqliteStorage::open(config.storage.clone()).await?);
    let mailer = propcare_email::build_transport(&config.email)?;

    match mailer.health_check().await {
        Ok(HealthStatus::Healthy) => info!(transport = mailer.name(), "mail transport ready"),
        Ok(status) => warn!(transport = mailer.name(), ?status, "mail transport not healthy"),
        Err(e) => warn!(transport = mailer.name(), error = %e, "mail transport health check failed"),
    }

    let worker = DeliveryWorker::new(storage.clone(), mailer, WorkerSettings::from_config(&config));

    let result = if once {
        worker.run_once().await.map(|report| {
            println!("{}", format_report(worker.worker_id(), &report));
        })
    } else {
        worker.run(shutdown::install_signal_handler()).await;
        Ok(())
    };

    if let Err(e) = storage.shutdown().await {
        warn!(error = %e, "storage shutdown failed");
    }
    result
}

fn format_report(worker_id: &str, report: &PassReport) -> String {
    format!(
        "{worker_id}: claimed {}, sent {}, retried {}, dead {}, lease lost {}",
        report.claimed, report.sent, report.retried, report.dead, report.lost
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_line_lists_every_count() {
        let report = PassReport {
            claimed: 4,
            sent: 1,
            retried: 1,
            dead: 1,
            lost: 1,
        };
        assert_eq!(
            format_report("w-1", &report),
            "w-1: claimed 4, sent 1, retried 1, dead 1, lease lost 1"
        );
    }
}
