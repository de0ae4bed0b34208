// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `propcare outbox` operator commands.

use propcare_config::model::PropcareConfig;
use propcare_core::PropcareError;
use propcare_storage::{OutboxCounts, SqliteStorage};

/// Prints per-status row counts.
pub async fn run_status(config: &PropcareConfig, json: bool) -> Result<(), PropcareError> {
    let storage = SqliteStorage::open(config.storage.clone()).await?;
    let counts = storage.status_counts().await?;

    if json {
        let text = serde_json::to_string_pretty(&counts)
            .map_err(|e| PropcareError::Internal(format!("failed to encode counts: {e}")))?;
        println!("{text}");
    } else {
        print!("{}", format_counts(&counts));
    }
    Ok(())
}

/// Moves a dead-lettered row back to pending.
pub async fn run_requeue(config: &PropcareConfig, id: i64) -> Result<(), PropcareError> {
    let storage = SqliteStorage::open(config.storage.clone()).await?;
    if storage.requeue(id).await? {
        println!("notification {id} requeued");
        Ok(())
    } else {
        Err(PropcareError::NotFound {
            entity: "dead notification",
            id: id.to_string(),
        })
    }
}

/// Prints one row as JSON.
pub async fn run_show(config: &PropcareConfig, id: i64) -> Result<(), PropcareError> {
    let storage = SqliteStorage::open(config.storage.clone()).await?;
    let entry = storage
        .outbox_entry(id)
        .await?
        .ok_or_else(|| PropcareError::NotFound {
            entity: "notification",
            id: id.to_string(),
        })?;
    let text = serde_json::to_string_pretty(&entry)
        .map_err(|e| PropcareError::Internal(format!("failed to encode notification: {e}")))?;
    println!("{text}");
    Ok(())
}

fn format_counts(counts: &OutboxCounts) -> String {
    format!(
        "pending  {:>6}  (leased {})\nsent     {:>6}\ndead     {:>6}\n",
        counts.pending, counts.leased, counts.sent, counts.dead
    )
}
