// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification delivery: event rendering, retry backoff, and the outbox worker.

pub mod backoff;
pub mod render;
pub mod worker;

pub use backoff::{BACKOFF_SCHEDULE_SECS, backoff, next_attempt};
pub use render::{Rendered, render_entry, render_event};
pub use worker::{DeliveryWorker, PassReport, WorkerSettings};
