// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Logging and metrics for the tracing core itself.
//!
//! - **Logging**: every component emits `tracing` events; hosts install a
//!   subscriber with [`init_telemetry`].
//! - **Metrics**: the flush pipeline counts operations, retries, skips and
//!   latency into a [`PipelineMetrics`] registry.
//!
//! ```rust,ignore
//! use llm_tracer::telemetry::{init_telemetry, TelemetryConfig, GLOBAL_METRICS};
//!
//! init_telemetry(&TelemetryConfig::default())?;
//! // ... log and flush traces ...
//! println!("{}", GLOBAL_METRICS.snapshot().format_report());
//! ```

mod init;
pub mod metrics;

pub use init::{init_telemetry, init_test_telemetry, LogFormat, TelemetryConfig, CRATE_TARGET};
pub use metrics::{
    Histogram, MetricsSnapshot, OperationKind, OperationMetrics, Outcome, PipelineMetrics,
    GLOBAL_METRICS,
};
