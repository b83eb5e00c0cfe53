// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Flush pipeline.
//!
//! Turns finished traces and late span updates into scheduled, retried
//! network operations against a [`Transport`]:
//!
//! ```text
//! trace  ──► ingest:<trace_id>            (no dependency)
//! update ──► update:<span_id>:<n>  ──depends on──► ingest:<trace_id>
//! ```
//!
//! The dependency edge guarantees the endpoint never sees an update before
//! the create it targets; an update whose ingest failed is skipped.

mod transport;

#[cfg(test)]
pub use transport::MockTransport;
pub use transport::{Ack, IngestRecord, MemoryTransport, RecordLabels, SpanUpdate, Transport};

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::LoggerConfig;
use crate::error::TransportError;
use crate::records::{StepId, Trace};
use crate::retry::{handle_http_exceptions_for_retry, RetryPolicy};
use crate::scheduler::{TaskHandle, TaskResult, TaskScheduler};
use crate::telemetry::{OperationKind, Outcome, PipelineMetrics, GLOBAL_METRICS};

/// Handle to one scheduled ingest or update.
pub type IngestHandle = TaskHandle<Ack, TransportError>;

/// Settled result of one scheduled ingest or update.
pub type IngestResult = TaskResult<Ack, TransportError>;

/// Unit name of the ingest operation for a trace.
pub fn ingest_unit_name(trace_id: &StepId) -> String {
    format!("ingest:{trace_id}")
}

/// Schedules ingest and update operations for a logger.
pub struct FlushPipeline {
    transport: Arc<dyn Transport>,
    scheduler: TaskScheduler<Ack, TransportError>,
    policy: RetryPolicy,
    labels: RecordLabels,
    metrics: Arc<PipelineMetrics>,
    update_seq: u64,
    pending_updates: Vec<IngestHandle>,
}

impl FlushPipeline {
    pub fn new(transport: Arc<dyn Transport>, config: &LoggerConfig) -> Self {
        Self {
            transport,
            scheduler: TaskScheduler::new(),
            policy: RetryPolicy::from(&config.retry),
            labels: RecordLabels::from(config),
            metrics: Arc::clone(&GLOBAL_METRICS),
            update_seq: 0,
            pending_updates: Vec::new(),
        }
    }

    /// Record into `metrics` instead of the global registry.
    pub fn with_metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn scheduler(&self) -> &TaskScheduler<Ack, TransportError> {
        &self.scheduler
    }

    pub fn metrics(&self) -> &Arc<PipelineMetrics> {
        &self.metrics
    }

    /// Schedule the ingest of one trace.
    pub fn ingest_trace(&self, trace: Trace) -> IngestHandle {
        let name = ingest_unit_name(&trace.step.id);
        let record = IngestRecord::Trace {
            labels: self.labels.clone(),
            trace,
        };
        self.schedule(name, OperationKind::Ingest, record, None)
    }

    /// Schedule one ingest per trace, with no edges between them.
    pub fn ingest_traces(&self, traces: impl IntoIterator<Item = Trace>) -> Vec<IngestHandle> {
        traces.into_iter().map(|t| self.ingest_trace(t)).collect()
    }

    /// Schedule an update that runs only after its trace's ingest settles.
    ///
    /// Returns the unit name; await the result with [`Self::wait_for_idle`].
    pub fn submit_update(&mut self, update: SpanUpdate) -> String {
        let name = format!("update:{}:{}", update.span_id, self.update_seq);
        self.update_seq += 1;
        let dependency = ingest_unit_name(&update.trace_id);
        let record = IngestRecord::SpanUpdate {
            labels: self.labels.clone(),
            update,
        };
        let handle = self.schedule(name.clone(), OperationKind::Update, record, Some(&dependency));
        self.pending_updates.push(handle);
        name
    }

    fn schedule(
        &self,
        name: String,
        kind: OperationKind,
        record: IngestRecord,
        depends_on: Option<&str>,
    ) -> IngestHandle {
        debug!(unit = %name, %kind, dependency = ?depends_on, "Scheduling operation");
        self.metrics.record_submission(kind);

        let transport = Arc::clone(&self.transport);
        let metrics = Arc::clone(&self.metrics);
        let scheduler = self.scheduler.clone();
        let policy = self.policy;
        let unit = name.clone();

        self.scheduler.submit(
            name,
            move || async move {
                let started = Instant::now();
                let result = policy
                    .run(
                        || {
                            let transport = Arc::clone(&transport);
                            let record = record.clone();
                            async move { handle_http_exceptions_for_retry(transport.submit(record)).await }
                        },
                        Some(&unit),
                        |_| {
                            scheduler.increment_retry(&unit);
                            metrics.record_retry(kind);
                        },
                    )
                    .await;
                let outcome = if result.is_ok() {
                    Outcome::Success
                } else {
                    Outcome::Failure
                };
                metrics.record_outcome(kind, started.elapsed(), outcome);
                result
            },
            depends_on,
        )
    }

    /// Await every scheduled update, returning their results in submit order.
    pub async fn wait_for_idle(&mut self) -> Vec<IngestResult> {
        let pending = std::mem::take(&mut self.pending_updates);
        let mut results = Vec::with_capacity(pending.len());
        for handle in pending {
            let unit = handle.name().to_string();
            let result = handle.await;
            self.scheduler.forget(&unit);
            if let Err(err) = &result {
                if err.is_dependency_failure() {
                    self.metrics.record_outcome(
                        OperationKind::Update,
                        Duration::ZERO,
                        Outcome::DependencySkipped,
                    );
                }
                warn!(unit = %unit, error = %err, "Update did not reach the endpoint");
            }
            results.push(result);
        }
        results
    }

    /// Number of updates scheduled but not yet awaited.
    pub fn pending_update_count(&self) -> usize {
        self.pending_updates.len()
    }

    /// Drop scheduler state. In-flight operations are not cancelled.
    pub fn terminate(&mut self) {
        self.scheduler.terminate();
    }
}
