// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! In-process metrics for the flush pipeline.
//!
//! Counts scheduled operations by kind, their outcomes and retries, a
//! latency histogram per kind, flushed/discarded trace totals and the LLM
//! token counts seen at flush time. Lock-based; no exporter.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;

/// Process-wide metrics shared by pipelines that are not given their own.
pub static GLOBAL_METRICS: Lazy<Arc<PipelineMetrics>> = Lazy::new(|| Arc::new(PipelineMetrics::new()));

/// Kind of scheduled network operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperationKind {
    Ingest,
    Update,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Ingest => "ingest",
            OperationKind::Update => "update",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a scheduled operation settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
    /// Never attempted because its dependency failed.
    DependencySkipped,
}

/// Metrics registry for one or more pipelines.
#[derive(Debug)]
pub struct PipelineMetrics {
    operations: RwLock<HashMap<OperationKind, OperationMetrics>>,
    tokens: Counters,
    traces: Counters,
    start_time: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            operations: RwLock::new(HashMap::new()),
            tokens: Counters::default(),
            traces: Counters::default(),
            start_time: Instant::now(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<OperationKind, OperationMetrics>> {
        self.operations.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<OperationKind, OperationMetrics>> {
        self.operations.write().unwrap_or_else(|p| p.into_inner())
    }

    pub fn record_submission(&self, kind: OperationKind) {
        self.write().entry(kind).or_default().submitted += 1;
    }

    /// Record a settled operation. `duration` covers all attempts.
    pub fn record_outcome(&self, kind: OperationKind, duration: Duration, outcome: Outcome) {
        self.write().entry(kind).or_default().record(duration, outcome);
    }

    pub fn record_retry(&self, kind: OperationKind) {
        self.write().entry(kind).or_default().retries += 1;
    }

    pub fn record_tokens(&self, input: u64, output: u64) {
        self.tokens.add(input, output);
    }

    pub fn record_traces_flushed(&self, count: u64) {
        self.traces.add(count, 0);
    }

    pub fn record_traces_discarded(&self, count: u64) {
        self.traces.add(0, count);
    }

    pub fn operation_metrics(&self, kind: OperationKind) -> Option<OperationMetrics> {
        self.read().get(&kind).cloned()
    }

    /// Total (input, output) tokens.
    pub fn token_counts(&self) -> (u64, u64) {
        self.tokens.totals()
    }

    /// Total (flushed, discarded) traces.
    pub fn trace_counts(&self) -> (u64, u64) {
        self.traces.totals()
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let (input_tokens, output_tokens) = self.token_counts();
        let (traces_flushed, traces_discarded) = self.trace_counts();
        MetricsSnapshot {
            operations: self.read().clone(),
            input_tokens,
            output_tokens,
            traces_flushed,
            traces_discarded,
            uptime: self.uptime(),
        }
    }

    pub fn reset(&self) {
        self.write().clear();
        self.tokens.reset();
        self.traces.reset();
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome counts and latency for one operation kind.
#[derive(Debug, Clone, Default)]
pub struct OperationMetrics {
    pub submitted: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub skipped: u64,
    pub retries: u64,
    pub total_duration: Duration,
    pub latency: Histogram,
}

impl OperationMetrics {
    fn record(&mut self, duration: Duration, outcome: Outcome) {
        match outcome {
            Outcome::Success => self.succeeded += 1,
            Outcome::Failure => self.failed += 1,
            Outcome::DependencySkipped => {
                self.skipped += 1;
                return;
            }
        }
        self.total_duration += duration;
        self.latency.record(duration);
    }

    /// Operations that actually ran to a result.
    pub fn attempted(&self) -> u64 {
        self.succeeded + self.failed
    }

    /// Submitted but not yet settled.
    pub fn in_flight(&self) -> u64 {
        self.submitted
            .saturating_sub(self.succeeded + self.failed + self.skipped)
    }

    pub fn avg_duration(&self) -> Duration {
        match u32::try_from(self.attempted()) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(n) => self.total_duration / n,
        }
    }

    /// Success rate over attempted operations (0.0 to 1.0).
    pub fn success_rate(&self) -> f64 {
        if self.attempted() == 0 {
            1.0
        } else {
            self.succeeded as f64 / self.attempted() as f64
        }
    }
}

/// Fixed-bucket latency histogram.
#[derive(Debug, Clone)]
pub struct Histogram {
    /// Upper bounds in microseconds; a final overflow bucket is implicit.
    bounds: Vec<u64>,
    counts: Vec<u64>,
}

impl Histogram {
    pub fn with_bounds(bounds: Vec<u64>) -> Self {
        let counts = vec![0; bounds.len() + 1];
        Self { bounds, counts }
    }

    pub fn record(&mut self, duration: Duration) {
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
        let idx = self
            .bounds
            .iter()
            .position(|&b| micros <= b)
            .unwrap_or(self.bounds.len());
        self.counts[idx] += 1;
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Approximate percentile, reported as the bucket's upper bound.
    pub fn percentile(&self, p: f64) -> Duration {
        let total = self.total();
        if total == 0 {
            return Duration::ZERO;
        }

        let target = (total as f64 * p / 100.0).ceil() as u64;
        let mut cumulative = 0u64;
        for (i, &count) in self.counts.iter().enumerate() {
            cumulative += count;
            if cumulative >= target {
                let micros = self
                    .bounds
                    .get(i)
                    .copied()
                    .unwrap_or_else(|| self.bounds.last().copied().unwrap_or(0) * 10);
                return Duration::from_micros(micros);
            }
        }
        Duration::ZERO
    }

    pub fn p50(&self) -> Duration {
        self.percentile(50.0)
    }

    pub fn p90(&self) -> Duration {
        self.percentile(90.0)
    }

    pub fn p99(&self) -> Duration {
        self.percentile(99.0)
    }
}

impl Default for Histogram {
    fn default() -> Self {
        // 1ms, 10ms, 100ms, 1s, 10s, 60s
        Self::with_bounds(vec![1_000, 10_000, 100_000, 1_000_000, 10_000_000, 60_000_000])
    }
}

/// Pair of monotonic counters.
#[derive(Debug, Default)]
struct Counters {
    first: AtomicU64,
    second: AtomicU64,
}

impl Counters {
    fn add(&self, first: u64, second: u64) {
        self.first.fetch_add(first, Ordering::Relaxed);
        self.second.fetch_add(second, Ordering::Relaxed);
    }

    fn totals(&self) -> (u64, u64) {
        (self.first.load(Ordering::Relaxed), self.second.load(Ordering::Relaxed))
    }

    fn reset(&self) {
        self.first.store(0, Ordering::Relaxed);
        self.second.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time copy of a [`PipelineMetrics`].
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub operations: HashMap<OperationKind, OperationMetrics>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub traces_flushed: u64,
    pub traces_discarded: u64,
    pub uptime: Duration,
}

impl MetricsSnapshot {
    /// Format as a human-readable report.
    pub fn format_report(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Tracer Metrics ===\n\n");
        report.push_str(&format!("Uptime: {:.2?}\n", self.uptime));
        report.push_str(&format!(
            "Traces: {} flushed, {} discarded\n",
            self.traces_flushed, self.traces_discarded
        ));
        report.push_str(&format!(
            "Tokens: {} input, {} output\n\n",
            self.input_tokens, self.output_tokens
        ));

        let mut kinds: Vec<_> = self.operations.keys().copied().collect();
        kinds.sort();
        if !kinds.is_empty() {
            report.push_str("Operations:\n");
            for kind in kinds {
                let m = &self.operations[&kind];
                report.push_str(&format!(
                    "  {}: {} submitted, {:.1}% success, {} skipped, {} retries, p50 {:.2?}, p99 {:.2?}\n",
                    kind,
                    m.submitted,
                    m.success_rate() * 100.0,
                    m.skipped,
                    m.retries,
                    m.latency.p50(),
                    m.latency.p99()
                ));
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_outcomes() {
        let metrics = PipelineMetrics::new();
        for _ in 0..4 {
            metrics.record_submission(OperationKind::Ingest);
        }
        metrics.record_outcome(OperationKind::Ingest, Duration::from_millis(10), Outcome::Success);
        metrics.record_outcome(OperationKind::Ingest, Duration::from_millis(30), Outcome::Failure);
        metrics.record_outcome(OperationKind::Ingest, Duration::ZERO, Outcome::DependencySkipped);

        let ingest = metrics.operation_metrics(OperationKind::Ingest).unwrap();
        assert_eq!(ingest.succeeded, 1);
        assert_eq!(ingest.failed, 1);
        assert_eq!(ingest.skipped, 1);
        assert_eq!(ingest.in_flight(), 1);
        assert_eq!(ingest.avg_duration(), Duration::from_millis(20));
        assert!((ingest.success_rate() - 0.5).abs() < f64::EPSILON);
        assert!(metrics.operation_metrics(OperationKind::Update).is_none());
    }

    #[test]
    fn test_histogram_percentiles() {
        let mut hist = Histogram::default();
        for _ in 0..90 {
            hist.record(Duration::from_micros(500));
        }
        for _ in 0..10 {
            hist.record(Duration::from_millis(500));
        }

        assert_eq!(hist.total(), 100);
        assert_eq!(hist.p50(), Duration::from_millis(1));
        assert_eq!(hist.p90(), Duration::from_millis(1));
        assert_eq!(hist.p99(), Duration::from_secs(1));
    }

    #[test]
    fn test_histogram_overflow_bucket() {
        let mut hist = Histogram::with_bounds(vec![100]);
        hist.record(Duration::from_secs(5));
        assert_eq!(hist.counts(), &[0, 1]);
        assert_eq!(hist.p50(), Duration::from_micros(1_000));
    }

    #[test]
    fn test_counters_and_reset() {
        let metrics = PipelineMetrics::new();
        metrics.record_tokens(100, 40);
        metrics.record_traces_flushed(2);
        metrics.record_traces_discarded(1);
        metrics.record_retry(OperationKind::Update);

        assert_eq!(metrics.token_counts(), (100, 40));
        assert_eq!(metrics.trace_counts(), (2, 1));
        assert_eq!(metrics.operation_metrics(OperationKind::Update).unwrap().retries, 1);

        metrics.reset();
        assert_eq!(metrics.token_counts(), (0, 0));
        assert_eq!(metrics.trace_counts(), (0, 0));
        assert!(metrics.operation_metrics(OperationKind::Update).is_none());
    }

    #[test]
    fn test_format_report() {
        let metrics = PipelineMetrics::new();
        metrics.record_submission(OperationKind::Ingest);
        metrics.record_outcome(OperationKind::Ingest, Duration::from_millis(5), Outcome::Success);
        metrics.record_traces_flushed(1);

        let report = metrics.snapshot().format_report();
        assert!(report.contains("1 flushed, 0 discarded"));
        assert!(report.contains("ingest: 1 submitted, 100.0% success"));
    }
}
