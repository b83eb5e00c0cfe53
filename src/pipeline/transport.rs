// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Ingestion transport capability and the records it carries.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::LoggerConfig;
use crate::error::TransportError;
use crate::records::{StepId, StepIO, Trace};

/// Routing labels attached to every record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordLabels {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub project: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub log_stream: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub experiment_id: Option<String>,
}

impl From<&LoggerConfig> for RecordLabels {
    fn from(config: &LoggerConfig) -> Self {
        Self {
            project: config.project.clone(),
            log_stream: config.log_stream.clone(),
            experiment_id: config.experiment_id.clone(),
        }
    }
}

/// Late change to a span that was already ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpanUpdate {
    pub trace_id: StepId,
    pub span_id: StepId,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub output: Option<StepIO>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub status_code: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub duration_ns: Option<u64>,
}

impl SpanUpdate {
    pub fn new(trace_id: StepId, span_id: StepId) -> Self {
        Self {
            trace_id,
            span_id,
            output: None,
            status_code: None,
            duration_ns: None,
        }
    }

    pub fn with_output(mut self, output: StepIO) -> Self {
        self.output = Some(output);
        self
    }

    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    pub fn with_duration_ns(mut self, duration_ns: u64) -> Self {
        self.duration_ns = Some(duration_ns);
        self
    }
}

/// One network operation against the ingestion endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum IngestRecord {
    Trace { labels: RecordLabels, trace: Trace },
    SpanUpdate { labels: RecordLabels, update: SpanUpdate },
}

impl IngestRecord {
    /// Id of the trace or span this record creates or updates.
    pub fn target_id(&self) -> StepId {
        match self {
            IngestRecord::Trace { trace, .. } => trace.step.id,
            IngestRecord::SpanUpdate { update, .. } => update.span_id,
        }
    }

    pub fn labels(&self) -> &RecordLabels {
        match self {
            IngestRecord::Trace { labels, .. } | IngestRecord::SpanUpdate { labels, .. } => labels,
        }
    }
}

/// Acknowledgement returned by the endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ack {
    pub record_id: StepId,
}

/// Capability to submit one record to the ingestion endpoint.
///
/// Errors should carry the response status where one exists so that
/// the retry policy can classify them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn submit(&self, record: IngestRecord) -> Result<Ack, TransportError>;
}

/// Transport that keeps records in memory.
///
/// Queued failures are returned, in order, before any record is accepted.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    records: Mutex<Vec<IngestRecord>>,
    failures: Mutex<VecDeque<TransportError>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|p| p.into_inner())
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next submission with `err`.
    pub fn push_failure(&self, err: TransportError) {
        lock(&self.failures).push_back(err);
    }

    /// Records accepted so far, in arrival order.
    pub fn records(&self) -> Vec<IngestRecord> {
        lock(&self.records).clone()
    }

    /// Traces accepted so far.
    pub fn traces(&self) -> Vec<Trace> {
        lock(&self.records)
            .iter()
            .filter_map(|r| match r {
                IngestRecord::Trace { trace, .. } => Some(trace.clone()),
                IngestRecord::SpanUpdate { .. } => None,
            })
            .collect()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn submit(&self, record: IngestRecord) -> Result<Ack, TransportError> {
        if let Some(err) = lock(&self.failures).pop_front() {
            return Err(err);
        }
        let ack = Ack {
            record_id: record.target_id(),
        };
        lock(&self.records).push(record);
        Ok(ack)
    }
}
