// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Fields shared by every trace and span.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::id::StepId;
use super::io::StepIO;
use super::metrics::Metrics;
use super::span::Span;

/// Kind of step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepType {
    Trace,
    Workflow,
    Agent,
    Llm,
    Retriever,
    Tool,
}

impl StepType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::Trace => "trace",
            StepType::Workflow => "workflow",
            StepType::Agent => "agent",
            StepType::Llm => "llm",
            StepType::Retriever => "retriever",
            StepType::Tool => "tool",
        }
    }

    /// Whether steps of this kind may hold child spans.
    pub fn is_container(&self) -> bool {
        matches!(self, StepType::Trace | StepType::Workflow | StepType::Agent)
    }
}

impl std::fmt::Display for StepType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common step data, flattened into each trace/span record on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepData {
    pub id: StepId,

    #[serde(rename = "type")]
    pub step_type: StepType,

    pub name: String,

    pub input: StepIO,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub output: Option<StepIO>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub redacted_input: Option<StepIO>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub redacted_output: Option<StepIO>,

    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub metrics: Metrics,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub status_code: Option<u16>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub user_metadata: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub external_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub dataset_input: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub dataset_output: Option<String>,

    #[serde(default)]
    pub dataset_metadata: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub step_number: Option<u32>,
}

impl StepData {
    /// Create step data with a fresh id and the current time.
    pub fn new(step_type: StepType, input: StepIO) -> Self {
        Self {
            id: StepId::new(),
            step_type,
            name: step_type.as_str().to_string(),
            input,
            output: None,
            redacted_input: None,
            redacted_output: None,
            created_at: Utc::now(),
            metrics: Metrics::default(),
            status_code: None,
            tags: Vec::new(),
            user_metadata: BTreeMap::new(),
            external_id: None,
            dataset_input: None,
            dataset_output: None,
            dataset_metadata: BTreeMap::new(),
            step_number: None,
        }
    }

    /// Nanoseconds elapsed since `created_at`, clamped at zero.
    pub fn elapsed_ns(&self) -> u64 {
        (Utc::now() - self.created_at)
            .num_nanoseconds()
            .and_then(|ns| u64::try_from(ns).ok())
            .unwrap_or(0)
    }

    /// Copy dataset fields from a parent.
    pub(crate) fn inherit_dataset(&mut self, parent: &StepData) {
        self.dataset_input = parent.dataset_input.clone();
        self.dataset_output = parent.dataset_output.clone();
        self.dataset_metadata = parent.dataset_metadata.clone();
    }
}

/// Capability of container steps (trace, workflow, agent) to hold children.
pub trait HasChildren {
    fn step(&self) -> &StepData;

    fn step_mut(&mut self) -> &mut StepData;

    fn spans(&self) -> &[Span];

    fn spans_mut(&mut self) -> &mut Vec<Span>;

    /// Attach a child span.
    ///
    /// The child takes a copy of this container's dataset fields; later
    /// changes to the container are not re-propagated.
    fn add_child_span(&mut self, mut span: Span) {
        span.step_mut().inherit_dataset(self.step());
        self.spans_mut().push(span);
    }

    /// Output of the last child, searched depth-first through last children.
    ///
    /// Returns the first defined output found on the way down: a child
    /// container with its own output wins over its descendants.
    fn last_output(&self) -> Option<StepIO> {
        let last = self.spans().last()?;
        if let Some(output) = &last.step().output {
            return Some(output.clone());
        }
        last.as_container().and_then(|c| c.last_output())
    }
}
