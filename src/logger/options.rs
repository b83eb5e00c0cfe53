// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Options accepted by the logger's start/add/conclude operations.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::records::{AgentType, LlmMetrics, StepData, StepIO, StepId};

/// Fields accepted by every kind of step.
#[derive(Debug, Clone, Default)]
pub struct StepOptions {
    /// Caller-chosen id; generated when absent.
    pub id: Option<StepId>,
    pub name: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub duration_ns: Option<u64>,
    pub status_code: Option<u16>,
    pub tags: Vec<String>,
    pub user_metadata: BTreeMap<String, String>,
    pub external_id: Option<String>,
    pub redacted_input: Option<StepIO>,
    pub redacted_output: Option<StepIO>,
}

impl StepOptions {
    pub(crate) fn apply(self, step: &mut StepData) {
        if let Some(id) = self.id {
            step.id = id;
        }
        if let Some(name) = self.name {
            step.name = name;
        }
        if let Some(created_at) = self.created_at {
            step.created_at = created_at;
        }
        if let Some(duration_ns) = self.duration_ns {
            step.metrics.duration_ns = duration_ns;
        }
        if self.status_code.is_some() {
            step.status_code = self.status_code;
        }
        step.tags = self.tags;
        step.user_metadata = self.user_metadata;
        step.external_id = self.external_id;
        step.redacted_input = self.redacted_input;
        step.redacted_output = self.redacted_output;
    }
}

macro_rules! step_option_builders {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $ty {
                pub fn with_id(mut self, id: StepId) -> Self {
                    self.step.id = Some(id);
                    self
                }

                pub fn with_name(mut self, name: impl Into<String>) -> Self {
                    self.step.name = Some(name.into());
                    self
                }

                pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
                    self.step.created_at = Some(created_at);
                    self
                }

                pub fn with_duration_ns(mut self, duration_ns: u64) -> Self {
                    self.step.duration_ns = Some(duration_ns);
                    self
                }

                pub fn with_status_code(mut self, status_code: u16) -> Self {
                    self.step.status_code = Some(status_code);
                    self
                }

                pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
                    self.step.tags.push(tag.into());
                    self
                }

                pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
                    self.step.user_metadata.insert(key.into(), value.into());
                    self
                }

                pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
                    self.step.external_id = Some(external_id.into());
                    self
                }

                pub fn with_redacted_input(mut self, redacted: impl Into<StepIO>) -> Self {
                    self.step.redacted_input = Some(redacted.into());
                    self
                }

                pub fn with_redacted_output(mut self, redacted: impl Into<StepIO>) -> Self {
                    self.step.redacted_output = Some(redacted.into());
                    self
                }

                pub fn with_output(mut self, output: impl Into<StepIO>) -> Self {
                    self.output = Some(output.into());
                    self
                }
            }
        )*
    };
}

/// Options for starting a trace.
#[derive(Debug, Clone, Default)]
pub struct TraceOptions {
    pub input: StepIO,
    pub output: Option<StepIO>,
    pub dataset_input: Option<String>,
    pub dataset_output: Option<String>,
    pub dataset_metadata: BTreeMap<String, String>,
    pub step: StepOptions,
}

impl TraceOptions {
    pub fn new(input: impl Into<StepIO>) -> Self {
        Self {
            input: input.into(),
            ..Self::default()
        }
    }

    /// Dataset row this trace was produced from. Copied to every span.
    pub fn with_dataset(mut self, input: impl Into<String>, output: Option<String>) -> Self {
        self.dataset_input = Some(input.into());
        self.dataset_output = output;
        self
    }

    pub fn with_dataset_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.dataset_metadata.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct WorkflowSpanOptions {
    pub input: StepIO,
    pub output: Option<StepIO>,
    pub step: StepOptions,
}

impl WorkflowSpanOptions {
    pub fn new(input: impl Into<StepIO>) -> Self {
        Self {
            input: input.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AgentSpanOptions {
    pub input: StepIO,
    pub output: Option<StepIO>,
    pub agent_type: AgentType,
    pub step: StepOptions,
}

impl AgentSpanOptions {
    pub fn new(input: impl Into<StepIO>) -> Self {
        Self {
            input: input.into(),
            ..Self::default()
        }
    }

    pub fn with_agent_type(mut self, agent_type: AgentType) -> Self {
        self.agent_type = agent_type;
        self
    }
}

/// Options for an LLM call. Input and output are normalized to messages.
#[derive(Debug, Clone, Default)]
pub struct LlmSpanOptions {
    pub input: StepIO,
    pub output: Option<StepIO>,
    pub model: Option<String>,
    pub tools: Option<Vec<serde_json::Value>>,
    pub temperature: Option<f64>,
    pub metrics: LlmMetrics,
    pub step: StepOptions,
}

impl LlmSpanOptions {
    pub fn new(input: impl Into<StepIO>) -> Self {
        Self {
            input: input.into(),
            ..Self::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_tools(mut self, tools: Vec<serde_json::Value>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_tokens(mut self, input: u32, output: u32) -> Self {
        let ttft = self.metrics.time_to_first_token_ns;
        self.metrics = LlmMetrics::tokens(input, output);
        self.metrics.time_to_first_token_ns = ttft;
        self
    }

    pub fn with_time_to_first_token_ns(mut self, ns: u64) -> Self {
        self.metrics.time_to_first_token_ns = Some(ns);
        self
    }
}

/// Options for a retrieval call. Output is normalized to documents.
#[derive(Debug, Clone, Default)]
pub struct RetrieverSpanOptions {
    pub input: StepIO,
    pub output: Option<StepIO>,
    pub step: StepOptions,
}

impl RetrieverSpanOptions {
    pub fn new(input: impl Into<StepIO>) -> Self {
        Self {
            input: input.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ToolSpanOptions {
    pub input: StepIO,
    pub output: Option<StepIO>,
    pub tool_call_id: Option<String>,
    pub step: StepOptions,
}

impl ToolSpanOptions {
    pub fn new(input: impl Into<StepIO>) -> Self {
        Self {
            input: input.into(),
            ..Self::default()
        }
    }

    pub fn with_tool_call_id(mut self, id: impl Into<String>) -> Self {
        self.tool_call_id = Some(id.into());
        self
    }
}

step_option_builders!(
    TraceOptions,
    WorkflowSpanOptions,
    AgentSpanOptions,
    LlmSpanOptions,
    RetrieverSpanOptions,
    ToolSpanOptions,
);

/// Options for concluding the open container.
///
/// Without an explicit output, the container takes the output found by
/// walking its last children.
#[derive(Debug, Clone, Default)]
pub struct ConcludeOptions {
    pub output: Option<StepIO>,
    pub redacted_output: Option<StepIO>,
    /// Elapsed time since creation when absent.
    pub duration_ns: Option<u64>,
    pub status_code: Option<u16>,
    /// Keep concluding until the trace itself is concluded.
    pub conclude_all: bool,
}

impl ConcludeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Conclude every open container, including the trace.
    pub fn all() -> Self {
        Self {
            conclude_all: true,
            ..Self::default()
        }
    }

    pub fn with_output(mut self, output: impl Into<StepIO>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_redacted_output(mut self, redacted: impl Into<StepIO>) -> Self {
        self.redacted_output = Some(redacted.into());
        self
    }

    pub fn with_duration_ns(mut self, duration_ns: u64) -> Self {
        self.duration_ns = Some(duration_ns);
        self
    }

    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }
}
