// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Span variants.
//!
//! Spans form a closed set: workflow and agent spans are containers and hold
//! their own child list, while LLM, retriever and tool spans are leaves. The
//! variant is an explicit enum tag; the container capability is the
//! [`HasChildren`] trait, implemented only by container variants.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ValidationError;

use super::io::{Document, Message, MessageRole, StepIO};
use super::metrics::LlmMetrics;
use super::step::{HasChildren, StepData, StepType};

/// Kind of agent represented by an agent span.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    #[default]
    Default,
    Planner,
    React,
    Reflection,
    Router,
    Classifier,
    Supervisor,
    Judge,
}

/// A sub-workflow grouping child spans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSpan {
    #[serde(flatten)]
    pub step: StepData,

    #[serde(default)]
    pub spans: Vec<Span>,
}

impl WorkflowSpan {
    pub fn new(input: StepIO) -> Self {
        Self {
            step: StepData::new(StepType::Workflow, input),
            spans: Vec::new(),
        }
    }
}

/// An agent invocation grouping child spans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSpan {
    #[serde(flatten)]
    pub step: StepData,

    #[serde(default)]
    pub agent_type: AgentType,

    #[serde(default)]
    pub spans: Vec<Span>,
}

impl AgentSpan {
    pub fn new(input: StepIO, agent_type: AgentType) -> Self {
        Self {
            step: StepData::new(StepType::Agent, input),
            agent_type,
            spans: Vec::new(),
        }
    }
}

/// A single LLM call.
///
/// Input and output are normalized into message lists: bare input strings
/// become user messages and bare output strings become an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmSpan {
    #[serde(flatten)]
    pub step: StepData,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tools: Option<Vec<serde_json::Value>>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub temperature: Option<f64>,
}

impl LlmSpan {
    /// Create an LLM span, normalizing input and output into messages.
    pub fn new(input: StepIO, output: Option<StepIO>) -> Result<Self, ValidationError> {
        let input = StepIO::Messages(input.into_messages("input", MessageRole::User)?);
        let output = match output {
            Some(out) => Some(Self::normalize_output(out)?),
            None => None,
        };

        let mut step = StepData::new(StepType::Llm, input);
        step.output = output;
        Ok(Self {
            step,
            model: None,
            tools: None,
            temperature: None,
        })
    }

    pub(crate) fn normalize_output(output: StepIO) -> Result<StepIO, ValidationError> {
        let mut messages = output.into_messages("output", MessageRole::Assistant)?;
        if messages.len() == 1 {
            return Ok(StepIO::Message(messages.remove(0)));
        }
        Ok(StepIO::Messages(messages))
    }

    /// Input messages.
    pub fn input_messages(&self) -> &[Message] {
        match &self.step.input {
            StepIO::Messages(m) => m,
            StepIO::Message(m) => std::slice::from_ref(m),
            _ => &[],
        }
    }

    /// Token and latency metrics recorded on this span.
    pub fn llm_metrics(&self) -> LlmMetrics {
        LlmMetrics::from_metrics(&self.step.metrics)
    }

    pub fn set_llm_metrics(&mut self, metrics: LlmMetrics) {
        metrics.apply_to(&mut self.step.metrics);
    }
}

/// A retrieval call. Output is always a document list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieverSpan {
    #[serde(flatten)]
    pub step: StepData,
}

impl RetrieverSpan {
    pub fn new(input: StepIO, output: Option<StepIO>) -> Self {
        let mut step = StepData::new(StepType::Retriever, input);
        step.output = output.map(|o| StepIO::Documents(o.into_documents()));
        Self { step }
    }

    /// Retrieved documents.
    pub fn documents(&self) -> &[Document] {
        match &self.step.output {
            Some(StepIO::Documents(docs)) => docs,
            _ => &[],
        }
    }
}

/// A tool execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSpan {
    #[serde(flatten)]
    pub step: StepData,

    /// Id of the LLM tool call this execution answers.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tool_call_id: Option<String>,
}

impl ToolSpan {
    pub fn new(input: StepIO, output: Option<StepIO>) -> Self {
        let mut step = StepData::new(StepType::Tool, input);
        step.output = output;
        Self {
            step,
            tool_call_id: None,
        }
    }
}

/// A non-root step in a trace.
///
/// The wire tag is the `type` key already carried by [`StepData`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Span {
    Workflow(WorkflowSpan),
    Agent(AgentSpan),
    Llm(LlmSpan),
    Retriever(RetrieverSpan),
    Tool(ToolSpan),
}

impl Span {
    pub fn step(&self) -> &StepData {
        match self {
            Span::Workflow(s) => &s.step,
            Span::Agent(s) => &s.step,
            Span::Llm(s) => &s.step,
            Span::Retriever(s) => &s.step,
            Span::Tool(s) => &s.step,
        }
    }

    pub fn step_mut(&mut self) -> &mut StepData {
        match self {
            Span::Workflow(s) => &mut s.step,
            Span::Agent(s) => &mut s.step,
            Span::Llm(s) => &mut s.step,
            Span::Retriever(s) => &mut s.step,
            Span::Tool(s) => &mut s.step,
        }
    }

    pub fn step_type(&self) -> StepType {
        self.step().step_type
    }

    /// View this span as a container, if it is one.
    pub fn as_container(&self) -> Option<&dyn HasChildren> {
        match self {
            Span::Workflow(s) => Some(s),
            Span::Agent(s) => Some(s),
            Span::Llm(_) | Span::Retriever(_) | Span::Tool(_) => None,
        }
    }

    pub fn as_container_mut(&mut self) -> Option<&mut dyn HasChildren> {
        match self {
            Span::Workflow(s) => Some(s),
            Span::Agent(s) => Some(s),
            Span::Llm(_) | Span::Retriever(_) | Span::Tool(_) => None,
        }
    }

    pub fn is_container(&self) -> bool {
        self.as_container().is_some()
    }

    /// Child spans; always empty for leaf variants.
    pub fn children(&self) -> &[Span] {
        self.as_container().map(|c| c.spans()).unwrap_or(&[])
    }
}

impl<'de> Deserialize<'de> for Span {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        let tag = value
            .get("type")
            .cloned()
            .ok_or_else(|| D::Error::missing_field("type"))?;
        let step_type: StepType = serde_json::from_value(tag).map_err(D::Error::custom)?;

        let span = match step_type {
            StepType::Workflow => serde_json::from_value(value).map(Span::Workflow),
            StepType::Agent => serde_json::from_value(value).map(Span::Agent),
            StepType::Llm => serde_json::from_value(value).map(Span::Llm),
            StepType::Retriever => serde_json::from_value(value).map(Span::Retriever),
            StepType::Tool => serde_json::from_value(value).map(Span::Tool),
            StepType::Trace => return Err(D::Error::custom("a trace cannot be nested as a span")),
        };
        span.map_err(D::Error::custom)
    }
}

macro_rules! impl_has_children {
    ($($ty:ty),* $(,)?) => {
        $(
            impl HasChildren for $ty {
                fn step(&self) -> &StepData {
                    &self.step
                }

                fn step_mut(&mut self) -> &mut StepData {
                    &mut self.step
                }

                fn spans(&self) -> &[Span] {
                    &self.spans
                }

                fn spans_mut(&mut self) -> &mut Vec<Span> {
                    &mut self.spans
                }
            }
        )*
    };
}

impl_has_children!(WorkflowSpan, AgentSpan);

impl From<WorkflowSpan> for Span {
    fn from(s: WorkflowSpan) -> Self {
        Span::Workflow(s)
    }
}

impl From<AgentSpan> for Span {
    fn from(s: AgentSpan) -> Self {
        Span::Agent(s)
    }
}

impl From<LlmSpan> for Span {
    fn from(s: LlmSpan) -> Self {
        Span::Llm(s)
    }
}

impl From<RetrieverSpan> for Span {
    fn from(s: RetrieverSpan) -> Self {
        Span::Retriever(s)
    }
}

impl From<ToolSpan> for Span {
    fn from(s: ToolSpan) -> Self {
        Span::Tool(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_span_normalizes_messages() {
        let span = LlmSpan::new(StepIO::from("hi"), Some(StepIO::from("hello"))).unwrap();
        assert_eq!(span.input_messages(), &[Message::user("hi")]);
        assert_eq!(span.step.output, Some(StepIO::Message(Message::assistant("hello"))));
    }

    #[test]
    fn test_llm_span_rejects_documents() {
        let docs = StepIO::Documents(vec![Document::new("d")]);
        assert!(LlmSpan::new(docs, None).is_err());
    }

    #[test]
    fn test_retriever_span_normalizes_documents() {
        let span = RetrieverSpan::new(
            StepIO::from("query"),
            Some(StepIO::Texts(vec!["a".to_string(), "b".to_string()])),
        );
        assert_eq!(span.documents().len(), 2);
        assert_eq!(span.documents()[0].content, "a");
    }

    #[test]
    fn test_only_containers_hold_children() {
        let workflow: Span = WorkflowSpan::new(StepIO::from("w")).into();
        let agent: Span = AgentSpan::new(StepIO::from("a"), AgentType::Planner).into();
        let tool: Span = ToolSpan::new(StepIO::from("t"), None).into();

        assert!(workflow.is_container());
        assert!(agent.is_container());
        assert!(!tool.is_container());
        assert!(tool.children().is_empty());
    }

    #[test]
    fn test_add_child_copies_dataset_fields_once() {
        let mut parent = WorkflowSpan::new(StepIO::from("w"));
        parent
            .step
            .dataset_metadata
            .insert("split".to_string(), "test".to_string());
        parent.step.dataset_input = Some("q".to_string());

        parent.add_child_span(ToolSpan::new(StepIO::from("t"), None).into());
        parent
            .step
            .dataset_metadata
            .insert("split".to_string(), "train".to_string());

        let child = &parent.spans[0];
        assert_eq!(child.step().dataset_input.as_deref(), Some("q"));
        assert_eq!(child.step().dataset_metadata["split"], "test");
    }

    #[test]
    fn test_last_output_walks_last_children() {
        let mut outer = WorkflowSpan::new(StepIO::from("outer"));
        let mut inner = AgentSpan::new(StepIO::from("inner"), AgentType::React);
        inner.add_child_span(ToolSpan::new(StepIO::from("t1"), Some(StepIO::from("first"))).into());
        inner.add_child_span(ToolSpan::new(StepIO::from("t2"), Some(StepIO::from("second"))).into());
        outer.add_child_span(ToolSpan::new(StepIO::from("t0"), Some(StepIO::from("zero"))).into());
        outer.add_child_span(inner.into());

        assert_eq!(outer.last_output(), Some(StepIO::from("second")));
    }

    #[test]
    fn test_last_output_empty_container() {
        let outer = WorkflowSpan::new(StepIO::from("outer"));
        assert_eq!(outer.last_output(), None);
    }

    #[test]
    fn test_span_wire_roundtrip() {
        let mut agent = AgentSpan::new(StepIO::from("a"), AgentType::Router);
        agent.add_child_span(LlmSpan::new(StepIO::from("hi"), Some(StepIO::from("yo"))).unwrap().into());
        let span: Span = agent.into();

        let json = serde_json::to_string(&span).unwrap();
        let parsed: Span = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, span);
        assert_eq!(parsed.children()[0].step_type(), StepType::Llm);
    }

    #[test]
    fn test_span_rejects_nested_trace() {
        let json = serde_json::json!({"type": "trace"});
        assert!(serde_json::from_value::<Span>(json).is_err());
    }

    #[test]
    fn test_span_wire_tag() {
        let span: Span = AgentSpan::new(StepIO::from("a"), AgentType::Judge).into();
        let json = serde_json::to_value(&span).unwrap();
        assert_eq!(json["type"], "agent");
        assert_eq!(json["agentType"], "judge");
        assert!(json["spans"].as_array().unwrap().is_empty());
    }
}
