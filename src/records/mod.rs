// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Record model: traces, spans and their metrics.
//!
//! Pure data plus validation. A [`Trace`] is the root of a tree of
//! [`Span`]s; only container steps (trace, workflow, agent) implement
//! [`HasChildren`] and hold child lists.
//!
//! ```text
//! Trace
//! ├── WorkflowSpan
//! │   ├── LlmSpan
//! │   └── ToolSpan
//! └── AgentSpan
//!     └── RetrieverSpan
//! ```

mod id;
mod io;
mod metrics;
mod span;
mod step;
mod trace;

pub use id::StepId;
pub use io::{Document, Message, MessageRole, MetadataValue, StepIO, ToolCall};
pub use metrics::{LlmMetrics, MetricValue, Metrics};
pub use span::{AgentSpan, AgentType, LlmSpan, RetrieverSpan, Span, ToolSpan, WorkflowSpan};
pub use step::{HasChildren, StepData, StepType};
pub use trace::{SpanIter, Trace};
