// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Trace logger state machine.
//!
//! Builds trace trees incrementally and hands finished traces to the
//! [`FlushPipeline`]. The logger keeps a stack of open containers: starting
//! a trace pushes it, adding a workflow or agent span pushes that span, and
//! concluding pops the top. Leaf spans attach to the top container and are
//! never pushed.
//!
//! ```text
//! start_trace ─► [trace]
//! add_workflow_span ─► [trace, workflow]
//! add_llm_span ─► [trace, workflow]        (llm attached to workflow)
//! conclude ─► [trace]
//! conclude ─► []                           (trace concluded)
//! flush ─► ingest:<trace_id>
//! ```
//!
//! Illegal transitions return [`LoggerError::InvalidState`]; they are never
//! retried.

mod options;

pub use options::{
    AgentSpanOptions, ConcludeOptions, LlmSpanOptions, RetrieverSpanOptions, StepOptions,
    ToolSpanOptions, TraceOptions, WorkflowSpanOptions,
};

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::config::LoggerConfig;
use crate::error::{LoggerError, Result};
use crate::pipeline::{FlushPipeline, SpanUpdate, Transport};
use crate::records::{
    AgentSpan, HasChildren, LlmSpan, RetrieverSpan, Span, StepIO, StepId, ToolSpan, Trace,
    WorkflowSpan,
};

/// Incremental builder and flusher of traces for one project/stream.
///
/// Each logger owns its state exclusively; independent loggers share nothing.
pub struct TraceLogger {
    config: LoggerConfig,
    pipeline: FlushPipeline,
    traces: Vec<Trace>,
    /// Path to each open container: a trace index, then child indices.
    parent_stack: Vec<usize>,
}

impl TraceLogger {
    pub fn new(config: LoggerConfig, transport: Arc<dyn Transport>) -> Self {
        let pipeline = FlushPipeline::new(transport, &config);
        Self::with_pipeline(config, pipeline)
    }

    pub fn with_pipeline(config: LoggerConfig, pipeline: FlushPipeline) -> Self {
        Self {
            config,
            pipeline,
            traces: Vec::new(),
            parent_stack: Vec::new(),
        }
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &FlushPipeline {
        &self.pipeline
    }

    pub fn pipeline_mut(&mut self) -> &mut FlushPipeline {
        &mut self.pipeline
    }

    /// Number of open containers, including the trace.
    pub fn open_depth(&self) -> usize {
        self.parent_stack.len()
    }

    pub fn has_active_trace(&self) -> bool {
        !self.parent_stack.is_empty()
    }

    /// Traces built but not yet flushed.
    pub fn pending_traces(&self) -> &[Trace] {
        &self.traces
    }

    /// The trace currently accepting spans.
    pub fn current_trace(&self) -> Option<&Trace> {
        self.parent_stack.first().and_then(|&i| self.traces.get(i))
    }

    /// Id of the container new spans attach to.
    pub fn current_parent(&self) -> Option<StepId> {
        self.top_container().map(|c| c.step().id)
    }

    fn top_container(&self) -> Option<&dyn HasChildren> {
        let (&root, rest) = self.parent_stack.split_first()?;
        let mut node: &dyn HasChildren = self.traces.get(root)?;
        for &idx in rest {
            node = node.spans().get(idx)?.as_container()?;
        }
        Some(node)
    }

    fn top_container_mut(&mut self) -> Result<&mut dyn HasChildren> {
        let broken = || LoggerError::invalid_state("Open parent does not resolve to a container.");
        let (&root, rest) = self.parent_stack.split_first().ok_or_else(broken)?;
        let mut node: &mut dyn HasChildren = self.traces.get_mut(root).ok_or_else(broken)?;
        for &idx in rest {
            node = node
                .spans_mut()
                .get_mut(idx)
                .and_then(Span::as_container_mut)
                .ok_or_else(broken)?;
        }
        Ok(node)
    }

    /// Start a new trace. Fails while another trace is open.
    pub fn start_trace(&mut self, options: TraceOptions) -> Result<StepId> {
        if self.has_active_trace() {
            return Err(LoggerError::invalid_state(
                "You must conclude the existing trace before adding a new one.",
            ));
        }

        let TraceOptions {
            input,
            output,
            dataset_input,
            dataset_output,
            dataset_metadata,
            step,
        } = options;

        let mut trace = Trace::new(input);
        trace.step.output = output;
        trace.step.dataset_input = dataset_input;
        trace.step.dataset_output = dataset_output;
        trace.step.dataset_metadata = dataset_metadata;
        step.apply(&mut trace.step);

        let id = trace.step.id;
        self.traces.push(trace);
        self.parent_stack.push(self.traces.len() - 1);
        debug!(trace_id = %id, "Started trace");
        Ok(id)
    }

    pub fn add_workflow_span(&mut self, options: WorkflowSpanOptions) -> Result<StepId> {
        let mut span = WorkflowSpan::new(options.input);
        span.step.output = options.output;
        options.step.apply(&mut span.step);
        self.attach(span.into())
    }

    pub fn add_agent_span(&mut self, options: AgentSpanOptions) -> Result<StepId> {
        let mut span = AgentSpan::new(options.input, options.agent_type);
        span.step.output = options.output;
        options.step.apply(&mut span.step);
        self.attach(span.into())
    }

    pub fn add_llm_span(&mut self, options: LlmSpanOptions) -> Result<StepId> {
        self.ensure_active_trace()?;
        let span = Self::build_llm_span(options)?;
        self.attach(span.into())
    }

    pub fn add_retriever_span(&mut self, options: RetrieverSpanOptions) -> Result<StepId> {
        let mut span = RetrieverSpan::new(options.input, options.output);
        options.step.apply(&mut span.step);
        self.attach(span.into())
    }

    pub fn add_tool_span(&mut self, options: ToolSpanOptions) -> Result<StepId> {
        let mut span = ToolSpan::new(options.input, options.output);
        span.tool_call_id = options.tool_call_id;
        options.step.apply(&mut span.step);
        self.attach(span.into())
    }

    /// Log a trace holding exactly one concluded LLM span.
    ///
    /// Returns the trace id. The trace's output is the LLM output.
    pub fn add_single_llm_span_trace(&mut self, options: LlmSpanOptions) -> Result<StepId> {
        if self.has_active_trace() {
            return Err(LoggerError::invalid_state(
                "A trace cannot be created within another trace.",
            ));
        }

        let mut trace_options = TraceOptions::new(options.input.clone());
        trace_options.step.name = options.step.name.clone();
        trace_options.step.tags = options.step.tags.clone();
        let duration_ns = options.step.duration_ns;
        let span = Self::build_llm_span(options)?;

        let trace_id = self.start_trace(trace_options)?;
        self.attach(span.into())?;

        let mut conclude = ConcludeOptions::new();
        conclude.duration_ns = duration_ns;
        self.conclude(conclude)?;
        Ok(trace_id)
    }

    fn build_llm_span(options: LlmSpanOptions) -> Result<LlmSpan> {
        let LlmSpanOptions {
            input,
            output,
            model,
            tools,
            temperature,
            metrics,
            step,
        } = options;

        let mut span = LlmSpan::new(input, output)?;
        span.model = model;
        span.tools = tools;
        span.temperature = temperature;
        step.apply(&mut span.step);
        span.set_llm_metrics(metrics);
        Ok(span)
    }

    fn ensure_active_trace(&self) -> Result<()> {
        if self.has_active_trace() {
            Ok(())
        } else {
            Err(LoggerError::invalid_state(
                "A trace needs to be created in order to add a span.",
            ))
        }
    }

    fn attach(&mut self, mut span: Span) -> Result<StepId> {
        self.ensure_active_trace()?;

        let id = span.step().id;
        let step_type = span.step_type();
        let is_container = span.is_container();

        let parent = self.top_container_mut()?;
        span.step_mut().step_number = Some(u32::try_from(parent.spans().len()).unwrap_or(u32::MAX));
        parent.add_child_span(span);
        let index = parent.spans().len() - 1;

        if is_container {
            self.parent_stack.push(index);
        }
        debug!(span_id = %id, %step_type, depth = self.parent_stack.len(), "Added span");
        Ok(id)
    }

    /// Conclude the open container and pop it.
    ///
    /// Returns the container that is open afterwards, or `None` once the
    /// trace itself has been concluded. With `conclude_all`, keeps popping
    /// until the trace is concluded, applying the same options at each level.
    pub fn conclude(&mut self, options: ConcludeOptions) -> Result<Option<StepId>> {
        if !self.has_active_trace() {
            return Err(LoggerError::invalid_state("No existing workflow to conclude."));
        }

        loop {
            let concluded = self.conclude_top(&options)?;
            self.parent_stack.pop();
            debug!(step_id = %concluded, depth = self.parent_stack.len(), "Concluded step");

            match self.current_parent() {
                None if self.has_active_trace() => {
                    return Err(LoggerError::invalid_state(
                        "Concluded step was left without a parent.",
                    ));
                }
                None => return Ok(None),
                Some(parent) if !options.conclude_all => return Ok(Some(parent)),
                Some(_) => {}
            }
        }
    }

    fn conclude_top(&mut self, options: &ConcludeOptions) -> Result<StepId> {
        let node = self.top_container_mut()?;
        let output = options
            .output
            .clone()
            .or_else(|| node.last_output().map(|o| StepIO::Text(o.to_text())));

        let step = node.step_mut();
        if output.is_some() {
            step.output = output;
        }
        if options.redacted_output.is_some() {
            step.redacted_output = options.redacted_output.clone();
        }
        let duration_ns = options.duration_ns.unwrap_or_else(|| step.elapsed_ns());
        step.metrics.duration_ns = duration_ns;
        if options.status_code.is_some() {
            step.status_code = options.status_code;
        }
        Ok(step.id)
    }

    /// Conclude anything still open and ingest every pending trace.
    ///
    /// Returns the traces that were ingested. Traces whose ingest failed are
    /// kept for the next flush. Never fails: errors are logged and an empty
    /// list is returned.
    pub async fn flush(&mut self) -> Vec<Trace> {
        if self.has_active_trace() {
            debug!(open = self.open_depth(), "Concluding open steps before flush");
            if let Err(err) = self.conclude(ConcludeOptions::all()) {
                error!(error = %err, "Could not conclude open steps; nothing flushed");
                return Vec::new();
            }
        }

        if self.traces.is_empty() {
            debug!("No traces to flush");
            return Vec::new();
        }

        let traces = std::mem::take(&mut self.traces);
        let metrics = Arc::clone(self.pipeline.metrics());

        if self.config.disabled {
            info!(count = traces.len(), "Logging disabled, discarding traces");
            metrics.record_traces_discarded(traces.len() as u64);
            return Vec::new();
        }

        info!(count = traces.len(), "Flushing traces");
        for trace in &traces {
            let (input, output) = token_usage(trace);
            metrics.record_tokens(input, output);
        }

        let handles = self.pipeline.ingest_traces(traces.iter().cloned());
        let mut flushed = Vec::with_capacity(traces.len());
        for (trace, handle) in traces.into_iter().zip(handles) {
            match handle.await {
                Ok(_) => flushed.push(trace),
                Err(err) => {
                    error!(trace_id = %trace.step.id, error = %err, "Failed to ingest trace");
                    self.traces.push(trace);
                }
            }
        }

        metrics.record_traces_flushed(flushed.len() as u64);
        debug!(flushed = flushed.len(), retained = self.traces.len(), "Flush finished");
        flushed
    }

    /// Apply a late change to a span.
    ///
    /// A span in a trace that has not been flushed yet is updated in place
    /// and `None` is returned. Otherwise the update is scheduled behind the
    /// trace's ingest and its unit name is returned.
    ///
    /// Scheduling spawns onto the current tokio runtime; called outside one,
    /// an update that would need scheduling fails with `InvalidState`.
    pub fn update_span(&mut self, update: SpanUpdate) -> Result<Option<String>> {
        if let Some(trace) = self.traces.iter_mut().find(|t| t.step.id == update.trace_id) {
            apply_update_locally(trace, update)?;
            return Ok(None);
        }

        if self.config.disabled {
            debug!(span_id = %update.span_id, "Logging disabled, dropping span update");
            return Ok(None);
        }
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(LoggerError::invalid_state(
                "Updating a flushed trace requires a running tokio runtime.",
            ));
        }
        Ok(Some(self.pipeline.submit_update(update)))
    }

    /// Set the output of a span after the fact.
    pub fn update_span_output(
        &mut self,
        trace_id: StepId,
        span_id: StepId,
        output: impl Into<StepIO>,
    ) -> Result<Option<String>> {
        self.update_span(SpanUpdate::new(trace_id, span_id).with_output(output.into()))
    }

    /// Flush, wait for scheduled updates, then drop scheduler state.
    pub async fn terminate(&mut self) -> Vec<Trace> {
        let flushed = self.flush().await;
        self.pipeline.wait_for_idle().await;
        self.pipeline.terminate();
        flushed
    }
}

fn apply_update_locally(trace: &mut Trace, update: SpanUpdate) -> Result<()> {
    let SpanUpdate {
        span_id,
        output,
        status_code,
        duration_ns,
        ..
    } = update;

    let output = match (trace.find_span(&span_id), output) {
        (Some(Span::Llm(_)), Some(out)) => Some(LlmSpan::normalize_output(out)?),
        (_, out) => out,
    };

    let step = if trace.step.id == span_id {
        &mut trace.step
    } else {
        trace
            .find_span_mut(&span_id)
            .map(Span::step_mut)
            .ok_or_else(|| LoggerError::invalid_state(format!("Span {span_id} not found in trace.")))?
    };

    if output.is_some() {
        step.output = output;
    }
    if status_code.is_some() {
        step.status_code = status_code;
    }
    if let Some(duration_ns) = duration_ns {
        step.metrics.duration_ns = duration_ns;
    }
    Ok(())
}

fn token_usage(trace: &Trace) -> (u64, u64) {
    trace
        .iter_spans()
        .filter_map(|span| match span {
            Span::Llm(llm) => Some(llm.llm_metrics()),
            _ => None,
        })
        .fold((0, 0), |(input, output), m| {
            (
                input + u64::from(m.num_input_tokens.unwrap_or(0)),
                output + u64::from(m.num_output_tokens.unwrap_or(0)),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::pipeline::{MemoryTransport, MockTransport};
    use crate::records::{AgentType, Message, StepType};
    use crate::retry::RetryPolicy;
    use crate::telemetry::PipelineMetrics;
    use std::time::Duration;

    fn logger_with(transport: Arc<dyn Transport>, config: LoggerConfig) -> TraceLogger {
        let pipeline = FlushPipeline::new(transport, &config)
            .with_metrics(Arc::new(PipelineMetrics::new()))
            .with_policy(RetryPolicy::new(2).with_delays(Duration::from_millis(1), Duration::from_millis(2)));
        TraceLogger::with_pipeline(config, pipeline)
    }

    fn logger() -> (TraceLogger, Arc<MemoryTransport>) {
        let transport = Arc::new(MemoryTransport::new());
        (logger_with(transport.clone(), LoggerConfig::default()), transport)
    }

    #[test]
    fn test_add_span_without_trace_fails() {
        let (mut logger, _) = logger();
        let results = [
            logger.add_workflow_span(WorkflowSpanOptions::new("w")),
            logger.add_agent_span(AgentSpanOptions::new("a")),
            logger.add_llm_span(LlmSpanOptions::new("hi")),
            logger.add_retriever_span(RetrieverSpanOptions::new("q")),
            logger.add_tool_span(ToolSpanOptions::new("t")),
        ];
        for result in results {
            assert!(result.unwrap_err().is_invalid_state());
        }
        assert!(logger.pending_traces().is_empty());
    }

    #[test]
    fn test_nested_trace_fails() {
        let (mut logger, _) = logger();
        logger.start_trace(TraceOptions::new("q")).unwrap();
        let err = logger.start_trace(TraceOptions::new("again")).unwrap_err();
        assert!(err.is_invalid_state());
        assert_eq!(logger.pending_traces().len(), 1);
    }

    #[test]
    fn test_conclude_without_open_container_fails() {
        let (mut logger, _) = logger();
        assert!(logger.conclude(ConcludeOptions::new()).unwrap_err().is_invalid_state());
    }

    #[test]
    fn test_containers_nest_and_leaves_do_not() {
        let (mut logger, _) = logger();
        let trace_id = logger.start_trace(TraceOptions::new("q")).unwrap();
        let workflow_id = logger.add_workflow_span(WorkflowSpanOptions::new("w")).unwrap();
        assert_eq!(logger.current_parent(), Some(workflow_id));

        logger.add_tool_span(ToolSpanOptions::new("t")).unwrap();
        assert_eq!(logger.open_depth(), 2);

        let agent_id = logger
            .add_agent_span(AgentSpanOptions::new("a").with_agent_type(AgentType::Planner))
            .unwrap();
        assert_eq!(logger.current_parent(), Some(agent_id));
        assert_eq!(logger.open_depth(), 3);

        assert_eq!(logger.conclude(ConcludeOptions::new()).unwrap(), Some(workflow_id));
        assert_eq!(logger.conclude(ConcludeOptions::new()).unwrap(), Some(trace_id));
        assert_eq!(logger.conclude(ConcludeOptions::new()).unwrap(), None);
        assert!(!logger.has_active_trace());

        let trace = &logger.pending_traces()[0];
        let workflow = &trace.spans[0];
        assert_eq!(workflow.children().len(), 2);
        assert_eq!(workflow.children()[0].step().step_number, Some(0));
        assert_eq!(workflow.children()[1].step_type(), StepType::Agent);
        assert_eq!(workflow.children()[1].step().step_number, Some(1));
    }

    #[test]
    fn test_conclude_all_propagates_deepest_output() {
        let (mut logger, _) = logger();
        logger.start_trace(TraceOptions::new("q")).unwrap();
        logger.add_workflow_span(WorkflowSpanOptions::new("w1")).unwrap();
        logger.add_agent_span(AgentSpanOptions::new("a")).unwrap();
        logger
            .add_tool_span(ToolSpanOptions::new("t1").with_output("first"))
            .unwrap();
        logger
            .add_tool_span(ToolSpanOptions::new("t2").with_output("second"))
            .unwrap();

        assert_eq!(logger.conclude(ConcludeOptions::all()).unwrap(), None);
        assert_eq!(logger.open_depth(), 0);

        let trace = &logger.pending_traces()[0];
        assert_eq!(trace.step.output, Some(StepIO::from("second")));
        assert_eq!(trace.spans[0].step().output, Some(StepIO::from("second")));
    }

    #[test]
    fn test_explicit_conclude_output_wins() {
        let (mut logger, _) = logger();
        logger.start_trace(TraceOptions::new("q")).unwrap();
        logger
            .add_tool_span(ToolSpanOptions::new("t").with_output("tool"))
            .unwrap();
        logger
            .conclude(
                ConcludeOptions::new()
                    .with_output("final")
                    .with_duration_ns(42)
                    .with_status_code(200),
            )
            .unwrap();

        let step = &logger.pending_traces()[0].step;
        assert_eq!(step.output, Some(StepIO::from("final")));
        assert_eq!(step.metrics.duration_ns, 42);
        assert_eq!(step.status_code, Some(200));
    }

    #[test]
    fn test_conclude_empty_container_keeps_output_unset() {
        let (mut logger, _) = logger();
        logger.start_trace(TraceOptions::new("q")).unwrap();
        logger.add_workflow_span(WorkflowSpanOptions::new("w")).unwrap();
        logger.conclude(ConcludeOptions::all()).unwrap();

        let trace = &logger.pending_traces()[0];
        assert_eq!(trace.spans[0].step().output, None);
        assert_eq!(trace.step.output, None);
    }

    #[test]
    fn test_dataset_fields_copied_to_spans() {
        let (mut logger, _) = logger();
        logger
            .start_trace(
                TraceOptions::new("q")
                    .with_dataset("row input", Some("row output".to_string()))
                    .with_dataset_metadata("split", "test"),
            )
            .unwrap();
        logger.add_workflow_span(WorkflowSpanOptions::new("w")).unwrap();
        logger.add_tool_span(ToolSpanOptions::new("t")).unwrap();

        let trace = &logger.pending_traces()[0];
        let tool = &trace.spans[0].children()[0];
        assert_eq!(tool.step().dataset_input.as_deref(), Some("row input"));
        assert_eq!(tool.step().dataset_output.as_deref(), Some("row output"));
        assert_eq!(tool.step().dataset_metadata["split"], "test");
    }

    #[test]
    fn test_llm_span_validation_error_leaves_state_untouched() {
        let (mut logger, _) = logger();
        logger.start_trace(TraceOptions::new("q")).unwrap();
        let docs = StepIO::Documents(vec![crate::records::Document::new("d")]);
        let err = logger.add_llm_span(LlmSpanOptions::new(docs)).unwrap_err();
        assert!(matches!(err, LoggerError::Validation(_)));
        assert!(logger.pending_traces()[0].spans.is_empty());
    }

    #[test]
    fn test_single_llm_span_trace() {
        let (mut logger, _) = logger();
        let trace_id = logger
            .add_single_llm_span_trace(
                LlmSpanOptions::new("hi")
                    .with_output("hello")
                    .with_model("gpt-4o")
                    .with_tokens(3, 5),
            )
            .unwrap();

        assert!(!logger.has_active_trace());
        let trace = &logger.pending_traces()[0];
        assert_eq!(trace.step.id, trace_id);
        assert_eq!(trace.span_count(), 1);
        let expected = serde_json::to_string(&Message::assistant("hello")).unwrap();
        assert_eq!(trace.step.output, Some(StepIO::Text(expected)));
    }

    #[tokio::test]
    async fn test_flush_ingests_and_clears() {
        let (mut logger, transport) = logger();
        logger.start_trace(TraceOptions::new("q")).unwrap();
        logger
            .add_llm_span(LlmSpanOptions::new("hi").with_output("hello").with_tokens(10, 2))
            .unwrap();

        let flushed = logger.flush().await;
        assert_eq!(flushed.len(), 1);
        assert_eq!(logger.open_depth(), 0);
        assert!(logger.pending_traces().is_empty());
        assert_eq!(transport.traces(), flushed);
        assert_eq!(logger.pipeline().metrics().token_counts(), (10, 2));
        assert_eq!(logger.pipeline().metrics().trace_counts(), (1, 0));
    }

    #[tokio::test]
    async fn test_flush_with_nothing_pending() {
        let (mut logger, transport) = logger();
        assert!(logger.flush().await.is_empty());
        assert!(transport.records().is_empty());
    }

    #[tokio::test]
    async fn test_flush_keeps_failed_traces() {
        let mut mock = MockTransport::new();
        mock.expect_submit()
            .times(1)
            .returning(|_| Err(TransportError::http(403, "forbidden")));
        let mut logger = logger_with(Arc::new(mock), LoggerConfig::default());

        logger.start_trace(TraceOptions::new("q")).unwrap();
        logger.conclude(ConcludeOptions::new()).unwrap();

        assert!(logger.flush().await.is_empty());
        assert_eq!(logger.pending_traces().len(), 1);
    }

    #[tokio::test]
    async fn test_disabled_logger_discards() {
        let transport = Arc::new(MemoryTransport::new());
        let mut logger = logger_with(transport.clone(), LoggerConfig::disabled());

        assert!(logger.add_tool_span(ToolSpanOptions::new("t")).is_err());
        logger.start_trace(TraceOptions::new("q")).unwrap();

        assert!(logger.flush().await.is_empty());
        assert!(logger.pending_traces().is_empty());
        assert!(transport.records().is_empty());
        assert_eq!(logger.pipeline().metrics().trace_counts(), (0, 1));
    }

    #[tokio::test]
    async fn test_update_span_in_pending_trace_applies_locally() {
        let (mut logger, transport) = logger();
        let trace_id = logger.start_trace(TraceOptions::new("q")).unwrap();
        let llm_id = logger.add_llm_span(LlmSpanOptions::new("hi")).unwrap();

        let unit = logger.update_span_output(trace_id, llm_id, "late").unwrap();
        assert!(unit.is_none());

        let span = logger.pending_traces()[0].find_span(&llm_id).unwrap();
        assert_eq!(span.step().output, Some(StepIO::Message(Message::assistant("late"))));

        let missing = logger.update_span_output(trace_id, StepId::new(), "x");
        assert!(missing.unwrap_err().is_invalid_state());
        assert!(transport.records().is_empty());
    }

    #[tokio::test]
    async fn test_update_span_after_flush_is_scheduled() {
        let (mut logger, transport) = logger();
        let trace_id = logger.start_trace(TraceOptions::new("q")).unwrap();
        let tool_id = logger.add_tool_span(ToolSpanOptions::new("t")).unwrap();
        logger.flush().await;

        let unit = logger
            .update_span_output(trace_id, tool_id, "late")
            .unwrap()
            .unwrap();
        assert!(unit.starts_with("update:"));

        let flushed = logger.terminate().await;
        assert!(flushed.is_empty());
        let records = transport.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].target_id(), tool_id);
    }

    #[test]
    fn test_update_span_outside_runtime() {
        let (mut logger, transport) = logger();
        let trace_id = logger.start_trace(TraceOptions::new("q")).unwrap();
        let tool_id = logger.add_tool_span(ToolSpanOptions::new("t")).unwrap();

        // Pending traces are edited in place without a runtime.
        assert_eq!(logger.update_span_output(trace_id, tool_id, "local").unwrap(), None);

        let err = logger
            .update_span_output(StepId::new(), StepId::new(), "late")
            .unwrap_err();
        assert!(err.is_invalid_state());
        assert_eq!(logger.pipeline().pending_update_count(), 0);
        assert!(transport.records().is_empty());
    }
}
