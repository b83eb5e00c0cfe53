// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! llm-tracer - client-side telemetry core for LLM applications.
//!
//! Builds trees of execution records (traces holding nested workflow,
//! agent, LLM, retriever and tool spans), then ships finished traces to an
//! ingestion endpoint through a dependency-ordered scheduler with
//! classification-based retries.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`records`] - Trace/span data model, metrics and validation
//! - [`logger`] - Trace logger state machine (open-parent stack, conclude, flush)
//! - [`scheduler`] - Dependency-aware executor for named units of work
//! - [`retry`] - Status classification and exponential backoff
//! - [`pipeline`] - Ingest/update scheduling against a [`pipeline::Transport`]
//! - [`config`] - Configuration loading and merging
//! - [`telemetry`] - Subscriber setup and pipeline metrics
//! - [`error`] - Error types and result aliases
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use llm_tracer::logger::{ConcludeOptions, LlmSpanOptions, TraceLogger, TraceOptions};
//! use llm_tracer::{LoggerConfig, MemoryTransport};
//!
//! let mut logger = TraceLogger::new(LoggerConfig::default(), Arc::new(MemoryTransport::new()));
//! logger.start_trace(TraceOptions::new("question"))?;
//! logger.add_llm_span(LlmSpanOptions::new("hi").with_output("hello"))?;
//! logger.conclude(ConcludeOptions::all())?;
//! let flushed = logger.flush().await;
//! ```

pub mod config;
pub mod error;
pub mod logger;
pub mod pipeline;
pub mod records;
pub mod retry;
pub mod scheduler;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use config::{LoggerConfig, RetryConfig};
pub use error::{ConfigError, LoggerError, Result, TaskError, TransportError, ValidationError};
pub use logger::TraceLogger;
pub use pipeline::{Ack, FlushPipeline, IngestRecord, MemoryTransport, SpanUpdate, Transport};
pub use records::{Span, StepIO, StepId, StepType, Trace};
pub use retry::{with_retry, RetryPolicy};
pub use scheduler::{TaskHandle, TaskScheduler, TaskStatus};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
