// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Subscriber installation for hosts and tests.
//!
//! The library only emits `tracing` events. Hosts that do not install their
//! own subscriber can call [`init_telemetry`] once at startup.

use std::io;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Target prefix of every event this crate emits.
pub const CRATE_TARGET: &str = "llm_tracer";

/// Line layout of emitted events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Level used when neither `directives` nor RUST_LOG say otherwise.
    pub level: Level,

    /// Extra filter directives, e.g. `llm_tracer::scheduler=trace`.
    /// When non-empty, RUST_LOG is ignored.
    pub directives: Vec<String>,

    pub format: LogFormat,

    pub ansi: bool,

    /// Emit file and line of each event.
    pub source_location: bool,

    /// Emit an event when an instrumented span closes.
    pub span_close_events: bool,

    /// Route output through the test harness capture.
    pub test_writer: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            directives: Vec::new(),
            format: LogFormat::Compact,
            ansi: true,
            source_location: false,
            span_close_events: false,
            test_writer: false,
        }
    }
}

impl TelemetryConfig {
    /// Debug output with locations, for working on a host application.
    pub fn verbose() -> Self {
        Self {
            level: Level::DEBUG,
            format: LogFormat::Full,
            source_location: true,
            span_close_events: true,
            ..Self::default()
        }
    }

    /// Warnings and failures only.
    pub fn quiet() -> Self {
        Self {
            level: Level::WARN,
            ansi: false,
            ..Self::default()
        }
    }

    /// Everything this crate emits, captured per test.
    pub fn testing() -> Self {
        Self {
            level: Level::WARN,
            directives: vec![format!("{CRATE_TARGET}=trace")],
            ansi: false,
            source_location: true,
            test_writer: true,
            ..Self::default()
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    /// Invalid directives are skipped with a note on stderr.
    fn env_filter(&self) -> EnvFilter {
        if self.directives.is_empty() {
            return EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.level.to_string()));
        }

        let mut filter = EnvFilter::new(self.level.to_string());
        for directive in &self.directives {
            match directive.parse() {
                Ok(parsed) => filter = filter.add_directive(parsed),
                Err(err) => eprintln!("ignoring log directive {directive:?}: {err}"),
            }
        }
        filter
    }
}

/// Install a global subscriber.
///
/// Fails if a global subscriber is already set.
pub fn init_telemetry(config: &TelemetryConfig) -> io::Result<()> {
    let span_events = if config.span_close_events {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let registry = tracing_subscriber::registry().with(config.env_filter());
    let layer = fmt::layer()
        .with_ansi(config.ansi)
        .with_file(config.source_location)
        .with_line_number(config.source_location)
        .with_span_events(span_events);

    let result = match (config.format, config.test_writer) {
        (LogFormat::Compact, false) => registry.with(layer.compact()).try_init(),
        (LogFormat::Compact, true) => registry.with(layer.compact().with_test_writer()).try_init(),
        (LogFormat::Full, false) => registry.with(layer).try_init(),
        (LogFormat::Full, true) => registry.with(layer.with_test_writer()).try_init(),
    };

    result.map_err(|e| io::Error::other(e.to_string()))
}

/// Install the testing subscriber, ignoring an already-installed one.
pub fn init_test_telemetry() {
    let _ = init_telemetry(&TelemetryConfig::testing());
}
