// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Error types for the tracing core.
//!
//! This module provides strongly-typed errors for each part of the core,
//! using `thiserror` for ergonomic error definitions. Contract violations
//! ([`LoggerError`], [`ValidationError`]) surface synchronously and are never
//! retried; [`TransportError`] is classified by the retry policy; and
//! [`TaskError`] carries scheduler outcomes, including failures synthesized
//! for units whose dependency failed.

use thiserror::Error;

/// Errors raised when a step's input or output cannot be represented as JSON.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Value is not serializable: {0}")]
    NotSerializable(String),

    #[error("Unsupported {field} shape: {found}")]
    UnsupportedShape { field: String, found: String },
}

impl ValidationError {
    /// Create an unsupported-shape error for the given field.
    pub fn shape(field: impl Into<String>, found: impl Into<String>) -> Self {
        Self::UnsupportedShape {
            field: field.into(),
            found: found.into(),
        }
    }
}

impl From<serde_json::Error> for ValidationError {
    fn from(err: serde_json::Error) -> Self {
        Self::NotSerializable(err.to_string())
    }
}

/// Errors raised by the logger state machine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoggerError {
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl LoggerError {
    /// Create an invalid-state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// Check if this error is an illegal state-machine transition.
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState(_))
    }
}

/// Errors raised by the ingestion transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("API error: {message}")]
    Api {
        message: String,
        status_code: Option<u16>,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl TransportError {
    /// Create an HTTP error with status code.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Create an API error with an optional status code.
    pub fn api(message: impl Into<String>, status_code: Option<u16>) -> Self {
        Self::Api {
            message: message.into(),
            status_code,
        }
    }

    /// Explicit status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Status code reported by the API body, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status_code, .. } => *status_code,
            _ => None,
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Outcome of a scheduled unit of work that did not complete.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError<E> {
    #[error("Task failed: {0}")]
    Failed(E),

    #[error("Task {task} skipped because dependency {dependency} failed")]
    DependencyFailed { task: String, dependency: String },

    #[error("Task {0} is already pending or running")]
    Duplicate(String),

    #[error("Task {0} was dropped by scheduler termination")]
    Terminated(String),

    #[error("Task {task} panicked: {message}")]
    Panicked { task: String, message: String },
}

impl<E> TaskError<E> {
    /// The underlying work error, if the work itself ran and failed.
    pub fn work_error(&self) -> Option<&E> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// Name of the failed dependency, for synthesized failures.
    pub fn failed_dependency(&self) -> Option<&str> {
        match self {
            Self::DependencyFailed { dependency, .. } => Some(dependency),
            _ => None,
        }
    }

    /// Check if this failure was synthesized without running the work.
    pub fn is_dependency_failure(&self) -> bool {
        matches!(self, Self::DependencyFailed { .. })
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, Self::Panicked { .. })
    }
}

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("IO error reading config: {0}")]
    IoError(String),

    #[error("YAML parsing error: {0}")]
    YamlError(String),

    #[error("JSON parsing error: {0}")]
    JsonError(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            _ => Self::IoError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError(err.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::YamlError(err.to_string())
    }
}

/// Result type for logger operations.
pub type Result<T> = std::result::Result<T, LoggerError>;
