// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration type definitions.
//!
//! [`TracerConfigFile`] mirrors what may appear in a JSON or YAML file, with
//! every field optional. [`LoggerConfig`] is the resolved struct injected
//! into a logger at construction.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Partial configuration as read from a file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TracerConfigFile {
    /// Skip transmission entirely
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,

    /// Project label copied onto every ingest record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    /// Log stream label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_stream: Option<String>,

    /// Experiment label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experiment_id: Option<String>,

    /// Retry settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryConfigPartial>,
}

/// Partial retry settings as read from a file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfigPartial {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_delay_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_delay_ms: Option<u64>,
}

/// Resolved retry settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
        }
    }
}

/// Resolved logger configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggerConfig {
    /// When set, traces are still built but never transmitted.
    pub disabled: bool,

    pub project: Option<String>,

    pub log_stream: Option<String>,

    pub experiment_id: Option<String>,

    pub retry: RetryConfig,
}

impl LoggerConfig {
    /// Config for a logger bound to a project and log stream.
    pub fn for_stream(project: impl Into<String>, log_stream: impl Into<String>) -> Self {
        Self {
            project: Some(project.into()),
            log_stream: Some(log_stream.into()),
            ..Self::default()
        }
    }

    /// A config that never transmits.
    pub fn disabled() -> Self {
        Self {
            disabled: true,
            ..Self::default()
        }
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(ConfigError::InvalidValue {
                field: "retry.baseDelayMs".to_string(),
                message: format!(
                    "base delay {}ms exceeds max delay {}ms",
                    self.retry.base_delay_ms, self.retry.max_delay_ms
                ),
            });
        }
        if self.log_stream.is_some() && self.experiment_id.is_some() {
            return Err(ConfigError::InvalidValue {
                field: "experimentId".to_string(),
                message: "logStream and experimentId are mutually exclusive".to_string(),
            });
        }
        Ok(())
    }
}
