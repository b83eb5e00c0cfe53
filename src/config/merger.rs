// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration merging.
//!
//! Handles merging configurations from different sources with proper precedence.

use super::types::{LoggerConfig, TracerConfigFile};

/// Caller-supplied values that override file configuration.
///
/// Environment lookups belong to the caller; the result is passed in here.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub disabled: Option<bool>,
    pub project: Option<String>,
    pub log_stream: Option<String>,
    pub experiment_id: Option<String>,
    pub max_retries: Option<u32>,
}

/// Merge configuration with precedence.
///
/// Precedence (highest to lowest):
/// 1. Overrides
/// 2. File config
/// 3. Default values
pub fn merge_config(file: Option<TracerConfigFile>, overrides: ConfigOverrides) -> LoggerConfig {
    let mut result = LoggerConfig::default();

    if let Some(config) = file {
        apply_file_config(&mut result, &config);
    }

    apply_overrides(&mut result, &overrides);

    result
}

fn apply_file_config(result: &mut LoggerConfig, config: &TracerConfigFile) {
    if let Some(disabled) = config.disabled {
        result.disabled = disabled;
    }

    if config.project.is_some() {
        result.project = config.project.clone();
    }

    if config.log_stream.is_some() {
        result.log_stream = config.log_stream.clone();
    }

    if config.experiment_id.is_some() {
        result.experiment_id = config.experiment_id.clone();
    }

    if let Some(ref retry) = config.retry {
        if let Some(max_retries) = retry.max_retries {
            result.retry.max_retries = max_retries;
        }
        if let Some(base) = retry.base_delay_ms {
            result.retry.base_delay_ms = base;
        }
        if let Some(max) = retry.max_delay_ms {
            result.retry.max_delay_ms = max;
        }
    }
}

fn apply_overrides(result: &mut LoggerConfig, overrides: &ConfigOverrides) {
    if let Some(disabled) = overrides.disabled {
        result.disabled = disabled;
    }

    if overrides.project.is_some() {
        result.project = overrides.project.clone();
    }

    if overrides.log_stream.is_some() {
        result.log_stream = overrides.log_stream.clone();
    }

    if overrides.experiment_id.is_some() {
        result.experiment_id = overrides.experiment_id.clone();
    }

    if let Some(max_retries) = overrides.max_retries {
        result.retry.max_retries = max_retries;
    }
}
