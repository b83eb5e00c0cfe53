// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration for the tracing core.
//!
//! Handles loading and merging of configuration from:
//! - A config file in the working directory (`.llm-tracer.json`, `.llm-tracer.yaml`, ...)
//! - Caller overrides (typically derived from the environment by the host)
//!
//! Configuration is merged with precedence (overrides > file > defaults)
//! and then injected into a logger as a plain [`LoggerConfig`].

mod loader;
mod merger;
mod types;

pub use loader::{load_config_file, load_workspace_config, save_config_file, CONFIG_FILES};

pub use merger::{merge_config, ConfigOverrides};

pub use types::{LoggerConfig, RetryConfig, RetryConfigPartial, TracerConfigFile};

use crate::error::ConfigError;
use std::path::Path;

/// Load, merge and validate configuration for a directory.
pub fn load_config(dir: &Path, overrides: ConfigOverrides) -> Result<LoggerConfig, ConfigError> {
    let file = load_workspace_config(dir)?;
    let config = merge_config(file, overrides);
    config.validate()?;
    Ok(config)
}
