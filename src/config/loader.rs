// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration loading from files.
//!
//! Handles loading configuration from JSON and YAML files.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

use super::types::TracerConfigFile;

/// Config file names to search for (in order).
pub const CONFIG_FILES: &[&str] = &[
    ".llm-tracer.json",
    ".llm-tracer.yaml",
    ".llm-tracer.yml",
    "llm-tracer.config.json",
];

/// Load configuration from the first config file found in `dir`.
pub fn load_workspace_config(dir: &Path) -> Result<Option<TracerConfigFile>, ConfigError> {
    for filename in CONFIG_FILES {
        let path = dir.join(filename);
        if path.exists() {
            return load_config_file(&path).map(Some);
        }
    }
    Ok(None)
}

/// Load a configuration file (JSON or YAML).
pub fn load_config_file(path: &Path) -> Result<TracerConfigFile, ConfigError> {
    let content = std::fs::read_to_string(path)?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");

    match extension.to_lowercase().as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&content).map_err(ConfigError::from),
        _ => serde_json::from_str(&content).map_err(ConfigError::from),
    }
}

/// Save configuration as pretty JSON.
pub fn save_config_file(
    dir: &Path,
    config: &TracerConfigFile,
    filename: Option<&str>,
) -> Result<PathBuf, ConfigError> {
    let filename = filename.unwrap_or(CONFIG_FILES[0]);
    let path = dir.join(filename);

    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, content)?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_files_order() {
        assert_eq!(CONFIG_FILES[0], ".llm-tracer.json");
    }

    #[test]
    fn test_load_workspace_config_not_found() {
        let temp = TempDir::new().unwrap();
        let result = load_workspace_config(temp.path());
        assert!(result.unwrap().is_none());
    }

    #[test]
    fn test_load_workspace_config_json() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(".llm-tracer.json"),
            r#"{"project": "demo", "logStream": "dev"}"#,
        )
        .unwrap();

        let config = load_workspace_config(temp.path()).unwrap().unwrap();
        assert_eq!(config.project, Some("demo".to_string()));
        assert_eq!(config.log_stream, Some("dev".to_string()));
    }

    #[test]
    fn test_load_config_file_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".llm-tracer.yaml");
        std::fs::write(&path, "disabled: true\nretry:\n  maxRetries: 1\n  baseDelayMs: 5\n").unwrap();

        let config = load_config_file(&path).unwrap();
        assert_eq!(config.disabled, Some(true));
        let retry = config.retry.unwrap();
        assert_eq!(retry.max_retries, Some(1));
        assert_eq!(retry.base_delay_ms, Some(5));
        assert_eq!(retry.max_delay_ms, None);
    }

    #[test]
    fn test_load_config_file_missing() {
        let temp = TempDir::new().unwrap();
        let result = load_config_file(&temp.path().join("nope.json"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_config_file_invalid_json() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(load_config_file(&path), Err(ConfigError::JsonError(_))));
    }

    #[test]
    fn test_save_config_file() {
        let temp = TempDir::new().unwrap();
        let config = TracerConfigFile {
            project: Some("demo".to_string()),
            disabled: Some(false),
            ..Default::default()
        };

        let path = save_config_file(temp.path(), &config, None).unwrap();
        assert!(path.exists());

        let loaded = load_config_file(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
