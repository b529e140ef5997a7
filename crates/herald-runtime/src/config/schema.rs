//! Configuration schema definitions.
//!
//! ```toml
//! [logging]
//! level = "info"
//! format = "compact"
//! output = "stdout"
//!
//! [logging.filters]
//! herald_framework = "debug"
//!
//! [dispatch]
//! sync_commands = true
//! autocomplete_limit = 25
//! catch_panics = true
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use herald_framework::{DEFAULT_AUTOCOMPLETE_LIMIT, DispatchSettings};
use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeraldConfig {
    /// Logging setup.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Dispatch behaviour.
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

// =============================================================================
// Logging
// =============================================================================

/// Log line layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    #[cfg(feature = "json-log")]
    Json,
}

/// Where log lines are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    /// Requires `file_path`.
    File,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base level (trace, debug, info, warn, error). `RUST_LOG` wins if set.
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Log file, used when `output = "file"`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    #[serde(default)]
    pub thread_ids: bool,

    /// Include source file and line.
    #[serde(default)]
    pub file_location: bool,

    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Per-target levels, e.g. `herald_framework = "debug"`.
    #[serde(default)]
    pub filters: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            file_path: None,
            thread_ids: false,
            file_location: false,
            span_events: SpanEventConfig::default(),
            filters: HashMap::new(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

// =============================================================================
// Dispatch
// =============================================================================

/// Dispatch configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Submit command definitions to the platform at startup and rekey the
    /// command handlers by the returned ids.
    #[serde(default = "default_true")]
    pub sync_commands: bool,

    /// Maximum autocomplete suggestions forwarded to the platform.
    #[serde(default = "default_autocomplete_limit")]
    pub autocomplete_limit: usize,

    /// Contain handler panics as failures.
    #[serde(default = "default_true")]
    pub catch_panics: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            sync_commands: true,
            autocomplete_limit: default_autocomplete_limit(),
            catch_panics: true,
        }
    }
}

impl DispatchConfig {
    /// Converts to the dispatcher's settings.
    pub fn settings(&self) -> DispatchSettings {
        DispatchSettings {
            catch_panics: self.catch_panics,
            autocomplete_limit: self.autocomplete_limit,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_autocomplete_limit() -> usize {
    DEFAULT_AUTOCOMPLETE_LIMIT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config: HeraldConfig = serde_json::from_str(
            r#"{ "logging": { "level": "debug" }, "dispatch": { "catch_panics": false } }"#,
        )
        .unwrap();

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.output, LogOutput::Stdout);
        assert!(config.dispatch.sync_commands);
        assert!(!config.dispatch.catch_panics);
        assert_eq!(config.dispatch.autocomplete_limit, 25);
    }

    #[test]
    fn test_dispatch_settings() {
        let dispatch = DispatchConfig {
            autocomplete_limit: 10,
            ..DispatchConfig::default()
        };
        let settings = dispatch.settings();
        assert_eq!(settings.autocomplete_limit, 10);
        assert!(settings.catch_panics);
    }
}
