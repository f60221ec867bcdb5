//! Configuration types for the Codepath engine.
//!
//! This module provides the configuration structures that control where
//! lesson content is read from, which theme the presentation adapters use,
//! and how the external code-execution and chat services are reached.

use std::path::Path;

use codepath_render::Theme;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// The default config file name.
const CONFIG_FILE_NAME: &str = "codepath.json";

/// Default content directory.
fn default_content_dir() -> String {
    "content".to_string()
}

/// Default output directory for lesson summaries.
fn default_output_dir() -> String {
    ".".to_string()
}

/// Default maximum size of a single content file, in kilobytes.
const fn default_max_content_kb() -> u64 {
    1024
}

/// Default idle time after which a session is discarded, in minutes.
const fn default_session_idle_minutes() -> u64 {
    60
}

/// Upper bound for the session idle timeout, in minutes.
const MAX_SESSION_IDLE_MINUTES: u64 = 60 * 24 * 365;

/// Default code-execution endpoint.
fn default_execution_url() -> String {
    "http://localhost:8080/api/execute".to_string()
}

/// Default code-execution timeout in seconds.
const fn default_execution_timeout() -> u64 {
    30
}

/// Default chat service base URL.
fn default_chat_url() -> String {
    "http://localhost:8080".to_string()
}

/// Default chat model identifier.
fn default_chat_model() -> String {
    "default".to_string()
}

/// Default chat timeout in seconds.
const fn default_chat_timeout() -> u64 {
    60
}

/// Default number of chat turns kept per conversation.
const fn default_max_history() -> usize {
    20
}

/// Main configuration for a Codepath server or CLI session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Directory holding `tutorials/` and `languages/` JSON files.
    #[serde(default = "default_content_dir")]
    pub content_dir: String,

    /// Theme injected into code and diagram adapters.
    #[serde(default)]
    pub theme: Theme,

    /// Output directory for lesson summaries written by the CLI.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Maximum size of one content file in kilobytes.
    #[serde(default = "default_max_content_kb")]
    pub max_content_kb: u64,

    /// Minutes without activity before a session is discarded.
    #[serde(default = "default_session_idle_minutes")]
    pub session_idle_minutes: u64,

    /// Code-execution service settings.
    #[serde(default)]
    pub execution: ExecutionConfig,

    /// AI chat service settings.
    #[serde(default)]
    pub chat: ChatConfig,

    /// Diagram rendering settings.
    #[serde(default)]
    pub diagram: DiagramConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            content_dir: default_content_dir(),
            theme: Theme::default(),
            output_dir: default_output_dir(),
            max_content_kb: default_max_content_kb(),
            session_idle_minutes: default_session_idle_minutes(),
            execution: ExecutionConfig::default(),
            chat: ChatConfig::default(),
            diagram: DiagramConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the current working directory.
    ///
    /// Looks for `codepath.json` in the current directory. If not found,
    /// returns the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but contains invalid JSON.
    pub fn load() -> Result<Self> {
        let current_dir = std::env::current_dir().map_err(|e| {
            EngineError::config_parse(
                "<current directory>",
                format!("cannot determine current directory: {e}"),
            )
        })?;
        Self::load_from_dir(&current_dir)
    }

    /// Loads configuration from `codepath.json` in a specific directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but contains invalid JSON.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Self::load_from_file(&dir.join(CONFIG_FILE_NAME))
    }

    /// Loads configuration from a specific file path.
    ///
    /// A missing file yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::ConfigParseError` if the file exists but contains
    /// invalid JSON or invalid enum values, and
    /// `EngineError::ConfigValidationError` if a value is out of range.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(e) => {
                return Err(EngineError::config_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| EngineError::config_parse(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::ConfigValidationError` if any check fails.
    pub fn validate(&self) -> Result<()> {
        if self.content_dir.trim().is_empty() {
            return Err(EngineError::config_validation(
                "contentDir must not be empty",
                "Point contentDir at the directory holding your tutorials in codepath.json",
            ));
        }

        if self.output_dir.trim().is_empty() {
            return Err(EngineError::config_validation(
                "outputDir must not be empty",
                "Provide a valid output directory path in your codepath.json (use '.' for current directory)",
            ));
        }

        if self.max_content_kb == 0 {
            return Err(EngineError::config_validation(
                "maxContentKb must be greater than 0",
                "Set maxContentKb to at least 1 in your codepath.json",
            ));
        }

        if self.session_idle_minutes == 0 {
            return Err(EngineError::config_validation(
                "sessionIdleMinutes must be greater than 0",
                "Set sessionIdleMinutes to at least 1 in your codepath.json",
            ));
        }

        if self.execution.timeout_seconds == 0 {
            return Err(EngineError::config_validation(
                "execution.timeoutSeconds must be greater than 0",
                "Set execution.timeoutSeconds to at least 1 second in your codepath.json",
            ));
        }

        if self.chat.timeout_seconds == 0 {
            return Err(EngineError::config_validation(
                "chat.timeoutSeconds must be greater than 0",
                "Set chat.timeoutSeconds to at least 1 second in your codepath.json",
            ));
        }

        let urls = [
            ("execution.url", &self.execution.url),
            ("chat.url", &self.chat.url),
        ];
        for (field, url) in urls {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(EngineError::config_validation(
                    format!("{field} must be an http(s) URL, got '{url}'"),
                    format!(
                        "Set {field} to a full URL such as http://localhost:8080 in your codepath.json"
                    ),
                ));
            }
        }

        Ok(())
    }

    /// Size limit for content files in bytes.
    pub const fn max_content_bytes(&self) -> u64 {
        self.max_content_kb * 1024
    }

    /// Idle time after which a session is discarded, capped at one year.
    pub fn session_idle_timeout(&self) -> chrono::Duration {
        let minutes = self.session_idle_minutes.min(MAX_SESSION_IDLE_MINUTES);
        chrono::Duration::minutes(i64::try_from(minutes).unwrap_or(0))
    }
}

/// Code-execution service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionConfig {
    /// Endpoint that accepts `{code, language, input}`.
    #[serde(default = "default_execution_url")]
    pub url: String,

    /// Client-side timeout in seconds.
    #[serde(default = "default_execution_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            url: default_execution_url(),
            timeout_seconds: default_execution_timeout(),
        }
    }
}

/// AI chat service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatConfig {
    /// Base URL; requests go to `{url}/api/chat/playground`.
    #[serde(default = "default_chat_url")]
    pub url: String,

    /// Model identifier forwarded to the service.
    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Client-side timeout in seconds.
    #[serde(default = "default_chat_timeout")]
    pub timeout_seconds: u64,

    /// Maximum number of messages forwarded per request.
    #[serde(default = "default_max_history")]
    pub max_history: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            url: default_chat_url(),
            model: default_chat_model(),
            timeout_seconds: default_chat_timeout(),
            max_history: default_max_history(),
        }
    }
}

/// Diagram rendering settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramConfig {
    /// Explicit path to the `mmdc` binary. Looked up on `PATH` when unset.
    #[serde(default)]
    pub mmdc_path: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_config_default_values() {
        let config = Config::default();

        assert_eq!(config.content_dir, "content");
        assert_eq!(config.theme, Theme::Light);
        assert_eq!(config.output_dir, ".");
        assert_eq!(config.max_content_kb, 1024);
        assert_eq!(config.session_idle_minutes, 60);
        assert_eq!(config.execution.timeout_seconds, 30);
        assert_eq!(config.chat.timeout_seconds, 60);
        assert_eq!(config.chat.max_history, 20);
        assert!(config.diagram.mmdc_path.is_none());
    }

    #[test]
    fn test_config_deserialization_with_overrides() {
        let json = r#"{
            "contentDir": "cms-export",
            "theme": "dark",
            "chat": { "model": "tutor-large" }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();

        assert_eq!(config.content_dir, "cms-export");
        assert_eq!(config.theme, Theme::Dark);
        assert_eq!(config.chat.model, "tutor-large");
        // Untouched nested fields keep their defaults
        assert_eq!(config.chat.timeout_seconds, 60);
        assert_eq!(config.execution.timeout_seconds, 30);
    }

    #[test]
    fn test_theme_case_insensitive() {
        let config: Config = serde_json::from_str(r#"{"theme": "DARK"}"#).unwrap();
        assert_eq!(config.theme, Theme::Dark);

        let config: Config = serde_json::from_str(r#"{"theme": "Light"}"#).unwrap();
        assert_eq!(config.theme, Theme::Light);
    }

    #[test]
    fn test_invalid_theme_error() {
        let result: std::result::Result<Config, _> =
            serde_json::from_str(r#"{"theme": "sepia"}"#);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("invalid theme"));
        assert!(err.contains("sepia"));
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let json = r#"{"contentDir": "x", "somethingNew": true}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.content_dir, "x");
    }

    #[test]
    fn test_load_from_file_valid_json() {
        use std::io::Write;

        let config_path = std::env::temp_dir().join("test_codepath_valid.json");
        let json = r#"{"contentDir": "lessons", "execution": {"timeoutSeconds": 10}}"#;
        let mut file = std::fs::File::create(&config_path).unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config.content_dir, "lessons");
        assert_eq!(config.execution.timeout_seconds, 10);
        assert_eq!(config.chat.timeout_seconds, 60);

        std::fs::remove_file(&config_path).ok();
    }

    #[test]
    fn test_load_from_file_invalid_json() {
        use std::io::Write;

        let config_path = std::env::temp_dir().join("test_codepath_invalid.json");
        let mut file = std::fs::File::create(&config_path).unwrap();
        file.write_all(b"{ not valid json }").unwrap();

        let err = Config::load_from_file(&config_path).unwrap_err();
        assert!(
            matches!(
                &err,
                EngineError::ConfigParseError { path, message }
                    if *path == config_path && !message.is_empty()
            ),
            "Expected ConfigParseError with correct path, got: {err:?}"
        );

        std::fs::remove_file(&config_path).ok();
    }

    #[test]
    fn test_load_from_file_nonexistent_returns_default() {
        let config =
            Config::load_from_file(&PathBuf::from("/nonexistent/path/codepath.json")).unwrap();
        assert_eq!(config.content_dir, "content");
    }

    #[test]
    fn test_load_from_dir_finds_codepath_json() {
        use std::io::Write;

        let temp_dir = std::env::temp_dir().join("test_codepath_dir");
        std::fs::create_dir_all(&temp_dir).unwrap();
        let config_path = temp_dir.join("codepath.json");
        let mut file = std::fs::File::create(&config_path).unwrap();
        file.write_all(br#"{"outputDir": "reports"}"#).unwrap();

        let config = Config::load_from_dir(&temp_dir).unwrap();
        assert_eq!(config.output_dir, "reports");

        std::fs::remove_file(&config_path).ok();
        std::fs::remove_dir(&temp_dir).ok();
    }

    #[test]
    fn test_config_validation_zero_timeouts() {
        let config = Config {
            execution: ExecutionConfig {
                timeout_seconds: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(
            matches!(&err, EngineError::ConfigValidationError { message, .. }
                if message.contains("execution.timeoutSeconds")),
            "got: {err:?}"
        );

        let config = Config {
            chat: ChatConfig {
                timeout_seconds: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_bad_url() {
        let config = Config {
            chat: ChatConfig {
                url: "localhost:8080".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(
            matches!(&err, EngineError::ConfigValidationError { message, suggestion }
                if message.contains("chat.url") && suggestion.contains("chat.url")),
            "got: {err:?}"
        );
    }

    #[test]
    fn test_config_validation_empty_dirs() {
        let config = Config {
            content_dir: "  ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            output_dir: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file_validates_after_parsing() {
        use std::io::Write;

        let config_path = std::env::temp_dir().join("test_codepath_validation.json");
        let mut file = std::fs::File::create(&config_path).unwrap();
        file.write_all(br#"{"maxContentKb": 0}"#).unwrap();

        let err = Config::load_from_file(&config_path).unwrap_err();
        assert!(
            matches!(&err, EngineError::ConfigValidationError { .. }),
            "Expected ConfigValidationError, got: {err:?}"
        );

        std::fs::remove_file(&config_path).ok();
    }

    #[test]
    fn test_max_content_bytes() {
        let config = Config {
            max_content_kb: 2,
            ..Default::default()
        };
        assert_eq!(config.max_content_bytes(), 2048);
    }

    #[test]
    fn test_session_idle_timeout() {
        let config: Config = serde_json::from_str(r#"{"sessionIdleMinutes": 5}"#).unwrap();
        assert_eq!(config.session_idle_timeout(), chrono::Duration::minutes(5));

        let config = Config {
            session_idle_minutes: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
