//! Error types for the Codepath lesson engine.
//!
//! This module defines the error hierarchy for all engine operations,
//! including configuration loading, content validation, learner interactions,
//! and calls to the external code-execution and chat services.

use std::path::PathBuf;

/// A specialized `Result` type for Codepath engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while loading or playing a lesson.
///
/// Error variants are organized by subsystem and include actionable suggestions
/// where possible. None of them is fatal to a lesson: content errors become
/// placeholders, service errors become messages shown next to the playground.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid JSON syntax in configuration file.
    #[error("Invalid JSON in config file '{path}': {message}\n\nSuggestion: Validate your codepath.json with a JSON linter")]
    ConfigParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Configuration validation failed.
    #[error("Invalid configuration: {message}\n\nSuggestion: {suggestion}")]
    ConfigValidationError {
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    // ========================================================================
    // Content Errors
    // ========================================================================
    /// Content file was not found at the specified path.
    #[error("Content file not found: '{path}'\n\nSuggestion: Check the 'contentDir' field in codepath.json or the path you passed")]
    ContentFileNotFound {
        /// Path where the content was expected.
        path: PathBuf,
    },

    /// Content file exceeds the configured size limit.
    #[error("Content file exceeds size limit ({limit_kb}KB): '{path}' is {size_kb}KB\n\nSuggestion: Split the tutorial or raise 'maxContentSize'")]
    ContentTooLarge {
        /// Path to the oversized file.
        path: PathBuf,
        /// Actual size in kilobytes.
        size_kb: u64,
        /// Configured limit in kilobytes.
        limit_kb: u64,
    },

    /// Content file contains non-UTF-8 bytes.
    #[error("Content file has invalid encoding: '{path}'\n\nSuggestion: Convert the file to UTF-8 encoding")]
    ContentEncodingError {
        /// Path to the file with encoding issues.
        path: PathBuf,
    },

    /// A lesson payload does not have the shape its type requires.
    #[error("Invalid content in lesson '{lesson}': {message}")]
    InvalidContent {
        /// Slug of the offending lesson.
        lesson: String,
        /// What is wrong with it.
        message: String,
    },

    /// Tutorial or lesson lookup came back empty.
    #[error("Lesson not found: '{tutorial}/{lesson}'\n\nSuggestion: Check the tutorial and lesson slugs")]
    LessonNotFound {
        /// Tutorial slug.
        tutorial: String,
        /// Lesson slug.
        lesson: String,
    },

    // ========================================================================
    // Interaction Errors
    // ========================================================================
    /// An action was sent to a lesson of a different type.
    #[error("Action '{action}' does not apply to a {actual} lesson")]
    WrongLessonType {
        /// The action that was attempted.
        action: String,
        /// The lesson type the session holds.
        actual: String,
    },

    /// Question index outside `[0, total)`.
    #[error("Question index {index} is out of range (lesson has {total} questions)")]
    QuestionOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of questions in the lesson.
        total: usize,
    },

    /// Option id not present in the question.
    #[error("Unknown option '{option}' for question '{question}'")]
    UnknownOption {
        /// Question id.
        question: String,
        /// Option id that was selected.
        option: String,
    },

    /// Blank position not present in the question.
    #[error("Unknown blank position {position} for question '{question}'")]
    UnknownBlank {
        /// Question id.
        question: String,
        /// 1-based blank position.
        position: u32,
    },

    /// Block id not in the pool, or slot index not in the placed list.
    #[error("Unknown block or slot '{block}' for question '{question}'")]
    UnknownBlock {
        /// Question id.
        question: String,
        /// Block id or slot index.
        block: String,
    },

    /// No session with this id is held by the server.
    #[error("Session not found: '{id}'")]
    SessionNotFound {
        /// Session id.
        id: String,
    },

    // ========================================================================
    // External Service Errors
    // ========================================================================
    /// A service (code execution, chat) answered with an error.
    #[error("{service} service error ({kind}): {message}\n\nSuggestion: {suggestion}")]
    ServiceError {
        /// Which service failed.
        service: String,
        /// Classified error kind.
        kind: ServiceErrorKind,
        /// Detail from the response or transport.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    /// A service did not answer within its timeout.
    #[error("{service} service timed out after {timeout_secs}s\n\nSuggestion: Try again; long-running code may need to be simplified")]
    ServiceTimeout {
        /// Which service timed out.
        service: String,
        /// The timeout in seconds.
        timeout_secs: u64,
    },

    // ========================================================================
    // General I/O Errors
    // ========================================================================
    /// General I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Categories of service failures, keyed mostly on HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
    /// 401: the learner is not signed in.
    Authentication,
    /// 403: the learner's plan does not include the feature.
    Subscription,
    /// 429: too many requests.
    RateLimit,
    /// 5xx responses.
    Server,
    /// Connection refused, DNS, TLS and similar.
    Network,
    /// Anything else.
    Other,
}

impl std::fmt::Display for ServiceErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Subscription => write!(f, "subscription"),
            Self::RateLimit => write!(f, "rate_limit"),
            Self::Server => write!(f, "server"),
            Self::Network => write!(f, "network"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl ServiceErrorKind {
    /// Classifies an HTTP status code.
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            401 => Self::Authentication,
            403 => Self::Subscription,
            429 => Self::RateLimit,
            500..=599 => Self::Server,
            _ => Self::Other,
        }
    }

    /// Returns a suggestion message for this error kind.
    #[must_use]
    pub const fn suggestion(&self) -> &'static str {
        match self {
            Self::Authentication => "Sign in and try again",
            Self::Subscription => "Upgrade your plan to use this feature",
            Self::RateLimit => "Wait a moment before sending another request",
            Self::Server => "Retry later; the service may be experiencing issues",
            Self::Network => "Check your network connection",
            Self::Other => "Retry the request",
        }
    }

    /// The message shown to the learner next to the playground.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::Authentication => "Please sign in to use the AI assistant.",
            Self::Subscription => "The AI assistant requires an active subscription.",
            Self::RateLimit => "Too many requests. Please wait a moment and try again.",
            Self::Server | Self::Network | Self::Other => {
                "Something went wrong. Please try again."
            }
        }
    }
}

impl EngineError {
    /// Creates a new `ConfigParseError` with the given path and message.
    #[must_use]
    pub fn config_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ConfigValidationError` with the given message and suggestion.
    #[must_use]
    pub fn config_validation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::ConfigValidationError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `ContentFileNotFound` error.
    #[must_use]
    pub fn content_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ContentFileNotFound { path: path.into() }
    }

    /// Creates a new `ContentTooLarge` error.
    #[must_use]
    pub fn content_too_large(path: impl Into<PathBuf>, size_kb: u64, limit_kb: u64) -> Self {
        Self::ContentTooLarge {
            path: path.into(),
            size_kb,
            limit_kb,
        }
    }

    /// Creates a new `ContentEncodingError`.
    #[must_use]
    pub fn content_encoding(path: impl Into<PathBuf>) -> Self {
        Self::ContentEncodingError { path: path.into() }
    }

    /// Creates a new `InvalidContent` error.
    #[must_use]
    pub fn invalid_content(lesson: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidContent {
            lesson: lesson.into(),
            message: message.into(),
        }
    }

    /// Creates a new `LessonNotFound` error.
    #[must_use]
    pub fn lesson_not_found(tutorial: impl Into<String>, lesson: impl Into<String>) -> Self {
        Self::LessonNotFound {
            tutorial: tutorial.into(),
            lesson: lesson.into(),
        }
    }

    /// Creates a new `WrongLessonType` error.
    #[must_use]
    pub fn wrong_lesson_type(action: impl Into<String>, actual: impl std::fmt::Display) -> Self {
        Self::WrongLessonType {
            action: action.into(),
            actual: actual.to_string(),
        }
    }

    /// Creates a new `UnknownOption` error.
    #[must_use]
    pub fn unknown_option(question: impl Into<String>, option: impl Into<String>) -> Self {
        Self::UnknownOption {
            question: question.into(),
            option: option.into(),
        }
    }

    /// Creates a new `UnknownBlank` error.
    #[must_use]
    pub fn unknown_blank(question: impl Into<String>, position: u32) -> Self {
        Self::UnknownBlank {
            question: question.into(),
            position,
        }
    }

    /// Creates a new `UnknownBlock` error.
    #[must_use]
    pub fn unknown_block(question: impl Into<String>, block: impl std::fmt::Display) -> Self {
        Self::UnknownBlock {
            question: question.into(),
            block: block.to_string(),
        }
    }

    /// Creates a new `SessionNotFound` error.
    #[must_use]
    pub fn session_not_found(id: impl std::fmt::Display) -> Self {
        Self::SessionNotFound { id: id.to_string() }
    }

    /// Creates a new `ServiceError` with automatic suggestion based on error kind.
    #[must_use]
    pub fn service(
        service: impl Into<String>,
        kind: ServiceErrorKind,
        message: impl Into<String>,
    ) -> Self {
        let suggestion = kind.suggestion().to_string();
        Self::ServiceError {
            service: service.into(),
            kind,
            message: message.into(),
            suggestion,
        }
    }

    /// Creates a new `ServiceTimeout` error.
    #[must_use]
    pub fn service_timeout(service: impl Into<String>, timeout_secs: u64) -> Self {
        Self::ServiceTimeout {
            service: service.into(),
            timeout_secs,
        }
    }

    /// Returns `true` if this error is transient and the learner may retry.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ServiceError {
                kind: ServiceErrorKind::RateLimit
                    | ServiceErrorKind::Server
                    | ServiceErrorKind::Network,
                ..
            } | Self::ServiceTimeout { .. }
        )
    }

    /// Returns `true` if this error comes from a learner action that does not
    /// fit the lesson (as opposed to a broken environment).
    #[must_use]
    pub const fn is_interaction(&self) -> bool {
        matches!(
            self,
            Self::WrongLessonType { .. }
                | Self::QuestionOutOfRange { .. }
                | Self::UnknownOption { .. }
                | Self::UnknownBlank { .. }
                | Self::UnknownBlock { .. }
        )
    }

    /// A short message suitable for display inside the lesson UI.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::ServiceError { kind, .. } => kind.user_message().to_string(),
            Self::ServiceTimeout { timeout_secs, .. } => {
                format!("The request timed out after {timeout_secs} seconds. Please try again.")
            }
            Self::InvalidContent { .. } => "This content is unavailable.".to_string(),
            other => other
                .to_string()
                .split("\n\nSuggestion:")
                .next()
                .unwrap_or_default()
                .to_string(),
        }
    }
}
