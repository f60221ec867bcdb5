//! Codepath presentation adapters and lesson reports.
//!
//! This crate owns everything about how lesson content looks once the engine
//! has decided what to show:
//!
//! - [`Theme`] and [`Palette`]: explicit light/dark styling, passed into every adapter
//! - [`code::CodeBlock`]: line-numbered HTML with a copy affordance, or fenced Markdown
//! - [`diagram::DiagramAdapter`]: Mermaid rendering with re-theming and a fallback
//! - [`LessonReport`]: a finished (or abandoned) lesson, rendered by
//!   [`MarkdownGenerator`] and [`json::JsonGenerator`]
//!
//! # Example
//!
//! ```rust
//! use codepath_render::{LessonReport, MarkdownGenerator, ReportStatus};
//!
//! let report = LessonReport {
//!     tutorial: "rust-basics".to_string(),
//!     lesson: "ownership-quiz".to_string(),
//!     title: "Ownership Quiz".to_string(),
//!     status: ReportStatus::Completed,
//!     ..LessonReport::default()
//! };
//!
//! let markdown = MarkdownGenerator::new(&report).generate();
//! assert!(markdown.contains("# Lesson Report: Ownership Quiz"));
//! ```

pub mod code;
pub mod diagram;
pub mod json;
mod markdown;
mod theme;

pub use markdown::MarkdownGenerator;
pub use theme::{Palette, Theme};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The external renderer binary could not be found.
    #[error("{renderer} is not available\n\nSuggestion: Install it (npm install -g @mermaid-js/mermaid-cli) or set diagram.mmdcPath")]
    RendererUnavailable {
        /// Renderer name.
        renderer: String,
    },

    /// The renderer ran and rejected the input.
    #[error("diagram rendering failed: {message}")]
    RenderFailed {
        /// Renderer output.
        message: String,
    },

    /// Failed to serialize a report to JSON.
    #[error("failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failed to read or write files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RenderError {
    /// Creates a `RendererUnavailable` error.
    #[must_use]
    pub fn renderer_unavailable(renderer: impl Into<String>) -> Self {
        Self::RendererUnavailable {
            renderer: renderer.into(),
        }
    }

    /// The message without its suggestion.
    #[must_use]
    pub fn summary(&self) -> String {
        self.to_string()
            .split("\n\nSuggestion:")
            .next()
            .unwrap_or_default()
            .to_string()
    }
}

/// Result type for render operations.
pub type Result<T> = std::result::Result<T, RenderError>;

// ============================================================================
// Report Status (local copy to avoid cross-crate dependency)
// ============================================================================

/// Where the lesson stood when the report was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// Some questions are not complete.
    #[default]
    InProgress,
    /// Every question is complete.
    Completed,
    /// The lesson content could not be loaded.
    Unavailable,
}

impl ReportStatus {
    /// Returns `true` when the lesson was finished.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns a human-readable description of the status.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::InProgress => "In progress",
            Self::Completed => "Completed",
            Self::Unavailable => "Content unavailable",
        }
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// How one question ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionOutcome {
    /// Not answered, checked or read.
    #[default]
    Pending,
    /// Completed correctly.
    Correct,
    /// Completed incorrectly (including revealed solutions).
    Incorrect,
}

impl QuestionOutcome {
    /// Builds an outcome from completion flags.
    #[must_use]
    pub const fn from_flags(complete: bool, correct: bool) -> Self {
        match (complete, correct) {
            (false, _) => Self::Pending,
            (true, true) => Self::Correct,
            (true, false) => Self::Incorrect,
        }
    }

    /// Short label for tables.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Correct => "Correct",
            Self::Incorrect => "Incorrect",
        }
    }
}

// ============================================================================
// Report
// ============================================================================

/// A lesson session, summarized for the learner or an author.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LessonReport {
    /// Tutorial slug.
    pub tutorial: String,
    /// Lesson slug.
    pub lesson: String,
    /// Lesson title.
    pub title: String,
    /// Lesson type name (`mcq`, `fill_in_blanks`, ...).
    pub lesson_type: String,
    /// Overall status.
    pub status: ReportStatus,
    /// Aggregate counts.
    pub summary: ReportSummary,
    /// One entry per question, in lesson order.
    pub questions: Vec<QuestionReport>,
    /// When the session began.
    pub started_at: DateTime<Utc>,
    /// When the report was produced.
    pub generated_at: DateTime<Utc>,
}

/// Aggregate counts of a lesson.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Questions completed.
    pub completed: usize,
    /// Questions answered correctly.
    pub correct: usize,
    /// Number of questions.
    pub total: usize,
    /// Mean fill-in-blank score, if any were checked.
    pub average_score: Option<f64>,
}

impl ReportSummary {
    /// Completion percentage, rounded down.
    #[must_use]
    pub const fn percent_complete(&self) -> usize {
        if self.total == 0 {
            return 0;
        }
        self.completed * 100 / self.total
    }
}

/// One question of the report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionReport {
    /// Position in the lesson (0-based).
    pub index: usize,
    /// Question id.
    pub id: String,
    /// Prompt or section title.
    pub prompt: String,
    /// Outcome.
    pub outcome: QuestionOutcome,
    /// Fill-in-blank score.
    pub score: Option<u8>,
}

impl LessonReport {
    /// Seconds between session start and report generation.
    #[must_use]
    pub fn duration_seconds(&self) -> u64 {
        u64::try_from((self.generated_at - self.started_at).num_seconds()).unwrap_or(0)
    }
}
