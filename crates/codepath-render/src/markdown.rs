//! Markdown lesson reports.
//!
//! [`MarkdownGenerator`] turns a [`LessonReport`] into a short document: a
//! summary table followed by one row per question.

use chrono::{DateTime, Utc};
use std::fmt::Write;

use crate::{LessonReport, QuestionReport};

/// Maximum prompt length shown in the questions table.
const MAX_PROMPT_DISPLAY_LENGTH: usize = 80;

/// Generates Markdown reports for lesson sessions.
pub struct MarkdownGenerator<'a> {
    report: &'a LessonReport,
}

impl<'a> MarkdownGenerator<'a> {
    /// Creates a new Markdown generator for the given report.
    #[must_use]
    pub const fn new(report: &'a LessonReport) -> Self {
        Self { report }
    }

    /// Generates the complete Markdown report.
    #[must_use]
    pub fn generate(&self) -> String {
        let mut output = String::new();

        self.write_title(&mut output);
        self.write_summary(&mut output);
        self.write_questions(&mut output);
        self.write_footer(&mut output);

        output
    }

    fn write_title(&self, output: &mut String) {
        let _ = writeln!(
            output,
            "# Lesson Report: {}\n",
            escape_markdown(&self.report.title)
        );
    }

    fn write_summary(&self, output: &mut String) {
        let summary = &self.report.summary;

        let _ = writeln!(output, "## Summary\n");
        let _ = writeln!(output, "| Metric | Value |");
        let _ = writeln!(output, "|--------|-------|");
        let _ = writeln!(output, "| Tutorial | {} |", escape_markdown(&self.report.tutorial));
        let _ = writeln!(output, "| Lesson | {} |", escape_markdown(&self.report.lesson));
        let _ = writeln!(output, "| Type | {} |", escape_markdown(&self.report.lesson_type));
        let _ = writeln!(output, "| Status | {} |", self.report.status.description());
        let _ = writeln!(
            output,
            "| Progress | {}/{} ({}%) |",
            summary.completed,
            summary.total,
            summary.percent_complete()
        );
        let _ = writeln!(output, "| Correct | {}/{} |", summary.correct, summary.total);
        let _ = writeln!(
            output,
            "| Average Score | {} |",
            summary
                .average_score
                .map_or_else(|| "n/a".to_string(), |s| format!("{s:.0}%"))
        );
        let _ = writeln!(
            output,
            "| Duration | {} |",
            format_duration(self.report.duration_seconds())
        );
        let _ = writeln!(output);
    }

    fn write_questions(&self, output: &mut String) {
        let _ = writeln!(output, "## Questions\n");

        if self.report.questions.is_empty() {
            let _ = writeln!(output, "*No questions in this lesson.*\n");
            return;
        }

        let _ = writeln!(output, "| # | Question | Result | Score |");
        let _ = writeln!(output, "|---|----------|--------|-------|");
        for question in &self.report.questions {
            let _ = writeln!(output, "{}", question_row(question));
        }
        let _ = writeln!(output);
    }

    fn write_footer(&self, output: &mut String) {
        let _ = writeln!(output, "---");
        let timestamp = format_timestamp(&self.report.generated_at);
        let _ = writeln!(output, "*Generated by Codepath at {timestamp}*");
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn question_row(question: &QuestionReport) -> String {
    let prompt = if question.prompt.trim().is_empty() {
        question.id.clone()
    } else {
        truncate_prompt(&question.prompt, MAX_PROMPT_DISPLAY_LENGTH)
    };
    let score = question
        .score
        .map_or_else(|| "-".to_string(), |s| format!("{s}%"));
    format!(
        "| {} | {} | {} | {} |",
        question.index + 1,
        escape_markdown(&prompt),
        question.outcome.label(),
        score
    )
}

/// Formats a duration in seconds to a human-readable string.
///
/// Examples:
/// - 65 seconds -> "1m 5s"
/// - 3661 seconds -> "1h 1m 1s"
fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if secs > 0 || parts.is_empty() {
        parts.push(format!("{secs}s"));
    }
    parts.join(" ")
}

/// Format: "YYYY-MM-DD HH:MM:SS UTC"
fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Escapes special Markdown characters so prompts render literally.
fn escape_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '*' | '_' | '`' | '#' | '[' | ']' | '(' | ')' | '!' | '\\' | '<' | '>' | '|' => {
                result.push('\\');
                result.push(ch);
            }
            '\n' => result.push_str("<br>"),
            _ => result.push(ch),
        }
    }
    result
}

/// First line only, cut at a char boundary.
fn truncate_prompt(prompt: &str, max_chars: usize) -> String {
    let first_line = prompt.trim().lines().next().unwrap_or("");
    if first_line.chars().count() <= max_chars {
        return first_line.to_string();
    }
    let cut: String = first_line.chars().take(max_chars).collect();
    format!("{cut}...")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::{QuestionOutcome, ReportStatus, ReportSummary};

    fn sample_report() -> LessonReport {
        LessonReport {
            tutorial: "rust-basics".to_string(),
            lesson: "loops".to_string(),
            title: "Loops".to_string(),
            lesson_type: "mcq".to_string(),
            status: ReportStatus::Completed,
            summary: ReportSummary {
                completed: 2,
                correct: 1,
                total: 2,
                average_score: None,
            },
            questions: vec![
                QuestionReport {
                    index: 0,
                    id: "q1".to_string(),
                    prompt: "What does `loop` do?".to_string(),
                    outcome: QuestionOutcome::Correct,
                    score: None,
                },
                QuestionReport {
                    index: 1,
                    id: "q2".to_string(),
                    prompt: "Pick the range".to_string(),
                    outcome: QuestionOutcome::Incorrect,
                    score: None,
                },
            ],
            started_at: Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap(),
            generated_at: Utc.with_ymd_and_hms(2026, 1, 5, 10, 2, 5).unwrap(),
        }
    }

    #[test]
    fn test_full_report() {
        let markdown = MarkdownGenerator::new(&sample_report()).generate();
        let expected = "\
# Lesson Report: Loops

## Summary

| Metric | Value |
|--------|-------|
| Tutorial | rust-basics |
| Lesson | loops |
| Type | mcq |
| Status | Completed |
| Progress | 2/2 (100%) |
| Correct | 1/2 |
| Average Score | n/a |
| Duration | 2m 5s |

## Questions

| # | Question | Result | Score |
|---|----------|--------|-------|
| 1 | What does \\`loop\\` do? | Correct | - |
| 2 | Pick the range | Incorrect | - |

---
*Generated by Codepath at 2026-01-05 10:02:05 UTC*
";
        assert_eq!(markdown, expected);
    }

    #[test]
    fn test_question_row_snapshot() {
        let row = question_row(&QuestionReport {
            index: 2,
            id: "f1".to_string(),
            prompt: "Fill in the [loop] header\nsecond line".to_string(),
            outcome: QuestionOutcome::Incorrect,
            score: Some(50),
        });
        insta::assert_snapshot!(row, @r"| 3 | Fill in the \[loop\] header | Incorrect | 50% |");
    }

    #[test]
    fn test_empty_lesson() {
        let report = LessonReport {
            title: "Broken".to_string(),
            status: ReportStatus::Unavailable,
            ..LessonReport::default()
        };
        let markdown = MarkdownGenerator::new(&report).generate();
        assert!(markdown.contains("| Status | Content unavailable |"));
        assert!(markdown.contains("*No questions in this lesson.*"));
        assert!(markdown.contains("| Progress | 0/0 (0%) |"));
    }

    #[test]
    fn test_average_score_and_escaping() {
        let mut report = sample_report();
        report.lesson_type = "fill_in_blanks".to_string();
        report.summary.average_score = Some(83.3);
        let markdown = MarkdownGenerator::new(&report).generate();
        assert!(markdown.contains("| Type | fill\\_in\\_blanks |"));
        assert!(markdown.contains("| Average Score | 83% |"));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(65), "1m 5s");
        assert_eq!(format_duration(3661), "1h 1m 1s");
    }

    #[test]
    fn test_truncate_prompt() {
        let long = "x".repeat(100);
        let truncated = truncate_prompt(&long, 80);
        assert_eq!(truncated.len(), 83);
        assert!(truncated.ends_with("..."));
    }
}
