//! Fill-in-the-blank evaluation.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::content::{normalize_answer, parse_template, FibQuestion, TemplateSegment};
use crate::error::{EngineError, Result};
use crate::state::FibState;

/// Verdict for a single blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlankVerdict {
    /// Blank position.
    pub position: u32,
    /// What the learner entered (empty if nothing).
    pub given: String,
    /// The expected answer.
    pub expected: String,
    /// Normalized equality.
    pub correct: bool,
    /// Hint, included only for wrong answers.
    pub hint: Option<String>,
    /// Explanation.
    pub explanation: Option<String>,
}

/// Result of checking a fill-in-blank question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FibResult {
    /// `round(100 * correct / total)`, in `[0, 100]`.
    pub score: u8,
    /// Number of correct blanks.
    pub correct_count: usize,
    /// Number of blanks.
    pub total: usize,
    /// Per-blank verdicts ordered by position.
    pub blanks: Vec<BlankVerdict>,
}

/// Percentage score, rounded half away from zero. An empty question scores 100.
///
/// # Examples
///
/// ```
/// use codepath_engine::evaluate::fib::score;
///
/// assert_eq!(score(2, 3), 67);
/// assert_eq!(score(1, 3), 33);
/// assert_eq!(score(0, 0), 100);
/// ```
pub fn score(correct: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let correct = correct.min(total);
    // Integer form of round(100 * c / t): (200c + t) / 2t
    let rounded = (200 * correct + total) / (2 * total);
    u8::try_from(rounded).unwrap_or(100)
}

/// Evaluates a set of answers against the question's blanks.
pub fn evaluate(question: &FibQuestion, answers: &BTreeMap<u32, String>) -> FibResult {
    let blanks: Vec<BlankVerdict> = question
        .blanks
        .iter()
        .map(|blank| {
            let given = answers.get(&blank.position).cloned().unwrap_or_default();
            let correct = normalize_answer(&given) == normalize_answer(&blank.correct_answer);
            BlankVerdict {
                position: blank.position,
                given,
                expected: blank.correct_answer.clone(),
                correct,
                hint: if correct { None } else { blank.hint.clone() },
                explanation: blank.explanation.clone(),
            }
        })
        .collect();

    let correct_count = blanks.iter().filter(|b| b.correct).count();
    let total = blanks.len();
    FibResult {
        score: score(correct_count, total),
        correct_count,
        total,
        blanks,
    }
}

/// Updates one blank while editing. Ignored once checked.
///
/// # Errors
///
/// Returns `EngineError::UnknownBlank` if the position has no blank.
pub fn set_answer(
    question: &FibQuestion,
    state: &mut FibState,
    position: u32,
    value: impl Into<String>,
) -> Result<bool> {
    if question.blank(position).is_none() {
        return Err(EngineError::unknown_blank(&question.id, position));
    }
    let FibState::Editing { answers } = state else {
        return Ok(false);
    };
    let value = value.into();
    if answers.get(&position) == Some(&value) {
        return Ok(false);
    }
    answers.insert(position, value);
    Ok(true)
}

/// Submits the answers. Completes the question whatever the score; a second
/// check is ignored.
pub fn check(question: &FibQuestion, state: &mut FibState) -> bool {
    let FibState::Editing { answers } = state else {
        return false;
    };
    let answers = std::mem::take(answers);
    let result = evaluate(question, &answers);
    *state = FibState::Checked { answers, result };
    true
}

/// Renders the template with the given answers substituted. Missing answers
/// render as `____`.
pub fn fill_template(template: &str, answers: &BTreeMap<u32, String>) -> String {
    parse_template(template)
        .into_iter()
        .map(|segment| match segment {
            TemplateSegment::Text { text } => text,
            TemplateSegment::Blank { position } => answers
                .get(&position)
                .filter(|a| !a.trim().is_empty())
                .cloned()
                .unwrap_or_else(|| "____".to_string()),
        })
        .collect()
}

/// The template filled with the correct answers.
pub fn solution(question: &FibQuestion) -> String {
    let answers = question
        .blanks
        .iter()
        .map(|blank| (blank.position, blank.correct_answer.clone()))
        .collect();
    fill_template(&question.template, &answers)
}
