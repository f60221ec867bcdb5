//! Multiple-choice evaluation.

use serde::Serialize;

use crate::content::McqQuestion;
use crate::error::{EngineError, Result};
use crate::state::McqState;

/// How an option is shown once the question has been answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionMark {
    /// Not answered yet, or neither selected nor correct.
    Neutral,
    /// The correct option, not selected.
    Correct,
    /// Selected and correct.
    SelectedCorrect,
    /// Selected and wrong.
    SelectedWrong,
}

/// Per-option feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionFeedback {
    /// Option id.
    pub id: String,
    /// Option text.
    pub text: String,
    /// Display mark.
    pub mark: OptionMark,
    /// Explanation, revealed after answering.
    pub explanation: Option<String>,
}

/// Records the first selection. Later selections are ignored.
///
/// Returns `true` if the state changed.
///
/// # Errors
///
/// Returns `EngineError::UnknownOption` if `option` is not in the question.
pub fn select(question: &McqQuestion, state: &mut McqState, option: &str) -> Result<bool> {
    let chosen = question
        .option(option)
        .ok_or_else(|| EngineError::unknown_option(&question.id, option))?;

    if matches!(state, McqState::Answered { .. }) {
        return Ok(false);
    }

    *state = McqState::Answered {
        selected: chosen.id.clone(),
        correct: chosen.is_correct,
    };
    Ok(true)
}

/// Feedback for every option. Before answering every mark is `Neutral`
/// and explanations stay hidden.
pub fn feedback(question: &McqQuestion, state: &McqState) -> Vec<OptionFeedback> {
    let selected = state.selected();
    question
        .options
        .iter()
        .map(|option| {
            let is_selected = selected == Some(option.id.as_str());
            let mark = match (selected.is_some(), is_selected, option.is_correct) {
                (false, _, _) => OptionMark::Neutral,
                (true, true, true) => OptionMark::SelectedCorrect,
                (true, true, false) => OptionMark::SelectedWrong,
                (true, false, true) => OptionMark::Correct,
                (true, false, false) => OptionMark::Neutral,
            };
            OptionFeedback {
                id: option.id.clone(),
                text: option.text.clone(),
                mark,
                explanation: selected.and(option.explanation.clone()),
            }
        })
        .collect()
}
