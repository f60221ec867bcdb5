//! Per-question runtime state.
//!
//! Each lesson type has its own finite-state enum; the variants are the only
//! legal states, so a checked fill-in-blank always carries its score and an
//! unanswered MCQ never carries a selection. State is created lazily on the
//! first visit to a question and lives only as long as the session.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::evaluate::fib::FibResult;
use crate::evaluate::rearrange::RearrangeResult;

// ============================================================================
// Concept
// ============================================================================

/// Reading progress for one concept section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConceptState {
    /// Not yet acknowledged.
    #[default]
    Unread,
    /// Acknowledged by the learner.
    Read,
}

// ============================================================================
// Multiple choice
// ============================================================================

/// Multiple-choice state: `Unanswered -> Answered`, locked until reset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum McqState {
    /// No option chosen yet.
    #[default]
    Unanswered,
    /// First selection, kept until reset.
    Answered {
        /// Selected option id.
        selected: String,
        /// Whether the selected option is the correct one.
        correct: bool,
    },
}

impl McqState {
    /// The selected option, if answered.
    ///
    /// # Examples
    ///
    /// ```
    /// use codepath_engine::McqState;
    ///
    /// assert_eq!(McqState::Unanswered.selected(), None);
    /// let answered = McqState::Answered { selected: "b".into(), correct: true };
    /// assert_eq!(answered.selected(), Some("b"));
    /// ```
    pub fn selected(&self) -> Option<&str> {
        match self {
            Self::Unanswered => None,
            Self::Answered { selected, .. } => Some(selected),
        }
    }
}

// ============================================================================
// Fill in the blanks
// ============================================================================

/// Fill-in-blank state: `Editing -> Checked`, locked until reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FibState {
    /// Learner is typing; answers keyed by blank position.
    Editing {
        /// Current answers.
        answers: BTreeMap<u32, String>,
    },
    /// Submitted once; further edits are ignored.
    Checked {
        /// Answers as submitted.
        answers: BTreeMap<u32, String>,
        /// Evaluation of the submission.
        result: FibResult,
    },
}

impl Default for FibState {
    fn default() -> Self {
        Self::Editing {
            answers: BTreeMap::new(),
        }
    }
}

impl FibState {
    /// Current answers regardless of phase.
    pub const fn answers(&self) -> &BTreeMap<u32, String> {
        match self {
            Self::Editing { answers } | Self::Checked { answers, .. } => answers,
        }
    }
}

// ============================================================================
// Code rearrangement
// ============================================================================

/// Code-rearrange state: `Arranging -> Checked`, or `-> Reviewed` when the
/// solution is revealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RearrangeState {
    /// Learner is moving blocks between the pool and the answer area.
    #[serde(rename_all = "camelCase")]
    Arranging {
        /// Block ids in the answer area, in order.
        placed: Vec<String>,
        /// Block ids still available, in display order.
        pool: Vec<String>,
        /// Number of hints revealed.
        hints_shown: usize,
    },
    /// Arrangement submitted and evaluated.
    #[serde(rename_all = "camelCase")]
    Checked {
        /// Block ids as submitted.
        placed: Vec<String>,
        /// Pool at submission time.
        pool: Vec<String>,
        /// Evaluation of the submission.
        result: RearrangeResult,
        /// Number of hints revealed.
        hints_shown: usize,
    },
    /// Solution revealed; complete but not correct.
    #[serde(rename_all = "camelCase")]
    Reviewed {
        /// Block ids the learner had placed.
        placed: Vec<String>,
        /// Canonical order.
        solution: Vec<String>,
        /// Number of hints revealed.
        hints_shown: usize,
    },
}

impl RearrangeState {
    /// Fresh state with every block in the pool.
    pub const fn new(pool: Vec<String>) -> Self {
        Self::Arranging {
            placed: Vec::new(),
            pool,
            hints_shown: 0,
        }
    }

    /// Placed block ids in order.
    pub fn placed(&self) -> &[String] {
        match self {
            Self::Arranging { placed, .. }
            | Self::Checked { placed, .. }
            | Self::Reviewed { placed, .. } => placed,
        }
    }

    /// Blocks still in the pool.
    pub fn pool(&self) -> &[String] {
        match self {
            Self::Arranging { pool, .. } | Self::Checked { pool, .. } => pool,
            Self::Reviewed { .. } => &[],
        }
    }

    /// Number of hints revealed so far.
    pub const fn hints_shown(&self) -> usize {
        match self {
            Self::Arranging { hints_shown, .. }
            | Self::Checked { hints_shown, .. }
            | Self::Reviewed { hints_shown, .. } => *hints_shown,
        }
    }
}

// ============================================================================
// QuestionState
// ============================================================================

/// Runtime state for one question index, tagged by lesson type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "state", rename_all = "snake_case")]
pub enum QuestionState {
    /// Concept section.
    Concept(ConceptState),
    /// Multiple choice.
    Mcq(McqState),
    /// Fill in the blanks.
    FillInBlanks(FibState),
    /// Code rearrangement.
    #[serde(rename = "codeblock_rearranging")]
    CodeRearrange(RearrangeState),
}

impl QuestionState {
    /// Returns `true` once the question counts toward lesson completion.
    ///
    /// # Examples
    ///
    /// ```
    /// use codepath_engine::{ConceptState, McqState, QuestionState};
    ///
    /// assert!(!QuestionState::Mcq(McqState::Unanswered).is_complete());
    /// assert!(QuestionState::Concept(ConceptState::Read).is_complete());
    /// ```
    pub const fn is_complete(&self) -> bool {
        match self {
            Self::Concept(state) => matches!(state, ConceptState::Read),
            Self::Mcq(state) => matches!(state, McqState::Answered { .. }),
            Self::FillInBlanks(state) => matches!(state, FibState::Checked { .. }),
            Self::CodeRearrange(state) => !matches!(state, RearrangeState::Arranging { .. }),
        }
    }

    /// Returns `true` if the question was completed correctly.
    ///
    /// A read concept section counts as correct; a revealed solution does not.
    pub const fn is_correct(&self) -> bool {
        match self {
            Self::Concept(state) => matches!(state, ConceptState::Read),
            Self::Mcq(McqState::Answered { correct, .. }) => *correct,
            Self::FillInBlanks(FibState::Checked { result, .. }) => result.score == 100,
            Self::CodeRearrange(RearrangeState::Checked { result, .. }) => result.correct,
            _ => false,
        }
    }

    /// Fill-in-blank score once checked.
    pub const fn score(&self) -> Option<u8> {
        match self {
            Self::FillInBlanks(FibState::Checked { result, .. }) => Some(result.score),
            _ => None,
        }
    }
}
