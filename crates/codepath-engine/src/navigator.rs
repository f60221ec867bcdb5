//! Lesson navigation and progress aggregation.

use serde::Serialize;

use crate::error::{EngineError, Result};
use crate::store::QuestionStore;

/// Cursor over the questions of one lesson.
///
/// `next` and `previous` clamp at the ends instead of wrapping. Navigation is
/// free at all times; completed questions can always be revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Navigator {
    current: usize,
    total: usize,
}

impl Navigator {
    /// Creates a navigator at index 0.
    pub const fn new(total: usize) -> Self {
        Self { current: 0, total }
    }

    /// Current index.
    pub const fn current(&self) -> usize {
        self.current
    }

    /// Number of questions.
    pub const fn total(&self) -> usize {
        self.total
    }

    /// Returns `true` at the first question.
    pub const fn is_first(&self) -> bool {
        self.current == 0
    }

    /// Returns `true` at the last question (or when there are none).
    pub const fn is_last(&self) -> bool {
        self.current + 1 >= self.total
    }

    /// Advances one question. Returns `true` if the index changed.
    ///
    /// # Examples
    ///
    /// ```
    /// use codepath_engine::Navigator;
    ///
    /// let mut nav = Navigator::new(2);
    /// assert!(nav.next());
    /// assert!(!nav.next());
    /// assert_eq!(nav.current(), 1);
    /// ```
    pub fn next(&mut self) -> bool {
        if self.is_last() {
            return false;
        }
        self.current += 1;
        true
    }

    /// Goes back one question. Returns `true` if the index changed.
    pub fn previous(&mut self) -> bool {
        if self.is_first() {
            return false;
        }
        self.current -= 1;
        true
    }

    /// Jumps to `index`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::QuestionOutOfRange` if `index >= total`.
    pub fn go_to(&mut self, index: usize) -> Result<bool> {
        if index >= self.total {
            return Err(EngineError::QuestionOutOfRange {
                index,
                total: self.total,
            });
        }
        let changed = self.current != index;
        self.current = index;
        Ok(changed)
    }
}

/// Aggregate progress over a lesson's question states.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    /// Questions whose state is complete.
    pub completed: usize,
    /// Questions answered correctly.
    pub correct: usize,
    /// Number of questions.
    pub total: usize,
    /// Mean fill-in-blank score over checked questions.
    pub average_score: Option<f64>,
    /// Every question complete (and at least one question exists).
    pub all_complete: bool,
}

impl Progress {
    /// Computes progress from the store. Pure: the same store always yields
    /// the same progress.
    pub fn of(store: &QuestionStore) -> Self {
        let total = store.len();
        let completed = store.visited().filter(|s| s.is_complete()).count();
        let correct = store.visited().filter(|s| s.is_correct()).count();
        let scores: Vec<u8> = store.visited().filter_map(|s| s.score()).collect();
        #[allow(clippy::cast_precision_loss)]
        let average_score = (!scores.is_empty()).then(|| {
            scores.iter().map(|s| f64::from(*s)).sum::<f64>() / scores.len() as f64
        });
        Self {
            completed,
            correct,
            total,
            average_score,
            all_complete: all_complete(store),
        }
    }

    /// Completion percentage, rounded down.
    pub const fn percent(&self) -> usize {
        if self.total == 0 {
            return 0;
        }
        self.completed * 100 / self.total
    }
}

/// `true` when every question index holds a complete state.
///
/// A lesson without questions (a placeholder) is never complete.
pub fn all_complete(store: &QuestionStore) -> bool {
    !store.is_empty()
        && (0..store.len())
            .all(|i| store.get(i).is_some_and(crate::state::QuestionState::is_complete))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::evaluate::fib::FibResult;
    use crate::state::{FibState, McqState, QuestionState};

    fn answered(correct: bool) -> QuestionState {
        QuestionState::Mcq(McqState::Answered {
            selected: "a".to_string(),
            correct,
        })
    }

    fn checked_fib(score: u8) -> QuestionState {
        QuestionState::FillInBlanks(FibState::Checked {
            answers: BTreeMap::new(),
            result: FibResult {
                score,
                correct_count: 0,
                total: 0,
                blanks: Vec::new(),
            },
        })
    }

    #[test]
    fn test_clamped_navigation() {
        let mut nav = Navigator::new(3);
        assert!(!nav.previous());
        assert_eq!(nav.current(), 0);

        assert!(nav.next());
        assert!(nav.next());
        assert!(!nav.next());
        assert_eq!(nav.current(), 2);

        assert!(nav.previous());
        assert_eq!(nav.current(), 1);
    }

    #[test]
    fn test_go_to() {
        let mut nav = Navigator::new(3);
        assert!(nav.go_to(2).unwrap());
        assert!(!nav.go_to(2).unwrap());
        assert!(nav.go_to(3).is_err());
        assert_eq!(nav.current(), 2);
    }

    #[test]
    fn test_empty_lesson_navigation() {
        let mut nav = Navigator::new(0);
        assert!(!nav.next());
        assert!(!nav.previous());
        assert!(nav.go_to(0).is_err());
    }

    #[test]
    fn test_all_complete_requires_every_index() {
        let mut store = QuestionStore::new(2);
        assert!(!all_complete(&store));

        store.set(0, answered(true)).unwrap();
        assert!(!all_complete(&store));

        store.set(1, QuestionState::Mcq(McqState::Unanswered)).unwrap();
        assert!(!all_complete(&store));

        store.set(1, answered(false)).unwrap();
        assert!(all_complete(&store));
        // Idempotent
        assert!(all_complete(&store));
        assert_eq!(Progress::of(&store), Progress::of(&store));
    }

    #[test]
    fn test_progress_counts() {
        let mut store = QuestionStore::new(3);
        store.set(0, answered(true)).unwrap();
        store.set(1, answered(false)).unwrap();

        let progress = Progress::of(&store);
        assert_eq!(progress.completed, 2);
        assert_eq!(progress.correct, 1);
        assert_eq!(progress.total, 3);
        assert!(!progress.all_complete);
        assert_eq!(progress.percent(), 66);
        assert!(progress.average_score.is_none());
    }

    #[test]
    fn test_average_score() {
        let mut store = QuestionStore::new(2);
        store.set(0, checked_fib(100)).unwrap();
        store.set(1, checked_fib(50)).unwrap();

        let progress = Progress::of(&store);
        assert_eq!(progress.average_score, Some(75.0));
        assert_eq!(progress.correct, 1);
        assert!(progress.all_complete);
    }

    #[test]
    fn test_empty_store_is_never_complete() {
        let store = QuestionStore::new(0);
        assert!(!all_complete(&store));
        assert_eq!(Progress::of(&store).percent(), 0);
    }
}
