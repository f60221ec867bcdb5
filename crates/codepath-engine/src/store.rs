//! Question state store.
//!
//! Holds one optional [`QuestionState`] per question index. States are
//! created lazily the first time a question is visited, and `reset`
//! replaces a state with a fresh one. The block pool of a code-rearrange
//! question is shuffled whenever its state is (re)initialized; MCQ options
//! keep their authored order.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::content::LessonBody;
use crate::error::{EngineError, Result};
use crate::state::{ConceptState, FibState, McqState, QuestionState, RearrangeState};

/// Builds the initial state for question `index` of a lesson.
///
/// Returns `None` for placeholder lessons and out-of-range indexes.
pub fn initial_state<R: Rng + ?Sized>(
    body: &LessonBody,
    index: usize,
    rng: &mut R,
) -> Option<QuestionState> {
    match body {
        LessonBody::Concept(data) => data
            .sections
            .get(index)
            .map(|_| QuestionState::Concept(ConceptState::Unread)),
        LessonBody::Mcq(questions) => questions
            .get(index)
            .map(|_| QuestionState::Mcq(McqState::Unanswered)),
        LessonBody::FillInBlanks(questions) => questions
            .get(index)
            .map(|_| QuestionState::FillInBlanks(FibState::default())),
        LessonBody::CodeRearrange(questions) => questions.get(index).map(|question| {
            let mut pool = question.block_ids();
            pool.shuffle(rng);
            QuestionState::CodeRearrange(RearrangeState::new(pool))
        }),
        LessonBody::Unavailable { .. } => None,
    }
}

/// Per-question state for one lesson.
#[derive(Debug, Clone, Default)]
pub struct QuestionStore {
    states: Vec<Option<QuestionState>>,
}

impl QuestionStore {
    /// Creates a store for `total` questions, none visited.
    pub fn new(total: usize) -> Self {
        Self {
            states: vec![None; total],
        }
    }

    /// Number of question slots.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Returns `true` if the lesson has no questions.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// State at `index`, if the question has been visited.
    pub fn get(&self, index: usize) -> Option<&QuestionState> {
        self.states.get(index).and_then(Option::as_ref)
    }

    /// Mutable state at `index`, if the question has been visited.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut QuestionState> {
        self.states.get_mut(index).and_then(Option::as_mut)
    }

    /// State at `index`, creating it with `init` on first access.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::QuestionOutOfRange` if `index >= len`.
    pub fn get_or_init(
        &mut self,
        index: usize,
        init: impl FnOnce() -> Option<QuestionState>,
    ) -> Result<&mut QuestionState> {
        let total = self.states.len();
        let slot = self
            .states
            .get_mut(index)
            .ok_or(EngineError::QuestionOutOfRange { index, total })?;
        if slot.is_none() {
            *slot = init();
        }
        slot.as_mut()
            .ok_or(EngineError::QuestionOutOfRange { index, total })
    }

    /// Replaces the state at `index`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::QuestionOutOfRange` if `index >= len`.
    pub fn set(&mut self, index: usize, state: QuestionState) -> Result<()> {
        let total = self.states.len();
        let slot = self
            .states
            .get_mut(index)
            .ok_or(EngineError::QuestionOutOfRange { index, total })?;
        *slot = Some(state);
        Ok(())
    }

    /// Reinitializes the state at `index` for its lesson type.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::QuestionOutOfRange` if `index >= len`.
    pub fn reset<R: Rng + ?Sized>(
        &mut self,
        index: usize,
        body: &LessonBody,
        rng: &mut R,
    ) -> Result<()> {
        let total = self.states.len();
        let fresh = initial_state(body, index, rng)
            .ok_or(EngineError::QuestionOutOfRange { index, total })?;
        self.set(index, fresh)
    }

    /// Iterates over visited states.
    pub fn visited(&self) -> impl Iterator<Item = &QuestionState> {
        self.states.iter().flatten()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::content::{Block, ConceptData, ConceptSection, RearrangeQuestion};

    fn rearrange_body() -> LessonBody {
        LessonBody::CodeRearrange(vec![RearrangeQuestion {
            id: "r1".to_string(),
            scenario: String::new(),
            diagram: None,
            language: "rust".to_string(),
            blocks: ["b1", "b2", "b3", "b4", "b5"]
                .iter()
                .zip(1..)
                .map(|(id, order)| Block {
                    id: (*id).to_string(),
                    code: String::new(),
                    correct_order: order,
                })
                .collect(),
            hints: Vec::new(),
            explanation: None,
        }])
    }

    #[test]
    fn test_lazy_init() {
        let body = rearrange_body();
        let mut rng = StdRng::seed_from_u64(7);
        let mut store = QuestionStore::new(body.len());

        assert!(store.get(0).is_none());
        store
            .get_or_init(0, || initial_state(&body, 0, &mut rng))
            .unwrap();
        assert!(store.get(0).is_some());
        assert_eq!(store.visited().count(), 1);
    }

    #[test]
    fn test_out_of_range() {
        let mut store = QuestionStore::new(1);
        let err = store
            .set(3, QuestionState::Mcq(McqState::Unanswered))
            .unwrap_err();
        assert!(matches!(err, EngineError::QuestionOutOfRange { index: 3, total: 1 }));
        assert!(store.get_or_init(1, || None).is_err());
    }

    #[test]
    fn test_reset_preserves_block_multiset() {
        let body = rearrange_body();
        let mut rng = StdRng::seed_from_u64(42);
        let mut store = QuestionStore::new(1);

        for _ in 0..10 {
            store.reset(0, &body, &mut rng).unwrap();
            let Some(QuestionState::CodeRearrange(state)) = store.get(0) else {
                unreachable!("expected rearrange state");
            };
            assert!(state.placed().is_empty());
            let mut pool = state.pool().to_vec();
            pool.sort();
            assert_eq!(pool, vec!["b1", "b2", "b3", "b4", "b5"]);
        }
    }

    #[test]
    fn test_reset_replaces_answered_state() {
        let body = LessonBody::Concept(ConceptData {
            sections: vec![ConceptSection {
                title: "Intro".to_string(),
                content: String::new(),
                code: None,
                diagram: None,
            }],
            key_points: Vec::new(),
        });
        let mut rng = StdRng::seed_from_u64(1);
        let mut store = QuestionStore::new(1);
        store.set(0, QuestionState::Concept(ConceptState::Read)).unwrap();

        store.reset(0, &body, &mut rng).unwrap();
        assert_eq!(store.get(0), Some(&QuestionState::Concept(ConceptState::Unread)));
    }

    #[test]
    fn test_placeholder_has_no_initial_state() {
        let body = LessonBody::Unavailable {
            kind: None,
            reason: "missing".to_string(),
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert!(initial_state(&body, 0, &mut rng).is_none());
    }
}
