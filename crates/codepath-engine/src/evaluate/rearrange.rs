//! Code-block rearrangement evaluation.
//!
//! The solution is the block ids sorted by `correct_order`. An arrangement is
//! correct only when it equals that sequence exactly; per-slot verdicts are
//! feedback and never change the overall verdict.

use serde::Serialize;

use crate::content::RearrangeQuestion;
use crate::error::{EngineError, Result};
use crate::state::RearrangeState;

/// Feedback for one slot of the answer area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotVerdict {
    /// The right block in the right place.
    Correct,
    /// A block that belongs elsewhere.
    Incorrect,
    /// Nothing placed here.
    Missing,
    /// Placed beyond the solution length.
    Extra,
}

/// Result of checking an arrangement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RearrangeResult {
    /// Exact sequence equality with the solution.
    pub correct: bool,
    /// One verdict per slot, `max(placed, solution)` long.
    pub slots: Vec<SlotVerdict>,
}

/// Compares an arrangement against the canonical order.
pub fn evaluate(question: &RearrangeQuestion, placed: &[String]) -> RearrangeResult {
    let solution = question.canonical_order();
    let len = placed.len().max(solution.len());
    let slots = (0..len)
        .map(|i| match (placed.get(i), solution.get(i)) {
            (Some(p), Some(s)) if p == s => SlotVerdict::Correct,
            (Some(_), Some(_)) => SlotVerdict::Incorrect,
            (None, _) => SlotVerdict::Missing,
            (Some(_), None) => SlotVerdict::Extra,
        })
        .collect();
    RearrangeResult {
        correct: placed == solution.as_slice(),
        slots,
    }
}

/// Moves a block from the pool to the end of the answer area.
///
/// # Errors
///
/// Returns `EngineError::UnknownBlock` if the block is not in the pool.
pub fn place(
    question: &RearrangeQuestion,
    state: &mut RearrangeState,
    block: &str,
) -> Result<bool> {
    let RearrangeState::Arranging { placed, pool, .. } = state else {
        return Ok(false);
    };
    let index = pool
        .iter()
        .position(|id| id == block)
        .ok_or_else(|| EngineError::unknown_block(&question.id, block))?;
    placed.push(pool.remove(index));
    Ok(true)
}

/// Returns the block at `slot` to the end of the pool.
///
/// # Errors
///
/// Returns `EngineError::UnknownBlock` if the slot is empty.
pub fn unplace(
    question: &RearrangeQuestion,
    state: &mut RearrangeState,
    slot: usize,
) -> Result<bool> {
    let RearrangeState::Arranging { placed, pool, .. } = state else {
        return Ok(false);
    };
    if slot >= placed.len() {
        return Err(EngineError::unknown_block(&question.id, slot));
    }
    pool.push(placed.remove(slot));
    Ok(true)
}

/// Moves a placed block from slot `from` to slot `to`.
///
/// # Errors
///
/// Returns `EngineError::UnknownBlock` if either slot is out of range.
pub fn move_block(
    question: &RearrangeQuestion,
    state: &mut RearrangeState,
    from: usize,
    to: usize,
) -> Result<bool> {
    let RearrangeState::Arranging { placed, .. } = state else {
        return Ok(false);
    };
    for slot in [from, to] {
        if slot >= placed.len() {
            return Err(EngineError::unknown_block(&question.id, slot));
        }
    }
    if from == to {
        return Ok(false);
    }
    let block = placed.remove(from);
    placed.insert(to, block);
    Ok(true)
}

/// Reveals the next hint, returning it. `None` when every hint is shown or
/// the question is no longer being arranged.
pub fn show_hint<'q>(
    question: &'q RearrangeQuestion,
    state: &mut RearrangeState,
) -> Option<&'q str> {
    let RearrangeState::Arranging { hints_shown, .. } = state else {
        return None;
    };
    let hint = question.hints.get(*hints_shown)?;
    *hints_shown += 1;
    Some(hint)
}

/// Submits the arrangement, whatever its length.
pub fn check(question: &RearrangeQuestion, state: &mut RearrangeState) -> bool {
    let RearrangeState::Arranging {
        placed,
        pool,
        hints_shown,
    } = state
    else {
        return false;
    };
    let result = evaluate(question, placed);
    *state = RearrangeState::Checked {
        placed: std::mem::take(placed),
        pool: std::mem::take(pool),
        result,
        hints_shown: *hints_shown,
    };
    true
}

/// Reveals the canonical order. Allowed while arranging or after a check.
pub fn show_solution(question: &RearrangeQuestion, state: &mut RearrangeState) -> bool {
    if matches!(state, RearrangeState::Reviewed { .. }) {
        return false;
    }
    *state = RearrangeState::Reviewed {
        placed: state.placed().to_vec(),
        solution: question.canonical_order(),
        hints_shown: state.hints_shown(),
    };
    true
}
