//! Answer evaluation for the three interactive lesson types.
//!
//! Each submodule mutates the matching state enum in place and reports
//! whether anything changed, so callers can decide whether to emit events.
//! Actions that are not allowed in the current phase (editing a checked
//! answer, selecting a second MCQ option) are silently ignored and return
//! `false`; unknown ids are errors.

pub mod fib;
pub mod mcq;
pub mod rearrange;
