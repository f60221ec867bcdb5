//! Lesson sessions.
//!
//! A [`LessonSession`] is one learner working through one lesson: it owns the
//! lesson content, the question store, the navigator and the RNG used to
//! shuffle code blocks. Every learner interaction is an [`Action`] applied
//! synchronously; the resulting [`SessionView`] is what a renderer shows.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use codepath_render::{LessonReport, QuestionReport, ReportStatus, ReportSummary};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::content::{
    BlankKind, CodeSnippet, ConceptSection, FibQuestion, Lesson, LessonBody, LessonKind,
    McqQuestion, RearrangeQuestion, TemplateSegment,
};
use crate::error::{EngineError, Result};
use crate::evaluate::fib::{self, FibResult};
use crate::evaluate::mcq::{self, OptionFeedback};
use crate::evaluate::rearrange::{self, RearrangeResult};
use crate::events::{EventSink, LessonEvent};
use crate::navigator::{all_complete, Navigator, Progress};
use crate::state::{ConceptState, FibState, McqState, QuestionState, RearrangeState};
use crate::store::{initial_state, QuestionStore};

// ============================================================================
// Actions
// ============================================================================

/// A learner interaction, as sent by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Go to the next question (clamped).
    Next,
    /// Go to the previous question (clamped).
    Previous,
    /// Jump to a question.
    GoTo {
        /// Target index.
        index: usize,
    },
    /// Mark the current concept section as read.
    MarkRead,
    /// Choose an MCQ option.
    Select {
        /// Option id.
        option: String,
    },
    /// Type into a blank.
    SetBlank {
        /// Blank position.
        position: u32,
        /// New value.
        value: String,
    },
    /// Move a block from the pool into the answer area.
    Place {
        /// Block id.
        block: String,
    },
    /// Return the block at a slot to the pool.
    Unplace {
        /// Slot index.
        slot: usize,
    },
    /// Reorder placed blocks.
    Move {
        /// Source slot.
        from: usize,
        /// Destination slot.
        to: usize,
    },
    /// Reveal the next rearrangement hint.
    ShowHint,
    /// Submit a fill-in-blank or rearrangement answer.
    Check,
    /// Reveal the rearrangement solution.
    ShowSolution,
    /// Reinitialize the current question.
    Reset,
}

impl Action {
    /// Action name as it appears on the wire.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Next => "next",
            Self::Previous => "previous",
            Self::GoTo { .. } => "go_to",
            Self::MarkRead => "mark_read",
            Self::Select { .. } => "select",
            Self::SetBlank { .. } => "set_blank",
            Self::Place { .. } => "place",
            Self::Unplace { .. } => "unplace",
            Self::Move { .. } => "move",
            Self::ShowHint => "show_hint",
            Self::Check => "check",
            Self::ShowSolution => "show_solution",
            Self::Reset => "reset",
        }
    }
}

// ============================================================================
// Views
// ============================================================================

/// Lesson header shown above every question.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonHeader {
    /// Lesson id.
    pub id: String,
    /// Lesson slug.
    pub slug: String,
    /// Title.
    pub title: String,
    /// Lesson type, if known.
    pub kind: Option<LessonKind>,
    /// Learning objectives.
    pub learning_objectives: Vec<String>,
}

/// A block as shown to the learner (without its solution position).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockView {
    /// Block id.
    pub id: String,
    /// Code.
    pub code: String,
}

/// A blank as shown to the learner.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlankView {
    /// Position.
    pub position: u32,
    /// Input style.
    #[serde(rename = "type")]
    pub kind: BlankKind,
    /// Dropdown choices.
    pub options: Vec<String>,
    /// Current answer.
    pub value: String,
}

/// The current question, rendered for its lesson type.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionView {
    /// Concept section.
    #[serde(rename_all = "camelCase")]
    Concept {
        /// The section.
        section: ConceptSection,
        /// Key points, shown with the last section.
        key_points: Vec<String>,
        /// Whether the section was marked read.
        read: bool,
    },
    /// Multiple choice.
    #[serde(rename_all = "camelCase")]
    Mcq {
        /// Question id.
        id: String,
        /// Prompt.
        scenario: String,
        /// Mermaid source.
        diagram: Option<String>,
        /// Code shown with the prompt.
        code: Option<CodeSnippet>,
        /// Options with marks (neutral until answered).
        options: Vec<OptionFeedback>,
        /// Selected option.
        selected: Option<String>,
        /// Whether the selection was correct.
        correct: Option<bool>,
        /// Explanation, once answered.
        explanation: Option<String>,
    },
    /// Fill in the blanks.
    #[serde(rename_all = "camelCase")]
    FillInBlanks {
        /// Question id.
        id: String,
        /// Prompt.
        scenario: String,
        /// Mermaid source.
        diagram: Option<String>,
        /// Template language.
        language: String,
        /// Template split into text and blanks.
        segments: Vec<TemplateSegment>,
        /// Blank inputs.
        blanks: Vec<BlankView>,
        /// Result, once checked.
        result: Option<FibResult>,
        /// Filled-in solution, once checked.
        solution: Option<String>,
        /// Explanation, once checked.
        explanation: Option<String>,
    },
    /// Code rearrangement.
    #[serde(rename = "codeblock_rearranging", rename_all = "camelCase")]
    CodeRearrange {
        /// Question id.
        id: String,
        /// Prompt.
        scenario: String,
        /// Mermaid source.
        diagram: Option<String>,
        /// Block language.
        language: String,
        /// Blocks still available.
        pool: Vec<BlockView>,
        /// Blocks in the answer area.
        placed: Vec<BlockView>,
        /// Hints revealed so far.
        hints: Vec<String>,
        /// Hints not yet revealed.
        hints_remaining: usize,
        /// Result, once checked.
        result: Option<RearrangeResult>,
        /// Canonical order, once revealed.
        solution: Option<Vec<BlockView>>,
        /// Explanation, once checked or revealed.
        explanation: Option<String>,
    },
}

/// Outcome of one question, for summaries.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOutcome {
    /// Question index.
    pub index: usize,
    /// Question id (or section title for concepts).
    pub id: String,
    /// Prompt or section title.
    pub prompt: String,
    /// Completed.
    pub complete: bool,
    /// Correct.
    pub correct: bool,
    /// Fill-in-blank score.
    pub score: Option<u8>,
}

/// Summary shown once every question is complete.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonSummary {
    /// Tutorial slug.
    pub tutorial: String,
    /// Lesson slug.
    pub lesson: String,
    /// Lesson title.
    pub title: String,
    /// Lesson type.
    pub kind: Option<LessonKind>,
    /// Aggregate progress.
    pub progress: Progress,
    /// Per-question outcomes.
    pub questions: Vec<QuestionOutcome>,
    /// When the session began.
    pub started_at: DateTime<Utc>,
    /// When the summary was produced.
    pub generated_at: DateTime<Utc>,
}

impl LessonSummary {
    /// Converts the summary into a report with the given status.
    pub fn into_report(self, status: ReportStatus) -> LessonReport {
        LessonReport {
            tutorial: self.tutorial,
            lesson: self.lesson,
            title: self.title,
            lesson_type: self
                .kind
                .map_or("unknown", LessonKind::as_str)
                .to_string(),
            status,
            summary: ReportSummary {
                completed: self.progress.completed,
                correct: self.progress.correct,
                total: self.progress.total,
                average_score: self.progress.average_score,
            },
            questions: self
                .questions
                .into_iter()
                .map(|q| QuestionReport {
                    index: q.index,
                    id: q.id,
                    prompt: q.prompt,
                    outcome: codepath_render::QuestionOutcome::from_flags(q.complete, q.correct),
                    score: q.score,
                })
                .collect(),
            started_at: self.started_at,
            generated_at: self.generated_at,
        }
    }
}

/// Everything a renderer needs for the current moment of a session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    /// Session id.
    pub session_id: String,
    /// Tutorial slug.
    pub tutorial: String,
    /// Lesson header.
    pub lesson: LessonHeader,
    /// Reason the content is unavailable, for placeholder lessons.
    pub unavailable: Option<String>,
    /// Current index.
    pub current: usize,
    /// Number of questions.
    pub total: usize,
    /// At the first question.
    pub is_first: bool,
    /// At the last question.
    pub is_last: bool,
    /// Current question.
    pub question: Option<QuestionView>,
    /// Aggregate progress.
    pub progress: Progress,
    /// Present exactly when every question is complete.
    pub summary: Option<LessonSummary>,
}

// ============================================================================
// Session
// ============================================================================

/// One learner's pass through one lesson.
#[derive(Debug)]
pub struct LessonSession {
    id: String,
    tutorial: String,
    lesson: Lesson,
    store: QuestionStore,
    navigator: Navigator,
    rng: StdRng,
    sink: Arc<dyn EventSink>,
    started_at: DateTime<Utc>,
    last_active: DateTime<Utc>,
    completion_announced: bool,
}

impl LessonSession {
    /// Opens a session with an entropy-seeded RNG.
    pub fn new(
        id: impl Into<String>,
        tutorial: impl Into<String>,
        lesson: Lesson,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self::with_rng(id, tutorial, lesson, sink, StdRng::from_entropy())
    }

    /// Opens a session with a caller-supplied RNG.
    pub fn with_rng(
        id: impl Into<String>,
        tutorial: impl Into<String>,
        lesson: Lesson,
        sink: Arc<dyn EventSink>,
        rng: StdRng,
    ) -> Self {
        let total = lesson.body.len();
        let mut session = Self {
            id: id.into(),
            tutorial: tutorial.into(),
            store: QuestionStore::new(total),
            navigator: Navigator::new(total),
            lesson,
            rng,
            sink,
            started_at: Utc::now(),
            last_active: Utc::now(),
            completion_announced: false,
        };

        info!(
            session = %session.id,
            tutorial = %session.tutorial,
            lesson = %session.lesson.slug,
            total,
            "Lesson session started"
        );
        session.sink.emit(LessonEvent::session_started(
            &session.id,
            &session.tutorial,
            &session.lesson.slug,
            session.lesson.kind(),
            total,
        ));
        if total > 0 {
            session.visit();
        }
        session
    }

    /// Session id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The lesson being played.
    pub const fn lesson(&self) -> &Lesson {
        &self.lesson
    }

    /// The question store.
    pub const fn store(&self) -> &QuestionStore {
        &self.store
    }

    /// The navigator.
    pub const fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    /// When the learner last interacted with this session.
    pub const fn last_active(&self) -> DateTime<Utc> {
        self.last_active
    }

    /// Records learner activity now.
    pub fn touch(&mut self) {
        self.last_active = Utc::now();
    }

    /// Aggregate progress.
    pub fn progress(&self) -> Progress {
        Progress::of(&self.store)
    }

    /// Applies one learner action.
    ///
    /// # Errors
    ///
    /// Returns interaction errors (`WrongLessonType`, `QuestionOutOfRange`,
    /// `UnknownOption`, `UnknownBlank`, `UnknownBlock`). State is unchanged
    /// when an error is returned.
    pub fn apply(&mut self, action: Action) -> Result<()> {
        debug!(session = %self.id, action = action.name(), "Applying action");
        self.touch();
        let result = self.dispatch(&action);
        if let Err(e) = &result {
            self.sink
                .emit(LessonEvent::error(Some(self.id.clone()), e.user_message()));
        }
        result
    }

    fn dispatch(&mut self, action: &Action) -> Result<()> {
        match action {
            Action::Next => {
                if self.navigator.next() {
                    self.visit();
                }
            }
            Action::Previous => {
                if self.navigator.previous() {
                    self.visit();
                }
            }
            Action::GoTo { index } => {
                if self.navigator.go_to(*index)? {
                    self.visit();
                }
            }
            Action::MarkRead => self.mark_read(action)?,
            Action::Select { option } => self.select(action, option)?,
            Action::SetBlank { position, value } => self.set_blank(action, *position, value)?,
            Action::Place { block } => {
                self.with_rearrange(action, |q, s| rearrange::place(q, s, block))?;
            }
            Action::Unplace { slot } => {
                self.with_rearrange(action, |q, s| rearrange::unplace(q, s, *slot))?;
            }
            Action::Move { from, to } => {
                self.with_rearrange(action, |q, s| rearrange::move_block(q, s, *from, *to))?;
            }
            Action::ShowHint => {
                self.with_rearrange(action, |q, s| Ok(rearrange::show_hint(q, s).is_some()))?;
            }
            Action::Check => self.check(action)?,
            Action::ShowSolution => {
                if self.with_rearrange(action, |q, s| Ok(rearrange::show_solution(q, s)))? {
                    let index = self.navigator.current();
                    self.sink
                        .emit(LessonEvent::solution_revealed(&self.id, index));
                    self.after_completion_change();
                }
            }
            Action::Reset => self.reset()?,
        }
        Ok(())
    }

    /// Initializes the current question's state if needed and reports the visit.
    fn visit(&mut self) {
        let index = self.navigator.current();
        let body = &self.lesson.body;
        let rng = &mut self.rng;
        if self
            .store
            .get_or_init(index, || initial_state(body, index, rng))
            .is_ok()
        {
            self.sink
                .emit(LessonEvent::question_visited(&self.id, index));
        }
    }

    fn current_state(&mut self) -> Result<&mut QuestionState> {
        let index = self.navigator.current();
        let body = &self.lesson.body;
        let rng = &mut self.rng;
        self.store
            .get_or_init(index, || initial_state(body, index, rng))
    }

    fn wrong_type(&self, action: &Action) -> EngineError {
        let actual = self
            .lesson
            .kind()
            .map_or("unavailable", LessonKind::as_str);
        EngineError::wrong_lesson_type(action.name(), actual)
    }

    fn mark_read(&mut self, action: &Action) -> Result<()> {
        if !matches!(self.lesson.body, LessonBody::Concept(_)) {
            return Err(self.wrong_type(action));
        }
        let state = self.current_state()?;
        if let QuestionState::Concept(concept @ ConceptState::Unread) = state {
            *concept = ConceptState::Read;
            self.after_completion_change();
        }
        Ok(())
    }

    fn select(&mut self, action: &Action, option: &str) -> Result<()> {
        let index = self.navigator.current();
        let LessonBody::Mcq(questions) = &self.lesson.body else {
            return Err(self.wrong_type(action));
        };
        let question = question_at(questions, index)?;
        let body = &self.lesson.body;
        let rng = &mut self.rng;
        let state = self
            .store
            .get_or_init(index, || initial_state(body, index, rng))?;
        let QuestionState::Mcq(mcq_state) = state else {
            return Err(EngineError::QuestionOutOfRange {
                index,
                total: self.navigator.total(),
            });
        };
        if mcq::select(question, mcq_state, option)? {
            let correct = state.is_correct();
            info!(session = %self.id, index, option, correct, "MCQ answered");
            self.sink
                .emit(LessonEvent::question_answered(&self.id, index, correct));
            self.after_completion_change();
        }
        Ok(())
    }

    fn set_blank(&mut self, action: &Action, position: u32, value: &str) -> Result<()> {
        let index = self.navigator.current();
        let LessonBody::FillInBlanks(questions) = &self.lesson.body else {
            return Err(self.wrong_type(action));
        };
        let question = question_at(questions, index)?;
        let body = &self.lesson.body;
        let rng = &mut self.rng;
        let state = self
            .store
            .get_or_init(index, || initial_state(body, index, rng))?;
        if let QuestionState::FillInBlanks(fib_state) = state {
            fib::set_answer(question, fib_state, position, value)?;
        }
        Ok(())
    }

    fn check(&mut self, action: &Action) -> Result<()> {
        let index = self.navigator.current();
        let body = &self.lesson.body;
        let rng = &mut self.rng;
        let checked = match body {
            LessonBody::FillInBlanks(questions) => {
                let question = question_at(questions, index)?;
                let state = self
                    .store
                    .get_or_init(index, || initial_state(body, index, rng))?;
                match state {
                    QuestionState::FillInBlanks(fib_state) => fib::check(question, fib_state),
                    _ => false,
                }
            }
            LessonBody::CodeRearrange(questions) => {
                let question = question_at(questions, index)?;
                let state = self
                    .store
                    .get_or_init(index, || initial_state(body, index, rng))?;
                match state {
                    QuestionState::CodeRearrange(r_state) => rearrange::check(question, r_state),
                    _ => false,
                }
            }
            _ => return Err(self.wrong_type(action)),
        };

        if checked {
            if let Some(state) = self.store.get(index) {
                let (correct, score) = (state.is_correct(), state.score());
                info!(session = %self.id, index, correct, ?score, "Question checked");
                self.sink
                    .emit(LessonEvent::question_checked(&self.id, index, correct, score));
            }
            self.after_completion_change();
        }
        Ok(())
    }

    fn with_rearrange(
        &mut self,
        action: &Action,
        f: impl FnOnce(&RearrangeQuestion, &mut RearrangeState) -> Result<bool>,
    ) -> Result<bool> {
        let index = self.navigator.current();
        let LessonBody::CodeRearrange(questions) = &self.lesson.body else {
            return Err(self.wrong_type(action));
        };
        let question = question_at(questions, index)?;
        let body = &self.lesson.body;
        let rng = &mut self.rng;
        let state = self
            .store
            .get_or_init(index, || initial_state(body, index, rng))?;
        match state {
            QuestionState::CodeRearrange(r_state) => f(question, r_state),
            _ => Ok(false),
        }
    }

    fn reset(&mut self) -> Result<()> {
        let index = self.navigator.current();
        self.store.reset(index, &self.lesson.body, &mut self.rng)?;
        info!(session = %self.id, index, "Question reset");
        self.sink.emit(LessonEvent::question_reset(&self.id, index));
        self.after_completion_change();
        Ok(())
    }

    /// Announces completion once per transition into the all-complete state.
    fn after_completion_change(&mut self) {
        let complete = all_complete(&self.store);
        if complete && !self.completion_announced {
            let progress = self.progress();
            info!(
                session = %self.id,
                completed = progress.completed,
                correct = progress.correct,
                "Lesson completed"
            );
            self.sink
                .emit(LessonEvent::lesson_completed(&self.id, &progress));
        }
        self.completion_announced = complete;
    }

    /// The summary, present exactly when every question is complete.
    pub fn summary(&self) -> Option<LessonSummary> {
        all_complete(&self.store).then(|| self.build_summary())
    }

    /// A summary regardless of completion, for reports of partial sessions.
    pub fn build_summary(&self) -> LessonSummary {
        let questions = (0..self.navigator.total())
            .map(|index| {
                let state = self.store.get(index);
                let (id, prompt) = self.question_label(index);
                QuestionOutcome {
                    index,
                    id,
                    prompt,
                    complete: state.is_some_and(QuestionState::is_complete),
                    correct: state.is_some_and(QuestionState::is_correct),
                    score: state.and_then(QuestionState::score),
                }
            })
            .collect();
        LessonSummary {
            tutorial: self.tutorial.clone(),
            lesson: self.lesson.slug.clone(),
            title: self.lesson.title.clone(),
            kind: self.lesson.kind(),
            progress: self.progress(),
            questions,
            started_at: self.started_at,
            generated_at: Utc::now(),
        }
    }

    /// Report of the session so far, complete or not.
    pub fn report(&self) -> LessonReport {
        let status = if self.lesson.body.is_unavailable() {
            ReportStatus::Unavailable
        } else if all_complete(&self.store) {
            ReportStatus::Completed
        } else {
            ReportStatus::InProgress
        };
        self.build_summary().into_report(status)
    }

    fn question_label(&self, index: usize) -> (String, String) {
        match &self.lesson.body {
            LessonBody::Concept(data) => data
                .sections
                .get(index)
                .map(|s| (format!("section-{}", index + 1), s.title.clone())),
            LessonBody::Mcq(qs) => qs.get(index).map(|q| (q.id.clone(), q.scenario.clone())),
            LessonBody::FillInBlanks(qs) => {
                qs.get(index).map(|q| (q.id.clone(), q.scenario.clone()))
            }
            LessonBody::CodeRearrange(qs) => {
                qs.get(index).map(|q| (q.id.clone(), q.scenario.clone()))
            }
            LessonBody::Unavailable { .. } => None,
        }
        .unwrap_or_default()
    }

    /// Renders the current moment of the session.
    pub fn view(&self) -> SessionView {
        let index = self.navigator.current();
        let unavailable = match &self.lesson.body {
            LessonBody::Unavailable { reason, .. } => Some(reason.clone()),
            _ => None,
        };
        SessionView {
            session_id: self.id.clone(),
            tutorial: self.tutorial.clone(),
            lesson: LessonHeader {
                id: self.lesson.id.clone(),
                slug: self.lesson.slug.clone(),
                title: self.lesson.title.clone(),
                kind: self.lesson.kind(),
                learning_objectives: self.lesson.learning_objectives.clone(),
            },
            unavailable,
            current: index,
            total: self.navigator.total(),
            is_first: self.navigator.is_first(),
            is_last: self.navigator.is_last(),
            question: self.question_view(index),
            progress: self.progress(),
            summary: self.summary(),
        }
    }

    fn question_view(&self, index: usize) -> Option<QuestionView> {
        let state = self.store.get(index)?;
        match (&self.lesson.body, state) {
            (LessonBody::Concept(data), QuestionState::Concept(concept)) => {
                let section = data.sections.get(index)?.clone();
                let is_last = index + 1 == data.sections.len();
                Some(QuestionView::Concept {
                    section,
                    key_points: if is_last { data.key_points.clone() } else { Vec::new() },
                    read: matches!(concept, ConceptState::Read),
                })
            }
            (LessonBody::Mcq(qs), QuestionState::Mcq(mcq_state)) => {
                Some(mcq_view(qs.get(index)?, mcq_state))
            }
            (LessonBody::FillInBlanks(qs), QuestionState::FillInBlanks(fib_state)) => {
                Some(fib_view(qs.get(index)?, fib_state))
            }
            (LessonBody::CodeRearrange(qs), QuestionState::CodeRearrange(r_state)) => {
                Some(rearrange_view(qs.get(index)?, r_state))
            }
            _ => None,
        }
    }
}

fn question_at<Q>(questions: &[Q], index: usize) -> Result<&Q> {
    questions.get(index).ok_or(EngineError::QuestionOutOfRange {
        index,
        total: questions.len(),
    })
}

fn mcq_view(question: &McqQuestion, state: &McqState) -> QuestionView {
    let answered = state.selected().is_some();
    QuestionView::Mcq {
        id: question.id.clone(),
        scenario: question.scenario.clone(),
        diagram: question.diagram.clone(),
        code: question.code.clone(),
        options: mcq::feedback(question, state),
        selected: state.selected().map(str::to_string),
        correct: match state {
            McqState::Answered { correct, .. } => Some(*correct),
            McqState::Unanswered => None,
        },
        explanation: if answered { question.explanation.clone() } else { None },
    }
}

fn fib_view(question: &FibQuestion, state: &FibState) -> QuestionView {
    let answers = state.answers();
    let blanks = question
        .blanks
        .iter()
        .map(|blank| BlankView {
            position: blank.position,
            kind: blank.kind,
            options: blank.options.clone(),
            value: answers.get(&blank.position).cloned().unwrap_or_default(),
        })
        .collect();
    let (result, solution, explanation) = match state {
        FibState::Editing { .. } => (None, None, None),
        FibState::Checked { result, .. } => (
            Some(result.clone()),
            Some(fib::solution(question)),
            question.explanation.clone(),
        ),
    };
    QuestionView::FillInBlanks {
        id: question.id.clone(),
        scenario: question.scenario.clone(),
        diagram: question.diagram.clone(),
        language: question.language.clone(),
        segments: question.segments(),
        blanks,
        result,
        solution,
        explanation,
    }
}

fn rearrange_view(question: &RearrangeQuestion, state: &RearrangeState) -> QuestionView {
    let blocks = |ids: &[String]| -> Vec<BlockView> {
        ids.iter()
            .filter_map(|id| question.block(id))
            .map(|block| BlockView {
                id: block.id.clone(),
                code: block.code.clone(),
            })
            .collect()
    };
    let shown = state.hints_shown().min(question.hints.len());
    let (result, solution, explanation) = match state {
        RearrangeState::Arranging { .. } => (None, None, None),
        RearrangeState::Checked { result, .. } => {
            (Some(result.clone()), None, question.explanation.clone())
        }
        RearrangeState::Reviewed { solution, .. } => {
            (None, Some(blocks(solution)), question.explanation.clone())
        }
    };
    QuestionView::CodeRearrange {
        id: question.id.clone(),
        scenario: question.scenario.clone(),
        diagram: question.diagram.clone(),
        language: question.language.clone(),
        pool: blocks(state.pool()),
        placed: blocks(state.placed()),
        hints: question.hints[..shown].to_vec(),
        hints_remaining: question.hints.len() - shown,
        result,
        solution,
        explanation,
    }
}
