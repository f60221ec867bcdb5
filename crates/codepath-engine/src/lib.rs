//! Codepath lesson engine
//!
//! Loads tutorial content, tracks per-question learner state, evaluates
//! answers and serves lesson sessions over HTTP and WebSocket.

pub mod api;
pub mod config;
pub mod content;
pub mod error;
pub mod evaluate;
pub mod events;
pub mod navigator;
pub mod playground;
pub mod services;
pub mod session;
pub mod source;
pub mod state;
pub mod store;

pub use api::{
    create_router, evict_idle, AppState, ErrorResponse, PlaygroundChatRequest,
    PlaygroundRunRequest, StartSessionRequest, TutorialOverview,
};
pub use config::{ChatConfig, Config, DiagramConfig, ExecutionConfig};
pub use content::{
    ContentIssue, Difficulty, Language, Lesson, LessonBody, LessonKind, RawTutorial, Tutorial,
};
pub use error::{EngineError, Result, ServiceErrorKind};
pub use events::{EventBroadcaster, EventSink, LessonEvent, NullSink};
pub use navigator::{Navigator, Progress};
pub use playground::{ClientRequests, EditorContext, Playground, PlaygroundOutcome};
pub use session::{Action, LessonSession, LessonSummary, QuestionView, SessionView};
pub use source::{ContentSource, DirectorySource, MemorySource, TutorialSummary};
pub use state::{ConceptState, FibState, McqState, QuestionState, RearrangeState};
pub use store::QuestionStore;
