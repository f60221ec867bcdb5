//! Lesson events and their delivery.
//!
//! Sessions report what happens (a question answered, a lesson completed)
//! through an [`EventSink`] handed to them at construction. The server uses
//! an [`EventBroadcaster`], which fans events out to WebSocket clients.
//!
//! # Event Types
//!
//! - `connected` - Sent to a WebSocket client when it connects
//! - `session_started` - A learner opened a lesson
//! - `question_visited` - Navigation moved to a question
//! - `question_answered` - An MCQ received its (first) answer
//! - `question_checked` - A fill-in-blank or rearrangement was submitted
//! - `solution_revealed` - A rearrangement solution was shown
//! - `question_reset` - A question was reinitialized
//! - `lesson_completed` - Every question in the lesson is complete
//! - `error` - An interaction or service call failed
//!
//! # Example
//!
//! ```no_run
//! use codepath_engine::events::{EventBroadcaster, LessonEvent};
//!
//! # async fn example() {
//! let broadcaster = EventBroadcaster::new(100);
//! let mut receiver = broadcaster.subscribe();
//!
//! broadcaster.send(LessonEvent::question_visited("s-1", 2));
//!
//! if let Ok(event) = receiver.recv().await {
//!     println!("Received: {}", event.event_name());
//! }
//! # }
//! ```

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::content::LessonKind;
use crate::navigator::Progress;

// ============================================================================
// Event Payloads
// ============================================================================

/// Payload for the `connected` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedPayload {
    /// Number of open sessions on the server.
    pub active_sessions: usize,
    /// When the client connected.
    pub timestamp: DateTime<Utc>,
}

/// Payload for the `session_started` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStartedPayload {
    /// Session id.
    pub session_id: String,
    /// Tutorial slug.
    pub tutorial: String,
    /// Lesson slug.
    pub lesson: String,
    /// Lesson type, if the content loaded.
    pub kind: Option<LessonKind>,
    /// Number of questions.
    pub total: usize,
}

/// Payload for `question_visited` and `question_reset`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPayload {
    /// Session id.
    pub session_id: String,
    /// Question index.
    pub index: usize,
}

/// Payload for `question_answered`, `question_checked` and `solution_revealed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomePayload {
    /// Session id.
    pub session_id: String,
    /// Question index.
    pub index: usize,
    /// Whether the submission was correct.
    pub correct: bool,
    /// Fill-in-blank score.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
}

/// Payload for the `lesson_completed` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonCompletedPayload {
    /// Session id.
    pub session_id: String,
    /// Completed questions.
    pub completed: usize,
    /// Correct questions.
    pub correct: usize,
    /// Number of questions.
    pub total: usize,
    /// Mean fill-in-blank score.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_score: Option<f64>,
}

/// Payload for the `error` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    /// Session id, when the error belongs to one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Human-readable error message.
    pub message: String,
}

// ============================================================================
// Event Enum
// ============================================================================

/// Lesson events, serialized as `{"event": ..., "payload": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum LessonEvent {
    /// Sent when a WebSocket client connects.
    Connected(ConnectedPayload),
    /// A session was opened.
    SessionStarted(SessionStartedPayload),
    /// Navigation moved to a question.
    QuestionVisited(QuestionPayload),
    /// An MCQ was answered.
    QuestionAnswered(OutcomePayload),
    /// A fill-in-blank or rearrangement was checked.
    QuestionChecked(OutcomePayload),
    /// A rearrangement solution was revealed.
    SolutionRevealed(QuestionPayload),
    /// A question was reset.
    QuestionReset(QuestionPayload),
    /// Every question is complete.
    LessonCompleted(LessonCompletedPayload),
    /// Something failed.
    Error(ErrorPayload),
}

impl LessonEvent {
    /// Creates a `Connected` event.
    #[must_use]
    pub fn connected(active_sessions: usize) -> Self {
        Self::Connected(ConnectedPayload {
            active_sessions,
            timestamp: Utc::now(),
        })
    }

    /// Creates a `SessionStarted` event.
    #[must_use]
    pub fn session_started(
        session_id: impl Into<String>,
        tutorial: impl Into<String>,
        lesson: impl Into<String>,
        kind: Option<LessonKind>,
        total: usize,
    ) -> Self {
        Self::SessionStarted(SessionStartedPayload {
            session_id: session_id.into(),
            tutorial: tutorial.into(),
            lesson: lesson.into(),
            kind,
            total,
        })
    }

    /// Creates a `QuestionVisited` event.
    #[must_use]
    pub fn question_visited(session_id: impl Into<String>, index: usize) -> Self {
        Self::QuestionVisited(QuestionPayload {
            session_id: session_id.into(),
            index,
        })
    }

    /// Creates a `QuestionAnswered` event.
    #[must_use]
    pub fn question_answered(session_id: impl Into<String>, index: usize, correct: bool) -> Self {
        Self::QuestionAnswered(OutcomePayload {
            session_id: session_id.into(),
            index,
            correct,
            score: None,
        })
    }

    /// Creates a `QuestionChecked` event.
    #[must_use]
    pub fn question_checked(
        session_id: impl Into<String>,
        index: usize,
        correct: bool,
        score: Option<u8>,
    ) -> Self {
        Self::QuestionChecked(OutcomePayload {
            session_id: session_id.into(),
            index,
            correct,
            score,
        })
    }

    /// Creates a `SolutionRevealed` event.
    #[must_use]
    pub fn solution_revealed(session_id: impl Into<String>, index: usize) -> Self {
        Self::SolutionRevealed(QuestionPayload {
            session_id: session_id.into(),
            index,
        })
    }

    /// Creates a `QuestionReset` event.
    #[must_use]
    pub fn question_reset(session_id: impl Into<String>, index: usize) -> Self {
        Self::QuestionReset(QuestionPayload {
            session_id: session_id.into(),
            index,
        })
    }

    /// Creates a `LessonCompleted` event from aggregate progress.
    #[must_use]
    pub fn lesson_completed(session_id: impl Into<String>, progress: &Progress) -> Self {
        Self::LessonCompleted(LessonCompletedPayload {
            session_id: session_id.into(),
            completed: progress.completed,
            correct: progress.correct,
            total: progress.total,
            average_score: progress.average_score,
        })
    }

    /// Creates an `Error` event.
    #[must_use]
    pub fn error(session_id: Option<String>, message: impl Into<String>) -> Self {
        Self::Error(ErrorPayload {
            session_id,
            message: message.into(),
        })
    }

    /// Returns the event name as a string.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Connected(_) => "connected",
            Self::SessionStarted(_) => "session_started",
            Self::QuestionVisited(_) => "question_visited",
            Self::QuestionAnswered(_) => "question_answered",
            Self::QuestionChecked(_) => "question_checked",
            Self::SolutionRevealed(_) => "solution_revealed",
            Self::QuestionReset(_) => "question_reset",
            Self::LessonCompleted(_) => "lesson_completed",
            Self::Error(_) => "error",
        }
    }
}

// ============================================================================
// Sinks
// ============================================================================

/// Receiver of lesson events.
pub trait EventSink: Send + Sync + std::fmt::Debug {
    /// Delivers one event. Must not block.
    fn emit(&self, event: LessonEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: LessonEvent) {}
}

/// Keeps every event in memory, in order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: std::sync::Mutex<Vec<LessonEvent>>,
}

impl RecordingSink {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the recorded events, oldest first.
    pub fn names(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .map(|events| events.iter().map(LessonEvent::event_name).collect())
            .unwrap_or_default()
    }

    /// Copies of the recorded events.
    pub fn events(&self) -> Vec<LessonEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: LessonEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

// ============================================================================
// Event Broadcaster
// ============================================================================

/// Broadcasts lesson events to all connected WebSocket clients.
///
/// Uses a tokio broadcast channel; events are not kept for clients that
/// connect later.
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<LessonEvent>,
}

impl EventBroadcaster {
    /// Creates a broadcaster with the given per-subscriber buffer.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a new subscriber.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<LessonEvent> {
        self.sender.subscribe()
    }

    /// Broadcasts an event, returning the number of receivers.
    pub fn send(&self, event: LessonEvent) -> usize {
        // Err only means nobody is listening
        self.sender.send(event).unwrap_or(0)
    }

    /// Number of active subscribers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}

impl EventSink for EventBroadcaster {
    fn emit(&self, event: LessonEvent) {
        let receivers = self.send(event);
        debug!(receivers, "Broadcast lesson event");
    }
}

// ============================================================================
// WebSocket streaming
// ============================================================================

/// Interval between heartbeat pings.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Maximum number of missed pong responses before disconnecting.
const MAX_MISSED_PONGS: u8 = 3;

/// Streams broadcast events to one WebSocket client.
///
/// - Sends `greeting` immediately
/// - Forwards every broadcast event
/// - Pings every 30 seconds and closes after 3 missed pongs
pub async fn stream_events(
    socket: WebSocket,
    broadcaster: EventBroadcaster,
    greeting: LessonEvent,
) {
    let (mut sender, mut receiver) = socket.split();

    let greeting_json = match serde_json::to_string(&greeting) {
        Ok(json) => json,
        Err(e) => {
            warn!("Failed to serialize connected event: {}", e);
            return;
        }
    };

    // Subscribe before greeting so nothing emitted in between is lost
    let mut event_receiver = broadcaster.subscribe();

    if sender.send(Message::Text(greeting_json)).await.is_err() {
        debug!("Client disconnected before receiving connected event");
        return;
    }

    info!("WebSocket client connected");

    let mut heartbeat = interval(HEARTBEAT_INTERVAL);
    // The first tick completes immediately
    heartbeat.tick().await;
    let mut missed_pongs = 0u8;

    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Pong(_))) => {
                        missed_pongs = 0;
                        debug!("Received pong from client");
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("Client requested close");
                        break;
                    }
                    Some(Ok(Message::Text(_) | Message::Binary(_))) => {
                        debug!("Ignoring message from client");
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            debug!("Failed to send pong, client disconnected");
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket error: {}", e);
                        break;
                    }
                    None => {
                        debug!("WebSocket stream ended");
                        break;
                    }
                }
            }

            event = event_receiver.recv() => {
                match event {
                    Ok(lesson_event) => {
                        let json = match serde_json::to_string(&lesson_event) {
                            Ok(j) => j,
                            Err(e) => {
                                warn!("Failed to serialize event: {}", e);
                                continue;
                            }
                        };
                        if sender.send(Message::Text(json)).await.is_err() {
                            debug!("Failed to send event, client disconnected");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Client lagged, missed {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("Broadcaster closed");
                        break;
                    }
                }
            }

            _ = heartbeat.tick() => {
                if sender.send(Message::Ping(vec![])).await.is_err() {
                    debug!("Failed to send ping, client disconnected");
                    break;
                }
                missed_pongs += 1;
                if missed_pongs >= MAX_MISSED_PONGS {
                    info!("Client missed {} pongs, closing connection", MAX_MISSED_PONGS);
                    break;
                }
            }
        }
    }

    info!("WebSocket client disconnected");
}
