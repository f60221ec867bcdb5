//! HTTP API for lesson playback.
//!
//! # Endpoints
//!
//! - `GET /api/health` - Liveness and session count
//! - `GET /api/tutorials` - Tutorial catalogue
//! - `GET /api/tutorials/:slug` - Tutorial overview
//! - `GET /api/languages/:slug` - Language metadata
//! - `POST /api/sessions` - Start a lesson session
//! - `GET /api/sessions/:id` - Current session view
//! - `POST /api/sessions/:id/actions` - Apply a learner action
//! - `DELETE /api/sessions/:id` - Discard a session
//! - `POST /api/playground/run` - Run code
//! - `POST /api/playground/chat` - Ask the AI assistant
//! - `POST /api/render/code` - Render a code block
//! - `POST /api/render/diagram` - Render a Mermaid diagram
//! - `GET /ws` - WebSocket stream of lesson events
//!
//! # Example
//!
//! ```no_run
//! use codepath_engine::{create_router, AppState, Config};
//!
//! # async fn example() {
//! let state = AppState::new(Config::default()).unwrap();
//! let router = create_router(state);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//! axum::serve(listener, router).await.unwrap();
//! # }
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, ws::WebSocketUpgrade, FromRequest, Path, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use codepath_render::code::{CodeBlock, RenderedCode};
use codepath_render::diagram::{DiagramAdapter, DiagramArtifact, MermaidCli};
use codepath_render::Theme;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::content::{Difficulty, Language, LessonKind, Tutorial};
use crate::error::EngineError;
use crate::events::{stream_events, EventBroadcaster, EventSink, LessonEvent};
use crate::playground::{EditorContext, Playground, PlaygroundOutcome};
use crate::services::{
    ChatClient, ChatMessage, ChatReply, ExecutionClient, ExecutionRequest, ExecutionResult,
};
use crate::session::{Action, LessonSession, SessionView};
use crate::source::{ContentSource, DirectorySource, TutorialSummary};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Response body for the health endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `ok`.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Sessions currently held.
    pub active_sessions: usize,
}

/// One lesson in a tutorial overview.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonOverview {
    /// Lesson slug.
    pub slug: String,
    /// Title.
    pub title: String,
    /// Lesson type, if known.
    pub kind: Option<LessonKind>,
    /// Number of questions (sections for concepts).
    pub question_count: usize,
    /// Whether the content failed validation.
    pub unavailable: bool,
}

/// Tutorial overview without answer data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorialOverview {
    /// Slug.
    pub slug: String,
    /// Title.
    pub title: String,
    /// Description.
    pub description: String,
    /// Difficulty.
    pub difficulty: Difficulty,
    /// Language slug.
    pub language: Option<String>,
    /// Reference markdown.
    pub reference: Option<String>,
    /// Lessons in order.
    pub lessons: Vec<LessonOverview>,
}

impl From<&Tutorial> for TutorialOverview {
    fn from(tutorial: &Tutorial) -> Self {
        Self {
            slug: tutorial.slug.clone(),
            title: tutorial.title.clone(),
            description: tutorial.description.clone(),
            difficulty: tutorial.difficulty,
            language: tutorial.language.clone(),
            reference: tutorial.reference.clone(),
            lessons: tutorial
                .lessons
                .iter()
                .map(|lesson| LessonOverview {
                    slug: lesson.slug.clone(),
                    title: lesson.title.clone(),
                    kind: lesson.kind(),
                    question_count: lesson.body.len(),
                    unavailable: lesson.body.is_unavailable(),
                })
                .collect(),
        }
    }
}

/// Request body for starting a session.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    /// Tutorial slug.
    pub tutorial: String,
    /// Lesson slug.
    pub lesson: String,
    /// Seed for the block shuffle; random when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Request body for the run endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaygroundRunRequest {
    /// Client making the request; only its own later runs supersede this one.
    pub session_id: String,
    /// Code to run.
    #[serde(flatten)]
    pub run: ExecutionRequest,
}

/// Request body for the chat endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaygroundChatRequest {
    /// Client making the request; only its own later messages supersede this one.
    pub session_id: String,
    /// Conversation, oldest first, ending with the learner's question.
    pub messages: Vec<ChatMessage>,
    /// Editor state given to the assistant.
    #[serde(default)]
    pub editor: EditorContext,
}

/// Request body for the code render endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderCodeRequest {
    /// Source code.
    pub code: String,
    /// Language slug.
    #[serde(default)]
    pub language: String,
    /// Theme override.
    #[serde(default)]
    pub theme: Option<Theme>,
}

/// Request body for the diagram render endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderDiagramRequest {
    /// Mermaid source.
    pub source: String,
    /// Theme override.
    #[serde(default)]
    pub theme: Option<Theme>,
}

/// Error response body returned on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Description of the error.
    pub error: String,
}

// ============================================================================
// Application State
// ============================================================================

/// Live sessions by id.
pub type SessionMap = Arc<Mutex<HashMap<String, LessonSession>>>;

/// Discards every session with no activity since `cutoff`. Returns how many
/// were removed.
pub fn evict_idle(sessions: &mut HashMap<String, LessonSession>, cutoff: DateTime<Utc>) -> usize {
    let before = sessions.len();
    sessions.retain(|id, session| {
        let keep = session.last_active() >= cutoff;
        if !keep {
            debug!(session = %id, last_active = %session.last_active(), "Evicting idle session");
        }
        keep
    });
    before - sessions.len()
}

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    /// Configuration.
    pub config: Config,
    /// Where tutorials come from.
    pub content: Arc<dyn ContentSource>,
    /// Live sessions.
    pub sessions: SessionMap,
    /// Event fan-out to WebSocket clients.
    pub events: EventBroadcaster,
    /// Code execution and AI chat.
    pub playground: Playground,
    /// Diagram rendering.
    pub diagrams: Arc<DiagramAdapter>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("events", &self.events)
            .field("playground", &self.playground)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Creates state backed by the content directory and HTTP service
    /// clients named in `config`.
    pub fn new(config: Config) -> crate::Result<Self> {
        let content = DirectorySource::new(&config.content_dir)
            .with_max_bytes(config.max_content_bytes());
        let playground = Playground::new(
            Arc::new(ExecutionClient::new(&config.execution)?),
            Arc::new(ChatClient::new(&config.chat)?),
            config.chat.model.clone(),
            config.chat.max_history,
        );
        let diagrams = DiagramAdapter::new(Box::new(MermaidCli::new(
            config.diagram.mmdc_path.as_ref().map(PathBuf::from),
        )));
        Ok(Self::with_services(config, Arc::new(content), playground, diagrams))
    }

    /// Creates state from explicit collaborators.
    pub fn with_services(
        config: Config,
        content: Arc<dyn ContentSource>,
        playground: Playground,
        diagrams: DiagramAdapter,
    ) -> Self {
        Self {
            config,
            content,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            events: EventBroadcaster::default(),
            playground,
            diagrams: Arc::new(diagrams),
        }
    }
}

// ============================================================================
// API Error Type
// ============================================================================

/// Internal error type for API handlers.
#[derive(Debug)]
enum ApiError {
    /// Unknown tutorial, lesson, language or session.
    NotFound(String),
    /// The action does not fit the lesson type.
    Conflict(String),
    /// Malformed or out-of-range input.
    BadRequest(String),
    /// The request body could not be decoded.
    Rejected(StatusCode, String),
    /// Anything else.
    Internal(String),
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let message = err.user_message();
        match err {
            EngineError::SessionNotFound { .. } | EngineError::LessonNotFound { .. } => {
                Self::NotFound(message)
            }
            EngineError::WrongLessonType { .. } => Self::Conflict(message),
            ref e if e.is_interaction() => Self::BadRequest(message),
            e => {
                warn!(error = %e, "Request failed");
                Self::Internal(message)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Rejected(status, msg) => (status, msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

/// JSON body extractor whose rejections use [`ErrorResponse`].
struct ApiJson<T>(T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                debug!(status = %rejection.status(), "Rejected request body");
                Err(ApiError::Rejected(rejection.status(), rejection.body_text()))
            }
        }
    }
}

// ============================================================================
// Router Setup
// ============================================================================

/// Creates the HTTP router with all API endpoints and the `/ws` stream.
pub fn create_router(state: AppState) -> Router {
    // Configure CORS for development (allow all origins)
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/health", get(handle_health))
        .route("/tutorials", get(handle_list_tutorials))
        .route("/tutorials/:slug", get(handle_get_tutorial))
        .route("/languages/:slug", get(handle_get_language))
        .route("/sessions", post(handle_start_session))
        .route(
            "/sessions/:id",
            get(handle_get_session).delete(handle_delete_session),
        )
        .route("/sessions/:id/actions", post(handle_action))
        .route("/playground/run", post(handle_run))
        .route("/playground/chat", post(handle_chat))
        .route("/render/code", post(handle_render_code))
        .route("/render/diagram", post(handle_render_diagram));

    Router::new()
        .nest("/api", api_routes)
        .route("/ws", get(handle_ws))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}

// ============================================================================
// Handlers
// ============================================================================

async fn handle_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let active_sessions = state.sessions.lock().await.len();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_sessions,
    })
}

async fn handle_list_tutorials(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TutorialSummary>>, ApiError> {
    Ok(Json(state.content.tutorials().await?))
}

async fn handle_get_tutorial(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<TutorialOverview>, ApiError> {
    let tutorial = state
        .content
        .tutorial(&slug)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Tutorial '{slug}' not found")))?;
    Ok(Json(TutorialOverview::from(&tutorial)))
}

async fn handle_get_language(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<Language>, ApiError> {
    let language = state
        .content
        .language(&slug)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Language '{slug}' not found")))?;
    Ok(Json(language))
}

/// Handler for `POST /api/sessions`.
async fn handle_start_session(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<StartSessionRequest>,
) -> Result<(StatusCode, Json<SessionView>), ApiError> {
    let lesson = state
        .content
        .lesson(&request.tutorial, &request.lesson)
        .await?
        .ok_or_else(|| EngineError::lesson_not_found(&request.tutorial, &request.lesson))?;

    let id = format!("s-{:016x}", rand::random::<u64>());
    let sink: Arc<dyn EventSink> = Arc::new(state.events.clone());
    let session = match request.seed {
        Some(seed) => LessonSession::with_rng(
            &id,
            &request.tutorial,
            lesson,
            sink,
            StdRng::seed_from_u64(seed),
        ),
        None => LessonSession::new(&id, &request.tutorial, lesson, sink),
    };
    let view = session.view();

    let mut sessions = state.sessions.lock().await;
    let evicted = evict_idle(&mut sessions, Utc::now() - state.config.session_idle_timeout());
    if evicted > 0 {
        info!(evicted, "Discarded idle sessions");
    }
    sessions.insert(id, session);
    Ok((StatusCode::CREATED, Json(view)))
}

async fn handle_get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
    let mut sessions = state.sessions.lock().await;
    let session = sessions
        .get_mut(&id)
        .ok_or_else(|| EngineError::session_not_found(&id))?;
    session.touch();
    Ok(Json(session.view()))
}

/// Handler for `POST /api/sessions/:id/actions`.
///
/// Applies one action under the session lock and returns the new view.
async fn handle_action(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(action): ApiJson<Action>,
) -> Result<Json<SessionView>, ApiError> {
    let mut sessions = state.sessions.lock().await;
    let session = sessions
        .get_mut(&id)
        .ok_or_else(|| EngineError::session_not_found(&id))?;
    session.apply(action)?;
    Ok(Json(session.view()))
}

async fn handle_delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .sessions
        .lock()
        .await
        .remove(&id)
        .ok_or_else(|| EngineError::session_not_found(&id))?;
    info!(session = %id, "Session discarded");
    Ok(StatusCode::NO_CONTENT)
}

async fn handle_run(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<PlaygroundRunRequest>,
) -> Json<PlaygroundOutcome<ExecutionResult>> {
    Json(state.playground.run(&request.session_id, request.run).await)
}

async fn handle_chat(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<PlaygroundChatRequest>,
) -> Json<PlaygroundOutcome<ChatReply>> {
    let outcome = state
        .playground
        .chat(&request.session_id, &request.messages, &request.editor)
        .await;
    Json(outcome)
}

async fn handle_render_code(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<RenderCodeRequest>,
) -> Json<RenderedCode> {
    let theme = request.theme.unwrap_or(state.config.theme);
    Json(CodeBlock::new(request.code, request.language, theme).render())
}

/// Handler for `POST /api/render/diagram`. Always succeeds: failed renders
/// come back as a fallback artifact.
async fn handle_render_diagram(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<RenderDiagramRequest>,
) -> Result<Json<DiagramArtifact>, ApiError> {
    let theme = request.theme.unwrap_or(state.config.theme);
    let diagrams = Arc::clone(&state.diagrams);
    let artifact = tokio::task::spawn_blocking(move || diagrams.render(&request.source, theme))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(artifact))
}

async fn handle_ws(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    info!("New WebSocket connection request");
    let greeting = LessonEvent::connected(state.sessions.lock().await.len());
    let events = state.events.clone();
    ws.on_upgrade(move |socket| stream_events(socket, events, greeting))
}
