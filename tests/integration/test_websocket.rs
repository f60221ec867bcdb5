//! Integration tests for the lesson event stream on `/ws`.
//!
//! Sessions are driven over HTTP while WebSocket clients observe the typed
//! events they emit.

use std::path::PathBuf;
use std::time::Duration;

use codepath_engine::{create_router, AppState, Config, LessonEvent};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tungstenite::Message;

/// Helper type for WebSocket client
type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Spawns the test server over the fixture content and returns its address.
async fn spawn_test_server() -> String {
    let config = Config {
        content_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("fixtures/content")
            .display()
            .to_string(),
        ..Config::default()
    };
    let router = create_router(AppState::new(config).expect("Failed to build state"));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get local addr");

    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Server failed");
    });

    // Give the server a moment to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    addr.to_string()
}

/// Connects a WebSocket client to the server at `addr`.
async fn connect_client(addr: &str) -> WsClient {
    let (ws_stream, _) = connect_async(format!("ws://{addr}/ws"))
        .await
        .expect("Failed to connect to WebSocket");
    ws_stream
}

/// Receives the next text message and parses it as a `LessonEvent`.
/// Answers pings along the way.
async fn receive_event(client: &mut WsClient) -> LessonEvent {
    loop {
        let msg = timeout(Duration::from_secs(5), client.next())
            .await
            .expect("Timeout waiting for message")
            .expect("Stream ended")
            .expect("WebSocket error");

        match msg {
            Message::Text(text) => {
                return serde_json::from_str(&text).expect("Failed to parse event");
            }
            Message::Ping(data) => {
                client
                    .send(Message::Pong(data))
                    .await
                    .expect("Failed to send pong");
            }
            Message::Pong(_) => {}
            other => panic!("Expected text message, got: {other:?}"),
        }
    }
}

async fn post(addr: &str, path: &str, body: Value) -> Value {
    reqwest::Client::new()
        .post(format!("http://{addr}{path}"))
        .json(&body)
        .send()
        .await
        .expect("Request failed")
        .json()
        .await
        .expect("Body is not JSON")
}

async fn start_session(addr: &str, lesson: &str) -> String {
    let view = post(
        addr,
        "/api/sessions",
        json!({"tutorial": "rust-basics", "lesson": lesson}),
    )
    .await;
    view["sessionId"].as_str().expect("sessionId").to_string()
}

// ============================================================================
// Connection
// ============================================================================

#[tokio::test]
async fn test_client_receives_connected_event() {
    let addr = spawn_test_server().await;
    let mut client = connect_client(&addr).await;

    let event = receive_event(&mut client).await;
    let LessonEvent::Connected(payload) = event else {
        panic!("Expected Connected event, got: {event:?}");
    };
    assert_eq!(payload.active_sessions, 0);
}

#[tokio::test]
async fn test_connected_event_counts_sessions() {
    let addr = spawn_test_server().await;
    start_session(&addr, "loops-quiz").await;
    start_session(&addr, "loops-blanks").await;

    let mut client = connect_client(&addr).await;
    let LessonEvent::Connected(payload) = receive_event(&mut client).await else {
        panic!("Expected Connected event");
    };
    assert_eq!(payload.active_sessions, 2);
}

// ============================================================================
// Lesson events
// ============================================================================

#[tokio::test]
async fn test_fill_in_blank_session_event_sequence() {
    let addr = spawn_test_server().await;
    let mut client = connect_client(&addr).await;
    receive_event(&mut client).await;

    let id = start_session(&addr, "loops-blanks").await;

    let LessonEvent::SessionStarted(started) = receive_event(&mut client).await else {
        panic!("Expected SessionStarted");
    };
    assert_eq!(started.session_id, id);
    assert_eq!(started.total, 1);

    let LessonEvent::QuestionVisited(visited) = receive_event(&mut client).await else {
        panic!("Expected QuestionVisited");
    };
    assert_eq!(visited.index, 0);

    let actions = format!("/api/sessions/{id}/actions");
    post(&addr, &actions, json!({"action": "set_blank", "position": 1, "value": "5"})).await;
    post(&addr, &actions, json!({"action": "set_blank", "position": 2, "value": "match"})).await;
    post(&addr, &actions, json!({"action": "check"})).await;

    let LessonEvent::QuestionChecked(checked) = receive_event(&mut client).await else {
        panic!("Expected QuestionChecked");
    };
    assert!(!checked.correct);
    assert_eq!(checked.score, Some(50));

    let LessonEvent::LessonCompleted(completed) = receive_event(&mut client).await else {
        panic!("Expected LessonCompleted");
    };
    assert_eq!(completed.completed, 1);
    assert_eq!(completed.correct, 0);
    assert_eq!(completed.average_score, Some(50.0));

    post(&addr, &actions, json!({"action": "reset"})).await;
    let LessonEvent::QuestionReset(reset) = receive_event(&mut client).await else {
        panic!("Expected QuestionReset");
    };
    assert_eq!(reset.session_id, id);
}

#[tokio::test]
async fn test_failed_action_emits_error_event() {
    let addr = spawn_test_server().await;
    let mut client = connect_client(&addr).await;
    receive_event(&mut client).await;

    let id = start_session(&addr, "loops-quiz").await;
    receive_event(&mut client).await;
    receive_event(&mut client).await;

    post(
        &addr,
        &format!("/api/sessions/{id}/actions"),
        json!({"action": "select", "option": "zzz"}),
    )
    .await;

    let LessonEvent::Error(error) = receive_event(&mut client).await else {
        panic!("Expected Error event");
    };
    assert_eq!(error.session_id.as_deref(), Some(id.as_str()));
    assert!(!error.message.contains("Suggestion"));
}

#[tokio::test]
async fn test_all_clients_receive_events() {
    let addr = spawn_test_server().await;
    let mut first = connect_client(&addr).await;
    let mut second = connect_client(&addr).await;
    receive_event(&mut first).await;
    receive_event(&mut second).await;

    let id = start_session(&addr, "loops-quiz").await;

    for client in [&mut first, &mut second] {
        let LessonEvent::SessionStarted(started) = receive_event(client).await else {
            panic!("Expected SessionStarted");
        };
        assert_eq!(started.session_id, id);
    }
}
