//! Integration tests for the playground and render endpoints.
//!
//! The code-execution and AI chat services are replaced by stub axum servers
//! so status mapping, timeouts and stale-request handling can be observed
//! through the public API.

use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use codepath_engine::config::{ChatConfig, ExecutionConfig};
use codepath_engine::{create_router, AppState, Config};
use serde_json::{json, Value};

/// Starts `router` on an ephemeral port and returns its base URL.
async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Server failed");
    });
    format!("http://{addr}")
}

/// Execution stub: echoes the code; `sleep:<ms>` delays the reply.
async fn stub_execute(Json(body): Json<Value>) -> Json<Value> {
    let code = body["code"].as_str().unwrap_or_default().to_string();
    if let Some(ms) = code.strip_prefix("sleep:").and_then(|ms| ms.parse().ok()) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
    Json(json!({
        "success": true,
        "output": format!("ran {code}"),
        "executionTime": 12.5
    }))
}

/// Chat stub: describes the request it received.
async fn stub_chat(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({
        "content": format!(
            "{} message(s), model {}, context: {}",
            body["messages"].as_array().map_or(0, Vec::len),
            body["model"].as_str().unwrap_or_default(),
            body.get("systemContext").is_some()
        ),
        "tokens": 42
    }))
}

/// Starts stubs plus the API and returns the API base URL.
async fn spawn_api(execution_timeout: u64, chat_base: Option<String>) -> String {
    let execution_base = serve(Router::new().route("/execute", post(stub_execute))).await;
    let chat_base = match chat_base {
        Some(base) => base,
        None => serve(Router::new().route("/api/chat/playground", post(stub_chat))).await,
    };

    let config = Config {
        execution: ExecutionConfig {
            url: format!("{execution_base}/execute"),
            timeout_seconds: execution_timeout,
        },
        chat: ChatConfig {
            url: chat_base,
            model: "tutor-small".to_string(),
            timeout_seconds: 5,
            max_history: 2,
        },
        ..Config::default()
    };
    serve(create_router(AppState::new(config).expect("Failed to build state"))).await
}

async fn post_json(url: &str, body: Value) -> Value {
    reqwest::Client::new()
        .post(url)
        .json(&body)
        .send()
        .await
        .expect("Request failed")
        .json()
        .await
        .expect("Body is not JSON")
}

// ============================================================================
// Code execution
// ============================================================================

#[tokio::test]
async fn test_run_returns_execution_result() {
    let api = spawn_api(5, None).await;
    let body = post_json(
        &format!("{api}/api/playground/run"),
        json!({"sessionId": "s-1", "code": "fn main() {}", "language": "rust"}),
    )
    .await;

    assert_eq!(body["status"], "completed");
    assert_eq!(body["result"]["success"], true);
    assert_eq!(body["result"]["output"], "ran fn main() {}");
    assert_eq!(body["result"]["executionTime"], 12.5);
}

#[tokio::test]
async fn test_run_timeout_is_reported_not_retried() {
    let api = spawn_api(1, None).await;
    let body = post_json(
        &format!("{api}/api/playground/run"),
        json!({"sessionId": "s-1", "code": "sleep:3000", "language": "rust"}),
    )
    .await;

    assert_eq!(body["status"], "failed");
    assert_eq!(body["retryable"], true);
    assert!(body["message"].as_str().unwrap().contains("timed out"));
}

#[tokio::test]
async fn test_empty_code_is_rejected_locally() {
    let api = spawn_api(5, None).await;
    let body = post_json(
        &format!("{api}/api/playground/run"),
        json!({"sessionId": "s-1", "code": "   ", "language": "rust"}),
    )
    .await;
    assert_eq!(body["status"], "failed");
}

#[tokio::test]
async fn test_newer_run_supersedes_older() {
    let api = spawn_api(5, None).await;
    let url = format!("{api}/api/playground/run");

    let slow = {
        let url = url.clone();
        tokio::spawn(async move {
            post_json(
                &url,
                json!({"sessionId": "s-1", "code": "sleep:500", "language": "rust"}),
            )
            .await
        })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    let fast = post_json(
        &url,
        json!({"sessionId": "s-1", "code": "print", "language": "rust"}),
    )
    .await;
    let slow = slow.await.expect("slow request task");

    assert_eq!(fast["status"], "completed");
    assert_eq!(slow["status"], "superseded");
}

#[tokio::test]
async fn test_runs_from_other_sessions_do_not_supersede() {
    let api = spawn_api(5, None).await;
    let url = format!("{api}/api/playground/run");

    let slow = {
        let url = url.clone();
        tokio::spawn(async move {
            post_json(
                &url,
                json!({"sessionId": "learner-a", "code": "sleep:500", "language": "rust"}),
            )
            .await
        })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    let other = post_json(
        &url,
        json!({"sessionId": "learner-b", "code": "print", "language": "rust"}),
    )
    .await;
    let slow = slow.await.expect("slow request task");

    assert_eq!(other["status"], "completed");
    assert_eq!(slow["status"], "completed");
    assert_eq!(slow["result"]["output"], "ran sleep:500");
}

// ============================================================================
// AI chat
// ============================================================================

#[tokio::test]
async fn test_chat_forwards_history_and_context() {
    let api = spawn_api(5, None).await;
    let body = post_json(
        &format!("{api}/api/playground/chat"),
        json!({
            "sessionId": "s-1",
            "messages": [
                {"role": "user", "content": "first"},
                {"role": "assistant", "content": "reply"},
                {"role": "user", "content": "why does this fail?"}
            ],
            "editor": {"code": "let x = ;", "language": "rust"}
        }),
    )
    .await;

    assert_eq!(body["status"], "completed");
    assert_eq!(
        body["result"]["content"],
        "2 message(s), model tutor-small, context: true"
    );
    assert_eq!(body["result"]["tokens"], 42);
}

#[tokio::test]
async fn test_chat_status_codes_map_to_messages() {
    let cases = [
        (401, "Please sign in to use the AI assistant."),
        (403, "The AI assistant requires an active subscription."),
        (429, "Too many requests. Please wait a moment and try again."),
        (500, "Something went wrong. Please try again."),
    ];

    for (status, expected) in cases {
        // Each case gets a chat base that always answers with `status`
        let chat = Router::new().route(
            "/api/chat/playground",
            post(move || async move {
                (
                    StatusCode::from_u16(status).expect("valid status"),
                    Json(json!({"error": "stub"})),
                )
            }),
        );
        let chat_base = serve(chat).await;
        let api = spawn_api(5, Some(chat_base)).await;

        let body = post_json(
            &format!("{api}/api/playground/chat"),
            json!({"sessionId": "s-1", "messages": [{"role": "user", "content": "hi"}]}),
        )
        .await;
        assert_eq!(body["status"], "failed", "status {status}");
        assert_eq!(body["message"], expected, "status {status}");
    }
}

#[tokio::test]
async fn test_chat_service_unreachable() {
    // Port 9 (discard) is assumed closed on test machines
    let api = spawn_api(5, Some("http://127.0.0.1:9".to_string())).await;
    let body = post_json(
        &format!("{api}/api/playground/chat"),
        json!({"sessionId": "s-1", "messages": [{"role": "user", "content": "hi"}]}),
    )
    .await;
    assert_eq!(body["status"], "failed");
    assert_eq!(body["retryable"], true);
}

// ============================================================================
// Presentation adapters
// ============================================================================

#[tokio::test]
async fn test_render_code_uses_configured_theme() {
    let api = spawn_api(5, None).await;
    let body = post_json(
        &format!("{api}/api/render/code"),
        json!({"code": "fn main() {\n    println!(\"<hi>\");\n}", "language": "Rust"}),
    )
    .await;

    assert_eq!(body["theme"], "light");
    assert_eq!(body["language"], "rust");
    assert_eq!(body["lineCount"], 3);
    assert!(body["html"].as_str().unwrap().contains("&lt;hi&gt;"));
    assert!(body["copyText"].as_str().unwrap().contains("<hi>"));
}

#[tokio::test]
async fn test_render_diagram_always_returns_svg() {
    let api = spawn_api(5, None).await;
    let body = post_json(
        &format!("{api}/api/render/diagram"),
        json!({"source": "graph TD\nA[Start] --> B[Finish]", "theme": "DARK"}),
    )
    .await;

    assert_eq!(body["theme"], "dark");
    let status = body["status"].as_str().unwrap();
    assert!(status == "rendered" || status == "fallback");
    assert!(body["svg"].as_str().unwrap().contains("<svg"));
}
