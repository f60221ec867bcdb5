//! End-to-end lesson flows over the HTTP API.
//!
//! A real server is started on an ephemeral port, backed by the fixture
//! content directory, and driven with `reqwest`.

use std::path::PathBuf;
use std::time::Duration;

use codepath_engine::{create_router, AppState, Config};
use reqwest::StatusCode;
use serde_json::{json, Value};

fn fixture_content_dir() -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures/content")
        .display()
        .to_string()
}

/// Spawns a server over the fixture content and returns its base URL.
async fn spawn_test_server() -> String {
    let config = Config {
        content_dir: fixture_content_dir(),
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
    tokio::time::sleep(Duration::from_millis(50)).await;

    format!("http://{addr}")
}

struct Client {
    base: String,
    http: reqwest::Client,
}

impl Client {
    async fn start() -> Self {
        Self {
            base: spawn_test_server().await,
            http: reqwest::Client::new(),
        }
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let response = self
            .http
            .get(format!("{}{path}", self.base))
            .send()
            .await
            .expect("Request failed");
        Self::decode(response).await
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let response = self
            .http
            .post(format!("{}{path}", self.base))
            .json(&body)
            .send()
            .await
            .expect("Request failed");
        Self::decode(response).await
    }

    async fn decode(response: reqwest::Response) -> (StatusCode, Value) {
        let status = response.status();
        let text = response.text().await.expect("Failed to read body");
        let value = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).expect("Body is not JSON")
        };
        (status, value)
    }

    /// Starts a session and returns `(id, view)`.
    async fn start_session(&self, lesson: &str, seed: Option<u64>) -> (String, Value) {
        let (status, view) = self
            .post(
                "/api/sessions",
                json!({"tutorial": "rust-basics", "lesson": lesson, "seed": seed}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "unexpected body: {view}");
        let id = view["sessionId"].as_str().expect("sessionId").to_string();
        (id, view)
    }

    async fn act(&self, id: &str, action: Value) -> (StatusCode, Value) {
        self.post(&format!("/api/sessions/{id}/actions"), action).await
    }
}

fn block_ids(blocks: &Value) -> Vec<String> {
    blocks
        .as_array()
        .expect("blocks array")
        .iter()
        .map(|b| b["id"].as_str().expect("block id").to_string())
        .collect()
}

// ============================================================================
// Catalogue
// ============================================================================

#[tokio::test]
async fn test_catalogue_endpoints() {
    let client = Client::start().await;

    let (status, tutorials) = client.get("/api/tutorials").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tutorials[0]["slug"], "rust-basics");
    assert_eq!(tutorials[0]["lessonCount"], 5);

    let (status, tutorial) = client.get("/api/tutorials/rust-basics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tutorial["difficulty"], "beginner");
    assert_eq!(tutorial["lessons"][3]["kind"], "codeblock_rearranging");
    assert_eq!(tutorial["lessons"][4]["unavailable"], true);

    let (status, language) = client.get("/api/languages/rust").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(language["fileExtension"], "rs");

    let (status, _) = client.get("/api/tutorials/..%2Fsecrets").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = client.get("/api/languages/cobol").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Lesson types
// ============================================================================

#[tokio::test]
async fn test_concept_lesson_marks_sections_read() {
    let client = Client::start().await;
    let (id, view) = client.start_session("loops-concept", None).await;

    assert_eq!(view["total"], 2);
    assert_eq!(view["lesson"]["learningObjectives"][0], "Write a for loop");
    assert_eq!(view["question"]["section"]["code"]["language"], "rust");
    assert_eq!(view["question"]["keyPoints"], json!([]));

    let (_, view) = client.act(&id, json!({"action": "mark_read"})).await;
    assert_eq!(view["question"]["read"], true);
    assert_eq!(view["progress"]["completed"], 1);

    let (_, view) = client.act(&id, json!({"action": "next"})).await;
    assert_eq!(view["isLast"], true);
    assert_eq!(view["question"]["keyPoints"][0], "Ranges exclude their end");

    let (_, view) = client.act(&id, json!({"action": "mark_read"})).await;
    assert_eq!(view["progress"]["allComplete"], true);
    assert!(view["summary"].is_object());
}

#[tokio::test]
async fn test_mcq_first_answer_sticks() {
    let client = Client::start().await;
    let (id, view) = client.start_session("loops-quiz", None).await;
    assert_eq!(view["question"]["selected"], Value::Null);
    assert_eq!(view["question"]["options"][0]["mark"], "neutral");
    assert_eq!(view["question"]["options"][0]["explanation"], Value::Null);

    let (status, view) = client
        .act(&id, json!({"action": "select", "option": "a"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    let question = &view["question"];
    assert_eq!(question["selected"], "a");
    assert_eq!(question["correct"], false);
    assert_eq!(question["options"][0]["mark"], "selected_wrong");
    assert_eq!(question["options"][1]["mark"], "correct");
    assert_eq!(question["explanation"], "Ranges are half-open.");

    let (_, view) = client
        .act(&id, json!({"action": "select", "option": "b"}))
        .await;
    assert_eq!(view["question"]["selected"], "a");
    assert_eq!(view["question"]["correct"], false);

    // Options keep authored order
    let ids: Vec<&str> = view["question"]["options"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert!(view["summary"].is_null());
}

#[tokio::test]
async fn test_fill_in_blanks_normalizes_answers() {
    let client = Client::start().await;
    let (id, view) = client.start_session("loops-blanks", None).await;
    assert_eq!(view["question"]["blanks"][1]["type"], "dropdown");
    assert_eq!(view["question"]["result"], Value::Null);

    client
        .act(&id, json!({"action": "set_blank", "position": 1, "value": " 5 "}))
        .await;
    client
        .act(&id, json!({"action": "set_blank", "position": 2, "value": "Loop"}))
        .await;
    let (status, view) = client.act(&id, json!({"action": "check"})).await;
    assert_eq!(status, StatusCode::OK);

    let result = &view["question"]["result"];
    assert_eq!(result["score"], 100);
    assert_eq!(result["correctCount"], 2);
    assert!(view["question"]["solution"]
        .as_str()
        .unwrap()
        .contains("for i in 0..5"));
    assert_eq!(view["progress"]["allComplete"], true);
    assert_eq!(view["summary"]["questions"][0]["score"], 100);

    let (status, _) = client
        .act(&id, json!({"action": "set_blank", "position": 9, "value": "x"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_fill_in_blanks_partial_score() {
    let client = Client::start().await;
    let (id, _) = client.start_session("loops-blanks", None).await;

    client
        .act(&id, json!({"action": "set_blank", "position": 1, "value": "6"}))
        .await;
    client
        .act(&id, json!({"action": "set_blank", "position": 2, "value": "loop"}))
        .await;
    let (_, view) = client.act(&id, json!({"action": "check"})).await;

    let result = &view["question"]["result"];
    assert_eq!(result["score"], 50);
    assert_eq!(result["blanks"][0]["correct"], false);
    assert_eq!(result["blanks"][0]["hint"], "How many lines?");
    assert_eq!(view["progress"]["completed"], 1);
    assert_eq!(view["progress"]["correct"], 0);
}

#[tokio::test]
async fn test_rearrange_wrong_order_then_reset() {
    let client = Client::start().await;
    let (id, view) = client.start_session("loops-order", Some(7)).await;

    let mut pool = block_ids(&view["question"]["pool"]);
    pool.sort();
    assert_eq!(pool, vec!["b1", "b2", "b3"]);

    for block in ["b2", "b1", "b3"] {
        let (status, _) = client
            .act(&id, json!({"action": "place", "block": block}))
            .await;
        assert_eq!(status, StatusCode::OK);
    }
    let (_, view) = client.act(&id, json!({"action": "check"})).await;
    let question = &view["question"];
    assert_eq!(question["result"]["correct"], false);
    assert_eq!(question["result"]["slots"], json!(["incorrect", "incorrect", "correct"]));
    assert_eq!(block_ids(&question["placed"]), vec!["b2", "b1", "b3"]);

    let (_, view) = client.act(&id, json!({"action": "reset"})).await;
    let question = &view["question"];
    let mut pool = block_ids(&question["pool"]);
    pool.sort();
    assert_eq!(pool, vec!["b1", "b2", "b3"]);
    assert_eq!(question["placed"], json!([]));
    assert_eq!(question["result"], Value::Null);
    assert_eq!(view["progress"]["completed"], 0);
}

#[tokio::test]
async fn test_rearrange_hints_and_solution() {
    let client = Client::start().await;
    let (id, view) = client.start_session("loops-order", Some(1)).await;
    assert_eq!(view["question"]["hintsRemaining"], 2);

    let (_, view) = client.act(&id, json!({"action": "show_hint"})).await;
    assert_eq!(view["question"]["hints"], json!(["The header comes first"]));
    assert_eq!(view["question"]["hintsRemaining"], 1);

    let (_, view) = client.act(&id, json!({"action": "show_solution"})).await;
    assert_eq!(block_ids(&view["question"]["solution"]), vec!["b1", "b2", "b3"]);
    assert_eq!(view["progress"]["completed"], 1);
    assert_eq!(view["progress"]["correct"], 0);
}

// ============================================================================
// Errors and placeholders
// ============================================================================

#[tokio::test]
async fn test_broken_lesson_is_a_placeholder() {
    let client = Client::start().await;
    let (id, view) = client.start_session("broken-quiz", None).await;

    assert_eq!(view["total"], 0);
    assert!(view["unavailable"].as_str().unwrap().contains("no options"));
    assert_eq!(view["question"], Value::Null);

    let (status, _) = client.act(&id, json!({"action": "next"})).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = client
        .act(&id, json!({"action": "select", "option": "a"}))
        .await;
    assert!(status.is_client_error());
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_interaction_errors_map_to_status_codes() {
    let client = Client::start().await;
    let (id, _) = client.start_session("loops-quiz", None).await;

    let (status, _) = client.act(&id, json!({"action": "place", "block": "b1"})).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = client.act(&id, json!({"action": "go_to", "index": 5})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = client.act(&id, json!({"action": "fly"})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("fly"));

    let (status, _) = client
        .act("s-missing", json!({"action": "next"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = client
        .post("/api/sessions", json!({"tutorial": "rust-basics", "lesson": "nope"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_navigation_clamps_at_the_ends() {
    let client = Client::start().await;
    let (id, view) = client.start_session("loops-quiz", None).await;
    assert_eq!(view["isFirst"], true);

    let (_, view) = client.act(&id, json!({"action": "previous"})).await;
    assert_eq!(view["current"], 0);

    client.act(&id, json!({"action": "next"})).await;
    let (_, view) = client.act(&id, json!({"action": "next"})).await;
    assert_eq!(view["current"], 1);
    assert_eq!(view["isLast"], true);

    let (_, view) = client.get(&format!("/api/sessions/{id}")).await;
    assert_eq!(view["question"]["id"], "q2");
}
