//! AI chat service client.
//!
//! The playground assistant is a single endpoint,
//! `POST {base}/api/chat/playground`, that takes the conversation so far plus
//! a system context describing the learner's code, and returns one reply.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{build_client, map_transport_error, status_error};
use crate::config::ChatConfig;
use crate::error::{EngineError, Result, ServiceErrorKind};

const SERVICE: &str = "AI chat";

/// Path of the playground chat endpoint under the configured base URL.
pub const CHAT_PATH: &str = "/api/chat/playground";

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// The learner.
    User,
    /// The assistant.
    Assistant,
}

/// One message of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author.
    pub role: ChatRole,
    /// Text.
    pub content: String,
}

impl ChatMessage {
    /// A learner message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// An assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Request body of the chat endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// Conversation, oldest first.
    pub messages: Vec<ChatMessage>,
    /// Model name.
    pub model: String,
    /// Description of the learner's current code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_context: Option<String>,
}

impl ChatRequest {
    /// Builds a request from the conversation, keeping the most recent
    /// `max_history` messages.
    pub fn recent(
        history: &[ChatMessage],
        max_history: usize,
        model: impl Into<String>,
        system_context: Option<String>,
    ) -> Self {
        let skip = history.len().saturating_sub(max_history);
        Self {
            messages: history[skip..].to_vec(),
            model: model.into(),
            system_context,
        }
    }
}

/// Response body of the chat endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    /// Assistant reply.
    pub content: String,
    /// Tokens consumed, when reported.
    #[serde(default)]
    pub tokens: Option<u64>,
}

/// Something that answers playground questions.
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Sends the conversation and returns the assistant's reply.
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply>;
}

/// HTTP client for the chat service.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl ChatClient {
    /// Creates a client from configuration.
    pub fn new(config: &ChatConfig) -> Result<Self> {
        Self::with_timeout(&config.url, Duration::from_secs(config.timeout_seconds))
    }

    /// Creates a client for the service at `base_url` with an explicit timeout.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(SERVICE, timeout)?,
            endpoint: format!("{}{CHAT_PATH}", base_url.trim_end_matches('/')),
            timeout,
        })
    }

    /// Full endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatService for ChatClient {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply> {
        if request.messages.is_empty() {
            return Err(EngineError::service(
                SERVICE,
                ServiceErrorKind::Other,
                "No message to send",
            ));
        }

        debug!(
            messages = request.messages.len(),
            model = %request.model,
            "Sending chat request"
        );
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| map_transport_error(SERVICE, self.timeout, &e))?;

        if !response.status().is_success() {
            return Err(status_error(SERVICE, response).await);
        }

        let reply: ChatReply = response
            .json()
            .await
            .map_err(|e| map_transport_error(SERVICE, self.timeout, &e))?;
        info!(tokens = reply.tokens, chars = reply.content.len(), "Chat reply received");
        Ok(reply)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use tokio::net::TcpListener;

    use super::*;

    async fn serve(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn status_server(status: StatusCode) -> Router {
        Router::new().route(CHAT_PATH, post(move || async move { (status, "nope") }))
    }

    fn client(base: &str) -> ChatClient {
        ChatClient::with_timeout(base, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_send_returns_reply() {
        let base = serve(Router::new().route(
            CHAT_PATH,
            post(|Json(req): Json<ChatRequest>| async move {
                let content = format!(
                    "{} messages, context: {}",
                    req.messages.len(),
                    req.system_context.unwrap_or_default()
                );
                Json(serde_json::json!({"content": content, "tokens": 42}))
            }),
        ))
        .await;

        let chat = client(&base);
        let request = ChatRequest::recent(
            &[ChatMessage::user("why?")],
            20,
            "tutor",
            Some("fn main".to_string()),
        );
        let reply = chat.send(&request).await.unwrap();
        assert_eq!(reply.content, "1 messages, context: fn main");
        assert_eq!(reply.tokens, Some(42));
    }

    #[tokio::test]
    async fn test_status_mapping() {
        for (status, kind, message) in [
            (StatusCode::UNAUTHORIZED, ServiceErrorKind::Authentication, "sign in"),
            (StatusCode::FORBIDDEN, ServiceErrorKind::Subscription, "subscription"),
            (StatusCode::TOO_MANY_REQUESTS, ServiceErrorKind::RateLimit, "Too many requests"),
            (StatusCode::INTERNAL_SERVER_ERROR, ServiceErrorKind::Server, "went wrong"),
        ] {
            let chat = client(&serve(status_server(status)).await);
            let request = ChatRequest::recent(&[ChatMessage::user("hi")], 20, "tutor", None);
            let err = chat.send(&request).await.unwrap_err();
            match &err {
                EngineError::ServiceError { kind: actual, .. } => assert_eq!(*actual, kind),
                other => panic!("unexpected error: {other}"),
            }
            assert!(err.user_message().contains(message), "{}", err.user_message());
        }
    }

    #[tokio::test]
    async fn test_unreachable_service_is_network_error() {
        let chat = client("http://127.0.0.1:9");
        let request = ChatRequest::recent(&[ChatMessage::user("hi")], 20, "tutor", None);
        let err = chat.send(&request).await.unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn test_request_keeps_recent_history() {
        let chat = client("http://localhost:8080/");
        assert_eq!(chat.endpoint(), "http://localhost:8080/api/chat/playground");

        let history = vec![
            ChatMessage::user("one"),
            ChatMessage::assistant("two"),
            ChatMessage::user("three"),
        ];
        let request = ChatRequest::recent(&history, 2, "tutor", None);
        assert_eq!(request.messages, history[1..].to_vec());
        assert_eq!(request.model, "tutor");

        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("systemContext").is_none());
        assert_eq!(json["messages"][0]["role"], "assistant");
    }
}
