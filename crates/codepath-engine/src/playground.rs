//! Code playground: runs learner code and talks to the AI assistant.
//!
//! Only the most recent request of each kind from the same client matters.
//! Every call takes a ticket from that client's [`LatestRequest`]; when the
//! same client has started a newer call by the time a response arrives, the
//! response is dropped and the caller sees [`PlaygroundOutcome::Superseded`].
//! Requests from different clients never affect each other. Failures never
//! escape as errors: they become a learner-facing message.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::services::{
    ChatMessage, ChatReply, ChatRequest, ChatService, CodeExecutor, ExecutionRequest,
    ExecutionResult,
};

/// Hands out monotonically increasing tickets; only the newest is current.
#[derive(Debug, Clone, Default)]
pub struct LatestRequest {
    latest: Arc<AtomicU64>,
}

/// A claim on being the latest request.
#[derive(Debug)]
pub struct Ticket {
    id: u64,
    latest: Arc<AtomicU64>,
}

impl LatestRequest {
    /// Creates a guard with no tickets issued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a new ticket, superseding every earlier one.
    pub fn issue(&self) -> Ticket {
        let id = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        Ticket {
            id,
            latest: Arc::clone(&self.latest),
        }
    }

    /// `true` while any issued ticket is still alive.
    fn in_flight(&self) -> bool {
        Arc::strong_count(&self.latest) > 1
    }
}

/// One [`LatestRequest`] per client id.
///
/// Entries live only while a client has a request in flight, so the map
/// stays bounded by the number of outstanding calls.
#[derive(Debug, Default)]
pub struct ClientRequests {
    clients: Mutex<HashMap<String, LatestRequest>>,
}

impl ClientRequests {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a ticket for `client`, superseding that client's earlier ones.
    pub fn issue(&self, client: &str) -> Ticket {
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        clients.retain(|_, guard| guard.in_flight());
        clients.entry(client.to_string()).or_default().issue()
    }

    /// Number of clients with a request in flight.
    pub fn active_clients(&self) -> usize {
        let clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        clients.values().filter(|guard| guard.in_flight()).count()
    }
}

impl Ticket {
    /// `true` while no newer ticket has been issued.
    pub fn is_current(&self) -> bool {
        self.latest.load(Ordering::SeqCst) == self.id
    }
}

/// What the learner sees after a playground request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PlaygroundOutcome<T> {
    /// The service answered.
    Completed {
        /// Service response.
        result: T,
    },
    /// The request failed; `message` is ready to display.
    Failed {
        /// Learner-facing message.
        message: String,
        /// Whether trying again may help.
        retryable: bool,
    },
    /// A newer request was issued before this one finished.
    Superseded,
}

impl<T> PlaygroundOutcome<T> {
    /// `true` for `Completed`.
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Context the assistant gets about the editor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorContext {
    /// Current editor contents.
    #[serde(default)]
    pub code: String,
    /// Language slug.
    #[serde(default)]
    pub language: String,
    /// Output of the last run.
    #[serde(default)]
    pub last_output: Option<String>,
}

impl EditorContext {
    /// Formats the context sent as `systemContext`. `None` when empty.
    pub fn to_system_context(&self) -> Option<String> {
        if self.code.trim().is_empty() {
            return None;
        }
        let mut context = format!(
            "The learner is working in {} and has this code in the editor:\n```{}\n{}\n```",
            if self.language.is_empty() { "an unknown language" } else { &self.language },
            self.language,
            self.code.trim_end()
        );
        if let Some(output) = self.last_output.as_deref().filter(|o| !o.trim().is_empty()) {
            context.push_str("\nThe last run printed:\n```\n");
            context.push_str(output.trim_end());
            context.push_str("\n```");
        }
        Some(context)
    }
}

/// Playground front-end over the execution and chat services.
#[derive(Clone)]
pub struct Playground {
    executor: Arc<dyn CodeExecutor>,
    chat: Arc<dyn ChatService>,
    model: String,
    max_history: usize,
    runs: Arc<ClientRequests>,
    chats: Arc<ClientRequests>,
}

impl std::fmt::Debug for Playground {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Playground")
            .field("model", &self.model)
            .field("max_history", &self.max_history)
            .finish_non_exhaustive()
    }
}

impl Playground {
    /// Creates a playground over the given services.
    pub fn new(
        executor: Arc<dyn CodeExecutor>,
        chat: Arc<dyn ChatService>,
        model: impl Into<String>,
        max_history: usize,
    ) -> Self {
        Self {
            executor,
            chat,
            model: model.into(),
            max_history,
            runs: Arc::new(ClientRequests::new()),
            chats: Arc::new(ClientRequests::new()),
        }
    }

    /// Runs code for `client`. A run the same client starts later supersedes
    /// this one.
    pub async fn run(
        &self,
        client: &str,
        request: ExecutionRequest,
    ) -> PlaygroundOutcome<ExecutionResult> {
        let ticket = self.runs.issue(client);
        let result = self.executor.execute(&request).await;
        settle(&ticket, client, "run", result)
    }

    /// Asks the assistant for `client`. A message the same client sends later
    /// supersedes this one.
    pub async fn chat(
        &self,
        client: &str,
        history: &[ChatMessage],
        editor: &EditorContext,
    ) -> PlaygroundOutcome<ChatReply> {
        let ticket = self.chats.issue(client);
        let request = ChatRequest::recent(
            history,
            self.max_history,
            self.model.clone(),
            editor.to_system_context(),
        );
        let result = self.chat.send(&request).await;
        settle(&ticket, client, "chat", result)
    }
}

fn settle<T>(
    ticket: &Ticket,
    client: &str,
    what: &str,
    result: crate::Result<T>,
) -> PlaygroundOutcome<T> {
    if !ticket.is_current() {
        debug!(client, request = what, "Discarding superseded playground response");
        return PlaygroundOutcome::Superseded;
    }
    match result {
        Ok(result) => PlaygroundOutcome::Completed { result },
        Err(e) => {
            warn!(client, request = what, error = %e, "Playground request failed");
            PlaygroundOutcome::Failed {
                message: e.user_message(),
                retryable: e.is_transient(),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::error::{EngineError, ServiceErrorKind};

    /// Executor that echoes the code, optionally waiting to be released.
    struct EchoExecutor {
        gate: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl CodeExecutor for EchoExecutor {
        async fn execute(&self, request: &ExecutionRequest) -> crate::Result<ExecutionResult> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            Ok(ExecutionResult {
                success: true,
                output: request.code.clone(),
                error: None,
                stderr: None,
                execution_time: Some(1.0),
            })
        }
    }

    struct FailingChat(ServiceErrorKind);

    #[async_trait]
    impl ChatService for FailingChat {
        async fn send(&self, _request: &ChatRequest) -> crate::Result<ChatReply> {
            Err(EngineError::service("AI chat", self.0, "HTTP error"))
        }
    }

    fn run_request(code: &str) -> ExecutionRequest {
        ExecutionRequest {
            code: code.to_string(),
            language: "rust".to_string(),
            input: String::new(),
        }
    }

    #[test]
    fn test_latest_request_tickets() {
        let guard = LatestRequest::new();
        let first = guard.issue();
        assert!(first.is_current());
        let second = guard.issue();
        assert!(!first.is_current());
        assert!(second.is_current());
    }

    #[tokio::test]
    async fn test_run_completes() {
        let playground = Playground::new(
            Arc::new(EchoExecutor { gate: None }),
            Arc::new(FailingChat(ServiceErrorKind::Other)),
            "tutor",
            20,
        );
        let outcome = playground.run("s-1", run_request("print")).await;
        assert!(matches!(
            outcome,
            PlaygroundOutcome::Completed { ref result } if result.output == "print"
        ));
    }

    #[tokio::test]
    async fn test_stale_run_is_discarded() {
        let gate = Arc::new(Notify::new());
        let playground = Playground::new(
            Arc::new(EchoExecutor {
                gate: Some(Arc::clone(&gate)),
            }),
            Arc::new(FailingChat(ServiceErrorKind::Other)),
            "tutor",
            20,
        );

        let slow = {
            let playground = playground.clone();
            tokio::spawn(async move { playground.run("s-1", run_request("first")).await })
        };
        // Let the first run take its ticket before the second one starts
        tokio::time::sleep(Duration::from_millis(50)).await;
        let fast = {
            let playground = playground.clone();
            tokio::spawn(async move { playground.run("s-1", run_request("second")).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        gate.notify_waiters();

        assert_eq!(slow.await.unwrap(), PlaygroundOutcome::Superseded);
        assert!(fast.await.unwrap().is_completed());
    }

    #[tokio::test]
    async fn test_runs_from_different_clients_are_independent() {
        let gate = Arc::new(Notify::new());
        let playground = Playground::new(
            Arc::new(EchoExecutor {
                gate: Some(Arc::clone(&gate)),
            }),
            Arc::new(FailingChat(ServiceErrorKind::Other)),
            "tutor",
            20,
        );

        let first = {
            let playground = playground.clone();
            tokio::spawn(async move { playground.run("s-1", run_request("one")).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = {
            let playground = playground.clone();
            tokio::spawn(async move { playground.run("s-2", run_request("two")).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        gate.notify_waiters();

        assert!(first.await.unwrap().is_completed());
        assert!(second.await.unwrap().is_completed());
    }

    #[test]
    fn test_client_requests_drop_idle_clients() {
        let requests = ClientRequests::new();
        let ticket = requests.issue("s-1");
        assert_eq!(requests.active_clients(), 1);
        assert!(ticket.is_current());

        drop(ticket);
        assert_eq!(requests.active_clients(), 0);

        // A fresh ticket for another client prunes the idle entry
        let other = requests.issue("s-2");
        assert!(other.is_current());
        assert_eq!(requests.clients.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_chat_failure_becomes_message() {
        let playground = Playground::new(
            Arc::new(EchoExecutor { gate: None }),
            Arc::new(FailingChat(ServiceErrorKind::RateLimit)),
            "tutor",
            20,
        );
        let outcome = playground
            .chat("s-1", &[ChatMessage::user("help")], &EditorContext::default())
            .await;
        match outcome {
            PlaygroundOutcome::Failed { message, retryable } => {
                assert!(message.contains("Too many requests"));
                assert!(retryable);
            }
            other => unreachable!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_system_context() {
        assert!(EditorContext::default().to_system_context().is_none());

        let context = EditorContext {
            code: "fn main() {}\n".to_string(),
            language: "rust".to_string(),
            last_output: Some("hello\n".to_string()),
        }
        .to_system_context()
        .unwrap();
        assert!(context.contains("```rust\nfn main() {}\n```"));
        assert!(context.contains("The last run printed:\n```\nhello\n```"));
    }
}
