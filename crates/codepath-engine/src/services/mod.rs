//! Clients for the external services used by the code playground.
//!
//! Both services are plain JSON-over-HTTP with a client-side timeout. A
//! timeout or transport failure is reported as an [`EngineError`] and never
//! retried here; callers decide what to show the learner.

pub mod chat;
pub mod execution;

use std::time::Duration;

use tracing::warn;

use crate::error::{EngineError, ServiceErrorKind};

pub use chat::{ChatClient, ChatMessage, ChatReply, ChatRequest, ChatRole, ChatService};
pub use execution::{CodeExecutor, ExecutionClient, ExecutionRequest, ExecutionResult};

/// Longest response body quoted in an error message.
const MAX_ERROR_BODY: usize = 200;

/// Builds a reqwest client with the given overall request timeout.
pub(crate) fn build_client(
    service: &str,
    timeout: Duration,
) -> Result<reqwest::Client, EngineError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| EngineError::service(service, ServiceErrorKind::Other, e.to_string()))
}

/// Converts a transport-level reqwest failure.
pub(crate) fn map_transport_error(
    service: &str,
    timeout: Duration,
    err: &reqwest::Error,
) -> EngineError {
    if err.is_timeout() {
        warn!(service, timeout_secs = timeout.as_secs(), "Service request timed out");
        return EngineError::service_timeout(service, timeout.as_secs());
    }
    let kind = if err.is_decode() {
        ServiceErrorKind::Other
    } else {
        ServiceErrorKind::Network
    };
    warn!(service, error = %err, %kind, "Service request failed");
    EngineError::service(service, kind, err.to_string())
}

/// Turns a non-success response into a classified service error.
pub(crate) async fn status_error(service: &str, response: reqwest::Response) -> EngineError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let kind = ServiceErrorKind::from_status(status.as_u16());
    warn!(service, status = status.as_u16(), %kind, "Service returned an error status");
    EngineError::service(
        service,
        kind,
        format!("HTTP {}: {}", status.as_u16(), truncate(body.trim(), MAX_ERROR_BODY)),
    )
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 4), "abcd...");
    }
}
