//! Code execution service client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{build_client, map_transport_error, status_error};
use crate::config::ExecutionConfig;
use crate::error::{EngineError, Result, ServiceErrorKind};

const SERVICE: &str = "code execution";

/// Code to run, as sent to the execution service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    /// Source code.
    pub code: String,
    /// Language slug (e.g. `rust`).
    pub language: String,
    /// Standard input.
    #[serde(default)]
    pub input: String,
}

/// Outcome of a run, as reported by the execution service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    /// Whether the program ran and exited cleanly.
    pub success: bool,
    /// Standard output.
    #[serde(default)]
    pub output: String,
    /// Compile or runtime error summary.
    #[serde(default)]
    pub error: Option<String>,
    /// Standard error.
    #[serde(default)]
    pub stderr: Option<String>,
    /// Wall time in milliseconds.
    #[serde(default)]
    pub execution_time: Option<f64>,
}

/// Something that runs learner code.
#[async_trait]
pub trait CodeExecutor: Send + Sync {
    /// Runs the request and returns what the program produced.
    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult>;
}

/// HTTP client for the execution service.
#[derive(Debug, Clone)]
pub struct ExecutionClient {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl ExecutionClient {
    /// Creates a client from configuration.
    pub fn new(config: &ExecutionConfig) -> Result<Self> {
        Self::with_timeout(&config.url, Duration::from_secs(config.timeout_seconds))
    }

    /// Creates a client for `url` with an explicit timeout.
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(SERVICE, timeout)?,
            url: url.into(),
            timeout,
        })
    }

    /// Endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CodeExecutor for ExecutionClient {
    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult> {
        if request.code.trim().is_empty() {
            return Err(EngineError::service(
                SERVICE,
                ServiceErrorKind::Other,
                "Nothing to run: the editor is empty",
            ));
        }

        debug!(language = %request.language, bytes = request.code.len(), "Submitting code");
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| map_transport_error(SERVICE, self.timeout, &e))?;

        if !response.status().is_success() {
            return Err(status_error(SERVICE, response).await);
        }

        let result: ExecutionResult = response
            .json()
            .await
            .map_err(|e| map_transport_error(SERVICE, self.timeout, &e))?;
        info!(
            language = %request.language,
            success = result.success,
            execution_time_ms = result.execution_time,
            "Code executed"
        );
        Ok(result)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
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
        format!("http://{addr}/execute")
    }

    fn request(code: &str) -> ExecutionRequest {
        ExecutionRequest {
            code: code.to_string(),
            language: "rust".to_string(),
            input: String::new(),
        }
    }

    #[tokio::test]
    async fn test_execute_success() {
        let url = serve(Router::new().route(
            "/execute",
            post(|Json(req): Json<ExecutionRequest>| async move {
                Json(serde_json::json!({
                    "success": true,
                    "output": format!("ran {}", req.language),
                    "executionTime": 12.5
                }))
            }),
        ))
        .await;

        let client = ExecutionClient::with_timeout(url, Duration::from_secs(5)).unwrap();
        let result = client.execute(&request("fn main() {}")).await.unwrap();
        assert!(result.success);
        assert_eq!(result.output, "ran rust");
        assert_eq!(result.execution_time, Some(12.5));
        assert!(result.stderr.is_none());
    }

    #[tokio::test]
    async fn test_execute_server_error() {
        let url = serve(Router::new().route(
            "/execute",
            post(|| async { (StatusCode::BAD_GATEWAY, "sandbox down") }),
        ))
        .await;

        let client = ExecutionClient::with_timeout(url, Duration::from_secs(5)).unwrap();
        let err = client.execute(&request("fn main() {}")).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::ServiceError { kind: ServiceErrorKind::Server, .. }
        ));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_execute_timeout() {
        let url = serve(Router::new().route(
            "/execute",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        ))
        .await;

        let client = ExecutionClient::with_timeout(url, Duration::from_secs(1)).unwrap();
        let err = client.execute(&request("loop {}")).await.unwrap_err();
        assert!(matches!(err, EngineError::ServiceTimeout { timeout_secs: 1, .. }));
    }

    #[tokio::test]
    async fn test_empty_code_is_rejected_locally() {
        let client =
            ExecutionClient::with_timeout("http://127.0.0.1:9/execute", Duration::from_secs(1))
                .unwrap();
        assert!(client.execute(&request("   ")).await.is_err());
    }
}
