//! HTTP client helpers for tests.

use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(DEFAULT_TIMEOUT_SECS);

pub struct TestClient {
    client: reqwest::Client,
    base_url: String,
}

/// Decoded `/score` answer plus the response headers tests care about.
#[derive(Debug)]
pub struct ScoreReply {
    pub body: ScoreResponse,
    pub status_header: String,
    pub request_id: Option<String>,
}

impl TestClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("{}/{}", self.base_url, path)
    }

    pub async fn score(&self, request: &serde_json::Value) -> Result<ScoreReply, TestClientError> {
        self.score_at("/score", request).await
    }

    pub async fn score_at(
        &self,
        path: &str,
        request: &serde_json::Value,
    ) -> Result<ScoreReply, TestClientError> {
        let resp = self.client.post(self.url(path)).json(request).send().await?;

        let header = |name: &str| {
            resp.headers()
                .get(name)
                .and_then(|h| h.to_str().ok())
                .map(str::to_string)
        };
        let status_header = header("x-seqscore-status").unwrap_or_else(|| "unknown".to_string());
        let request_id = header("x-request-id");

        match resp.status().as_u16() {
            200 => Ok(ScoreReply {
                body: resp.json().await?,
                status_header,
                request_id,
            }),
            400 | 422 => Err(TestClientError::BadRequest(resp.text().await?)),
            status => {
                let body = resp.text().await.unwrap_or_default();
                Err(TestClientError::UnexpectedStatus(status, body))
            }
        }
    }

    pub async fn health(&self) -> Result<HealthResponse, TestClientError> {
        let resp = self.client.get(self.url("/health")).send().await?;

        if resp.status().is_success() {
            Ok(resp.json().await?)
        } else {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            Err(TestClientError::UnexpectedStatus(status, body))
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScoreResponse {
    pub results: Vec<ResultBody>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResultBody {
    pub id: String,
    pub sequence_logprob: Option<f64>,
    pub sequence_probability: Option<f64>,
    pub avg_logprob: Option<f64>,
    pub token_count: Option<usize>,
    pub mode_used: String,
    pub model: Option<String>,
    pub tokenizer: Option<String>,
    pub notes: Option<String>,
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TestClientError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Unexpected HTTP status: {0} - Body: {1}")]
    UnexpectedStatus(u16, String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}
