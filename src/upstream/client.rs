use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error, warn};

use super::error::{RetryPolicy, UpstreamError};
use super::request::{ChatRegenerateRequest, EchoCompletionRequest};
use super::CompletionProvider;
use crate::config::UpstreamConfig;
use crate::constants::{CHAT_COMPLETIONS_PATH, COMPLETIONS_PATH, MAX_RETRY_DELAY_MS};

/// Statuses a provider uses when a model cannot serve echo/logprob requests.
const ECHO_UNSUPPORTED_STATUSES: [u16; 5] = [400, 404, 405, 422, 501];
const ECHO_FEATURE_MARKERS: [&str; 2] = ["echo", "logprobs"];
const UNSUPPORTED_PHRASES: [&str; 3] = ["not supported", "unsupported", "does not support"];

#[derive(Clone)]
/// OpenRouter (OpenAI-compatible) HTTP client with bounded retries.
pub struct OpenRouterClient {
    http: reqwest::Client,
    config: UpstreamConfig,
    retry: RetryPolicy,
}

impl std::fmt::Debug for OpenRouterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterClient")
            .field("config", &self.config)
            .field("retry", &self.retry)
            .finish()
    }
}

/// How a failed attempt should be handled.
#[derive(Debug)]
pub(crate) enum AttemptFailure {
    Retryable(String),
    Fatal(UpstreamError),
}

impl OpenRouterClient {
    /// Builds a client; retry policy comes from `config`.
    pub fn new(config: UpstreamConfig) -> Result<Self, UpstreamError> {
        let retry = RetryPolicy::new(
            config.max_retries,
            config.retry_base_delay,
            Duration::from_millis(MAX_RETRY_DELAY_MS),
        );
        Self::with_retry_policy(config, retry)
    }

    pub fn with_retry_policy(
        config: UpstreamConfig,
        retry: RetryPolicy,
    ) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| UpstreamError::Unavailable {
                attempts: 0,
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            http,
            config,
            retry,
        })
    }

    pub fn config(&self) -> &UpstreamConfig {
        &self.config
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    fn url(&self, path: &str) -> Result<String, UpstreamError> {
        if !path.starts_with('/') {
            return Err(UpstreamError::InvalidPath(path.to_string()));
        }
        Ok(format!("{}{}", self.config.base_url.trim_end_matches('/'), path))
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .post(url)
            .header("Content-Type", "application/json")
            .header("X-Title", &self.config.app_name);

        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }
        if let Some(app_url) = &self.config.app_url {
            builder = builder.header("HTTP-Referer", app_url);
        }

        builder
    }

    /// POSTs `body` to `path`, retrying transport errors, 429 and 5xx.
    ///
    /// `echo_model` is set for echo calls so 4xx "unsupported" answers can be
    /// told apart from ordinary rejections.
    async fn post_json<T: Serialize + Sync>(
        &self,
        path: &str,
        body: &T,
        echo_model: Option<&str>,
    ) -> Result<serde_json::Value, UpstreamError> {
        let url = self.url(path)?;
        let max_attempts = self.retry.max_attempts();
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            let failure = match self.request(&url).json(body).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    match resp.text().await {
                        Ok(text) if status.is_success() => {
                            return serde_json::from_str(&text)
                                .map_err(|e| UpstreamError::InvalidJson(e.to_string()));
                        }
                        Ok(text) => classify_failure(status, &text, echo_model),
                        Err(e) => AttemptFailure::Retryable(format!(
                            "failed to read response body: {}",
                            e
                        )),
                    }
                }
                Err(e) => AttemptFailure::Retryable(format!("request failed: {}", e)),
            };

            let message = match failure {
                AttemptFailure::Fatal(err) => return Err(err),
                AttemptFailure::Retryable(message) => message,
            };

            if attempt >= max_attempts {
                error!(path, attempts = attempt, %message, "Upstream retries exhausted");
                return Err(UpstreamError::Unavailable {
                    attempts: attempt,
                    message,
                });
            }

            let delay = self.retry.delay_for(attempt - 1);
            warn!(
                path,
                attempt,
                delay_ms = delay.as_millis() as u64,
                %message,
                "Retryable upstream failure"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

/// Sorts a non-2xx answer into retryable vs. terminal.
pub(crate) fn classify_failure(
    status: StatusCode,
    body: &str,
    echo_model: Option<&str>,
) -> AttemptFailure {
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        if let Some(model) = echo_model
            && status == StatusCode::NOT_IMPLEMENTED
            && mentions_echo_unsupported(body)
        {
            return AttemptFailure::Fatal(UpstreamError::EchoUnsupported {
                model: model.to_string(),
                message: body.trim().to_string(),
            });
        }
        return AttemptFailure::Retryable(format!("status {}: {}", status.as_u16(), body.trim()));
    }

    if let Some(model) = echo_model
        && ECHO_UNSUPPORTED_STATUSES.contains(&status.as_u16())
        && mentions_echo_unsupported(body)
    {
        debug!(model, status = status.as_u16(), "Provider reports echo unsupported");
        return AttemptFailure::Fatal(UpstreamError::EchoUnsupported {
            model: model.to_string(),
            message: body.trim().to_string(),
        });
    }

    AttemptFailure::Fatal(UpstreamError::Rejected {
        status: status.as_u16(),
        message: body.trim().to_string(),
    })
}

/// The body must name the echo feature and say it is unsupported; a bare
/// parameter complaint about `logprobs` is an ordinary rejection.
fn mentions_echo_unsupported(body: &str) -> bool {
    let lower = body.to_lowercase();
    ECHO_FEATURE_MARKERS.iter().any(|m| lower.contains(m))
        && UNSUPPORTED_PHRASES.iter().any(|p| lower.contains(p))
}

#[async_trait]
impl CompletionProvider for OpenRouterClient {
    async fn echo_completion(
        &self,
        request: &EchoCompletionRequest,
    ) -> Result<serde_json::Value, UpstreamError> {
        self.post_json(COMPLETIONS_PATH, request, Some(&request.model))
            .await
    }

    async fn chat_completion(
        &self,
        request: &ChatRegenerateRequest,
    ) -> Result<serde_json::Value, UpstreamError> {
        self.post_json(CHAT_COMPLETIONS_PATH, request, None).await
    }
}
