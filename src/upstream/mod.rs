//! Upstream completion provider boundary.
//!
//! The scoring core only sees [`CompletionProvider`]: it hands over a typed
//! request and gets back the provider's raw JSON body. Parsing that body is the
//! normalizer's job (see [`crate::scoring::normalizer`]), so providers never
//! interpret logprob payloads.

pub mod client;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod request;

use async_trait::async_trait;

pub use client::OpenRouterClient;
pub use error::{RetryPolicy, UpstreamError};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockProvider;
pub use request::{ChatMessage, ChatRegenerateRequest, EchoCompletionRequest};

#[async_trait]
/// A text/chat completion API that can return token logprobs.
pub trait CompletionProvider: Send + Sync {
    /// Issues an echo+logprobs completion and returns the raw response body.
    async fn echo_completion(
        &self,
        request: &EchoCompletionRequest,
    ) -> Result<serde_json::Value, UpstreamError>;

    /// Issues a chat completion with logprobs and returns the raw response body.
    async fn chat_completion(
        &self,
        request: &ChatRegenerateRequest,
    ) -> Result<serde_json::Value, UpstreamError>;
}
