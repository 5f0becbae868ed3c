//! Scripted in-process provider for tests.
//!
//! [`MockProvider::new`] behaves like a tiny deterministic language model:
//! echo calls return the prompt split into whitespace-led word tokens in the
//! flat-array shape, chat calls reproduce the text after the regenerate
//! instruction in the structured-content shape. Either side can be replaced
//! with a closure to script failures.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::error::UpstreamError;
use super::request::{ChatRegenerateRequest, EchoCompletionRequest};
use super::CompletionProvider;
use crate::batch::Role;
use crate::constants::REGENERATE_INSTRUCTION;

type EchoHandler =
    Arc<dyn Fn(&EchoCompletionRequest) -> Result<Value, UpstreamError> + Send + Sync>;
type ChatHandler =
    Arc<dyn Fn(&ChatRegenerateRequest) -> Result<Value, UpstreamError> + Send + Sync>;

#[derive(Clone)]
pub struct MockProvider {
    echo: EchoHandler,
    chat: ChatHandler,
    delay: Option<Duration>,
    echo_calls: Arc<AtomicUsize>,
    chat_calls: Arc<AtomicUsize>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            echo: Arc::new(|req| Ok(flat_echo_response(&req.model, &req.prompt, req.logprobs))),
            chat: Arc::new(|req| {
                let content = regenerated_text(req);
                Ok(structured_chat_response(
                    &req.model,
                    &content,
                    req.top_logprobs,
                ))
            }),
            delay: None,
            echo_calls: Arc::new(AtomicUsize::new(0)),
            chat_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_echo<F>(mut self, handler: F) -> Self
    where
        F: Fn(&EchoCompletionRequest) -> Result<Value, UpstreamError> + Send + Sync + 'static,
    {
        self.echo = Arc::new(handler);
        self
    }

    pub fn with_chat<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ChatRegenerateRequest) -> Result<Value, UpstreamError> + Send + Sync + 'static,
    {
        self.chat = Arc::new(handler);
        self
    }

    /// Every call sleeps for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Echo calls for any model fail with [`UpstreamError::EchoUnsupported`].
    pub fn without_echo_support(self) -> Self {
        self.with_echo(|req| {
            Err(UpstreamError::EchoUnsupported {
                model: req.model.clone(),
                message: "echo is not supported for this model".to_string(),
            })
        })
    }

    pub fn echo_calls(&self) -> usize {
        self.echo_calls.load(Ordering::SeqCst)
    }

    pub fn chat_calls(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    async fn echo_completion(
        &self,
        request: &EchoCompletionRequest,
    ) -> Result<Value, UpstreamError> {
        self.echo_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        (self.echo)(request)
    }

    async fn chat_completion(
        &self,
        request: &ChatRegenerateRequest,
    ) -> Result<Value, UpstreamError> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        (self.chat)(request)
    }
}

/// Splits text into tokens that each start with their leading whitespace.
///
/// `"a b\nc"` becomes `["a", " b", "\nc"]`; concatenating the tokens always
/// reproduces the input.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut prev_was_space = false;

    for ch in text.chars() {
        let is_space = ch.is_whitespace();
        if is_space && !prev_was_space && !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
        current.push(ch);
        prev_was_space = is_space;
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

/// Deterministic, strictly negative logprob for a token.
pub fn token_logprob(token: &str) -> f64 {
    -(0.1 + 0.01 * token.chars().count() as f64)
}

/// Flat-array echo response: first token has a `null` logprob.
pub fn flat_echo_response(model: &str, prompt: &str, top: u32) -> Value {
    let tokens = tokenize(prompt);
    let token_logprobs: Vec<Value> = tokens
        .iter()
        .enumerate()
        .map(|(i, t)| {
            if i == 0 {
                Value::Null
            } else {
                json!(token_logprob(t))
            }
        })
        .collect();
    let top_logprobs: Vec<Value> = tokens
        .iter()
        .enumerate()
        .map(|(i, t)| {
            if i == 0 || top == 0 {
                Value::Null
            } else {
                let mut alternatives = serde_json::Map::new();
                alternatives.insert(t.clone(), json!(token_logprob(t)));
                if top > 1 {
                    alternatives.insert("<alt>".to_string(), json!(token_logprob(t) - 1.0));
                }
                Value::Object(alternatives)
            }
        })
        .collect();

    json!({
        "id": "cmpl-mock",
        "object": "text_completion",
        "model": model,
        "choices": [{
            "index": 0,
            "text": prompt,
            "finish_reason": "length",
            "logprobs": {
                "tokens": tokens,
                "token_logprobs": token_logprobs,
                "top_logprobs": top_logprobs,
            }
        }]
    })
}

/// Structured-content chat response for `content`.
pub fn structured_chat_response(model: &str, content: &str, top: u32) -> Value {
    let items: Vec<Value> = tokenize(content)
        .into_iter()
        .map(|t| {
            let logprob = token_logprob(&t);
            let mut alternatives = Vec::new();
            if top > 0 {
                alternatives.push(json!({"token": t, "logprob": logprob}));
            }
            if top > 1 {
                alternatives.push(json!({"token": "<alt>", "logprob": logprob - 1.0}));
            }
            json!({"token": t, "logprob": logprob, "top_logprobs": alternatives})
        })
        .collect();

    json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "model": model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop",
            "logprobs": {"content": items}
        }]
    })
}

fn regenerated_text(request: &ChatRegenerateRequest) -> String {
    request
        .messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .and_then(|m| m.content.strip_prefix(REGENERATE_INSTRUCTION))
        .unwrap_or("I cannot repeat that.")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_round_trips_text() {
        let text = "<|user|>\nWhat is the capital?\n\n<|assistant|>\nParis.";
        let tokens = tokenize(text);

        assert_eq!(tokens.concat(), text);
        assert_eq!(tokens.last().map(String::as_str), Some("\nParis."));
        assert_eq!(tokens[0], "<|user|>");
    }

    #[test]
    fn test_tokenize_empty_and_whitespace() {
        assert!(tokenize("").is_empty());
        assert_eq!(tokenize("  "), vec!["  ".to_string()]);
        assert_eq!(tokenize("a "), vec!["a".to_string(), " ".to_string()]);
    }

    #[tokio::test]
    async fn test_default_provider_counts_calls() {
        let provider = MockProvider::new();
        let request = EchoCompletionRequest {
            model: "m".to_string(),
            prompt: "hello world".to_string(),
            max_tokens: 0,
            echo: true,
            logprobs: 1,
            temperature: 0.0,
        };

        let body = provider.echo_completion(&request).await.unwrap();

        assert_eq!(provider.echo_calls(), 1);
        assert_eq!(provider.chat_calls(), 0);
        assert_eq!(
            body["choices"][0]["logprobs"]["tokens"],
            json!(["hello", " world"])
        );
        assert!(body["choices"][0]["logprobs"]["token_logprobs"][0].is_null());
    }
}
