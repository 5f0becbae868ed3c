//! Sequence scoring library crate (used by the server and integration tests).
//!
//! Scores how likely a language model is to produce each of several candidate
//! responses to a prompt, by asking an upstream completion API for token
//! log-probabilities and summing them over the candidate's tokens.
//!
//! # Public API Surface
//!
//! ## Core Types
//! - [`Config`], [`ConfigError`] - Server configuration
//! - [`ScoreRequest`], [`BatchResult`], [`CandidateResult`] - Wire model
//! - [`SequenceMetrics`], [`TokenRecord`] - Scoring output and input
//!
//! ## Pipeline
//! - [`normalize_completion`] - Either provider logprob shape to [`TokenRecord`]s
//! - [`find_answer_start`] - Locate the candidate inside an echoed prompt
//! - [`aggregate`] - Sum/average logprobs over a segment
//! - [`StrategySelector`] - Echo scoring with regenerate fallback
//! - [`BatchOrchestrator`] - Bounded, deadline-aware fan-out per request
//!
//! ## Upstream
//! - [`CompletionProvider`] - Provider boundary
//! - [`OpenRouterClient`] - reqwest implementation with retry/backoff
//!
//! ## Test/Mock Support
//! Mock implementations are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod batch;
pub mod config;
pub mod constants;
pub mod gateway;
pub mod scoring;
pub mod strategy;
pub mod upstream;

pub use batch::{
    BatchOrchestrator, BatchResult, Candidate, CandidateError, CandidateResult, Message,
    PromptContext, Role, ScoreRequest,
};
pub use config::{Config, ConfigError, UpstreamConfig};
pub use scoring::{
    NormalizedCompletion, PayloadShape, ScoringError, ScoringErrorKind, SequenceMetrics,
    TokenRecord, TopAlternative, aggregate, find_answer_start, normalize_completion,
    normalize_logprobs, score_echo_payload,
};
pub use strategy::{ScoreAttempt, ScoringConfig, ScoringMode, StrategySelector};
#[cfg(any(test, feature = "mock"))]
pub use upstream::MockProvider;
pub use upstream::{CompletionProvider, OpenRouterClient, RetryPolicy, UpstreamError};
