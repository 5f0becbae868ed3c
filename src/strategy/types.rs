use serde::{Deserialize, Serialize};

use crate::scoring::{ScoringError, SequenceMetrics};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    /// Score the candidate as an echoed continuation of the prompt (exact).
    #[default]
    EchoCompletions,
    /// Ask the model to repeat the candidate and score its output (approximate).
    ChatRegenerate,
}

impl ScoringMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoringMode::EchoCompletions => "echo_completions",
            ScoringMode::ChatRegenerate => "chat_regenerate",
        }
    }
}

impl std::fmt::Display for ScoringMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_allow_fallback() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// The `scoring` block of a request.
///
/// `temperature` and `max_tokens` only affect regenerate mode; echo calls
/// always use `max_tokens = 0` and `temperature = 0`.
pub struct ScoringConfig {
    #[serde(default)]
    pub mode: ScoringMode,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Retry in regenerate mode when the provider refuses echo.
    #[serde(default = "default_allow_fallback")]
    pub allow_fallback: bool,
    /// Filled from the request's `return_top_logprobs`.
    #[serde(skip)]
    pub top_logprobs: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            mode: ScoringMode::default(),
            temperature: None,
            max_tokens: None,
            allow_fallback: default_allow_fallback(),
            top_logprobs: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Successful scoring of one candidate.
pub struct ScoredCandidate {
    pub metrics: SequenceMetrics,
    pub notes: Option<String>,
}

#[derive(Debug)]
/// What the selector did for one candidate, successful or not.
pub struct ScoreAttempt {
    /// Mode that produced `outcome` (differs from the request after fallback).
    pub mode_used: ScoringMode,
    /// Model the upstream calls used, if one could be resolved.
    pub model: Option<String>,
    pub outcome: Result<ScoredCandidate, ScoringError>,
}
