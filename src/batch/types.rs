use serde::{Deserialize, Serialize};

use crate::scoring::{ScoringError, ScoringErrorKind, SequenceMetrics};
use crate::strategy::{ScoringConfig, ScoringMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Chat message role.
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// Conversation shared read-only by every candidate in a request.
pub struct PromptContext {
    #[serde(default)]
    pub system: Option<String>,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// One response to score.
pub struct Candidate {
    /// Unique within a request.
    pub id: String,
    pub text: String,
    /// Overrides the server's default model.
    #[serde(default)]
    pub model_for_scoring: Option<String>,
    /// Free-form tokenizer label, echoed back in the result.
    #[serde(default)]
    pub tokenizer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Body of `POST /score`.
pub struct ScoreRequest {
    pub prompt_context: PromptContext,
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub return_top_logprobs: u32,
    #[serde(default)]
    pub scoring: ScoringConfig,
}

impl ScoreRequest {
    /// Scoring settings with `return_top_logprobs` folded in.
    pub fn scoring_config(&self) -> ScoringConfig {
        ScoringConfig {
            top_logprobs: self.return_top_logprobs,
            ..self.scoring.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateError {
    pub kind: ScoringErrorKind,
    pub message: String,
}

impl From<&ScoringError> for CandidateError {
    fn from(err: &ScoringError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Outcome for one candidate. Carries either metrics or an error, never both.
pub struct CandidateResult {
    pub id: String,
    #[serde(flatten)]
    pub metrics: Option<SequenceMetrics>,
    pub mode_used: ScoringMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokenizer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CandidateError>,
}

impl CandidateResult {
    pub fn scored(
        candidate: &Candidate,
        metrics: SequenceMetrics,
        mode_used: ScoringMode,
        model: String,
        notes: Option<String>,
    ) -> Self {
        Self {
            id: candidate.id.clone(),
            metrics: Some(metrics),
            mode_used,
            model: Some(model),
            tokenizer: candidate.tokenizer.clone(),
            notes,
            error: None,
        }
    }

    pub fn failed(
        candidate: &Candidate,
        mode_used: ScoringMode,
        model: Option<String>,
        error: &ScoringError,
    ) -> Self {
        Self {
            id: candidate.id.clone(),
            metrics: None,
            mode_used,
            model,
            tokenizer: candidate.tokenizer.clone(),
            notes: None,
            error: Some(CandidateError::from(error)),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
/// One result per input candidate, in input order.
pub struct BatchResult {
    pub results: Vec<CandidateResult>,
}

impl BatchResult {
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.is_success()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.failed_count() == 0
    }
}
