//! Token logprob normalization, answer-segment detection and aggregation.
//!
//! The pipeline for one provider response is synchronous and pure:
//!
//! ```text
//! raw JSON ──normalize_completion──▶ [TokenRecord]
//!          ──find_answer_start────▶ answer segment (echo mode only)
//!          ──aggregate────────────▶ SequenceMetrics
//! ```
//!
//! In regenerate mode every emitted token is part of the answer, so the
//! boundary step is skipped.

pub mod aggregator;
pub mod boundary;
pub mod error;
pub mod normalizer;
pub mod types;

#[cfg(test)]
mod tests;

pub use aggregator::aggregate;
pub use boundary::find_answer_start;
pub use error::{ScoringError, ScoringErrorKind};
pub use normalizer::{normalize_completion, normalize_logprobs};
pub use types::{
    NormalizedCompletion, PayloadShape, SequenceMetrics, TokenRecord, TopAlternative,
    probability_from_logprob,
};

/// Scores an echoed prompt whose final text is `candidate`.
pub fn score_echo_payload(
    raw: &serde_json::Value,
    candidate: &str,
) -> Result<SequenceMetrics, ScoringError> {
    let completion = normalize_completion(raw)?;
    let start = find_answer_start(&completion.tokens, candidate)?;
    tracing::debug!(
        total_tokens = completion.tokens.len(),
        answer_start = start,
        "Echo answer segment located"
    );
    aggregate(&completion.tokens[start..])
}
