use serde::Serialize;

#[derive(Debug, Clone, PartialEq)]
/// One alternative the provider considered at a token position.
pub struct TopAlternative {
    /// Alternative token text.
    pub token: String,
    /// Its natural-log probability (≤ 0).
    pub logprob: f64,
}

#[derive(Debug, Clone, PartialEq)]
/// Canonical per-token record, independent of the upstream payload shape.
pub struct TokenRecord {
    /// Token text exactly as returned by the provider.
    pub token: String,
    /// Natural-log probability (≤ 0). `None` when the provider has no
    /// conditional probability for the position (the first echoed token).
    pub logprob: Option<f64>,
    /// Alternatives ordered by descending logprob, ties by token text.
    pub top_alternatives: Vec<TopAlternative>,
}

impl TokenRecord {
    pub fn new(token: impl Into<String>, logprob: Option<f64>) -> Self {
        Self {
            token: token.into(),
            logprob,
            top_alternatives: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Which upstream payload shape a completion was parsed from.
pub enum PayloadShape {
    /// Parallel `tokens` / `token_logprobs` / `top_logprobs` arrays.
    FlatArrays,
    /// `content: [{token, logprob, top_logprobs}]`.
    StructuredContent,
}

#[derive(Debug, Clone, PartialEq)]
/// First choice of a provider response after normalization.
pub struct NormalizedCompletion {
    /// Echoed/generated text, when the provider included it.
    pub text: Option<String>,
    /// Token records in provider order.
    pub tokens: Vec<TokenRecord>,
    /// Shape the logprobs were parsed from.
    pub shape: PayloadShape,
}

impl NormalizedCompletion {
    /// Concatenation of all token texts.
    pub fn reconstructed_text(&self) -> String {
        self.tokens.iter().map(|t| t.token.as_str()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
/// Probability metrics over an answer segment.
///
/// `sequence_probability == exp(sequence_logprob)` and
/// `avg_logprob == sequence_logprob / token_count`; see [`SequenceMetrics::from_sum`].
pub struct SequenceMetrics {
    pub sequence_logprob: f64,
    pub sequence_probability: f64,
    pub avg_logprob: f64,
    pub token_count: usize,
}

impl SequenceMetrics {
    /// Derives the metrics from a logprob sum over `token_count > 0` tokens.
    pub(crate) fn from_sum(sequence_logprob: f64, token_count: usize) -> Self {
        debug_assert!(token_count > 0);
        Self {
            sequence_logprob,
            sequence_probability: probability_from_logprob(sequence_logprob),
            avg_logprob: sequence_logprob / token_count as f64,
            token_count,
        }
    }
}

/// `exp(logprob)`; underflows to exactly `0.0` for very negative sums.
pub fn probability_from_logprob(logprob: f64) -> f64 {
    let p = logprob.exp();
    if p.is_nan() { 0.0 } else { p.min(1.0) }
}
