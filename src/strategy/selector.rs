use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, instrument, warn};

use super::prompt::{render_echo_prompt, render_regenerate_messages};
use super::types::{ScoreAttempt, ScoredCandidate, ScoringConfig, ScoringMode};
use crate::batch::{Candidate, PromptContext};
use crate::constants::{
    DEFAULT_REGENERATE_MAX_TOKENS, DEFAULT_REGENERATE_TEMPERATURE, PAYLOAD_LOG_PREVIEW_BYTES,
    REGENERATE_DIVERGED_NOTE,
};
use crate::scoring::{ScoringError, aggregate, normalize_completion, score_echo_payload};
use crate::upstream::{ChatRegenerateRequest, CompletionProvider, EchoCompletionRequest};

/// Chooses and runs the upstream scoring strategy for a candidate.
///
/// Echo mode is preferred; when the provider signals that echo is unavailable
/// for the model, the candidate is retried once in regenerate mode and the
/// substitution is reported through [`ScoreAttempt::mode_used`] and a note.
pub struct StrategySelector {
    provider: Arc<dyn CompletionProvider>,
    default_model: Option<String>,
}

impl std::fmt::Debug for StrategySelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategySelector")
            .field("default_model", &self.default_model)
            .finish_non_exhaustive()
    }
}

impl StrategySelector {
    pub fn new(provider: Arc<dyn CompletionProvider>, default_model: Option<String>) -> Self {
        Self {
            provider,
            default_model,
        }
    }

    pub fn default_model(&self) -> Option<&str> {
        self.default_model.as_deref()
    }

    /// The candidate's own model, else the configured default.
    pub fn resolve_model(&self, candidate: &Candidate) -> Option<String> {
        candidate
            .model_for_scoring
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .or(self.default_model.as_deref())
            .map(str::to_string)
    }

    pub fn build_echo_request(
        model: &str,
        ctx: &PromptContext,
        candidate: &Candidate,
        config: &ScoringConfig,
    ) -> EchoCompletionRequest {
        EchoCompletionRequest {
            model: model.to_string(),
            prompt: render_echo_prompt(ctx, &candidate.text),
            max_tokens: 0,
            echo: true,
            logprobs: config.top_logprobs.max(1),
            temperature: 0.0,
        }
    }

    pub fn build_regenerate_request(
        model: &str,
        ctx: &PromptContext,
        candidate: &Candidate,
        config: &ScoringConfig,
    ) -> ChatRegenerateRequest {
        ChatRegenerateRequest {
            model: model.to_string(),
            messages: render_regenerate_messages(ctx, &candidate.text),
            logprobs: true,
            top_logprobs: config.top_logprobs,
            temperature: config.temperature.unwrap_or(DEFAULT_REGENERATE_TEMPERATURE),
            max_tokens: config.max_tokens.unwrap_or(DEFAULT_REGENERATE_MAX_TOKENS),
        }
    }

    /// Scores one candidate. Never fails: errors are carried in the attempt.
    pub async fn score(
        &self,
        ctx: &PromptContext,
        candidate: &Candidate,
        config: &ScoringConfig,
    ) -> ScoreAttempt {
        self.score_tracked(ctx, candidate, config, &AtomicBool::new(false))
            .await
    }

    /// Like [`score`](Self::score), but sets `fell_back` as soon as the
    /// regenerate fallback starts, so a caller that abandons the future still
    /// knows which mode was in use.
    #[instrument(skip_all, fields(candidate = %candidate.id, mode = %config.mode))]
    pub async fn score_tracked(
        &self,
        ctx: &PromptContext,
        candidate: &Candidate,
        config: &ScoringConfig,
        fell_back: &AtomicBool,
    ) -> ScoreAttempt {
        let Some(model) = self.resolve_model(candidate) else {
            return ScoreAttempt {
                mode_used: config.mode,
                model: None,
                outcome: Err(ScoringError::Internal(
                    "no scoring model for candidate and no default model configured".to_string(),
                )),
            };
        };

        let attempt = match config.mode {
            ScoringMode::ChatRegenerate => ScoreAttempt {
                mode_used: ScoringMode::ChatRegenerate,
                outcome: self.score_regenerate(&model, ctx, candidate, config).await,
                model: Some(model),
            },
            ScoringMode::EchoCompletions => {
                match self.score_echo(&model, ctx, candidate, config).await {
                    Err(ScoringError::Upstream(e))
                        if config.allow_fallback && e.is_echo_unsupported() =>
                    {
                        warn!(
                            model = %model,
                            reason = %e,
                            "Echo unsupported, falling back to chat_regenerate"
                        );
                        fell_back.store(true, Ordering::SeqCst);
                        let outcome = self
                            .score_regenerate(&model, ctx, candidate, config)
                            .await
                            .map(with_fallback_note);
                        ScoreAttempt {
                            mode_used: ScoringMode::ChatRegenerate,
                            model: Some(model),
                            outcome,
                        }
                    }
                    outcome => ScoreAttempt {
                        mode_used: ScoringMode::EchoCompletions,
                        model: Some(model),
                        outcome,
                    },
                }
            }
        };

        if let Err(ScoringError::UpstreamShape { reason, payload }) = &attempt.outcome {
            warn!(
                reason = %reason,
                payload = %payload_preview(payload),
                "Unrecognized upstream logprob payload"
            );
        }

        attempt
    }

    async fn score_echo(
        &self,
        model: &str,
        ctx: &PromptContext,
        candidate: &Candidate,
        config: &ScoringConfig,
    ) -> Result<ScoredCandidate, ScoringError> {
        let request = Self::build_echo_request(model, ctx, candidate, config);
        let raw = self.provider.echo_completion(&request).await?;

        Ok(ScoredCandidate {
            metrics: score_echo_payload(&raw, &candidate.text)?,
            notes: None,
        })
    }

    async fn score_regenerate(
        &self,
        model: &str,
        ctx: &PromptContext,
        candidate: &Candidate,
        config: &ScoringConfig,
    ) -> Result<ScoredCandidate, ScoringError> {
        let request = Self::build_regenerate_request(model, ctx, candidate, config);
        let raw = self.provider.chat_completion(&request).await?;

        let completion = normalize_completion(&raw)?;
        let generated = completion
            .text
            .clone()
            .unwrap_or_else(|| completion.reconstructed_text());

        let notes = if generated.trim() != candidate.text.trim() {
            debug!(generated_len = generated.len(), "Regenerated text diverged");
            Some(REGENERATE_DIVERGED_NOTE.to_string())
        } else {
            None
        };

        Ok(ScoredCandidate {
            metrics: aggregate(&completion.tokens)?,
            notes,
        })
    }
}

fn with_fallback_note(mut scored: ScoredCandidate) -> ScoredCandidate {
    const FALLBACK_NOTE: &str = "fell back to chat_regenerate: echo unsupported for model";
    scored.notes = Some(match scored.notes.take() {
        Some(existing) => format!("{}; {}", FALLBACK_NOTE, existing),
        None => FALLBACK_NOTE.to_string(),
    });
    scored
}

fn payload_preview(payload: &serde_json::Value) -> String {
    let mut text = payload.to_string();
    if text.len() > PAYLOAD_LOG_PREVIEW_BYTES {
        let mut cut = PAYLOAD_LOG_PREVIEW_BYTES;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
        text.push_str("...");
    }
    text
}
