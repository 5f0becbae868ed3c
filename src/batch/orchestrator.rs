use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{error, info, instrument, warn};

use super::types::{BatchResult, Candidate, CandidateResult, ScoreRequest};
use crate::config::Config;
use crate::scoring::ScoringError;
use crate::strategy::{ScoreAttempt, ScoringMode, StrategySelector};

/// Fans a request's candidates out to the selector under a concurrency cap
/// and a shared deadline.
///
/// A failing, panicking or late candidate only affects its own result slot;
/// the batch always yields exactly one result per input candidate, in input
/// order.
#[derive(Debug, Clone)]
pub struct BatchOrchestrator {
    selector: Arc<StrategySelector>,
    max_concurrency: usize,
    deadline: Duration,
}

impl BatchOrchestrator {
    pub fn new(selector: Arc<StrategySelector>, max_concurrency: usize, deadline: Duration) -> Self {
        Self {
            selector,
            max_concurrency: max_concurrency.clamp(1, Semaphore::MAX_PERMITS),
            deadline,
        }
    }

    pub fn from_config(selector: Arc<StrategySelector>, config: &Config) -> Self {
        Self::new(selector, config.max_concurrency, config.request_deadline)
    }

    pub fn selector(&self) -> &StrategySelector {
        &self.selector
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    #[instrument(skip_all, fields(candidates = request.candidates.len()))]
    pub async fn score_batch(&self, request: ScoreRequest) -> BatchResult {
        let config = Arc::new(request.scoring_config());
        let ctx = Arc::new(request.prompt_context);
        let candidates = request.candidates;
        let deadline_at = Instant::now().checked_add(self.deadline);

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let fell_back: Arc<Vec<AtomicBool>> =
            Arc::new(candidates.iter().map(|_| AtomicBool::new(false)).collect());
        let mut tasks = JoinSet::new();

        for (index, candidate) in candidates.iter().cloned().enumerate() {
            let selector = Arc::clone(&self.selector);
            let semaphore = Arc::clone(&semaphore);
            let ctx = Arc::clone(&ctx);
            let config = Arc::clone(&config);
            let fell_back = Arc::clone(&fell_back);

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let scoring = selector.score_tracked(&ctx, &candidate, &config, &fell_back[index]);
                let attempt = AssertUnwindSafe(scoring)
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| ScoreAttempt {
                        mode_used: mode_in_use(&fell_back[index], config.mode),
                        model: None,
                        outcome: Err(ScoringError::Internal(panic_message(&*panic))),
                    });
                (index, attempt)
            });
        }

        let mut slots: Vec<Option<ScoreAttempt>> = (0..candidates.len()).map(|_| None).collect();
        let collect = async {
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((index, attempt)) => slots[index] = Some(attempt),
                    Err(e) => error!(error = %e, "Scoring task failed to join"),
                }
            }
        };
        // A deadline past the clock's range means no deadline.
        let timed_out = match deadline_at {
            Some(at) => tokio::time::timeout_at(at, collect).await.is_err(),
            None => {
                collect.await;
                false
            }
        };

        if timed_out {
            warn!(
                deadline_ms = self.deadline.as_millis() as u64,
                pending = tasks.len(),
                "Request deadline exceeded, cancelling pending candidates"
            );
            tasks.abort_all();
        }

        let results: Vec<CandidateResult> = candidates
            .iter()
            .zip(slots)
            .enumerate()
            .map(|(index, (candidate, slot))| match slot {
                Some(attempt) => into_result(candidate, attempt),
                None if timed_out => CandidateResult::failed(
                    candidate,
                    mode_in_use(&fell_back[index], config.mode),
                    self.selector.resolve_model(candidate),
                    &ScoringError::Timeout {
                        deadline: self.deadline,
                    },
                ),
                None => CandidateResult::failed(
                    candidate,
                    config.mode,
                    self.selector.resolve_model(candidate),
                    &ScoringError::Internal("scoring task produced no result".to_string()),
                ),
            })
            .collect();

        let batch = BatchResult { results };
        info!(
            total = batch.results.len(),
            failed = batch.failed_count(),
            "Batch scored"
        );
        batch
    }
}

fn mode_in_use(fell_back: &AtomicBool, requested: ScoringMode) -> ScoringMode {
    if fell_back.load(Ordering::SeqCst) {
        ScoringMode::ChatRegenerate
    } else {
        requested
    }
}

fn into_result(candidate: &Candidate, attempt: ScoreAttempt) -> CandidateResult {
    match (attempt.outcome, attempt.model) {
        (Ok(scored), Some(model)) => CandidateResult::scored(
            candidate,
            scored.metrics,
            attempt.mode_used,
            model,
            scored.notes,
        ),
        (Ok(_), None) => CandidateResult::failed(
            candidate,
            attempt.mode_used,
            None,
            &ScoringError::Internal("scored without a resolved model".to_string()),
        ),
        (Err(e), model) => {
            warn!(candidate = %candidate.id, kind = %e.kind(), error = %e, "Candidate scoring failed");
            CandidateResult::failed(candidate, attempt.mode_used, model, &e)
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    error!(detail = %detail, "Scoring task panicked");
    format!("scoring task panicked: {}", detail)
}
