//! Cross-cutting, shared constants.
//!
//! Limits that appear both in request validation and in upstream request
//! construction live here so the two never drift.

/// Default upstream base URL (OpenRouter's OpenAI-compatible API).
pub const DEFAULT_UPSTREAM_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Path of the legacy text-completion endpoint used for echo scoring.
pub const COMPLETIONS_PATH: &str = "/completions";

/// Path of the chat-completion endpoint used for regenerate scoring.
pub const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

/// Application name sent upstream as `X-Title`.
pub const DEFAULT_APP_NAME: &str = "sequence_scorer";

/// Upper bound accepted for `return_top_logprobs`.
pub const MAX_TOP_LOGPROBS: u32 = 20;

/// Default `max_tokens` for regenerate mode.
pub const DEFAULT_REGENERATE_MAX_TOKENS: u32 = 1024;

/// Default sampling temperature for regenerate mode.
pub const DEFAULT_REGENERATE_TEMPERATURE: f32 = 0.0;

/// Instruction prefixed to the candidate in regenerate mode.
pub const REGENERATE_INSTRUCTION: &str = "Repeat exactly the following text:\n\n";

/// Note attached to regenerate results whose output differs from the candidate.
pub const REGENERATE_DIVERGED_NOTE: &str = "approximate: regenerated text diverged";

pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 250;
pub const MAX_RETRY_DELAY_MS: u64 = 8_000;

pub const DEFAULT_MAX_CONCURRENCY: usize = 8;
pub const DEFAULT_REQUEST_DEADLINE_SECS: u64 = 120;
pub const DEFAULT_MAX_CANDIDATES: usize = 64;

/// Upper bound accepted for `SEQSCORE_MAX_CONCURRENCY`.
pub const MAX_CONCURRENCY_LIMIT: usize = 1024;
/// Upper bound accepted for `SEQSCORE_REQUEST_DEADLINE_SECS` (one hour).
pub const MAX_REQUEST_DEADLINE_SECS: u64 = 3600;

/// Maximum bytes of a raw upstream payload included in log lines.
pub const PAYLOAD_LOG_PREVIEW_BYTES: usize = 512;
