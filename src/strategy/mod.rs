//! Scoring strategy selection and upstream request construction.

pub mod prompt;
pub mod selector;
pub mod types;


pub use prompt::{render_echo_prompt, render_regenerate_messages};
pub use selector::StrategySelector;
pub use types::{ScoreAttempt, ScoredCandidate, ScoringConfig, ScoringMode};
