//! Request/result types and the concurrent batch orchestrator.

pub mod orchestrator;
pub mod types;


pub use orchestrator::BatchOrchestrator;
pub use types::{
    BatchResult, Candidate, CandidateError, CandidateResult, Message, PromptContext, Role,
    ScoreRequest,
};
