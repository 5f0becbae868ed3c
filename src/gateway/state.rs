use std::sync::Arc;

use crate::batch::BatchOrchestrator;

#[derive(Debug, Clone)]
pub struct HandlerState {
    pub orchestrator: Arc<BatchOrchestrator>,

    pub max_candidates: usize,
}

impl HandlerState {
    pub fn new(orchestrator: Arc<BatchOrchestrator>, max_candidates: usize) -> Self {
        Self {
            orchestrator,
            max_candidates,
        }
    }
}
