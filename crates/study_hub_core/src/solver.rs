//! crates/study_hub_core/src/solver.rs
//!
//! Thin front for the hosted language model that suggests how to resolve a doubt.

use std::sync::Arc;

use tracing::info;

use crate::doubts::require_non_empty;
use crate::domain::{DoubtSolverInput, DoubtSolverOutput};
use crate::ports::{DoubtSolverService, PortResult};

#[derive(Clone)]
pub struct DoubtSolver {
    service: Arc<dyn DoubtSolverService>,
}

impl DoubtSolver {
    pub fn new(service: Arc<dyn DoubtSolverService>) -> Self {
        Self { service }
    }

    /// One request, one response. Failures are passed through untouched.
    pub async fn suggest(&self, input: DoubtSolverInput) -> PortResult<DoubtSolverOutput> {
        require_non_empty("doubt text", &input.doubt_text)?;
        let output = self.service.suggest(&input).await?;
        info!(
            doubt_chars = input.doubt_text.len(),
            suggestion_chars = output.suggestions.len(),
            "Doubt solver answered"
        );
        Ok(output)
    }
}
