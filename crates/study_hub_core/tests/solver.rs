use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use study_hub_core::solver::DoubtSolver;
use study_hub_core::{
    DoubtSolverInput, DoubtSolverOutput, DoubtSolverService, PortError, PortResult,
};

struct EchoSolver {
    calls: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl DoubtSolverService for EchoSolver {
    async fn suggest(&self, input: &DoubtSolverInput) -> PortResult<DoubtSolverOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(PortError::Backend("model unavailable".to_string()));
        }
        Ok(DoubtSolverOutput {
            suggestions: format!("Revisit {} for: {}", input.subject_material, input.doubt_text),
        })
    }
}

fn solver(fail: bool) -> (DoubtSolver, Arc<EchoSolver>) {
    let service = Arc::new(EchoSolver {
        calls: AtomicUsize::new(0),
        fail,
    });
    (DoubtSolver::new(service.clone()), service)
}

#[tokio::test]
async fn passes_input_through_to_the_model() {
    let (solver, _) = solver(false);

    let output = solver
        .suggest(DoubtSolverInput {
            doubt_text: "Why is the sky blue?".to_string(),
            subject_material: "Rayleigh scattering".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(
        output.suggestions,
        "Revisit Rayleigh scattering for: Why is the sky blue?"
    );
}

#[tokio::test]
async fn empty_doubt_never_reaches_the_model() {
    let (solver, service) = solver(false);

    let err = solver
        .suggest(DoubtSolverInput {
            doubt_text: " ".to_string(),
            subject_material: String::new(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, PortError::Validation(_)));
    assert_eq!(service.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn model_failure_is_not_retried() {
    let (solver, service) = solver(true);

    let err = solver
        .suggest(DoubtSolverInput {
            doubt_text: "q".to_string(),
            subject_material: String::new(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, PortError::Backend(_)));
    assert_eq!(service.calls.load(Ordering::SeqCst), 1);
}
