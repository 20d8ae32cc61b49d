//! services/api/src/web/solver.rs
//!
//! The AI doubt solver endpoint.

use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use study_hub_core::DoubtSolverInput;
use utoipa::ToSchema;

use crate::web::{port_error_response, state::AppState};

#[derive(Deserialize, ToSchema)]
pub struct SolveDoubtRequest {
    pub doubt_text: String,
    #[serde(default)]
    pub subject_material: String,
}

#[derive(Serialize, ToSchema)]
pub struct SolveDoubtResponse {
    pub suggestions: String,
}

#[utoipa::path(
    post,
    path = "/ai/doubt-solver",
    request_body = SolveDoubtRequest,
    responses(
        (status = 200, description = "Suggestions from the model", body = SolveDoubtResponse),
        (status = 400, description = "Empty doubt text"),
        (status = 503, description = "No model configured")
    )
)]
pub async fn solve_doubt_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SolveDoubtRequest>,
) -> Result<Json<SolveDoubtResponse>, (StatusCode, String)> {
    let solver = state.solver.as_ref().ok_or_else(|| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "The doubt solver is not configured".to_string(),
        )
    })?;

    let output = solver
        .suggest(DoubtSolverInput {
            doubt_text: req.doubt_text,
            subject_material: req.subject_material,
        })
        .await
        .map_err(|e| port_error_response("Doubt solver failed", e))?;

    Ok(Json(SolveDoubtResponse {
        suggestions: output.suggestions,
    }))
}
