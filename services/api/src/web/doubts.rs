//! services/api/src/web/doubts.rs
//!
//! REST handlers over the doubt repository.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use study_hub_core::{Doubt, DoubtStatus, DoubtUpdate};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::web::{port_error_response, state::AppState};

//=========================================================================================
// API Payloads
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct CreateDoubtRequest {
    pub question_text: String,
    pub subject: String,
}

#[derive(Serialize, ToSchema)]
pub struct CreateDoubtResponse {
    pub id: Uuid,
}

#[derive(Serialize, ToSchema)]
pub struct AnswerResponse {
    pub answer_text: String,
    pub answered_by: Uuid,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, ToSchema)]
pub struct DoubtResponse {
    pub id: Uuid,
    pub question_text: String,
    pub subject: String,
    pub asked_by: Uuid,
    /// `pending` or `resolved`.
    pub status: String,
    pub answers: Vec<AnswerResponse>,
    pub timestamp: DateTime<Utc>,
}

impl From<Doubt> for DoubtResponse {
    fn from(d: Doubt) -> Self {
        Self {
            id: d.id,
            question_text: d.question_text,
            subject: d.subject,
            asked_by: d.asked_by,
            status: d.status.to_string(),
            answers: d
                .answers
                .into_iter()
                .map(|a| AnswerResponse {
                    answer_text: a.answer_text,
                    answered_by: a.answered_by,
                    timestamp: a.timestamp,
                })
                .collect(),
            timestamp: d.timestamp,
        }
    }
}

/// Filters for listing doubts. At most one is applied, in the order
/// `mine`, `asked_by`, `subject`; with none, every doubt is returned.
#[derive(Deserialize, IntoParams)]
pub struct DoubtQuery {
    pub subject: Option<String>,
    pub asked_by: Option<Uuid>,
    pub mine: Option<bool>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateDoubtRequest {
    pub question_text: Option<String>,
    pub subject: Option<String>,
    pub status: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct AddAnswerRequest {
    pub answer_text: String,
}

//=========================================================================================
// Handlers
//=========================================================================================

#[utoipa::path(
    post,
    path = "/doubts",
    request_body = CreateDoubtRequest,
    responses(
        (status = 201, description = "Doubt created", body = CreateDoubtResponse),
        (status = 400, description = "Empty question or subject"),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn create_doubt_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<CreateDoubtRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let id = state
        .doubts
        .create(&req.question_text, &req.subject, user_id)
        .await
        .map_err(|e| port_error_response("Failed to create doubt", e))?;
    Ok((StatusCode::CREATED, Json(CreateDoubtResponse { id })))
}

#[utoipa::path(
    get,
    path = "/doubts",
    params(DoubtQuery),
    responses(
        (status = 200, description = "Doubts, most recent first", body = [DoubtResponse]),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn list_doubts_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Query(query): Query<DoubtQuery>,
) -> Result<Json<Vec<DoubtResponse>>, (StatusCode, String)> {
    let doubts = if query.mine.unwrap_or(false) {
        state.doubts.list_by_asker(user_id).await
    } else if let Some(asked_by) = query.asked_by {
        state.doubts.list_by_asker(asked_by).await
    } else if let Some(subject) = query.subject {
        state.doubts.list_by_subject(&subject).await
    } else {
        state.doubts.list_all().await
    }
    .map_err(|e| port_error_response("Failed to list doubts", e))?;

    Ok(Json(doubts.into_iter().map(DoubtResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/doubts/{id}",
    params(("id" = Uuid, Path, description = "Doubt id")),
    responses(
        (status = 200, description = "The doubt", body = DoubtResponse),
        (status = 404, description = "No such doubt")
    )
)]
pub async fn get_doubt_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DoubtResponse>, (StatusCode, String)> {
    let doubt = state
        .doubts
        .get_by_id(id)
        .await
        .map_err(|e| port_error_response("Failed to load doubt", e))?
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Doubt {} not found", id)))?;
    Ok(Json(doubt.into()))
}

/// Only the asker may edit a doubt.
#[utoipa::path(
    patch,
    path = "/doubts/{id}",
    params(("id" = Uuid, Path, description = "Doubt id")),
    request_body = UpdateDoubtRequest,
    responses(
        (status = 204, description = "Doubt updated"),
        (status = 400, description = "Invalid field value"),
        (status = 403, description = "Caller did not ask this doubt"),
        (status = 404, description = "No such doubt")
    )
)]
pub async fn update_doubt_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateDoubtRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    let status = req
        .status
        .map(|s| s.parse::<DoubtStatus>())
        .transpose()
        .map_err(|e| (StatusCode::BAD_REQUEST, e))?;

    let doubt = state
        .doubts
        .get_by_id(id)
        .await
        .map_err(|e| port_error_response("Failed to load doubt", e))?
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Doubt {} not found", id)))?;
    if doubt.asked_by != user_id {
        return Err((
            StatusCode::FORBIDDEN,
            "Only the asker can edit this doubt".to_string(),
        ));
    }

    let update = DoubtUpdate {
        question_text: req.question_text,
        subject: req.subject,
        status,
        answers: None,
    };
    state
        .doubts
        .update(id, update)
        .await
        .map_err(|e| port_error_response("Failed to update doubt", e))?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/doubts/{id}/answers",
    params(("id" = Uuid, Path, description = "Doubt id")),
    request_body = AddAnswerRequest,
    responses(
        (status = 201, description = "Answer appended"),
        (status = 400, description = "Empty answer"),
        (status = 404, description = "No such doubt")
    )
)]
pub async fn add_answer_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
    Json(req): Json<AddAnswerRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .doubts
        .append_answer(id, &req.answer_text, user_id)
        .await
        .map_err(|e| port_error_response("Failed to add answer", e))?;
    Ok(StatusCode::CREATED)
}
