//! services/api/src/web/profile.rs
//!
//! Profile setup and editing for the logged-in user.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use study_hub_core::{UserProfile, UserProfileUpdate};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::{port_error_response, state::AppState};

#[derive(Serialize, ToSchema)]
pub struct ProfileResponse {
    pub uid: Uuid,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub profile_picture_url: Option<String>,
    pub class: Option<String>,
    pub semester: Option<String>,
    pub karma_points: i64,
}

impl From<UserProfile> for ProfileResponse {
    fn from(p: UserProfile) -> Self {
        Self {
            uid: p.uid,
            display_name: p.display_name,
            email: p.email,
            profile_picture_url: p.profile_picture_url,
            class: p.class,
            semester: p.semester,
            karma_points: p.karma_points,
        }
    }
}

/// Profile fields a user may set. Karma is not client-writable.
#[derive(Deserialize, ToSchema)]
pub struct ProfileRequest {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub class: Option<String>,
    pub semester: Option<String>,
}

impl From<ProfileRequest> for UserProfileUpdate {
    fn from(req: ProfileRequest) -> Self {
        UserProfileUpdate {
            display_name: req.display_name,
            email: req.email,
            class: req.class,
            semester: req.semester,
            ..UserProfileUpdate::default()
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PictureResponse {
    pub profile_picture_url: String,
}

#[utoipa::path(
    get,
    path = "/profile",
    responses(
        (status = 200, description = "The caller's profile", body = ProfileResponse),
        (status = 404, description = "Profile not set up yet")
    )
)]
pub async fn get_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<ProfileResponse>, (StatusCode, String)> {
    let profile = state
        .users
        .get(user_id)
        .await
        .map_err(|e| port_error_response("Failed to load profile", e))?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Profile not set up yet".to_string()))?;
    Ok(Json(profile.into()))
}

#[utoipa::path(
    post,
    path = "/profile",
    request_body = ProfileRequest,
    responses(
        (status = 201, description = "Profile created", body = ProfileResponse)
    )
)]
pub async fn create_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<ProfileRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let profile = state
        .users
        .create(user_id, req.into())
        .await
        .map_err(|e| port_error_response("Failed to create profile", e))?;
    Ok((StatusCode::CREATED, Json(ProfileResponse::from(profile))))
}

#[utoipa::path(
    patch,
    path = "/profile",
    request_body = ProfileRequest,
    responses(
        (status = 204, description = "Profile updated"),
        (status = 404, description = "Profile not set up yet")
    )
)]
pub async fn update_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<ProfileRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .users
        .update(user_id, req.into())
        .await
        .map_err(|e| port_error_response("Failed to update profile", e))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Upload a new profile picture as the `file` part of a multipart form.
#[utoipa::path(
    post,
    path = "/profile/picture",
    request_body(content_type = "multipart/form-data", description = "The image to upload."),
    responses(
        (status = 200, description = "Picture stored", body = PictureResponse),
        (status = 400, description = "Missing file"),
        (status = 404, description = "Profile not set up yet"),
        (status = 502, description = "Upload to storage failed")
    )
)]
pub async fn upload_picture_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<PictureResponse>, (StatusCode, String)> {
    let mut file = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("Failed to read multipart data: {}", e),
        )
    })? {
        if field.name() == Some("file") {
            let name = field.file_name().unwrap_or("avatar").to_string();
            let data = field.bytes().await.map_err(|e| {
                (
                    StatusCode::BAD_REQUEST,
                    format!("Failed to read file bytes: {}", e),
                )
            })?;
            file = Some((name, data));
        }
    }
    let (name, data) = file.ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            "Multipart form must include a file".to_string(),
        )
    })?;

    if state
        .users
        .get(user_id)
        .await
        .map_err(|e| port_error_response("Failed to load profile", e))?
        .is_none()
    {
        return Err((StatusCode::NOT_FOUND, "Profile not set up yet".to_string()));
    }

    let url = state
        .users
        .set_profile_picture(&state.uploader, user_id, &name, data)
        .await
        .map_err(|e| port_error_response("Failed to store profile picture", e))?;
    Ok(Json(PictureResponse {
        profile_picture_url: url,
    }))
}
