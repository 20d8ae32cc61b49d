//! services/api/src/web/resources.rs
//!
//! REST handlers for sharing and browsing resources.

use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use study_hub_core::{Resource, ResourceCategory, ResourceUpload};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::web::{port_error_response, state::AppState};

//=========================================================================================
// API Payloads
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct CreateResourceResponse {
    pub id: Uuid,
}

#[derive(Serialize, ToSchema)]
pub struct ResourceResponse {
    pub id: Uuid,
    pub file_name: String,
    pub file_url: String,
    pub file_type: String,
    pub subject: String,
    /// One of `Notes`, `PYQ`, `Syllabus`, `Links`.
    pub category: String,
    pub uploaded_by: Uuid,
    pub uploaded_by_name: String,
    pub description: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

impl From<Resource> for ResourceResponse {
    fn from(r: Resource) -> Self {
        Self {
            id: r.id,
            file_name: r.file_name,
            file_url: r.file_url,
            file_type: r.file_type,
            subject: r.subject,
            category: r.category.to_string(),
            uploaded_by: r.uploaded_by,
            uploaded_by_name: r.uploaded_by_name,
            description: r.description,
            uploaded_at: r.uploaded_at,
        }
    }
}

#[derive(Deserialize, IntoParams)]
pub struct ResourceQuery {
    pub subject: Option<String>,
    pub category: Option<String>,
}

#[derive(Default)]
struct ResourceForm {
    file: Option<(String, String, Bytes)>,
    title: Option<String>,
    subject: Option<String>,
    category: Option<String>,
    description: Option<String>,
}

fn bad_request(message: impl Into<String>) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, message.into())
}

async fn read_form(mut multipart: Multipart) -> Result<ResourceForm, (StatusCode, String)> {
    let mut form = ResourceForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Failed to read multipart data: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| bad_request(format!("Failed to read file bytes: {}", e)))?;
            form.file = Some((file_name, content_type, data));
            continue;
        }
        let value = field
            .text()
            .await
            .map_err(|e| bad_request(format!("Failed to read field '{}': {}", name, e)))?;
        match name.as_str() {
            "title" => form.title = Some(value),
            "subject" => form.subject = Some(value),
            "category" => form.category = Some(value),
            "description" => form.description = Some(value),
            _ => {}
        }
    }
    Ok(form)
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Share a file.
///
/// Accepts multipart/form-data with a `file` part and `title`, `subject`,
/// `category` and optional `description` text parts. The file is stored
/// first; the resource record is only written once the upload succeeded.
#[utoipa::path(
    post,
    path = "/resources",
    request_body(content_type = "multipart/form-data", description = "The file and its metadata."),
    responses(
        (status = 201, description = "Resource created", body = CreateResourceResponse),
        (status = 400, description = "Missing file, title, subject or category"),
        (status = 502, description = "Upload to storage failed")
    )
)]
pub async fn create_resource_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let form = read_form(multipart).await?;

    let (original_file_name, content_type, data) = form
        .file
        .ok_or_else(|| bad_request("Multipart form must include a file"))?;
    let category = form
        .category
        .ok_or_else(|| bad_request("category is required"))?
        .parse::<ResourceCategory>()
        .map_err(bad_request)?;

    let uploaded_by_name = state
        .users
        .get(user_id)
        .await
        .map_err(|e| port_error_response("Failed to load uploader profile", e))?
        .and_then(|p| p.display_name)
        .unwrap_or_else(|| "Anonymous".to_string());

    let upload = ResourceUpload {
        title: form.title.unwrap_or_default(),
        original_file_name,
        content_type,
        data,
        subject: form.subject.unwrap_or_default(),
        category,
        uploaded_by: user_id,
        uploaded_by_name,
        description: form.description,
    };
    let id = state
        .publisher
        .publish(upload)
        .await
        .map_err(|e| port_error_response("Failed to create resource", e))?;

    Ok((StatusCode::CREATED, Json(CreateResourceResponse { id })))
}

#[utoipa::path(
    get,
    path = "/resources",
    params(ResourceQuery),
    responses(
        (status = 200, description = "Resources, most recent first", body = [ResourceResponse]),
        (status = 400, description = "Unknown category")
    )
)]
pub async fn list_resources_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ResourceQuery>,
) -> Result<Json<Vec<ResourceResponse>>, (StatusCode, String)> {
    let category = query
        .category
        .map(|c| c.parse::<ResourceCategory>())
        .transpose()
        .map_err(bad_request)?;

    let resources = match (query.subject, category) {
        (Some(subject), category) => state.resources.list_by_subject(&subject).await.map(|rs| {
            rs.into_iter()
                .filter(|r| category.map_or(true, |c| r.category == c))
                .collect()
        }),
        (None, Some(category)) => state.resources.list_by_category(category).await,
        (None, None) => state.resources.list_all().await,
    }
    .map_err(|e| port_error_response("Failed to list resources", e))?;

    Ok(Json(resources.into_iter().map(ResourceResponse::from).collect()))
}
