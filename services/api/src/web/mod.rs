pub mod auth;
pub mod doubts;
pub mod middleware;
pub mod profile;
pub mod resources;
pub mod rest;
pub mod solver;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method, StatusCode,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use study_hub_core::PortError;
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::{error, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use middleware::require_auth;
pub use rest::ApiDoc;
pub use state::{AppState, Backends};

/// Builds the complete HTTP application around the shared state.
pub fn router(app_state: Arc<AppState>) -> Router {
    let mut cors = CorsLayer::new()
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);
    match HeaderValue::from_str(&app_state.config.cors_origin) {
        Ok(origin) => cors = cors.allow_origin(origin),
        Err(_) => warn!("Ignoring invalid CORS origin '{}'", app_state.config.cors_origin),
    }

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route(
            "/profile",
            get(profile::get_profile_handler)
                .post(profile::create_profile_handler)
                .patch(profile::update_profile_handler),
        )
        .route("/profile/picture", post(profile::upload_picture_handler))
        .route(
            "/doubts",
            get(doubts::list_doubts_handler).post(doubts::create_doubt_handler),
        )
        .route(
            "/doubts/{id}",
            get(doubts::get_doubt_handler).patch(doubts::update_doubt_handler),
        )
        .route("/doubts/{id}/answers", post(doubts::add_answer_handler))
        .route(
            "/resources",
            get(resources::list_resources_handler).post(resources::create_resource_handler),
        )
        .route("/ai/doubt-solver", post(solver::solve_doubt_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service("/files", ServeDir::new(&app_state.files_dir))
        .layer(DefaultBodyLimit::max(app_state.config.max_upload_bytes))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

/// Maps a core error onto the HTTP status and message returned to the client.
/// Backend details are logged but not echoed back.
pub(crate) fn port_error_response(context: &str, e: PortError) -> (StatusCode, String) {
    let status = match &e {
        PortError::Validation(_) => StatusCode::BAD_REQUEST,
        PortError::NotFound(_) => StatusCode::NOT_FOUND,
        PortError::Unauthorized => StatusCode::UNAUTHORIZED,
        PortError::Transfer(_) => StatusCode::BAD_GATEWAY,
        PortError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!("{}: {:?}", context, e);
    } else {
        warn!("{}: {}", context, e);
    }
    let message = match e {
        PortError::Backend(_) => context.to_string(),
        other => other.to_string(),
    };
    (status, message)
}
