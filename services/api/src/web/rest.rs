//! services/api/src/web/rest.rs
//!
//! The master definition of the OpenAPI specification for the REST API.

use utoipa::OpenApi;

use crate::web::{auth, doubts, profile, resources, solver};

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        profile::get_profile_handler,
        profile::create_profile_handler,
        profile::update_profile_handler,
        profile::upload_picture_handler,
        doubts::create_doubt_handler,
        doubts::list_doubts_handler,
        doubts::get_doubt_handler,
        doubts::update_doubt_handler,
        doubts::add_answer_handler,
        resources::create_resource_handler,
        resources::list_resources_handler,
        solver::solve_doubt_handler,
    ),
    components(
        schemas(
            auth::SignupRequest,
            auth::LoginRequest,
            auth::AuthResponse,
            profile::ProfileRequest,
            profile::ProfileResponse,
            profile::PictureResponse,
            doubts::CreateDoubtRequest,
            doubts::CreateDoubtResponse,
            doubts::DoubtResponse,
            doubts::AnswerResponse,
            doubts::UpdateDoubtRequest,
            doubts::AddAnswerRequest,
            resources::CreateResourceResponse,
            resources::ResourceResponse,
            solver::SolveDoubtRequest,
            solver::SolveDoubtResponse,
        )
    ),
    tags(
        (name = "JMI Study Hub API", description = "Notes, resources and peer-answered doubts.")
    )
)]
pub struct ApiDoc;
