//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, LocalObjectStore, OpenAiSolverAdapter},
    config::Config,
    error::ApiError,
    web::{router, AppState, Backends},
};
use async_openai::{config::OpenAIConfig, Client};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use study_hub_core::ports::{DoubtSolverService, SystemClock};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Storage & Model Adapters ---
    let object_store = LocalObjectStore::new(
        config.storage_root.clone(),
        config.public_base_url.clone(),
    )
    .await?;
    let files_dir = object_store.objects_dir().to_path_buf();

    let solver: Option<Arc<dyn DoubtSolverService>> = match &config.openai_api_key {
        Some(key) => {
            let client = Client::with_config(OpenAIConfig::new().with_api_key(key));
            Some(Arc::new(OpenAiSolverAdapter::new(
                client,
                config.solver_model.clone(),
            )))
        }
        None => {
            warn!("OPENAI_API_KEY is not set; the AI doubt solver is disabled.");
            None
        }
    };

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(
        config.clone(),
        Backends {
            auth: db_adapter.clone(),
            doubts: db_adapter.clone(),
            resources: db_adapter.clone(),
            users: db_adapter,
            objects: Arc::new(object_store),
            solver,
            clock: Arc::new(SystemClock),
            files_dir,
        },
    ));

    // --- 5. Start the Server ---
    let app = router(app_state);
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
