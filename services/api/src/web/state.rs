//! services/api/src/web/state.rs
//!
//! Defines the application state shared by every handler.

use crate::config::Config;
use std::path::PathBuf;
use std::sync::Arc;
use study_hub_core::ports::{
    AuthStore, Clock, DoubtSolverService, DoubtStore, ObjectStore, ResourceStore, UserStore,
};
use study_hub_core::{
    DoubtRepository, DoubtSolver, ResourcePublisher, ResourceRepository, StorageUploader,
    UserRepository,
};

/// The backend handles, initialized once at startup and injected here.
pub struct Backends {
    pub auth: Arc<dyn AuthStore>,
    pub doubts: Arc<dyn DoubtStore>,
    pub resources: Arc<dyn ResourceStore>,
    pub users: Arc<dyn UserStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub solver: Option<Arc<dyn DoubtSolverService>>,
    pub clock: Arc<dyn Clock>,
    /// Directory served under `/files`.
    pub files_dir: PathBuf,
}

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub auth: Arc<dyn AuthStore>,
    pub doubts: DoubtRepository,
    pub resources: ResourceRepository,
    pub publisher: ResourcePublisher,
    pub users: UserRepository,
    pub uploader: StorageUploader,
    pub solver: Option<DoubtSolver>,
    pub files_dir: PathBuf,
}

impl AppState {
    pub fn new(config: Arc<Config>, backends: Backends) -> Self {
        let uploader =
            StorageUploader::new(backends.objects).with_chunk_size(config.upload_chunk_size);
        let resources = ResourceRepository::new(backends.resources, backends.clock.clone());
        let publisher =
            ResourcePublisher::new(uploader.clone(), resources.clone(), backends.clock.clone());

        Self {
            auth: backends.auth,
            doubts: DoubtRepository::new(backends.doubts, backends.clock.clone()),
            resources,
            publisher,
            users: UserRepository::new(backends.users, backends.clock),
            uploader,
            solver: backends.solver.map(DoubtSolver::new),
            files_dir: backends.files_dir,
            config,
        }
    }
}
