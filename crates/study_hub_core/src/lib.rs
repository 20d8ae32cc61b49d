pub mod domain;
pub mod doubts;
pub mod memory;
pub mod ports;
pub mod resources;
pub mod solver;
pub mod storage;
pub mod users;

pub use domain::{
    Answer, Doubt, DoubtFilter, DoubtSolverInput, DoubtSolverOutput, DoubtStatus, DoubtUpdate,
    NewDoubt, NewResource, Resource, ResourceCategory, ResourceFilter, ResourceMetadata, User,
    UserCredentials, UserProfile, UserProfileUpdate,
};
pub use doubts::DoubtRepository;
pub use ports::{
    AuthStore, Clock, DoubtSolverService, DoubtStore, ObjectStore, PortError, PortResult,
    ResourceStore, ResumableUpload, SystemClock, UserStore,
};
pub use resources::{ResourcePublisher, ResourceRepository, ResourceUpload};
pub use solver::DoubtSolver;
pub use storage::{await_completion, upload_path, StorageUploader, UploadEvent, UploadStream};
pub use users::UserRepository;
