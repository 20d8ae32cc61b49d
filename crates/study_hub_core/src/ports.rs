//! crates/study_hub_core/src/ports.rs
//!
//! Defines the service contracts (traits) the study hub core depends on.
//! These traits form the boundary of the hexagonal architecture: the managed
//! document database, the object store, the clock and the hosted language
//! model all sit behind them, so the repositories can be exercised against
//! in-memory fakes.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    Doubt, DoubtFilter, DoubtSolverInput, DoubtSolverOutput, DoubtUpdate, NewDoubt, NewResource,
    Resource, ResourceFilter, User, UserCredentials, UserProfile, UserProfileUpdate,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// The error type shared by every repository, uploader and port operation.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// A required field was empty or missing. Raised before any I/O happens.
    #[error("Validation failed: {0}")]
    Validation(String),
    /// The referenced record does not exist.
    #[error("Item not found: {0}")]
    NotFound(String),
    /// Moving bytes to the object store failed. The upload must be restarted.
    #[error("Transfer failed: {0}")]
    Transfer(String),
    /// Any other fault surfaced by the backing store.
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Document Store Ports
//=========================================================================================

/// The `doubts` collection.
#[async_trait]
pub trait DoubtStore: Send + Sync {
    /// Persists a new doubt and returns the identifier the store assigned.
    async fn insert_doubt(&self, doubt: NewDoubt) -> PortResult<Uuid>;

    async fn get_doubt(&self, id: Uuid) -> PortResult<Option<Doubt>>;

    /// Returns the matching doubts ordered by `timestamp`, most recent first.
    async fn query_doubts(&self, filter: DoubtFilter) -> PortResult<Vec<Doubt>>;

    /// Field-level partial write. Fails with `NotFound` if `id` is unknown.
    async fn update_doubt(&self, id: Uuid, update: DoubtUpdate) -> PortResult<()>;
}

/// The `resources` collection.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn insert_resource(&self, resource: NewResource) -> PortResult<Uuid>;

    /// Returns the matching resources ordered by `uploaded_at`, most recent first.
    async fn query_resources(&self, filter: ResourceFilter) -> PortResult<Vec<Resource>>;
}

/// The `users` collection.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user_profile(&self, uid: Uuid) -> PortResult<Option<UserProfile>>;

    /// Writes the whole profile document, replacing any previous one.
    async fn put_user_profile(&self, profile: UserProfile) -> PortResult<()>;

    /// Fails with `NotFound` if no profile exists for `uid`.
    async fn update_user_profile(&self, uid: Uuid, update: UserProfileUpdate) -> PortResult<()>;
}

/// Accounts and browser login sessions.
#[async_trait]
pub trait AuthStore: Send + Sync {
    async fn create_user_with_email(&self, email: &str, hashed_password: &str)
        -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Returns the owner of a live session, or `Unauthorized`.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;
}

//=========================================================================================
// Object Store Port
//=========================================================================================

/// Handle of an in-flight resumable upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumableUpload {
    pub session_id: String,
    pub path: String,
    pub total_bytes: u64,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// One-shot blob write at `path`, replacing anything already there.
    async fn put(&self, path: &str, data: Bytes) -> PortResult<()>;

    async fn start_resumable(&self, path: &str, total_bytes: u64) -> PortResult<ResumableUpload>;

    async fn put_chunk(&self, upload: &ResumableUpload, offset: u64, chunk: Bytes)
        -> PortResult<()>;

    /// Commits the uploaded bytes to `upload.path`.
    async fn finish_resumable(&self, upload: &ResumableUpload) -> PortResult<()>;

    /// Drops the staged bytes of an upload that will not be finished.
    /// Aborting a session that no longer exists is not an error.
    async fn abort_resumable(&self, upload: &ResumableUpload) -> PortResult<()>;

    /// Generates the retrievable address of a stored blob.
    async fn download_url(&self, path: &str) -> PortResult<String>;
}

//=========================================================================================
// Clock
//=========================================================================================

/// Source of "server time" for creation timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

//=========================================================================================
// Language Model Port
//=========================================================================================

#[async_trait]
pub trait DoubtSolverService: Send + Sync {
    /// Suggests how a student might resolve a doubt. Single shot, never retried.
    async fn suggest(&self, input: &DoubtSolverInput) -> PortResult<DoubtSolverOutput>;
}
