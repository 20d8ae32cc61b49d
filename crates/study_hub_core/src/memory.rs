//! crates/study_hub_core/src/memory.rs
//!
//! In-memory implementations of the ports. They stand in for the managed
//! database and object store in tests and local experiments.
//!
//! Every operation yields to the runtime once before touching state, which
//! models the network round trip of the real backends: two concurrent
//! callers interleave exactly where they would against a remote store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::domain::{
    Doubt, DoubtFilter, DoubtUpdate, NewDoubt, NewResource, Resource, ResourceFilter, User,
    UserCredentials, UserProfile, UserProfileUpdate,
};
use crate::ports::{
    AuthStore, Clock, DoubtStore, ObjectStore, PortError, PortResult, ResourceStore,
    ResumableUpload, UserStore,
};

fn lock_poisoned<T>(_: T) -> PortError {
    PortError::Backend("in-memory store lock poisoned".to_string())
}

//=========================================================================================
// Document store
//=========================================================================================

#[derive(Default)]
struct Collections {
    doubts: HashMap<Uuid, Doubt>,
    resources: HashMap<Uuid, Resource>,
    users: HashMap<Uuid, UserProfile>,
    accounts: HashMap<String, UserCredentials>,
    auth_sessions: HashMap<String, (Uuid, DateTime<Utc>)>,
}

/// Implements every collection port over a set of hash maps.
#[derive(Default)]
pub struct InMemoryStore {
    collections: Mutex<Collections>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn with<R>(&self, f: impl FnOnce(&mut Collections) -> PortResult<R>) -> PortResult<R> {
        tokio::task::yield_now().await;
        let mut collections = self.collections.lock().map_err(lock_poisoned)?;
        f(&mut collections)
    }
}

#[async_trait]
impl DoubtStore for InMemoryStore {
    async fn insert_doubt(&self, doubt: NewDoubt) -> PortResult<Uuid> {
        self.with(|c| {
            let id = Uuid::new_v4();
            c.doubts.insert(
                id,
                Doubt {
                    id,
                    question_text: doubt.question_text,
                    subject: doubt.subject,
                    asked_by: doubt.asked_by,
                    status: doubt.status,
                    answers: doubt.answers,
                    timestamp: doubt.timestamp,
                },
            );
            Ok(id)
        })
        .await
    }

    async fn get_doubt(&self, id: Uuid) -> PortResult<Option<Doubt>> {
        self.with(|c| Ok(c.doubts.get(&id).cloned())).await
    }

    async fn query_doubts(&self, filter: DoubtFilter) -> PortResult<Vec<Doubt>> {
        self.with(|c| {
            let mut doubts: Vec<Doubt> = c
                .doubts
                .values()
                .filter(|d| match &filter {
                    DoubtFilter::All => true,
                    DoubtFilter::Subject(subject) => &d.subject == subject,
                    DoubtFilter::AskedBy(asked_by) => &d.asked_by == asked_by,
                })
                .cloned()
                .collect();
            doubts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
            Ok(doubts)
        })
        .await
    }

    async fn update_doubt(&self, id: Uuid, update: DoubtUpdate) -> PortResult<()> {
        self.with(|c| {
            let doubt = c
                .doubts
                .get_mut(&id)
                .ok_or_else(|| PortError::NotFound(format!("Doubt {} not found", id)))?;
            if let Some(question_text) = update.question_text {
                doubt.question_text = question_text;
            }
            if let Some(subject) = update.subject {
                doubt.subject = subject;
            }
            if let Some(status) = update.status {
                doubt.status = status;
            }
            if let Some(answers) = update.answers {
                doubt.answers = answers;
            }
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl ResourceStore for InMemoryStore {
    async fn insert_resource(&self, resource: NewResource) -> PortResult<Uuid> {
        self.with(|c| {
            let id = Uuid::new_v4();
            let m = resource.metadata;
            c.resources.insert(
                id,
                Resource {
                    id,
                    file_name: m.file_name,
                    file_url: m.file_url,
                    file_type: m.file_type,
                    subject: m.subject,
                    category: m.category,
                    uploaded_by: m.uploaded_by,
                    uploaded_by_name: m.uploaded_by_name,
                    description: m.description,
                    uploaded_at: resource.uploaded_at,
                },
            );
            Ok(id)
        })
        .await
    }

    async fn query_resources(&self, filter: ResourceFilter) -> PortResult<Vec<Resource>> {
        self.with(|c| {
            let mut resources: Vec<Resource> = c
                .resources
                .values()
                .filter(|r| match &filter {
                    ResourceFilter::All => true,
                    ResourceFilter::Subject(subject) => &r.subject == subject,
                    ResourceFilter::Category(category) => &r.category == category,
                })
                .cloned()
                .collect();
            resources.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
            Ok(resources)
        })
        .await
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn get_user_profile(&self, uid: Uuid) -> PortResult<Option<UserProfile>> {
        self.with(|c| Ok(c.users.get(&uid).cloned())).await
    }

    async fn put_user_profile(&self, profile: UserProfile) -> PortResult<()> {
        self.with(|c| {
            c.users.insert(profile.uid, profile);
            Ok(())
        })
        .await
    }

    async fn update_user_profile(&self, uid: Uuid, update: UserProfileUpdate) -> PortResult<()> {
        self.with(|c| {
            let profile = c
                .users
                .get_mut(&uid)
                .ok_or_else(|| PortError::NotFound(format!("User {} not found", uid)))?;
            if update.display_name.is_some() {
                profile.display_name = update.display_name;
            }
            if update.email.is_some() {
                profile.email = update.email;
            }
            if update.profile_picture_url.is_some() {
                profile.profile_picture_url = update.profile_picture_url;
            }
            if update.class.is_some() {
                profile.class = update.class;
            }
            if update.semester.is_some() {
                profile.semester = update.semester;
            }
            if let Some(karma) = update.karma_points {
                profile.karma_points = karma;
            }
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl AuthStore for InMemoryStore {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        self.with(|c| {
            if c.accounts.contains_key(email) {
                return Err(PortError::Validation(format!(
                    "email {} is already registered",
                    email
                )));
            }
            let user_id = Uuid::new_v4();
            c.accounts.insert(
                email.to_string(),
                UserCredentials {
                    user_id,
                    email: email.to_string(),
                    hashed_password: hashed_password.to_string(),
                },
            );
            Ok(User {
                user_id,
                email: email.to_string(),
            })
        })
        .await
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.with(|c| {
            c.accounts
                .get(email)
                .cloned()
                .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))
        })
        .await
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.with(|c| {
            c.auth_sessions
                .insert(session_id.to_string(), (user_id, expires_at));
            Ok(())
        })
        .await
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        self.with(|c| match c.auth_sessions.get(session_id) {
            Some((user_id, expires_at)) if *expires_at > Utc::now() => Ok(*user_id),
            _ => Err(PortError::Unauthorized),
        })
        .await
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.with(|c| {
            c.auth_sessions.remove(session_id);
            Ok(())
        })
        .await
    }
}

//=========================================================================================
// Object store
//=========================================================================================

#[derive(Default)]
struct Blobs {
    objects: HashMap<String, Bytes>,
    pending: HashMap<String, (String, Vec<u8>)>,
}

/// Blob store over a hash map, with optional fault injection.
pub struct InMemoryObjectStore {
    base_url: String,
    blobs: Mutex<Blobs>,
    fail_after_chunks: Option<usize>,
    chunks_written: AtomicUsize,
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self {
            base_url: "memory://bucket".to_string(),
            blobs: Mutex::new(Blobs::default()),
            fail_after_chunks: None,
            chunks_written: AtomicUsize::new(0),
        }
    }

    /// Every write fails, as if the network were down.
    pub fn unreachable() -> Self {
        Self::failing_after_chunks(0)
    }

    /// Accepts `n` chunks (and any number of one-shot puts when `n > 0`),
    /// then fails every further write.
    pub fn failing_after_chunks(n: usize) -> Self {
        Self {
            fail_after_chunks: Some(n),
            ..Self::new()
        }
    }

    pub fn get(&self, path: &str) -> Option<Bytes> {
        self.blobs.lock().ok()?.objects.get(path).cloned()
    }

    pub fn object_count(&self) -> usize {
        self.blobs.lock().map(|b| b.objects.len()).unwrap_or(0)
    }

    /// Resumable sessions started but neither finished nor aborted.
    pub fn pending_count(&self) -> usize {
        self.blobs.lock().map(|b| b.pending.len()).unwrap_or(0)
    }

    fn check_write(&self) -> PortResult<()> {
        match self.fail_after_chunks {
            Some(0) => Err(PortError::Transfer("network unavailable".to_string())),
            Some(limit) if self.chunks_written.load(Ordering::SeqCst) >= limit => {
                Err(PortError::Transfer("connection reset".to_string()))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(&self, path: &str, data: Bytes) -> PortResult<()> {
        tokio::task::yield_now().await;
        self.check_write()?;
        let mut blobs = self.blobs.lock().map_err(lock_poisoned)?;
        blobs.objects.insert(path.to_string(), data);
        Ok(())
    }

    async fn start_resumable(&self, path: &str, total_bytes: u64) -> PortResult<ResumableUpload> {
        tokio::task::yield_now().await;
        self.check_write()?;
        let session_id = Uuid::new_v4().to_string();
        let mut blobs = self.blobs.lock().map_err(lock_poisoned)?;
        blobs.pending.insert(
            session_id.clone(),
            (path.to_string(), Vec::with_capacity(total_bytes as usize)),
        );
        Ok(ResumableUpload {
            session_id,
            path: path.to_string(),
            total_bytes,
        })
    }

    async fn put_chunk(
        &self,
        upload: &ResumableUpload,
        offset: u64,
        chunk: Bytes,
    ) -> PortResult<()> {
        tokio::task::yield_now().await;
        self.check_write()?;
        let mut blobs = self.blobs.lock().map_err(lock_poisoned)?;
        let (_, buffer) = blobs
            .pending
            .get_mut(&upload.session_id)
            .ok_or_else(|| PortError::Transfer("unknown upload session".to_string()))?;
        if buffer.len() as u64 != offset {
            return Err(PortError::Transfer(format!(
                "chunk offset {} does not match {} bytes received",
                offset,
                buffer.len()
            )));
        }
        buffer.extend_from_slice(&chunk);
        self.chunks_written.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn finish_resumable(&self, upload: &ResumableUpload) -> PortResult<()> {
        tokio::task::yield_now().await;
        let mut blobs = self.blobs.lock().map_err(lock_poisoned)?;
        let (path, buffer) = blobs
            .pending
            .remove(&upload.session_id)
            .ok_or_else(|| PortError::Transfer("unknown upload session".to_string()))?;
        if buffer.len() as u64 != upload.total_bytes {
            return Err(PortError::Transfer(format!(
                "upload incomplete: {} of {} bytes",
                buffer.len(),
                upload.total_bytes
            )));
        }
        blobs.objects.insert(path, Bytes::from(buffer));
        Ok(())
    }

    async fn abort_resumable(&self, upload: &ResumableUpload) -> PortResult<()> {
        tokio::task::yield_now().await;
        let mut blobs = self.blobs.lock().map_err(lock_poisoned)?;
        blobs.pending.remove(&upload.session_id);
        Ok(())
    }

    async fn download_url(&self, path: &str) -> PortResult<String> {
        let blobs = self.blobs.lock().map_err(lock_poisoned)?;
        if !blobs.objects.contains_key(path) {
            return Err(PortError::NotFound(format!("object {} not found", path)));
        }
        Ok(format!("{}/{}", self.base_url, path))
    }
}

//=========================================================================================
// Clock
//=========================================================================================

/// A clock that only moves when told to.
///
/// Each call to `now` returns the current instant and then advances it by
/// `step`, so consecutive creations get strictly increasing timestamps
/// unless `step` is zero.
pub struct ManualClock {
    current: Mutex<DateTime<Utc>>,
    step: Duration,
}

impl ManualClock {
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::stepping(at, Duration::zero())
    }

    pub fn stepping(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            current: Mutex::new(start),
            step,
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut current) = self.current.lock() {
            *current += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        match self.current.lock() {
            Ok(mut current) => {
                let now = *current;
                *current += self.step;
                now
            }
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
