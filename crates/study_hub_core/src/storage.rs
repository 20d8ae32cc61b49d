//! crates/study_hub_core/src/storage.rs
//!
//! The storage uploader: moves file bytes into the object store and returns
//! a retrievable address, either in one shot or as a resumable transfer that
//! reports progress.

use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::ports::{ObjectStore, PortError, PortResult, ResumableUpload};

/// Bytes sent per `put_chunk` call during a resumable upload.
pub const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;

pub const RESOURCES_FOLDER: &str = "resources";
pub const PROFILE_PICTURES_FOLDER: &str = "profile-pictures";

/// Builds `{folder}/{owner_id}/{millis}-{original_file_name}`.
///
/// Two uploads by the same owner of the same file name within one
/// millisecond map to the same path; the later one overwrites the earlier.
pub fn upload_path(
    folder: &str,
    owner_id: Uuid,
    created_at: DateTime<Utc>,
    original_file_name: &str,
) -> String {
    format!(
        "{}/{}/{}-{}",
        folder,
        owner_id,
        created_at.timestamp_millis(),
        original_file_name
    )
}

/// Events emitted by a resumable upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    /// Percentage of bytes transferred so far, 0 to 100, never decreasing.
    Progress(u8),
    /// The transfer was committed; carries the retrievable address.
    Completed(String),
}

pub type UploadStream = Pin<Box<dyn Stream<Item = PortResult<UploadEvent>> + Send>>;

#[derive(Clone)]
pub struct StorageUploader {
    store: Arc<dyn ObjectStore>,
    chunk_size: usize,
}

impl StorageUploader {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Stores `data` at `destination` and returns its download address.
    pub async fn upload(&self, data: Bytes, destination: &str) -> PortResult<String> {
        validate_upload(&data, destination)?;

        let size = data.len();
        self.store
            .put(destination, data)
            .await
            .map_err(into_transfer_error)?;
        let url = self
            .store
            .download_url(destination)
            .await
            .map_err(into_transfer_error)?;
        info!(path = destination, bytes = size, "Upload complete");
        Ok(url)
    }

    /// Same storage contract as [`upload`](Self::upload), but chunked.
    ///
    /// The stream yields `Progress` events and ends with either
    /// `Completed(address)` or a single `Err(PortError::Transfer)`. Nothing is
    /// retried; a failed transfer has to be started again from scratch.
    pub fn upload_resumable(&self, data: Bytes, destination: &str) -> UploadStream {
        let store = self.store.clone();
        let chunk_size = self.chunk_size;
        let destination = destination.to_string();

        Box::pin(async_stream::stream! {
            if let Err(e) = validate_upload(&data, &destination) {
                yield Err(e);
                return;
            }

            let total = data.len();
            let upload = match store.start_resumable(&destination, total as u64).await {
                Ok(upload) => upload,
                Err(e) => {
                    error!(path = %destination, "Failed to start resumable upload: {}", e);
                    yield Err(into_transfer_error(e));
                    return;
                }
            };
            yield Ok(UploadEvent::Progress(0));

            let mut offset = 0usize;
            while offset < total {
                let end = (offset + chunk_size).min(total);
                if let Err(e) = store
                    .put_chunk(&upload, offset as u64, data.slice(offset..end))
                    .await
                {
                    error!(path = %destination, offset, "Chunk upload failed: {}", e);
                    abort(store.as_ref(), &upload).await;
                    yield Err(into_transfer_error(e));
                    return;
                }
                offset = end;
                yield Ok(UploadEvent::Progress(percent(offset, total)));
            }

            if let Err(e) = store.finish_resumable(&upload).await {
                error!(path = %destination, "Failed to commit upload: {}", e);
                abort(store.as_ref(), &upload).await;
                yield Err(into_transfer_error(e));
                return;
            }
            match store.download_url(&destination).await {
                Ok(url) => {
                    info!(path = %destination, bytes = total, "Resumable upload complete");
                    yield Ok(UploadEvent::Completed(url));
                }
                Err(e) => yield Err(into_transfer_error(e)),
            }
        })
    }
}

/// Drives an upload stream to completion, reporting each progress step.
pub async fn await_completion<F>(mut stream: UploadStream, mut on_progress: F) -> PortResult<String>
where
    F: FnMut(u8),
{
    while let Some(event) = stream.next().await {
        match event? {
            UploadEvent::Progress(pct) => on_progress(pct),
            UploadEvent::Completed(url) => return Ok(url),
        }
    }
    Err(PortError::Transfer(
        "upload ended without a download address".to_string(),
    ))
}

// A failed transfer is never resumed, so its staged bytes are dropped.
async fn abort(store: &dyn ObjectStore, upload: &ResumableUpload) {
    if let Err(e) = store.abort_resumable(upload).await {
        warn!(session = %upload.session_id, "Failed to discard staged upload: {}", e);
    }
}

fn validate_upload(data: &Bytes, destination: &str) -> PortResult<()> {
    if data.is_empty() {
        return Err(PortError::Validation("file must not be empty".to_string()));
    }
    if destination.trim().is_empty() {
        return Err(PortError::Validation(
            "destination path must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn percent(done: usize, total: usize) -> u8 {
    ((done as u64 * 100) / total as u64) as u8
}

// Any object store fault during a transfer surfaces as `Transfer`.
fn into_transfer_error(e: PortError) -> PortError {
    match e {
        PortError::Transfer(_) | PortError::Validation(_) => e,
        other => {
            debug!("Mapping object store error to transfer error: {}", other);
            PortError::Transfer(other.to_string())
        }
    }
}
