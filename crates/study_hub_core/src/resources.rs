//! crates/study_hub_core/src/resources.rs
//!
//! The resource repository, plus the upload-then-record flow that is the
//! only way a resource with a real `file_url` comes into existence.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::doubts::require_non_empty;
use crate::domain::{NewResource, Resource, ResourceCategory, ResourceFilter, ResourceMetadata};
use crate::ports::{Clock, PortError, PortResult, ResourceStore};
use crate::storage::{await_completion, upload_path, StorageUploader, RESOURCES_FOLDER};

//=========================================================================================
// Resource Repository
//=========================================================================================

#[derive(Clone)]
pub struct ResourceRepository {
    store: Arc<dyn ResourceStore>,
    clock: Arc<dyn Clock>,
}

impl ResourceRepository {
    pub fn new(store: Arc<dyn ResourceStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Records metadata for an already uploaded file. `uploaded_at` comes
    /// from the injected clock, never from the caller.
    pub async fn create(&self, metadata: ResourceMetadata) -> PortResult<Uuid> {
        require_non_empty("title", &metadata.file_name)?;
        require_non_empty("file url", &metadata.file_url)?;
        require_non_empty("subject", &metadata.subject)?;

        let uploaded_by = metadata.uploaded_by;
        let category = metadata.category;
        let id = self
            .store
            .insert_resource(NewResource {
                metadata,
                uploaded_at: self.clock.now(),
            })
            .await?;
        info!(resource_id = %id, %uploaded_by, %category, "Resource created");
        Ok(id)
    }

    /// Every resource, most recently uploaded first.
    pub async fn list_all(&self) -> PortResult<Vec<Resource>> {
        self.store.query_resources(ResourceFilter::All).await
    }

    pub async fn list_by_subject(&self, subject: &str) -> PortResult<Vec<Resource>> {
        if subject.trim().is_empty() {
            return Ok(Vec::new());
        }
        self.store
            .query_resources(ResourceFilter::Subject(subject.to_string()))
            .await
    }

    pub async fn list_by_category(&self, category: ResourceCategory) -> PortResult<Vec<Resource>> {
        self.store
            .query_resources(ResourceFilter::Category(category))
            .await
    }
}

//=========================================================================================
// Upload-then-record flow
//=========================================================================================

/// A file plus the metadata a student fills in when sharing it.
#[derive(Debug, Clone)]
pub struct ResourceUpload {
    pub title: String,
    pub original_file_name: String,
    pub content_type: String,
    pub data: Bytes,
    pub subject: String,
    pub category: ResourceCategory,
    pub uploaded_by: Uuid,
    pub uploaded_by_name: String,
    pub description: Option<String>,
}

#[derive(Clone)]
pub struct ResourcePublisher {
    uploader: StorageUploader,
    resources: ResourceRepository,
    clock: Arc<dyn Clock>,
}

impl ResourcePublisher {
    pub fn new(
        uploader: StorageUploader,
        resources: ResourceRepository,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            uploader,
            resources,
            clock,
        }
    }

    /// Uploads the file, then records its metadata.
    ///
    /// If the upload fails no resource is created. If the metadata write
    /// fails after a successful upload, the blob stays in storage.
    pub async fn publish(&self, upload: ResourceUpload) -> PortResult<Uuid> {
        require_non_empty("title", &upload.title)?;
        require_non_empty("file name", &upload.original_file_name)?;
        require_non_empty("subject", &upload.subject)?;
        if upload.data.is_empty() {
            return Err(PortError::Validation("file must not be empty".to_string()));
        }

        let path = upload_path(
            RESOURCES_FOLDER,
            upload.uploaded_by,
            self.clock.now(),
            &upload.original_file_name,
        );
        let stream = self.uploader.upload_resumable(upload.data, &path);
        let file_url = await_completion(stream, |pct| {
            debug!(path = %path, progress = pct, "Resource upload progress");
        })
        .await?;

        let metadata = ResourceMetadata {
            file_name: upload.title,
            file_url,
            file_type: upload.content_type,
            subject: upload.subject,
            category: upload.category,
            uploaded_by: upload.uploaded_by,
            uploaded_by_name: upload.uploaded_by_name,
            description: upload.description.filter(|d| !d.trim().is_empty()),
        };
        match self.resources.create(metadata).await {
            Ok(id) => Ok(id),
            Err(e) => {
                warn!(path = %path, "Resource metadata write failed, blob left orphaned: {}", e);
                Err(e)
            }
        }
    }
}
