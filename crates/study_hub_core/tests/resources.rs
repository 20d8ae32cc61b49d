use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Duration, TimeZone, Utc};
use study_hub_core::memory::{InMemoryObjectStore, InMemoryStore, ManualClock};
use study_hub_core::{
    NewResource, PortError, PortResult, Resource, ResourceCategory, ResourceFilter,
    ResourceMetadata, ResourcePublisher, ResourceRepository, ResourceStore, ResourceUpload,
    StorageUploader,
};
use uuid::Uuid;

/// Wraps a resource store and counts insert calls.
struct CountingResourceStore {
    inner: InMemoryStore,
    inserts: AtomicUsize,
    fail_inserts: bool,
}

impl CountingResourceStore {
    fn new(fail_inserts: bool) -> Self {
        Self {
            inner: InMemoryStore::new(),
            inserts: AtomicUsize::new(0),
            fail_inserts,
        }
    }
}

#[async_trait]
impl ResourceStore for CountingResourceStore {
    async fn insert_resource(&self, resource: NewResource) -> PortResult<Uuid> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_inserts {
            return Err(PortError::Backend("permission denied".to_string()));
        }
        self.inner.insert_resource(resource).await
    }

    async fn query_resources(&self, filter: ResourceFilter) -> PortResult<Vec<Resource>> {
        self.inner.query_resources(filter).await
    }
}

fn clock() -> Arc<ManualClock> {
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
    Arc::new(ManualClock::stepping(start, Duration::milliseconds(250)))
}

fn metadata(title: &str, subject: &str, category: ResourceCategory) -> ResourceMetadata {
    ResourceMetadata {
        file_name: title.to_string(),
        file_url: format!("memory://bucket/resources/{}.pdf", title),
        file_type: "application/pdf".to_string(),
        subject: subject.to_string(),
        category,
        uploaded_by: Uuid::new_v4(),
        uploaded_by_name: "Ayesha".to_string(),
        description: None,
    }
}

fn upload(uploader: Uuid) -> ResourceUpload {
    ResourceUpload {
        title: "Unit 3 notes".to_string(),
        original_file_name: "unit3.pdf".to_string(),
        content_type: "application/pdf".to_string(),
        data: Bytes::from_static(b"%PDF-1.4 notes"),
        subject: "Physics".to_string(),
        category: ResourceCategory::Notes,
        uploaded_by: uploader,
        uploaded_by_name: "Ayesha".to_string(),
        description: Some("Covers optics".to_string()),
    }
}

#[tokio::test]
async fn create_requires_title_and_file_url() {
    let repo = ResourceRepository::new(Arc::new(InMemoryStore::new()), clock());

    let mut missing_title = metadata("", "Physics", ResourceCategory::Notes);
    missing_title.file_url = "memory://bucket/x".to_string();
    let err = repo.create(missing_title).await.unwrap_err();
    assert!(matches!(err, PortError::Validation(_)));

    let mut missing_url = metadata("Notes", "Physics", ResourceCategory::Notes);
    missing_url.file_url = String::new();
    let err = repo.create(missing_url).await.unwrap_err();
    assert!(matches!(err, PortError::Validation(_)));

    assert!(repo.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn uploaded_at_comes_from_the_clock() {
    let start = Utc.with_ymd_and_hms(2024, 5, 5, 12, 0, 0).unwrap();
    let repo = ResourceRepository::new(
        Arc::new(InMemoryStore::new()),
        Arc::new(ManualClock::fixed(start)),
    );

    repo.create(metadata("Syllabus", "Physics", ResourceCategory::Syllabus))
        .await
        .unwrap();

    let listed = repo.list_all().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].uploaded_at, start);
    assert_eq!(listed[0].file_name, "Syllabus");
}

#[tokio::test]
async fn listings_filter_and_order_by_upload_time() {
    let repo = ResourceRepository::new(Arc::new(InMemoryStore::new()), clock());

    let a = repo
        .create(metadata("a", "Physics", ResourceCategory::Notes))
        .await
        .unwrap();
    let b = repo
        .create(metadata("b", "Chemistry", ResourceCategory::Pyq))
        .await
        .unwrap();
    let c = repo
        .create(metadata("c", "Physics", ResourceCategory::Pyq))
        .await
        .unwrap();

    let ids = |rs: Vec<Resource>| rs.into_iter().map(|r| r.id).collect::<Vec<_>>();
    assert_eq!(ids(repo.list_all().await.unwrap()), vec![c, b, a]);
    assert_eq!(ids(repo.list_by_subject("Physics").await.unwrap()), vec![c, a]);
    assert_eq!(
        ids(repo.list_by_category(ResourceCategory::Pyq).await.unwrap()),
        vec![c, b]
    );
    assert!(repo.list_by_subject("").await.unwrap().is_empty());
    assert!(repo
        .list_by_category(ResourceCategory::Links)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn publish_uploads_then_records_metadata() {
    let objects = Arc::new(InMemoryObjectStore::new());
    let store = Arc::new(InMemoryStore::new());
    let clock = clock();
    let uploader = StorageUploader::new(objects.clone()).with_chunk_size(4);
    let repo = ResourceRepository::new(store, clock.clone());
    let publisher = ResourcePublisher::new(uploader, repo.clone(), clock);
    let owner = Uuid::new_v4();

    let id = publisher.publish(upload(owner)).await.unwrap();

    let resource = repo.list_all().await.unwrap().remove(0);
    assert_eq!(resource.id, id);
    assert_eq!(resource.file_name, "Unit 3 notes");
    assert_eq!(resource.file_type, "application/pdf");
    assert_eq!(resource.description.as_deref(), Some("Covers optics"));
    assert!(resource
        .file_url
        .starts_with(&format!("memory://bucket/resources/{}/", owner)));
    assert!(resource.file_url.ends_with("-unit3.pdf"));

    let path = resource.file_url.trim_start_matches("memory://bucket/");
    assert_eq!(objects.get(path).unwrap(), Bytes::from_static(b"%PDF-1.4 notes"));
}

#[tokio::test]
async fn failed_upload_never_creates_a_resource() {
    let resources = Arc::new(CountingResourceStore::new(false));
    let clock = clock();
    let uploader = StorageUploader::new(Arc::new(InMemoryObjectStore::failing_after_chunks(1)))
        .with_chunk_size(4);
    let publisher = ResourcePublisher::new(
        uploader,
        ResourceRepository::new(resources.clone(), clock.clone()),
        clock,
    );

    let err = publisher.publish(upload(Uuid::new_v4())).await.unwrap_err();

    assert!(matches!(err, PortError::Transfer(_)));
    assert_eq!(resources.inserts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn invalid_upload_is_rejected_before_touching_storage() {
    let objects = Arc::new(InMemoryObjectStore::new());
    let resources = Arc::new(CountingResourceStore::new(false));
    let clock = clock();
    let publisher = ResourcePublisher::new(
        StorageUploader::new(objects.clone()),
        ResourceRepository::new(resources.clone(), clock.clone()),
        clock,
    );

    let mut no_title = upload(Uuid::new_v4());
    no_title.title = String::new();
    let err = publisher.publish(no_title).await.unwrap_err();
    assert!(matches!(err, PortError::Validation(_)));

    let mut no_file = upload(Uuid::new_v4());
    no_file.data = Bytes::new();
    let err = publisher.publish(no_file).await.unwrap_err();
    assert!(matches!(err, PortError::Validation(_)));

    assert_eq!(objects.object_count(), 0);
    assert_eq!(resources.inserts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn metadata_failure_leaves_orphaned_blob() {
    let objects = Arc::new(InMemoryObjectStore::new());
    let resources = Arc::new(CountingResourceStore::new(true));
    let clock = clock();
    let publisher = ResourcePublisher::new(
        StorageUploader::new(objects.clone()),
        ResourceRepository::new(resources.clone(), clock.clone()),
        clock,
    );

    let err = publisher.publish(upload(Uuid::new_v4())).await.unwrap_err();

    assert!(matches!(err, PortError::Backend(_)));
    assert_eq!(resources.inserts.load(Ordering::SeqCst), 1);
    assert_eq!(objects.object_count(), 1);
}
