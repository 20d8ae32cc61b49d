use std::sync::Arc;

use bytes::Bytes;
use chrono::{TimeZone, Utc};
use futures::StreamExt;
use study_hub_core::memory::{InMemoryObjectStore, InMemoryStore, ManualClock};
use study_hub_core::storage::RESOURCES_FOLDER;
use study_hub_core::{
    await_completion, upload_path, PortError, ResourceCategory, ResourcePublisher,
    ResourceRepository, ResourceUpload, StorageUploader, UploadEvent,
};
use uuid::Uuid;

#[tokio::test]
async fn one_shot_upload_returns_address() {
    let objects = Arc::new(InMemoryObjectStore::new());
    let uploader = StorageUploader::new(objects.clone());

    let url = uploader
        .upload(Bytes::from_static(b"hello"), "resources/u1/1-a.pdf")
        .await
        .unwrap();

    assert_eq!(url, "memory://bucket/resources/u1/1-a.pdf");
    assert_eq!(
        objects.get("resources/u1/1-a.pdf").unwrap(),
        Bytes::from_static(b"hello")
    );
}

#[tokio::test]
async fn one_shot_upload_failure_is_a_transfer_error() {
    let uploader = StorageUploader::new(Arc::new(InMemoryObjectStore::unreachable()));

    let err = uploader
        .upload(Bytes::from_static(b"hello"), "resources/u1/1-a.pdf")
        .await
        .unwrap_err();

    assert!(matches!(err, PortError::Transfer(_)));
}

#[tokio::test]
async fn empty_file_is_a_validation_error() {
    let uploader = StorageUploader::new(Arc::new(InMemoryObjectStore::new()));

    let err = uploader
        .upload(Bytes::new(), "resources/u1/1-a.pdf")
        .await
        .unwrap_err();

    assert!(matches!(err, PortError::Validation(_)));
}

#[tokio::test]
async fn resumable_upload_reports_non_decreasing_progress() {
    let objects = Arc::new(InMemoryObjectStore::new());
    let uploader = StorageUploader::new(objects.clone()).with_chunk_size(4);

    let events: Vec<UploadEvent> = uploader
        .upload_resumable(Bytes::from_static(b"0123456789"), "resources/u1/1-a.pdf")
        .map(|event| event.unwrap())
        .collect()
        .await;

    assert_eq!(
        events,
        vec![
            UploadEvent::Progress(0),
            UploadEvent::Progress(40),
            UploadEvent::Progress(80),
            UploadEvent::Progress(100),
            UploadEvent::Completed("memory://bucket/resources/u1/1-a.pdf".to_string()),
        ]
    );
    assert_eq!(
        objects.get("resources/u1/1-a.pdf").unwrap(),
        Bytes::from_static(b"0123456789")
    );
}

#[tokio::test]
async fn resumable_upload_fails_once_without_retrying() {
    let objects = Arc::new(InMemoryObjectStore::failing_after_chunks(1));
    let uploader = StorageUploader::new(objects.clone()).with_chunk_size(4);

    let events: Vec<_> = uploader
        .upload_resumable(Bytes::from_static(b"0123456789"), "resources/u1/1-a.pdf")
        .collect()
        .await;

    assert_eq!(events.len(), 3);
    assert!(matches!(events[0], Ok(UploadEvent::Progress(0))));
    assert!(matches!(events[1], Ok(UploadEvent::Progress(40))));
    assert!(matches!(events[2], Err(PortError::Transfer(_))));
    assert_eq!(objects.object_count(), 0);
    assert_eq!(objects.pending_count(), 0);
}

#[tokio::test]
async fn await_completion_collects_progress() {
    let uploader =
        StorageUploader::new(Arc::new(InMemoryObjectStore::new())).with_chunk_size(3);
    let mut seen = Vec::new();

    let url = await_completion(
        uploader.upload_resumable(Bytes::from_static(b"abcdef"), "notes/u/1-n.txt"),
        |pct| seen.push(pct),
    )
    .await
    .unwrap();

    assert_eq!(url, "memory://bucket/notes/u/1-n.txt");
    assert_eq!(seen, vec![0, 50, 100]);
}

// The naming policy only has millisecond granularity: same owner, same file
// name, same millisecond gives the same path. This is a known limitation.
#[test]
fn same_millisecond_uploads_share_a_path() {
    let owner = Uuid::new_v4();
    let at = Utc.timestamp_millis_opt(1_717_171_717_171).unwrap();

    let first = upload_path(RESOURCES_FOLDER, owner, at, "a.pdf");
    let second = upload_path(RESOURCES_FOLDER, owner, at, "a.pdf");

    assert_eq!(first, second);
    assert_eq!(first, format!("resources/{}/1717171717171-a.pdf", owner));
}

#[tokio::test]
async fn same_millisecond_publishes_overwrite_each_other() {
    let at = Utc.timestamp_millis_opt(1_717_171_717_171).unwrap();
    let clock = Arc::new(ManualClock::fixed(at));
    let objects = Arc::new(InMemoryObjectStore::new());
    let repo = ResourceRepository::new(Arc::new(InMemoryStore::new()), clock.clone());
    let publisher =
        ResourcePublisher::new(StorageUploader::new(objects.clone()), repo.clone(), clock.clone());
    let owner = Uuid::new_v4();
    let paper = |body: &'static [u8]| ResourceUpload {
        title: "Paper".to_string(),
        original_file_name: "a.pdf".to_string(),
        content_type: "application/pdf".to_string(),
        data: Bytes::from_static(body),
        subject: "Physics".to_string(),
        category: ResourceCategory::Pyq,
        uploaded_by: owner,
        uploaded_by_name: "Ayesha".to_string(),
        description: None,
    };

    publisher.publish(paper(b"first")).await.unwrap();
    publisher.publish(paper(b"second")).await.unwrap();

    let resources = repo.list_all().await.unwrap();
    assert_eq!(resources.len(), 2);
    assert_eq!(resources[0].file_url, resources[1].file_url);
    assert_eq!(objects.object_count(), 1);
    let path = upload_path(RESOURCES_FOLDER, owner, at, "a.pdf");
    assert_eq!(objects.get(&path).unwrap(), Bytes::from_static(b"second"));

    // One millisecond later the same name gets its own path.
    clock.advance(chrono::Duration::milliseconds(1));
    publisher.publish(paper(b"third")).await.unwrap();
    assert_eq!(objects.object_count(), 2);
    assert_eq!(objects.get(&path).unwrap(), Bytes::from_static(b"second"));
}
