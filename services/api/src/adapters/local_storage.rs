//! services/api/src/adapters/local_storage.rs
//!
//! An `ObjectStore` backed by the local filesystem.
//!
//! Committed objects live at `{root}/objects/{path}` and are served over
//! HTTP under `/files/{path}`. Resumable uploads are staged as flat files in
//! `{root}/partial/{session_id}` and renamed into place when finished.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use study_hub_core::ports::{ObjectStore, PortError, PortResult, ResumableUpload};
use tokio::fs;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, info};
use uuid::Uuid;

pub struct LocalObjectStore {
    objects_dir: PathBuf,
    partial_dir: PathBuf,
    public_base_url: String,
}

impl LocalObjectStore {
    pub async fn new(root: PathBuf, public_base_url: String) -> std::io::Result<Self> {
        let objects_dir = root.join("objects");
        let partial_dir = root.join("partial");
        fs::create_dir_all(&objects_dir).await?;
        fs::create_dir_all(&partial_dir).await?;
        info!("Object storage directory: {}", root.display());
        Ok(Self {
            objects_dir,
            partial_dir,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Directory that holds committed objects; this is what `/files` serves.
    pub fn objects_dir(&self) -> &Path {
        &self.objects_dir
    }

    fn object_path(&self, path: &str) -> PortResult<PathBuf> {
        let relative = sanitize(path)?;
        Ok(self.objects_dir.join(relative))
    }

    fn partial_path(&self, upload: &ResumableUpload) -> PortResult<PathBuf> {
        // Session ids are minted by `start_resumable`; anything else is foreign.
        Uuid::parse_str(&upload.session_id)
            .map_err(|_| PortError::Transfer("unknown upload session".to_string()))?;
        Ok(self.partial_dir.join(&upload.session_id))
    }
}

/// Accepts only plain relative paths (no `..`, no root, no empty segments).
fn sanitize(path: &str) -> PortResult<PathBuf> {
    if path.is_empty() || path.contains('\\') {
        return Err(PortError::Validation(format!("invalid object path '{}'", path)));
    }
    let mut clean = PathBuf::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => clean.push(part),
            _ => {
                return Err(PortError::Validation(format!(
                    "invalid object path '{}'",
                    path
                )))
            }
        }
    }
    if clean.as_os_str().is_empty() {
        return Err(PortError::Validation(format!("invalid object path '{}'", path)));
    }
    Ok(clean)
}

/// Percent-encodes each segment so names with `#`, `?` or spaces stay addressable.
fn url_path(path: &str) -> String {
    path.split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/")
}

fn transfer(e: std::io::Error) -> PortError {
    PortError::Transfer(e.to_string())
}

async fn ensure_parent(path: &Path) -> PortResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(transfer)?;
    }
    Ok(())
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, path: &str, data: Bytes) -> PortResult<()> {
        let target = self.object_path(path)?;
        ensure_parent(&target).await?;
        fs::write(&target, &data).await.map_err(transfer)?;
        Ok(())
    }

    async fn start_resumable(&self, path: &str, total_bytes: u64) -> PortResult<ResumableUpload> {
        self.object_path(path)?;
        let session_id = Uuid::new_v4().to_string();
        fs::File::create(self.partial_dir.join(&session_id))
            .await
            .map_err(transfer)?;
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
        let partial = self.partial_path(upload)?;
        let mut file = fs::OpenOptions::new()
            .write(true)
            .open(&partial)
            .await
            .map_err(transfer)?;
        let received = file.metadata().await.map_err(transfer)?.len();
        if received != offset {
            return Err(PortError::Transfer(format!(
                "chunk offset {} does not match {} bytes received",
                offset, received
            )));
        }
        file.seek(std::io::SeekFrom::Start(offset))
            .await
            .map_err(transfer)?;
        file.write_all(&chunk).await.map_err(transfer)?;
        file.flush().await.map_err(transfer)?;
        Ok(())
    }

    async fn finish_resumable(&self, upload: &ResumableUpload) -> PortResult<()> {
        let partial = self.partial_path(upload)?;
        let received = fs::metadata(&partial).await.map_err(transfer)?.len();
        if received != upload.total_bytes {
            return Err(PortError::Transfer(format!(
                "upload incomplete: {} of {} bytes",
                received, upload.total_bytes
            )));
        }
        let target = self.object_path(&upload.path)?;
        ensure_parent(&target).await?;
        fs::rename(&partial, &target).await.map_err(transfer)?;
        Ok(())
    }

    async fn abort_resumable(&self, upload: &ResumableUpload) -> PortResult<()> {
        let partial = self.partial_path(upload)?;
        match fs::remove_file(&partial).await {
            Ok(()) => {
                debug!(session = %upload.session_id, "Discarded staged upload");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(transfer(e)),
        }
    }

    async fn download_url(&self, path: &str) -> PortResult<String> {
        let target = self.object_path(path)?;
        match fs::metadata(&target).await {
            Ok(_) => Ok(format!("{}/files/{}", self.public_base_url, url_path(path))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(PortError::NotFound(format!("object {} not found", path)))
            }
            Err(e) => Err(PortError::Backend(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use study_hub_core::StorageUploader;

    #[test]
    fn sanitize_rejects_escaping_paths() {
        assert!(sanitize("resources/u1/1-a.pdf").is_ok());
        assert!(sanitize("../etc/passwd").is_err());
        assert!(sanitize("/abs/path").is_err());
        assert!(sanitize("resources/../../x").is_err());
        assert!(sanitize("").is_err());
    }

    #[tokio::test]
    async fn resumable_upload_lands_under_objects_dir() {
        let root = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(root.path().to_path_buf(), "http://hub.test/".into())
            .await
            .unwrap();
        let objects_dir = store.objects_dir().to_path_buf();
        let uploader = StorageUploader::new(std::sync::Arc::new(store)).with_chunk_size(3);

        let url = study_hub_core::await_completion(
            uploader.upload_resumable(Bytes::from_static(b"lecture"), "resources/u1/5-l.txt"),
            |_| {},
        )
        .await
        .unwrap();

        assert_eq!(url, "http://hub.test/files/resources/u1/5-l.txt");
        let stored = std::fs::read(objects_dir.join("resources/u1/5-l.txt")).unwrap();
        assert_eq!(stored, b"lecture");
    }

    #[tokio::test]
    async fn download_url_escapes_reserved_characters() {
        let root = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(root.path().to_path_buf(), "http://hub.test".into())
            .await
            .unwrap();
        let path = "resources/u1/7-Q#1 final?.pdf";
        store.put(path, Bytes::from_static(b"paper")).await.unwrap();

        let url = store.download_url(path).await.unwrap();
        assert_eq!(url, "http://hub.test/files/resources/u1/7-Q%231%20final%3F.pdf");
    }

    /// Delegates to a `LocalObjectStore` but drops the connection after one chunk.
    struct DroppingAfterOneChunk {
        inner: LocalObjectStore,
        chunks: AtomicUsize,
    }

    #[async_trait]
    impl ObjectStore for DroppingAfterOneChunk {
        async fn put(&self, path: &str, data: Bytes) -> PortResult<()> {
            self.inner.put(path, data).await
        }

        async fn start_resumable(&self, path: &str, total: u64) -> PortResult<ResumableUpload> {
            self.inner.start_resumable(path, total).await
        }

        async fn put_chunk(
            &self,
            upload: &ResumableUpload,
            offset: u64,
            chunk: Bytes,
        ) -> PortResult<()> {
            if self.chunks.fetch_add(1, Ordering::SeqCst) >= 1 {
                return Err(PortError::Transfer("connection reset".to_string()));
            }
            self.inner.put_chunk(upload, offset, chunk).await
        }

        async fn finish_resumable(&self, upload: &ResumableUpload) -> PortResult<()> {
            self.inner.finish_resumable(upload).await
        }

        async fn abort_resumable(&self, upload: &ResumableUpload) -> PortResult<()> {
            self.inner.abort_resumable(upload).await
        }

        async fn download_url(&self, path: &str) -> PortResult<String> {
            self.inner.download_url(path).await
        }
    }

    #[tokio::test]
    async fn failed_resumable_upload_leaves_no_partial_file() {
        let root = tempfile::tempdir().unwrap();
        let inner = LocalObjectStore::new(root.path().to_path_buf(), "http://hub.test".into())
            .await
            .unwrap();
        let store = DroppingAfterOneChunk {
            inner,
            chunks: AtomicUsize::new(0),
        };
        let uploader = StorageUploader::new(std::sync::Arc::new(store)).with_chunk_size(4);

        let err = study_hub_core::await_completion(
            uploader.upload_resumable(Bytes::from_static(b"0123456789"), "resources/u1/1-a.pdf"),
            |_| {},
        )
        .await
        .unwrap_err();

        assert!(matches!(err, PortError::Transfer(_)));
        let staged = std::fs::read_dir(root.path().join("partial")).unwrap().count();
        assert_eq!(staged, 0);
        assert!(!root.path().join("objects/resources/u1/1-a.pdf").exists());
    }

    #[tokio::test]
    async fn abort_discards_a_session_rejected_for_a_bad_offset() {
        let root = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(root.path().to_path_buf(), "http://hub.test".into())
            .await
            .unwrap();

        let upload = store.start_resumable("resources/u1/2-b.pdf", 12).await.unwrap();
        store
            .put_chunk(&upload, 0, Bytes::from_static(b"abcd"))
            .await
            .unwrap();
        let err = store
            .put_chunk(&upload, 8, Bytes::from_static(b"ijkl"))
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Transfer(_)));

        store.abort_resumable(&upload).await.unwrap();
        store.abort_resumable(&upload).await.unwrap();
        assert_eq!(std::fs::read_dir(root.path().join("partial")).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn download_url_of_missing_object_is_not_found() {
        let root = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(root.path().to_path_buf(), "http://hub.test".into())
            .await
            .unwrap();

        let err = store.download_url("resources/nope.pdf").await.unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
    }
}
