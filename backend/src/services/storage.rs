//! Project file storage on top of an [`ObjectStore`].
//!
//! Every key lives under `{projectId}/`. Folders are implied by key prefixes;
//! an empty folder is kept alive by a `.folder` marker object that the
//! listing hides.

use async_trait::async_trait;
use futures::TryStreamExt;
use http::Method;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::{ObjectStore, PutPayload};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::api::{FileEntry, ProjectId};

/// Name of the marker object written into new folders.
pub const FOLDER_MARKER: &str = ".folder";

/// Presigned URLs are valid for 15 minutes.
pub const DEFAULT_PRESIGN_EXPIRY: Duration = Duration::from_secs(900);

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object store error: {0}")]
    Store(#[from] object_store::Error),

    #[error("key '{key}' is outside project {project_id}")]
    OutsideProject { project_id: String, key: String },

    #[error("presigned URLs are not supported by the configured store")]
    SigningUnavailable,

    #[error("object '{0}' not found")]
    NotFound(String),

    #[error("{remaining} objects under '{key}' survived a delete pass")]
    DeleteStalled { key: String, remaining: usize },
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::NotFound(_) | StorageError::Store(object_store::Error::NotFound { .. })
        )
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Produces time-limited URLs for direct client transfers.
#[async_trait]
pub trait UrlSigner: Send + Sync {
    async fn presign(&self, method: Method, key: &str, expires_in: Duration) -> StorageResult<String>;
}

/// [`UrlSigner`] backed by an object_store [`Signer`] such as `AmazonS3`.
pub struct ObjectStoreSigner<S>(pub Arc<S>);

#[async_trait]
impl<S: Signer + 'static> UrlSigner for ObjectStoreSigner<S> {
    async fn presign(&self, method: Method, key: &str, expires_in: Duration) -> StorageResult<String> {
        let url = self
            .0
            .signed_url(method, &Path::from(key), expires_in)
            .await?;
        Ok(url.to_string())
    }
}

/// S3 connection settings.
#[derive(Debug, Clone, PartialEq)]
pub struct S3Settings {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
}

#[derive(Clone)]
pub struct FileStorage {
    store: Arc<dyn ObjectStore>,
    signer: Option<Arc<dyn UrlSigner>>,
    presign_expiry: Duration,
}

impl FileStorage {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            signer: None,
            presign_expiry: DEFAULT_PRESIGN_EXPIRY,
        }
    }

    pub fn with_signer(mut self, signer: Arc<dyn UrlSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn with_presign_expiry(mut self, expiry: Duration) -> Self {
        self.presign_expiry = expiry;
        self
    }

    /// S3 bucket storage. Credentials come from the usual `AWS_*` variables.
    pub fn s3(settings: &S3Settings) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(&settings.bucket)
            .with_region(&settings.region);
        if let Some(endpoint) = &settings.endpoint {
            builder = builder.with_endpoint(endpoint).with_allow_http(true);
        }
        let s3 = Arc::new(builder.build()?);
        Ok(Self::new(s3.clone()).with_signer(Arc::new(ObjectStoreSigner(s3))))
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Entries directly inside `prefix` of a project. `prefix` is `/` for the
    /// project root or a relative folder path such as `drawings/`.
    pub async fn list(&self, project_id: &ProjectId, prefix: &str) -> StorageResult<Vec<FileEntry>> {
        let base = listing_prefix(project_id, prefix);
        let listing = self
            .store
            .list_with_delimiter(Some(&Path::from(base.as_str())))
            .await?;

        let mut entries: Vec<FileEntry> = listing
            .objects
            .into_iter()
            .filter(|meta| meta.location.filename() != Some(FOLDER_MARKER))
            .map(|meta| {
                let key = meta.location.to_string();
                FileEntry {
                    name: basename(&key).to_string(),
                    id: key,
                    mod_date: Some(meta.last_modified),
                    size: Some(meta.size),
                    is_dir: false,
                }
            })
            .collect();

        entries.extend(listing.common_prefixes.into_iter().map(|dir| {
            let key = dir.to_string();
            FileEntry {
                name: key.strip_prefix(&base).unwrap_or(&key).to_string(),
                id: format!("{}/", key),
                mod_date: None,
                size: None,
                is_dir: true,
            }
        }));
        Ok(entries)
    }

    /// Delete `key` and everything stored under it. Listing is repeated
    /// until it comes back empty; a listing identical to the previous one
    /// means the deletes are not taking effect.
    pub async fn delete_tree(&self, project_id: &ProjectId, key: &str) -> StorageResult<usize> {
        ensure_in_project(project_id, key)?;
        let path = Path::from(key);
        let mut deleted = 0;
        let mut previous: Vec<Path> = Vec::new();

        loop {
            let batch: Vec<Path> = self
                .store
                .list(Some(&path))
                .map_ok(|meta| meta.location)
                .try_collect()
                .await?;
            if batch.is_empty() {
                break;
            }
            if batch == previous {
                return Err(StorageError::DeleteStalled {
                    key: key.to_string(),
                    remaining: batch.len(),
                });
            }
            for location in &batch {
                match self.store.delete(location).await {
                    Ok(()) => deleted += 1,
                    Err(object_store::Error::NotFound { .. }) => {}
                    Err(e) => return Err(e.into()),
                }
            }
            previous = batch;
        }

        // A plain file key is not a prefix of anything.
        match self.store.delete(&path).await {
            Ok(()) => deleted += 1,
            Err(object_store::Error::NotFound { .. }) => {}
            Err(e) => return Err(e.into()),
        }
        tracing::debug!(key, deleted, "deleted storage objects");
        Ok(deleted)
    }

    /// Write the folder marker for `folder_name` inside `prefix`. Slashes in
    /// the folder name become underscores. Returns the folder key with a
    /// trailing slash.
    pub async fn create_folder(
        &self,
        project_id: &ProjectId,
        prefix: &str,
        folder_name: &str,
    ) -> StorageResult<String> {
        let folder_key = folder_key(project_id, prefix, folder_name);
        let marker = format!("{}{}", folder_key, FOLDER_MARKER);
        self.store
            .put(&Path::from(marker.as_str()), PutPayload::from_static(b""))
            .await?;
        Ok(folder_key)
    }

    pub async fn read(&self, project_id: &ProjectId, key: &str) -> StorageResult<Vec<u8>> {
        ensure_in_project(project_id, key)?;
        let result = match self.store.get(&Path::from(key)).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => {
                return Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(result.bytes().await?.to_vec())
    }

    pub async fn write(&self, project_id: &ProjectId, key: &str, data: Vec<u8>) -> StorageResult<()> {
        ensure_in_project(project_id, key)?;
        self.store.put(&Path::from(key), PutPayload::from(data)).await?;
        Ok(())
    }

    /// GET URL for the object at the full key `file_id`.
    pub async fn presign_download(&self, project_id: &ProjectId, file_id: &str) -> StorageResult<String> {
        ensure_in_project(project_id, file_id)?;
        self.presign(Method::GET, file_id).await
    }

    /// PUT URL for `{projectId}/{fileId}`.
    pub async fn presign_upload(&self, project_id: &ProjectId, file_id: &str) -> StorageResult<String> {
        let key = upload_key(project_id, file_id);
        self.presign(Method::PUT, &key).await
    }

    async fn presign(&self, method: Method, key: &str) -> StorageResult<String> {
        let signer = self.signer.as_ref().ok_or(StorageError::SigningUnavailable)?;
        signer.presign(method, key, self.presign_expiry).await
    }
}

/// `{projectId}/` for the root, `{projectId}/{prefix}` otherwise.
pub fn listing_prefix(project_id: &ProjectId, prefix: &str) -> String {
    if prefix.is_empty() || prefix == "/" {
        format!("{}/", project_id)
    } else {
        let mut base = format!("{}/{}", project_id, prefix.trim_start_matches('/'));
        if !base.ends_with('/') {
            base.push('/');
        }
        base
    }
}

pub fn upload_key(project_id: &ProjectId, file_id: &str) -> String {
    format!("{}/{}", project_id, file_id.trim_start_matches('/'))
}

pub fn folder_key(project_id: &ProjectId, prefix: &str, folder_name: &str) -> String {
    let name = folder_name.replace('/', "_");
    let relative = if prefix.is_empty() || prefix == "/" {
        name
    } else {
        // Prefixes may arrive as full keys from a listing.
        let own = format!("{}/", project_id);
        let prefix = prefix.strip_prefix(&own).unwrap_or(prefix);
        format!("{}{}", prefix.trim_start_matches('/'), name)
    };
    format!("{}/{}/", project_id, relative.trim_end_matches('/'))
}

fn basename(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

fn ensure_in_project(project_id: &ProjectId, key: &str) -> StorageResult<()> {
    let own = format!("{}/", project_id);
    if key.starts_with(&own) && key.len() > own.len() {
        Ok(())
    } else {
        Err(StorageError::OutsideProject {
            project_id: project_id.to_string(),
            key: key.to_string(),
        })
    }
}
