//! Filesystem and object-store implementations of [`Storage`].

use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use domain::{Storage, StorageError};

/// Stores uploads below a root directory.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub const DEFAULT_ROOT: &'static str = "./public";

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if path.is_empty() || escapes {
            return Err(StorageError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid storage path: {path}"),
            )));
        }
        Ok(self.root.join(relative))
    }
}

impl Default for LocalStorage {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ROOT)
    }
}

#[async_trait]
impl Storage for LocalStorage {
    /// Writes the file and returns its absolute path.
    #[tracing::instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn store(&self, path: &str, bytes: Vec<u8>) -> Result<String, StorageError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;

        let absolute = tokio::fs::canonicalize(&target).await?;
        tracing::debug!(path = %absolute.display(), "file stored locally");
        Ok(absolute.to_string_lossy().into_owned())
    }
}

const GCS_UPLOAD_BASE: &str = "https://storage.googleapis.com/upload/storage/v1";
const GCS_PUBLIC_BASE: &str = "https://storage.googleapis.com";
const CACHE_CONTROL: &str = "public, max-age=86400";
const MULTIPART_BOUNDARY: &str = "marketplace-upload-boundary";

/// Uploads to a Google Cloud Storage bucket through the JSON API.
///
/// Objects are written with a one day public cache lifetime and addressed by
/// their public `storage.googleapis.com` URL.
#[derive(Debug, Clone)]
pub struct ObjectStorage {
    bucket: String,
    token: String,
    upload_base: String,
    public_base: String,
    client: reqwest::Client,
}

impl ObjectStorage {
    pub fn new(bucket: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            token: token.into(),
            upload_base: GCS_UPLOAD_BASE.to_string(),
            public_base: GCS_PUBLIC_BASE.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Points uploads at another JSON API endpoint, such as an emulator.
    pub fn with_endpoint(mut self, upload_base: impl Into<String>) -> Self {
        self.upload_base = upload_base.into();
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn public_url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.public_base, self.bucket, path)
    }

    fn upload_url(&self) -> String {
        format!("{}/b/{}/o", self.upload_base, self.bucket)
    }
}

/// Builds a `multipart/related` body carrying the object metadata followed
/// by its content.
fn multipart_body(path: &str, content_type: &str, bytes: &[u8]) -> Vec<u8> {
    let metadata = serde_json::json!({
        "name": path,
        "contentType": content_type,
        "cacheControl": CACHE_CONTROL,
    });

    let mut body = Vec::with_capacity(bytes.len() + 256);
    body.extend_from_slice(
        format!(
            "--{MULTIPART_BOUNDARY}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(
        format!("--{MULTIPART_BOUNDARY}\r\nContent-Type: {content_type}\r\n\r\n").as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}--").as_bytes());
    body
}

#[async_trait]
impl Storage for ObjectStorage {
    #[tracing::instrument(skip(self, bytes), fields(bucket = %self.bucket, size = bytes.len()))]
    async fn store(&self, path: &str, bytes: Vec<u8>) -> Result<String, StorageError> {
        let content_type = mime_guess::from_path(path).first_or_octet_stream();
        let body = multipart_body(path, content_type.essence_str(), &bytes);

        let response = self
            .client
            .post(self.upload_url())
            .query(&[("uploadType", "multipart")])
            .bearer_auth(&self.token)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={MULTIPART_BOUNDARY}"),
            )
            .body(body)
            .send()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "object upload rejected");
            return Err(StorageError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(self.public_url(path))
    }
}
