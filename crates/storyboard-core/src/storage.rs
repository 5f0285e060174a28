use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use crate::error::{Result, StoryboardError};

/// Opaque blob store addressed by object name within a bucket.
///
/// `put` returns a public reference that `fetch` (and anything outside the
/// pipeline) can later resolve.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, name: &str, bytes: &[u8], content_type: &str) -> Result<String>;
    async fn fetch(&self, reference: &str, dest: &Path) -> Result<()>;
}

/// Google Cloud Storage over the JSON API with a bearer token.
pub struct GcsStore {
    client: reqwest::Client,
    bucket: String,
    token: String,
}

impl GcsStore {
    pub const TOKEN_ENV_VAR: &'static str = "GCS_ACCESS_TOKEN";

    pub fn from_env(bucket: &str) -> Result<Self> {
        let token = std::env::var(Self::TOKEN_ENV_VAR).map_err(|_| {
            StoryboardError::MissingApiKey {
                env_var: Self::TOKEN_ENV_VAR.to_string(),
            }
        })?;
        Ok(Self {
            client: reqwest::Client::new(),
            bucket: bucket.to_string(),
            token,
        })
    }

    pub fn public_url(&self, name: &str) -> String {
        format!("https://storage.googleapis.com/{}/{}", self.bucket, name)
    }

    /// Percent-encode an object name for use as a query parameter.
    fn encode_name(name: &str) -> String {
        let mut out = String::with_capacity(name.len());
        for c in name.chars() {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~') {
                out.push(c);
            } else {
                let mut buf = [0u8; 4];
                for byte in c.encode_utf8(&mut buf).bytes() {
                    out.push_str(&format!("%{byte:02X}"));
                }
            }
        }
        out
    }

    /// Resolve a `gs://bucket/name` reference to its public HTTPS URL.
    fn resolve(reference: &str) -> String {
        match reference.strip_prefix("gs://") {
            Some(rest) => format!("https://storage.googleapis.com/{rest}"),
            None => reference.to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for GcsStore {
    async fn put(&self, name: &str, bytes: &[u8], content_type: &str) -> Result<String> {
        let url = format!(
            "https://storage.googleapis.com/upload/storage/v1/b/{}/o?uploadType=media&name={}",
            self.bucket,
            Self::encode_name(name)
        );
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Content-Type", content_type)
            .body(bytes.to_vec())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StoryboardError::StorageFailed {
                object: name.to_string(),
                reason: format!("upload returned {}", response.status()),
            });
        }

        debug!(object = name, "uploaded to gcs");
        Ok(self.public_url(name))
    }

    async fn fetch(&self, reference: &str, dest: &Path) -> Result<()> {
        let response = self
            .client
            .get(Self::resolve(reference))
            .header("Authorization", format!("Bearer {}", self.token))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StoryboardError::StorageFailed {
                object: reference.to_string(),
                reason: format!("download returned {}", response.status()),
            });
        }

        let bytes = response.bytes().await?;
        fs::write(dest, &bytes).await?;
        Ok(())
    }
}

/// Filesystem-backed store for offline runs and tests. References are plain
/// paths under the base directory.
pub struct LocalStore {
    base: PathBuf,
}

impl LocalStore {
    pub fn new(base: impl AsRef<Path>) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn put(&self, name: &str, bytes: &[u8], _content_type: &str) -> Result<String> {
        let path = self.base.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, bytes).await?;
        Ok(path.to_string_lossy().into_owned())
    }

    async fn fetch(&self, reference: &str, dest: &Path) -> Result<()> {
        fs::copy(Path::new(reference), dest)
            .await
            .map_err(|e| StoryboardError::StorageFailed {
                object: reference.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_names_are_percent_encoded() {
        assert_eq!(
            GcsStore::encode_name("job_1/scene 2.png"),
            "job_1%2Fscene%202.png"
        );
    }

    #[test]
    fn gs_references_resolve_to_public_urls() {
        assert_eq!(
            GcsStore::resolve("gs://bucket/a/b.mp3"),
            "https://storage.googleapis.com/bucket/a/b.mp3"
        );
        assert_eq!(GcsStore::resolve("https://x/y"), "https://x/y");
    }
}
