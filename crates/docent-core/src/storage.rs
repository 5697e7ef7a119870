//! Remote object storage seam
//!
//! The publisher only needs lookup, create, update and a URL scheme. GitHub
//! is the production backend; tests use an in-memory store.

use async_trait::async_trait;
use docent_tools::GitHubClient;

use crate::error::BoxError;

/// An existing remote object and the version token required to overwrite it.
/// Consumed by the update that follows the lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFileHandle {
    pub path: String,
    pub version: String,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Resolve the object at `path`, `None` if nothing is there
    async fn lookup(&self, path: &str) -> Result<Option<RemoteFileHandle>, BoxError>;

    async fn create(&self, path: &str, bytes: &[u8], note: &str) -> Result<(), BoxError>;

    /// Overwrite an object. Rejected by the backend if `handle.version` is stale.
    async fn update(
        &self,
        handle: RemoteFileHandle,
        bytes: &[u8],
        note: &str,
    ) -> Result<(), BoxError>;

    /// Public URL for `path`, derivable without a network call
    fn public_url(&self, path: &str) -> String;
}

#[async_trait]
impl ObjectStore for GitHubClient {
    async fn lookup(&self, path: &str) -> Result<Option<RemoteFileHandle>, BoxError> {
        let file = self.get_file(path).await?;
        Ok(file.map(|f| RemoteFileHandle {
            path: f.path,
            version: f.sha,
        }))
    }

    async fn create(&self, path: &str, bytes: &[u8], note: &str) -> Result<(), BoxError> {
        self.create_file(path, bytes, note).await?;
        Ok(())
    }

    async fn update(
        &self,
        handle: RemoteFileHandle,
        bytes: &[u8],
        note: &str,
    ) -> Result<(), BoxError> {
        self.update_file(&handle.path, &handle.version, bytes, note)
            .await?;
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        self.raw_url(path)
    }
}
