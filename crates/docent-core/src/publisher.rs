//! Publisher
//!
//! Makes local image bytes reachable at a stable public URL by writing them
//! to the configured object store. An existing object at the same path is
//! updated against its current version; otherwise the object is created.
//!
//! Re-publishing identical bytes still writes. Nothing is hashed or compared,
//! so each call costs one lookup and one write.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::DocentError;
use crate::reference::{normalize, ImageFormat};
use crate::storage::ObjectStore;

/// Outcome of a successful publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishResult {
    pub url: String,
    pub path: String,
    pub format: ImageFormat,
    /// True when an existing object was overwritten
    pub updated: bool,
}

#[derive(Clone)]
pub struct Publisher {
    store: Arc<dyn ObjectStore>,
}

impl Publisher {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    pub async fn publish(
        &self,
        bytes: &[u8],
        path: &str,
        note: &str,
    ) -> Result<PublishResult, DocentError> {
        let path = path.trim().trim_start_matches('/');
        if path.is_empty() {
            return Err(DocentError::publish_failed("destination path is empty"));
        }

        let format = normalize(bytes, None)?;

        debug!(
            "Publishing {} ({} bytes) to {}",
            format.mime_type(),
            bytes.len(),
            path
        );

        let existing = self.store.lookup(path).await.map_err(|e| {
            warn!("Lookup of {} failed: {}", path, e);
            DocentError::publish_failed(e)
        })?;

        let updated = match existing {
            Some(handle) => {
                debug!("{} exists at version {}, updating", path, handle.version);
                self.store.update(handle, bytes, note).await.map(|_| true)
            }
            None => self.store.create(path, bytes, note).await.map(|_| false),
        }
        .map_err(|e| {
            warn!("Write of {} failed: {}", path, e);
            DocentError::publish_failed(e)
        })?;

        let url = self.store.public_url(path);
        info!("Published {} -> {}", path, url);

        Ok(PublishResult {
            url,
            path: path.to_string(),
            format,
            updated,
        })
    }
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::samples::{BMP, PNG, TEXT};
    use crate::storage::memory::MemoryStore;
    use std::sync::atomic::Ordering;

    fn publisher() -> (Arc<MemoryStore>, Publisher) {
        let store = Arc::new(MemoryStore::default());
        (store.clone(), Publisher::new(store))
    }

    #[tokio::test]
    async fn test_publish_creates_then_lookup_returns_bytes() {
        let (store, publisher) = publisher();

        let result = publisher
            .publish(PNG, "imgs/red.png", "Upload imgs/red.png")
            .await
            .unwrap();

        assert_eq!(
            result.url,
            "https://raw.githubusercontent.com/octo/gallery/main/imgs/red.png"
        );
        assert!(!result.updated);
        assert_eq!(result.format, ImageFormat::Png);
        assert_eq!(store.content("imgs/red.png").unwrap(), PNG);
        assert_eq!(store.creates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_second_publish_updates_with_same_url() {
        let (store, publisher) = publisher();

        let first = publisher.publish(PNG, "imgs/red.png", "first").await.unwrap();
        let mut changed = PNG.to_vec();
        changed.push(0);
        let second = publisher
            .publish(&changed, "imgs/red.png", "second")
            .await
            .unwrap();

        assert_eq!(first.url, second.url);
        assert!(second.updated);
        assert_eq!(store.creates.load(Ordering::SeqCst), 1);
        assert_eq!(store.updates.load(Ordering::SeqCst), 1);
        assert_eq!(store.content("imgs/red.png").unwrap(), changed);
    }

    #[tokio::test]
    async fn test_identical_republish_still_writes() {
        let (store, publisher) = publisher();

        publisher.publish(PNG, "imgs/red.png", "first").await.unwrap();
        publisher.publish(PNG, "imgs/red.png", "again").await.unwrap();

        assert_eq!(store.updates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unsupported_format_makes_no_network_call() {
        let (store, publisher) = publisher();

        for bytes in [BMP, TEXT] {
            let err = publisher.publish(bytes, "imgs/x", "note").await.unwrap_err();
            assert!(matches!(err, DocentError::UnsupportedFormat(_)));
        }
        assert_eq!(store.network_calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_path_rejected() {
        let (store, publisher) = publisher();

        let err = publisher.publish(PNG, " / ", "note").await.unwrap_err();
        assert!(matches!(err, DocentError::PublishFailed { .. }));
        assert_eq!(store.network_calls(), 0);
    }

    #[tokio::test]
    async fn test_directory_path_fails() {
        let (_store, publisher) = publisher();
        publisher.publish(PNG, "imgs/red.png", "note").await.unwrap();

        let err = publisher.publish(PNG, "imgs", "note").await.unwrap_err();
        assert!(matches!(err, DocentError::PublishFailed { .. }));
        assert!(err.to_string().contains("not a file"));
    }

    #[tokio::test]
    async fn test_backend_failure_is_wrapped() {
        let store = Arc::new(MemoryStore::failing("API error: 401 - Bad credentials"));
        let publisher = Publisher::new(store.clone());

        let err = publisher.publish(PNG, "imgs/red.png", "note").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "publish failed: API error: 401 - Bad credentials"
        );
        // No retry
        assert_eq!(store.network_calls(), 1);
    }
}
