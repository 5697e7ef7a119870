use thiserror::Error;

/// Underlying failure from a storage or completion backend
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Every way a publish or describe call can fail.
///
/// Backend errors are carried as `cause` so their message reaches the user.
#[derive(Debug, Error)]
pub enum DocentError {
    #[error("unsupported image format: {0} (expected PNG, JPEG, GIF or WEBP)")]
    UnsupportedFormat(String),

    #[error("publish failed: {cause}")]
    PublishFailed {
        #[source]
        cause: BoxError,
    },

    #[error("description failed: {cause}")]
    DescribeFailed {
        #[source]
        cause: BoxError,
    },

    #[error("missing or invalid configuration: {0}")]
    ConfigurationMissing(String),
}

impl DocentError {
    pub fn publish_failed(cause: impl Into<BoxError>) -> Self {
        Self::PublishFailed {
            cause: cause.into(),
        }
    }

    pub fn describe_failed(cause: impl Into<BoxError>) -> Self {
        Self::DescribeFailed {
            cause: cause.into(),
        }
    }
}
