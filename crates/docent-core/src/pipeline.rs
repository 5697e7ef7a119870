//! Image-to-description pipeline
//!
//! Turns whatever the user supplied into an `ImageReference` and describes
//! it. Typed URLs go straight to the describer. Uploaded files and camera
//! frames are checked, then published when storage is configured, or inlined
//! into the request when it is not.

use tracing::{debug, info};
use uuid::Uuid;

use crate::describer::{DescriptionResult, Describer};
use crate::error::DocentError;
use crate::publisher::Publisher;
use crate::reference::{normalize, ImageFormat, ImageReference};

/// Where an image came from
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// A URL typed by the user
    Url(String),
    /// An uploaded file, with its original name and declared content type
    Upload {
        name: Option<String>,
        content_type: Option<String>,
        bytes: Vec<u8>,
    },
    /// A frame captured from the camera
    Capture(Vec<u8>),
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    publisher: Option<Publisher>,
    describer: Describer,
    upload_dir: String,
}

impl Pipeline {
    pub fn new(publisher: Option<Publisher>, describer: Describer, upload_dir: &str) -> Self {
        Self {
            publisher,
            describer,
            upload_dir: upload_dir.trim_matches('/').to_string(),
        }
    }

    pub fn publishes(&self) -> bool {
        self.publisher.is_some()
    }

    /// Resolve the source to a reference and describe it
    pub async fn run(&self, source: ImageSource) -> Result<DescriptionResult, DocentError> {
        let reference = self.resolve(source).await?;
        self.describer.describe(reference).await
    }

    /// Make the source something the completion service can read
    pub async fn resolve(&self, source: ImageSource) -> Result<ImageReference, DocentError> {
        match source {
            ImageSource::Url(url) => {
                let url = url.trim();
                if url.is_empty() {
                    return Err(DocentError::describe_failed("image URL is empty"));
                }
                Ok(ImageReference::url(url))
            }
            ImageSource::Upload {
                name,
                content_type,
                bytes,
            } => {
                let format = normalize(&bytes, content_type.as_deref())?;
                let path = self.upload_path(name.as_deref(), format);
                self.publish_or_inline(bytes, format, &path).await
            }
            ImageSource::Capture(bytes) => {
                let format = normalize(&bytes, None)?;
                let path = self.capture_path(format);
                self.publish_or_inline(bytes, format, &path).await
            }
        }
    }

    async fn publish_or_inline(
        &self,
        bytes: Vec<u8>,
        format: ImageFormat,
        path: &str,
    ) -> Result<ImageReference, DocentError> {
        match &self.publisher {
            Some(publisher) => {
                let note = format!("Upload {}", path);
                let published = publisher.publish(&bytes, path, &note).await?;
                Ok(ImageReference::url(published.url))
            }
            None => {
                debug!("No storage configured, inlining {} bytes", bytes.len());
                Ok(ImageReference::Inline { bytes, format })
            }
        }
    }

    /// `<upload_dir>/<file name>`. Only the last component of the
    /// client-supplied name is kept, characters outside letters, digits, `-`,
    /// `_` and `.` become `_`, and the extension is replaced by the one for
    /// the detected format. Unusable or missing names get a random name.
    pub fn upload_path(&self, name: Option<&str>, format: ImageFormat) -> String {
        let file_name = name
            .and_then(|n| n.rsplit(|c: char| c == '/' || c == '\\').next())
            .and_then(|n| safe_stem(n.trim()))
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let path = self.join(&format!("{}.{}", file_name, format.extension()));
        info!("Upload will be stored at {}", path);
        path
    }

    /// `<upload_dir>/captures/<uuid>.<ext>`
    pub fn capture_path(&self, format: ImageFormat) -> String {
        self.join(&format!("captures/{}.{}", Uuid::new_v4(), format.extension()))
    }

    fn join(&self, relative: &str) -> String {
        if self.upload_dir.is_empty() {
            relative.to_string()
        } else {
            format!("{}/{}", self.upload_dir, relative)
        }
    }
}

fn safe_stem(file_name: &str) -> Option<String> {
    let stem = file_name
        .rsplit_once('.')
        .map_or(file_name, |(stem, _)| stem)
        .trim_matches('.');

    let stem: String = stem
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    (!stem.is_empty()).then_some(stem)
}
