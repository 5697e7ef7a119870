//! Image references and format normalization
//!
//! The completion service only reliably accepts PNG, JPEG, GIF and WEBP, so
//! bytes are sniffed and checked against that list before they are published
//! or inlined. Anything else is rejected with `UnsupportedFormat` without
//! touching the network.

use base64::Engine;
use serde::Serialize;

use crate::error::DocentError;

/// Image encodings the completion service accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Webp,
}

impl ImageFormat {
    /// MIME subtype, as in `image/<subtype>`
    pub fn subtype(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Gif => "gif",
            ImageFormat::Webp => "webp",
        }
    }

    pub fn mime_type(self) -> String {
        format!("image/{}", self.subtype())
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            other => other.subtype(),
        }
    }

    /// Parse a declared content type such as `image/png` or `image/jpg; q=1`
    pub fn from_mime(content_type: &str) -> Option<Self> {
        let essence = content_type.split(';').next()?.trim().to_ascii_lowercase();
        match essence.as_str() {
            "image/png" => Some(ImageFormat::Png),
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(ImageFormat::Jpeg),
            "image/gif" => Some(ImageFormat::Gif),
            "image/webp" => Some(ImageFormat::Webp),
            _ => None,
        }
    }

    /// Identify the format from the leading magic bytes
    pub fn sniff(bytes: &[u8]) -> Result<Self, DocentError> {
        let format = image::guess_format(bytes)
            .map_err(|_| DocentError::UnsupportedFormat("unrecognized data".to_string()))?;

        match format {
            image::ImageFormat::Png => Ok(ImageFormat::Png),
            image::ImageFormat::Jpeg => Ok(ImageFormat::Jpeg),
            image::ImageFormat::Gif => Ok(ImageFormat::Gif),
            image::ImageFormat::WebP => Ok(ImageFormat::Webp),
            other => Err(DocentError::UnsupportedFormat(
                format!("{:?}", other).to_lowercase(),
            )),
        }
    }
}

/// Check raw bytes before they are published or inlined.
///
/// The sniffed format decides. A declared content type, when the caller has
/// one, must itself be an allowed image type.
pub fn normalize(bytes: &[u8], declared: Option<&str>) -> Result<ImageFormat, DocentError> {
    if bytes.is_empty() {
        return Err(DocentError::UnsupportedFormat("empty data".to_string()));
    }

    if let Some(content_type) = declared.filter(|ct| !ct.trim().is_empty()) {
        if ImageFormat::from_mime(content_type).is_none() {
            return Err(DocentError::UnsupportedFormat(content_type.to_string()));
        }
    }

    ImageFormat::sniff(bytes)
}

/// An image the completion service can read: a URL it fetches itself, or the
/// bytes inlined into the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageReference {
    Url(String),
    Inline { bytes: Vec<u8>, format: ImageFormat },
}

impl ImageReference {
    pub fn url(url: impl Into<String>) -> Self {
        ImageReference::Url(url.into())
    }

    /// Wrap local bytes, rejecting anything outside the allowed formats
    pub fn inline(bytes: Vec<u8>) -> Result<Self, DocentError> {
        let format = normalize(&bytes, None)?;
        Ok(ImageReference::Inline { bytes, format })
    }

    /// The URL placed in the request: the URL itself, or a
    /// `data:image/<subtype>;base64,` URL for inline bytes
    pub fn to_request_url(&self) -> String {
        match self {
            ImageReference::Url(url) => url.clone(),
            ImageReference::Inline { bytes, format } => format!(
                "data:{};base64,{}",
                format.mime_type(),
                base64::engine::general_purpose::STANDARD.encode(bytes)
            ),
        }
    }

    /// Short form for logs and responses; never includes inline payloads
    pub fn summary(&self) -> String {
        match self {
            ImageReference::Url(url) => url.clone(),
            ImageReference::Inline { bytes, format } => {
                format!("inline {} ({} bytes)", format.mime_type(), bytes.len())
            }
        }
    }
}
