//! HTTP surface
//!
//! - `GET  /health`
//! - `POST /describe/url`      JSON `{ "url": "..." }`
//! - `POST /describe/upload`   raw image body, `?name=<file name>`
//! - `POST /describe/capture`  raw camera frame body

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, DefaultBodyLimit, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::describer::DescriptionResult;
use crate::error::DocentError;
use crate::pipeline::{ImageSource, Pipeline};
use crate::reference::ImageReference;

/// Camera frames and phone photos routinely exceed axum's 2 MB default
const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/describe/url", post(describe_url))
        .route("/describe/upload", post(describe_upload))
        .route("/describe/capture", post(describe_capture))
        .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    publishing: bool,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        publishing: state.pipeline.publishes(),
    })
}

#[derive(Debug, Deserialize)]
pub struct UrlRequest {
    pub url: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UploadParams {
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DescribeResponse {
    pub description: String,
    pub image: ImageInfo,
}

#[derive(Debug, Serialize)]
pub struct ImageInfo {
    /// "url" or "inline"
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl From<DescriptionResult> for DescribeResponse {
    fn from(result: DescriptionResult) -> Self {
        let image = match result.reference {
            ImageReference::Url(url) => ImageInfo {
                kind: "url",
                url: Some(url),
                mime_type: None,
            },
            ImageReference::Inline { format, .. } => ImageInfo {
                kind: "inline",
                url: None,
                mime_type: Some(format.mime_type()),
            },
        };
        Self {
            description: result.text,
            image,
        }
    }
}

/// Error body: `{ "error": "<message>" }`
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Docent(DocentError),
}

impl From<DocentError> for ApiError {
    fn from(err: DocentError) -> Self {
        ApiError::Docent(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Docent(err) => {
                let status = match &err {
                    DocentError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    DocentError::PublishFailed { .. } | DocentError::DescribeFailed { .. } => {
                        StatusCode::BAD_GATEWAY
                    }
                    DocentError::ConfigurationMissing(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.to_string())
            }
        };

        warn!("Request failed ({}): {}", status, message);
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

async fn describe_url(
    State(state): State<AppState>,
    request: Result<Json<UrlRequest>, JsonRejection>,
) -> Result<Json<DescribeResponse>, ApiError> {
    let Json(request) =
        request.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    if request.url.trim().is_empty() {
        return Err(ApiError::BadRequest("Please enter an image URL".to_string()));
    }

    info!("Describe request for URL {}", request.url.trim());
    let result = state.pipeline.run(ImageSource::Url(request.url)).await?;
    Ok(Json(result.into()))
}

async fn describe_upload(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<DescribeResponse>, ApiError> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("Please upload an image file".to_string()));
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        // Generic binary uploads carry no format information
        .filter(|ct| !ct.starts_with("application/octet-stream"));

    info!(
        "Describe request for upload {:?} ({} bytes)",
        params.name,
        body.len()
    );

    let result = state
        .pipeline
        .run(ImageSource::Upload {
            name: params.name,
            content_type,
            bytes: body.to_vec(),
        })
        .await?;
    Ok(Json(result.into()))
}

async fn describe_capture(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<DescribeResponse>, ApiError> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("Could not capture an image".to_string()));
    }

    info!("Describe request for camera frame ({} bytes)", body.len());
    let result = state.pipeline.run(ImageSource::Capture(body.to_vec())).await?;
    Ok(Json(result.into()))
}
