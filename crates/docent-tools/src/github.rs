//! GitHub contents API client
//!
//! Stores files on a repository branch so they can be served from
//! raw.githubusercontent.com. Only what publishing needs is implemented:
//! - look up a file by path (content + blob sha)
//! - create a file
//! - update a file against the sha it currently has

use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const GITHUB_API_BASE: &str = "https://api.github.com";
const GITHUB_RAW_BASE: &str = "https://raw.githubusercontent.com";
const GITHUB_API_VERSION: &str = "2022-11-28";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum GitHubError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("{path} is not a file")]
    NotAFile { path: String },
    #[error("invalid repository '{0}', expected owner/repo")]
    InvalidRepository(String),
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to decode file content: {0}")]
    Decode(#[from] base64::DecodeError),
}

/// Where published files live: owner, repository name and branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub owner: String,
    pub name: String,
    pub branch: String,
}

impl Repository {
    /// Parse an `owner/repo` slug
    pub fn parse(slug: &str, branch: &str) -> Result<Self, GitHubError> {
        let invalid = || GitHubError::InvalidRepository(slug.to_string());

        let (owner, name) = slug.trim().split_once('/').ok_or_else(invalid)?;
        let (owner, name) = (owner.trim(), name.trim());
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(invalid());
        }

        let branch = branch.trim();
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
            branch: if branch.is_empty() { "main" } else { branch }.to_string(),
        })
    }
}

/// A file entry from the contents API
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteFile {
    pub path: String,
    pub sha: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    /// Base64, wrapped at 60 columns. Absent in PUT responses.
    #[serde(default)]
    pub content: Option<String>,
}

fn default_kind() -> String {
    "file".to_string()
}

impl RemoteFile {
    /// Decode the file content, ignoring the line breaks GitHub inserts
    pub fn decoded_content(&self) -> Result<Vec<u8>, GitHubError> {
        let packed: String = self
            .content
            .as_deref()
            .unwrap_or_default()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        Ok(base64::engine::general_purpose::STANDARD.decode(packed)?)
    }
}

#[derive(Serialize)]
struct PutContents<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Deserialize)]
struct PutContentsResponse {
    content: RemoteFile,
}

#[derive(Clone)]
pub struct GitHubClient {
    client: reqwest::Client,
    token: Arc<String>,
    repository: Repository,
    api_base: String,
    raw_base: reqwest::Url,
}

impl GitHubClient {
    pub fn new(token: String, repository: Repository) -> Result<Self, GitHubError> {
        Self::with_base_urls(token, repository, GITHUB_API_BASE, GITHUB_RAW_BASE)
    }

    /// Point the client at a different API/raw host (GitHub Enterprise, tests)
    pub fn with_base_urls(
        token: String,
        repository: Repository,
        api_base: &str,
        raw_base: &str,
    ) -> Result<Self, GitHubError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("Docent/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let raw_base = reqwest::Url::parse(raw_base.trim_end_matches('/'))
            .map_err(|e| GitHubError::InvalidUrl(format!("{}: {}", raw_base, e)))?;
        if raw_base.cannot_be_a_base() {
            return Err(GitHubError::InvalidUrl(raw_base.to_string()));
        }

        Ok(Self {
            client,
            token: Arc::new(token),
            repository,
            api_base: api_base.trim_end_matches('/').to_string(),
            raw_base,
        })
    }

    /// Public URL of a file on the configured branch.
    ///
    /// Derived from owner, repository, branch and path only, so it is known
    /// before the file exists. Segments are percent-encoded the same way the
    /// contents API path is, so names with spaces or `#` still resolve.
    pub fn raw_url(&self, path: &str) -> String {
        let mut url = self.raw_base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend([self.repository.owner.as_str(), self.repository.name.as_str()])
                .extend(self.repository.branch.split('/'))
                .extend(path.split('/').filter(|segment| !segment.is_empty()));
        }
        url.to_string()
    }

    /// Fetch a file. `Ok(None)` when nothing exists at `path`.
    pub async fn get_file(&self, path: &str) -> Result<Option<RemoteFile>, GitHubError> {
        let url = self.contents_url(path)?;
        debug!("GitHub lookup {}", url);

        let response = self
            .authorized(self.client.get(url))
            .query(&[("ref", self.repository.branch.as_str())])
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GitHubError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        // Directories come back as a listing
        let body: serde_json::Value = response.json().await?;
        if body.is_array() {
            return Err(GitHubError::NotAFile {
                path: path.to_string(),
            });
        }

        let file: RemoteFile = serde_json::from_value(body)?;
        if file.kind != "file" {
            return Err(GitHubError::NotAFile {
                path: path.to_string(),
            });
        }

        Ok(Some(file))
    }

    /// Create a new file. Fails if one already exists at `path`.
    pub async fn create_file(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
    ) -> Result<RemoteFile, GitHubError> {
        self.put_contents(path, content, message, None).await
    }

    /// Replace an existing file. `sha` must be the blob sha GitHub currently
    /// holds for `path`, otherwise the API rejects the write.
    pub async fn update_file(
        &self,
        path: &str,
        sha: &str,
        content: &[u8],
        message: &str,
    ) -> Result<RemoteFile, GitHubError> {
        self.put_contents(path, content, message, Some(sha)).await
    }

    async fn put_contents(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        sha: Option<&str>,
    ) -> Result<RemoteFile, GitHubError> {
        let url = self.contents_url(path)?;
        let body = PutContents {
            message,
            content: base64::engine::general_purpose::STANDARD.encode(content),
            branch: &self.repository.branch,
            sha,
        };

        let response = self
            .authorized(self.client.put(url))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GitHubError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let written: PutContentsResponse = response.json().await?;
        info!(
            "{} {} ({} bytes) on {}",
            if sha.is_some() { "Updated" } else { "Created" },
            written.content.path,
            content.len(),
            self.repository.branch
        );

        Ok(written.content)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .bearer_auth(self.token.as_str())
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
    }

    fn contents_url(&self, path: &str) -> Result<reqwest::Url, GitHubError> {
        let mut url = reqwest::Url::parse(&self.api_base)
            .map_err(|e| GitHubError::InvalidUrl(format!("{}: {}", self.api_base, e)))?;

        url.path_segments_mut()
            .map_err(|_| GitHubError::InvalidUrl(self.api_base.clone()))?
            .pop_if_empty()
            .extend([
                "repos",
                self.repository.owner.as_str(),
                self.repository.name.as_str(),
                "contents",
            ])
            .extend(path.split('/').filter(|segment| !segment.is_empty()));

        Ok(url)
    }
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("token", &"[REDACTED]")
            .field("repository", &self.repository)
            .finish()
    }
}
