//! Docent Tools - clients for the remote services Docent talks to
//!
//! Clients are organized by service:
//! - github: GitHub contents API, used to publish images at a stable URL
//! - completions: OpenAI-compatible chat completions, used to describe images

pub mod completions;
pub mod github;

pub use completions::{
    ChatMessage, ChatRequest, ChatResponse, CompletionClient, CompletionError, ContentPart,
};
pub use github::{GitHubClient, GitHubError, RemoteFile, Repository};
