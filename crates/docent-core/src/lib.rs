//! Docent Core Library
//!
//! Describes images with a multimodal model, publishing local images to a
//! GitHub repository first so the model can fetch them by URL.

pub mod config;
pub mod describer;
pub mod error;
pub mod pipeline;
pub mod publisher;
pub mod reference;
pub mod server;
pub mod storage;

// Re-export key types for convenience
pub use config::Config;
pub use describer::{CompletionService, DescriptionResult, Describer, DESCRIBE_INSTRUCTION};
pub use error::DocentError;
pub use pipeline::{ImageSource, Pipeline};
pub use publisher::{PublishResult, Publisher};
pub use reference::{ImageFormat, ImageReference};
pub use storage::{ObjectStore, RemoteFileHandle};
