//! Remote generative-service boundary.
//!
//! The pipeline talks to the transcription/summarization service only
//! through the [`GenerativeService`] trait, and every failure crossing the
//! boundary is already classified into a [`RemoteError`] variant. The retry
//! layer decides what to do with a pure match instead of scanning error
//! text; provider-specific parsing (including the free-text fallback) stays
//! inside the provider module.

mod gemini;

#[cfg(test)]
pub mod mock;

pub use gemini::GeminiClient;

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// Error returned by a remote call, classified at the provider boundary.
#[derive(Debug, Clone)]
pub enum RemoteError {
    /// The service throttled the call. `retry_after` is the wait the service
    /// suggested, if it provided one.
    RateLimited {
        retry_after: Option<Duration>,
        message: String,
    },
    /// Any other failure. Never retried.
    Fatal(String),
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteError::RateLimited { message, .. } => {
                write!(f, "rate limited: {}", message)
            }
            RemoteError::Fatal(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for RemoteError {}

/// Result type for calls crossing the remote boundary.
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Processing state of an uploaded asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetState {
    /// The service is still ingesting the asset.
    Pending,
    /// The asset is ready to be referenced in generation requests.
    Active,
    /// The service rejected the asset.
    Failed,
}

/// Reference to an asset uploaded to the remote service.
#[derive(Debug, Clone)]
pub struct AssetHandle {
    /// Service-side resource name, used to poll state.
    pub name: String,
    /// URI used to reference the asset in generation requests.
    pub uri: String,
}

/// A generative service that accepts audio assets and text prompts.
#[async_trait]
pub trait GenerativeService: Send + Sync {
    /// Upload an audio file, returning a handle to the created asset.
    async fn upload_audio(&self, path: &Path) -> RemoteResult<AssetHandle>;

    /// Query the processing state of an uploaded asset.
    async fn asset_state(&self, asset: &AssetHandle) -> RemoteResult<AssetState>;

    /// Generate text from a prompt over an uploaded audio asset.
    async fn generate_from_audio(&self, prompt: &str, asset: &AssetHandle)
        -> RemoteResult<String>;

    /// Generate text from a text-only prompt.
    async fn generate_text(&self, prompt: &str) -> RemoteResult<String>;
}
