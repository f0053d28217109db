//! Scriptable in-memory service implementation for pipeline tests.

use super::{AssetHandle, AssetState, GenerativeService, RemoteError, RemoteResult};
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

/// A [`GenerativeService`] whose behavior is scripted per test.
///
/// Transcription responses echo the uploaded slice name so tests can assert
/// ordering; prompts sent to `generate_text` are recorded for inspection.
#[derive(Default)]
pub struct MockService {
    /// Slice names (substring match) whose transcription fails fatally.
    fail_audio_for: Vec<String>,
    /// Slice names (substring match) that transcribe to an empty string.
    empty_audio_for: Vec<String>,
    /// When set, uploaded assets never leave the pending state.
    never_ready: bool,
    /// When set, every `generate_text` call fails fatally.
    fail_text: bool,
    pub audio_calls: AtomicU32,
    pub text_calls: AtomicU32,
    pub state_polls: AtomicU32,
    pub upload_calls: AtomicU32,
    text_prompts: Mutex<Vec<String>>,
}

impl MockService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failing_audio(mut self, name_fragment: &str) -> Self {
        self.fail_audio_for.push(name_fragment.to_string());
        self
    }

    pub fn with_empty_transcript(mut self, name_fragment: &str) -> Self {
        self.empty_audio_for.push(name_fragment.to_string());
        self
    }

    pub fn with_never_ready(mut self) -> Self {
        self.never_ready = true;
        self
    }

    pub fn with_failing_text(mut self) -> Self {
        self.fail_text = true;
        self
    }

    /// Prompts passed to `generate_text`, in call order.
    pub fn text_prompts(&self) -> Vec<String> {
        self.text_prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeService for MockService {
    async fn upload_audio(&self, path: &Path) -> RemoteResult<AssetHandle> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("audio")
            .to_string();

        Ok(AssetHandle {
            name: format!("files/{}", stem),
            uri: format!("mock://{}", stem),
        })
    }

    async fn asset_state(&self, _asset: &AssetHandle) -> RemoteResult<AssetState> {
        self.state_polls.fetch_add(1, Ordering::SeqCst);
        if self.never_ready {
            Ok(AssetState::Pending)
        } else {
            Ok(AssetState::Active)
        }
    }

    async fn generate_from_audio(
        &self,
        _prompt: &str,
        asset: &AssetHandle,
    ) -> RemoteResult<String> {
        self.audio_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_audio_for.iter().any(|f| asset.name.contains(f)) {
            return Err(RemoteError::Fatal(format!(
                "transcription failed for {}",
                asset.name
            )));
        }
        if self.empty_audio_for.iter().any(|f| asset.name.contains(f)) {
            return Ok(String::new());
        }

        Ok(format!("transcript of {}", asset.name))
    }

    async fn generate_text(&self, prompt: &str) -> RemoteResult<String> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        self.text_prompts.lock().unwrap().push(prompt.to_string());

        if self.fail_text {
            return Err(RemoteError::Fatal("text generation failed".into()));
        }

        Ok(format!("generated from {} chars", prompt.len()))
    }
}
