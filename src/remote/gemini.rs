//! Gemini implementation of the remote generative service.
//!
//! Speaks the Generative Language REST API directly: resumable file upload,
//! file-state polling, and `models/{model}:generateContent`. All error
//! classification for this provider lives here, including the last-resort
//! scan of free-text messages for a "retry in Ns" hint.

use super::{AssetHandle, AssetState, GenerativeService, RemoteError, RemoteResult};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

const BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default timeout for API requests (5 minutes). Transcribing a 5-minute
/// audio window is slow; generation requests routinely run past a minute.
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// MIME type of the sliced audio. Slices are always exported as MP3.
const AUDIO_MIME: &str = "audio/mpeg";

/// Gemini API client.
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    retry_hint_regex: Regex,
}

impl GeminiClient {
    /// Create a client for the given API key and model.
    pub fn new(api_key: &str, model: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            base_url: BASE_URL.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            // Some quota errors only carry the suggested wait inside the
            // human-readable message, e.g. "... Please retry in 39s."
            retry_hint_regex: Regex::new(r"(?i)retry in (\d+(?:\.\d+)?)s")
                .expect("Invalid regex"),
        }
    }

    /// Classify a non-success API response into a [`RemoteError`].
    fn classify_error(&self, status: u16, body: &str) -> RemoteError {
        let parsed: Option<ApiErrorEnvelope> = serde_json::from_str(body).ok();
        let detail = parsed.as_ref().map(|e| &e.error);

        let message = detail
            .and_then(|d| d.message.clone())
            .unwrap_or_else(|| format!("HTTP {}: {}", status, truncate(body, 300)));

        let api_status = detail.and_then(|d| d.status.as_deref()).unwrap_or("");

        let throttled = status == 429
            || api_status == "RESOURCE_EXHAUSTED"
            || message.to_lowercase().contains("quota");

        if !throttled {
            return RemoteError::Fatal(message);
        }

        let retry_after = detail
            .and_then(|d| parse_retry_delay(d.details.as_deref()))
            .or_else(|| self.scan_retry_hint(&message));

        RemoteError::RateLimited {
            retry_after,
            message,
        }
    }

    /// Last-resort fallback: scan the error message for a "retry in Ns" hint.
    fn scan_retry_hint(&self, message: &str) -> Option<Duration> {
        let caps = self.retry_hint_regex.captures(message)?;
        let seconds: f64 = caps.get(1)?.as_str().parse().ok()?;
        Some(Duration::from_secs_f64(seconds))
    }

    /// Convert a response into `Ok(body)` or a classified error.
    async fn check(&self, response: reqwest::Response) -> RemoteResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .map_err(|e| RemoteError::Fatal(format!("Failed to read error body: {}", e)))?;

        Err(self.classify_error(status.as_u16(), &body))
    }
}

#[async_trait]
impl GenerativeService for GeminiClient {
    async fn upload_audio(&self, path: &Path) -> RemoteResult<AssetHandle> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| RemoteError::Fatal(format!("Failed to read {}: {}", path.display(), e)))?;

        let display_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp3");

        debug!("Uploading {} ({} bytes)", display_name, bytes.len());

        // Resumable upload, phase 1: announce the file and get the upload URL.
        let start = self
            .http
            .post(format!("{}/upload/v1beta/files", self.base_url))
            .query(&[("key", self.api_key.as_str())])
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len())
            .header("X-Goog-Upload-Header-Content-Type", AUDIO_MIME)
            .json(&serde_json::json!({ "file": { "display_name": display_name } }))
            .send()
            .await
            .map_err(transport_error)?;

        let start = self.check(start).await?;

        let upload_url = start
            .headers()
            .get("X-Goog-Upload-URL")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| RemoteError::Fatal("Upload URL missing from response".into()))?
            .to_string();

        // Phase 2: send the bytes and finalize.
        let finish = self
            .http
            .post(&upload_url)
            .header("X-Goog-Upload-Command", "upload, finalize")
            .header("X-Goog-Upload-Offset", 0)
            .body(bytes)
            .send()
            .await
            .map_err(transport_error)?;

        let file: UploadResponse = self
            .check(finish)
            .await?
            .json()
            .await
            .map_err(|e| RemoteError::Fatal(format!("Invalid upload response: {}", e)))?;

        let uri = file.file.uri.unwrap_or_else(|| file.file.name.clone());

        Ok(AssetHandle {
            name: file.file.name,
            uri,
        })
    }

    async fn asset_state(&self, asset: &AssetHandle) -> RemoteResult<AssetState> {
        let response = self
            .http
            .get(format!("{}/v1beta/{}", self.base_url, asset.name))
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(transport_error)?;

        let file: FileResource = self
            .check(response)
            .await?
            .json()
            .await
            .map_err(|e| RemoteError::Fatal(format!("Invalid file resource: {}", e)))?;

        Ok(match file.state.as_deref() {
            Some("ACTIVE") => AssetState::Active,
            Some("FAILED") => AssetState::Failed,
            _ => AssetState::Pending,
        })
    }

    async fn generate_from_audio(
        &self,
        prompt: &str,
        asset: &AssetHandle,
    ) -> RemoteResult<String> {
        let body = serde_json::json!({
            "contents": [{
                "parts": [
                    { "text": prompt },
                    { "file_data": { "mime_type": AUDIO_MIME, "file_uri": asset.uri } },
                ]
            }]
        });

        self.generate(body).await
    }

    async fn generate_text(&self, prompt: &str) -> RemoteResult<String> {
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        self.generate(body).await
    }
}

impl GeminiClient {
    async fn generate(&self, body: serde_json::Value) -> RemoteResult<String> {
        let response = self
            .http
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let generated: GenerateResponse = self
            .check(response)
            .await?
            .json()
            .await
            .map_err(|e| RemoteError::Fatal(format!("Invalid generation response: {}", e)))?;

        let text = generated
            .candidates
            .unwrap_or_default()
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            warn!("Generation returned no candidates");
        }

        Ok(text)
    }
}

fn transport_error(e: reqwest::Error) -> RemoteError {
    RemoteError::Fatal(format!("Request failed: {}", e))
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Extract a `RetryInfo.retryDelay` hint ("39s") from the structured error
/// details, if the service provided one.
fn parse_retry_delay(details: Option<&[serde_json::Value]>) -> Option<Duration> {
    for detail in details? {
        if detail.get("@type").and_then(|t| t.as_str())
            == Some("type.googleapis.com/google.rpc.RetryInfo")
        {
            let delay = detail.get("retryDelay")?.as_str()?;
            let seconds: f64 = delay.strip_suffix('s')?.parse().ok()?;
            return Some(Duration::from_secs_f64(seconds));
        }
    }
    None
}

// === Wire types ===

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: FileResource,
}

#[derive(Debug, Deserialize)]
struct FileResource {
    name: String,
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    details: Option<Vec<serde_json::Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GeminiClient {
        GeminiClient::new("test-key", "gemini-2.5-flash")
    }

    #[test]
    fn test_classify_quota_error_with_retry_info() {
        let body = r#"{
            "error": {
                "code": 429,
                "message": "Resource has been exhausted",
                "status": "RESOURCE_EXHAUSTED",
                "details": [{
                    "@type": "type.googleapis.com/google.rpc.RetryInfo",
                    "retryDelay": "39s"
                }]
            }
        }"#;

        match client().classify_error(429, body) {
            RemoteError::RateLimited { retry_after, .. } => {
                assert_eq!(retry_after, Some(Duration::from_secs(39)));
            }
            other => panic!("expected RateLimited, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_quota_error_with_message_hint() {
        let body = r#"{
            "error": {
                "code": 429,
                "message": "Quota exceeded. Please retry in 17.5s.",
                "status": "RESOURCE_EXHAUSTED"
            }
        }"#;

        match client().classify_error(429, body) {
            RemoteError::RateLimited { retry_after, .. } => {
                assert_eq!(retry_after, Some(Duration::from_secs_f64(17.5)));
            }
            other => panic!("expected RateLimited, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_quota_error_without_hint() {
        let body = r#"{"error": {"code": 429, "message": "Too many requests", "status": "RESOURCE_EXHAUSTED"}}"#;

        match client().classify_error(429, body) {
            RemoteError::RateLimited { retry_after, .. } => {
                assert_eq!(retry_after, None);
            }
            other => panic!("expected RateLimited, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_non_quota_error_is_fatal() {
        let body = r#"{"error": {"code": 400, "message": "Invalid argument", "status": "INVALID_ARGUMENT"}}"#;

        match client().classify_error(400, body) {
            RemoteError::Fatal(message) => assert!(message.contains("Invalid argument")),
            other => panic!("expected Fatal, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_unparseable_body() {
        match client().classify_error(500, "<html>Internal Server Error</html>") {
            RemoteError::Fatal(message) => assert!(message.contains("HTTP 500")),
            other => panic!("expected Fatal, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_retry_delay_ignores_other_details() {
        let details = vec![
            serde_json::json!({"@type": "type.googleapis.com/google.rpc.ErrorInfo"}),
            serde_json::json!({
                "@type": "type.googleapis.com/google.rpc.RetryInfo",
                "retryDelay": "8s"
            }),
        ];

        assert_eq!(
            parse_retry_delay(Some(&details)),
            Some(Duration::from_secs(8))
        );
        assert_eq!(parse_retry_delay(Some(&[])), None);
        assert_eq!(parse_retry_delay(None), None);
    }
}
