//! Per-slice worker: one job in, one result out.
//!
//! A worker drives a single window through upload, readiness polling,
//! transcription, and summarization. Every failure is folded into the
//! result; nothing escapes the worker boundary, so a bad slice can never
//! take the rest of the batch down with it.

use crate::config::Prompts;
use crate::error::{ReferatError, Result};
use crate::limiter::RateLimiter;
use crate::remote::{AssetHandle, AssetState, GenerativeService};
use crate::retry::{call_with_retry, RetryPolicy};
use crate::windowing::AudioWindow;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Maximum number of readiness polls before the upload is given up on.
const UPLOAD_POLL_ATTEMPTS: u32 = 60;
/// Pause between readiness polls.
const UPLOAD_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Immutable unit of map-stage work.
#[derive(Debug, Clone)]
pub struct SliceJob {
    pub index: usize,
    pub window: AudioWindow,
    /// Path of the sliced audio file to upload.
    pub audio_path: PathBuf,
}

/// Outcome of processing one slice.
///
/// Exactly one of `summary` or `error` is authoritative. Both may be empty
/// together: an empty transcript yields an empty summary and is not an
/// error. The transcript is retained even when a later step fails, so it
/// can still be persisted.
#[derive(Debug, Clone)]
pub struct SliceResult {
    pub index: usize,
    pub transcript: String,
    pub summary: String,
    pub error: Option<String>,
}

impl SliceResult {
    fn empty(index: usize) -> Self {
        Self {
            index,
            transcript: String::new(),
            summary: String::new(),
            error: None,
        }
    }
}

/// Shared handles a worker needs; cloned per map-stage invocation, shared by
/// reference across its workers.
pub(crate) struct WorkerContext {
    pub service: Arc<dyn GenerativeService>,
    pub limiter: Arc<RateLimiter>,
    pub policy: RetryPolicy,
    pub prompts: Prompts,
    pub cancel: CancellationToken,
}

/// Process one slice, producing exactly one result.
pub(crate) async fn process_slice(ctx: &WorkerContext, job: &SliceJob) -> SliceResult {
    let mut result = SliceResult::empty(job.index);
    debug!(
        "Processing slice {} [{}ms, {}ms)",
        job.index, job.window.start_ms, job.window.end_ms
    );

    let asset = match upload_and_await(ctx, job).await {
        Ok(asset) => asset,
        Err(e) => {
            warn!("Slice {}: {}", job.index, e);
            result.error = Some(e.to_string());
            return result;
        }
    };

    match call_with_retry(&ctx.limiter, &ctx.policy, &ctx.cancel, || {
        ctx.service
            .generate_from_audio(&ctx.prompts.transcription, &asset)
    })
    .await
    {
        Ok(transcript) => result.transcript = transcript,
        Err(e) => {
            warn!("Slice {}: transcription failed: {}", job.index, e);
            result.error = Some(e.to_string());
            return result;
        }
    }

    // An empty transcript is a silent window, not a failure; the summary
    // stays empty and no summarization call is made.
    if result.transcript.trim().is_empty() {
        return result;
    }

    let prompt = ctx.prompts.slice_summary_prompt(&result.transcript);
    match call_with_retry(&ctx.limiter, &ctx.policy, &ctx.cancel, || {
        ctx.service.generate_text(&prompt)
    })
    .await
    {
        Ok(summary) => result.summary = summary,
        Err(e) => {
            warn!("Slice {}: summarization failed: {}", job.index, e);
            result.error = Some(e.to_string());
        }
    }

    result
}

/// Upload the slice and wait for the asset to become active.
async fn upload_and_await(ctx: &WorkerContext, job: &SliceJob) -> Result<AssetHandle> {
    let asset = call_with_retry(&ctx.limiter, &ctx.policy, &ctx.cancel, || {
        ctx.service.upload_audio(&job.audio_path)
    })
    .await?;

    // Readiness polls are cheap metadata reads against the file resource;
    // they bypass the limiter and carry their own fixed bound instead.
    for _ in 0..UPLOAD_POLL_ATTEMPTS {
        let state = ctx.service.asset_state(&asset).await;
        match state {
            Ok(AssetState::Active) => return Ok(asset),
            Ok(AssetState::Failed) => {
                return Err(ReferatError::AssetNotReady(format!(
                    "{} was rejected by the service",
                    asset.name
                )));
            }
            Ok(AssetState::Pending) => {}
            Err(e) => return Err(ReferatError::RemoteCall(e.to_string())),
        }

        tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => return Err(ReferatError::Cancelled),
            _ = tokio::time::sleep(UPLOAD_POLL_INTERVAL) => {}
        }
    }

    Err(ReferatError::AssetNotReady(format!(
        "{} still pending after {} polls",
        asset.name, UPLOAD_POLL_ATTEMPTS
    )))
}
