//! Pipeline orchestration.
//!
//! A run moves through a fixed, linear stage sequence: create the workspace,
//! slice the audio, map the slices through the worker pool, reduce the slice
//! summaries into the final document. Failures in the first three stages are
//! fatal to the run; a failure in the reduction alone is downgraded to a
//! sentinel summary so a run that got that far always produces a response.

mod map;
mod slice;

pub use slice::{SliceJob, SliceResult};

use crate::audio::{probe_duration_ms, slice_audio};
use crate::config::{Prompts, Settings};
use crate::error::{ReferatError, Result};
use crate::ingest::sanitize_filename;
use crate::limiter::RateLimiter;
use crate::remote::{GeminiClient, GenerativeService};
use crate::retry::{call_with_retry, RetryPolicy};
use crate::windowing::plan_windows;
use crate::workspace::Workspace;
use map::map_slices;
use slice::WorkerContext;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Final summary used when no slice produced a summary. No remote call is
/// made in that case.
pub const NO_SUMMARY_SENTINEL: &str =
    "No summary available: no slice summaries were produced.";

/// The pipeline and its shared components.
pub struct Pipeline {
    settings: Settings,
    prompts: Prompts,
    service: Arc<dyn GenerativeService>,
    limiter: Arc<RateLimiter>,
    cancel: CancellationToken,
}

/// Result of one completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    /// Display name of the processed source; also the workspace key.
    pub file_name: String,
    pub workspace_path: PathBuf,
    pub slice_count: usize,
    /// Slices that produced a summary.
    pub succeeded: usize,
    /// Slices that ended with an error.
    pub failed: usize,
    pub final_summary: String,
}

impl Pipeline {
    /// Create a pipeline from settings, wiring up the Gemini client and the
    /// shared rate limiter.
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate()?;

        let api_key = settings.gemini.api_key.clone().ok_or_else(|| {
            ReferatError::Config(
                "gemini.api_key is not set; add it to the config file or set GEMINI_API_KEY"
                    .into(),
            )
        })?;

        let service: Arc<dyn GenerativeService> =
            Arc::new(GeminiClient::new(&api_key, &settings.gemini.model));
        let limiter = Arc::new(RateLimiter::new(settings.gemini.max_requests_per_minute));

        Ok(Self::with_components(
            settings,
            Prompts::default(),
            service,
            limiter,
        ))
    }

    /// Create a pipeline with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        service: Arc<dyn GenerativeService>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            settings,
            prompts,
            service,
            limiter,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that aborts the current run when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run the full pipeline over a local audio file.
    #[instrument(skip(self, audio_path), fields(name = %display_name))]
    pub async fn process_file(
        &self,
        audio_path: &Path,
        display_name: &str,
    ) -> Result<RunSummary> {
        let run_id = Uuid::new_v4();
        info!("Starting run {}", run_id);

        // Stage 1: workspace
        let run_key = sanitize_filename(display_name);
        let workspace = Workspace::create(&self.settings.workspace_dir(), &run_key)?;

        // Stage 2: slice the audio along the window plan
        let duration_ms = probe_duration_ms(audio_path).await?;
        let windows = plan_windows(
            duration_ms,
            self.settings.slicing.window_seconds * 1000,
            self.settings.slicing.overlap_seconds * 1000,
        );
        info!(
            "Source is {:.1}s, planned {} window(s)",
            duration_ms as f64 / 1000.0,
            windows.len()
        );
        if windows.is_empty() {
            warn!("Source audio is empty; nothing to slice");
        }
        slice_audio(audio_path, &workspace, &windows).await?;

        // Stage 3: map slices through the bounded pool
        let jobs: Vec<SliceJob> = windows
            .iter()
            .map(|w| SliceJob {
                index: w.index,
                window: *w,
                audio_path: workspace.slice_path(w.index),
            })
            .collect();

        let ctx = WorkerContext {
            service: self.service.clone(),
            limiter: self.limiter.clone(),
            policy: self.retry_policy(),
            prompts: self.prompts.clone(),
            cancel: self.cancel.clone(),
        };

        let results = map_slices(
            &ctx,
            &workspace,
            jobs,
            self.settings.pipeline.max_parallel_slices,
        )
        .await;

        if self.cancel.is_cancelled() {
            return Err(ReferatError::Cancelled);
        }

        let succeeded = results.iter().filter(|r| !r.summary.is_empty()).count();
        let failed = results.iter().filter(|r| r.error.is_some()).count();

        // Results arrive sorted by index, so this preserves run order.
        let summaries: Vec<String> = results
            .iter()
            .filter(|r| !r.summary.is_empty())
            .map(|r| r.summary.clone())
            .collect();

        // Stage 4: reduce
        let final_summary = self.reduce(&workspace, &summaries).await;

        info!("Run {} complete", run_id);
        Ok(RunSummary {
            run_id,
            file_name: run_key,
            workspace_path: workspace.root().to_path_buf(),
            slice_count: results.len(),
            succeeded,
            failed,
            final_summary,
        })
    }

    /// Fold the slice summaries into the final summary.
    ///
    /// This is the one place where a remote failure is swallowed rather than
    /// raised: the run still completes, carrying a sentinel that embeds the
    /// cause.
    async fn reduce(&self, workspace: &Workspace, summaries: &[String]) -> String {
        if summaries.is_empty() {
            warn!("No slice summaries; skipping final summary generation");
            return NO_SUMMARY_SENTINEL.to_string();
        }

        info!("Reducing {} slice summaries", summaries.len());

        let combined = summaries.join("\n\n");
        let prompt = self.prompts.final_summary_prompt(&combined);

        match call_with_retry(&self.limiter, &self.retry_policy(), &self.cancel, || {
            self.service.generate_text(&prompt)
        })
        .await
        {
            Ok(text) => {
                if let Err(e) = workspace.write_final_summary(&text) {
                    warn!("Failed to persist final summary: {}", e);
                }
                text
            }
            Err(e) => {
                error!("Final summary generation failed: {}", e);
                format!("Summary generation failed: {}", e)
            }
        }
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.settings.gemini.max_retries,
            ..RetryPolicy::default()
        }
    }
}
