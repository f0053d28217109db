//! Parallel map stage over the slice jobs.
//!
//! Dispatches slice workers across a bounded pool and collects every result,
//! in index order, regardless of completion order. Failure isolation is
//! per-slice: an error result neither cancels nor blocks sibling slices.

use super::slice::{process_slice, SliceJob, SliceResult, WorkerContext};
use crate::workspace::Workspace;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Run all slice jobs through the worker pool.
///
/// The effective pool size is `min(max_parallel, available parallelism,
/// job count)`, never zero. Per-slice artifacts are persisted inside each
/// worker future, so one slice's write neither waits for nor depends on its
/// siblings.
#[instrument(skip_all, fields(jobs = jobs.len()))]
pub(crate) async fn map_slices(
    ctx: &WorkerContext,
    workspace: &Workspace,
    jobs: Vec<SliceJob>,
    max_parallel: usize,
) -> Vec<SliceResult> {
    if jobs.is_empty() {
        warn!("No slices to process");
        return Vec::new();
    }

    let available = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let concurrency = max_parallel.min(available).min(jobs.len()).max(1);

    info!(
        "Processing {} slice(s) with {} worker(s)",
        jobs.len(),
        concurrency
    );

    let pb = Arc::new(ProgressBar::new(jobs.len() as u64));
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {spinner:.green} Slices    [{bar:30.cyan/blue}] {pos}/{len}")
            .unwrap()
            .progress_chars("█▓░"),
    );

    let mut results: Vec<SliceResult> = stream::iter(jobs)
        .map(|job| {
            let pb = pb.clone();
            async move {
                let result = process_slice(ctx, &job).await;
                persist_artifacts(workspace, &result);
                pb.inc(1);
                result
            }
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    pb.finish_and_clear();

    // Execution order is non-deterministic; the reduction depends on run
    // order, so sort once the pool has drained.
    results.sort_by_key(|r| r.index);

    let succeeded = results.iter().filter(|r| !r.summary.is_empty()).count();
    let failed = results.iter().filter(|r| r.error.is_some()).count();
    info!("Map stage complete: {} succeeded, {} failed", succeeded, failed);

    results
}

/// Write one slice's artifacts. A failed write is logged, not fatal: the
/// result itself still flows into the reduction.
fn persist_artifacts(workspace: &Workspace, result: &SliceResult) {
    if !result.transcript.is_empty() {
        if let Err(e) = workspace.write_transcript(result.index, &result.transcript) {
            warn!("Failed to persist transcript {}: {}", result.index, e);
        }
    }
    if !result.summary.is_empty() {
        if let Err(e) = workspace.write_summary(result.index, &result.summary) {
            warn!("Failed to persist summary {}: {}", result.index, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Prompts;
    use crate::limiter::RateLimiter;
    use crate::remote::mock::MockService;
    use crate::retry::RetryPolicy;
    use crate::windowing::AudioWindow;
    use std::path::PathBuf;
    use tokio_util::sync::CancellationToken;

    fn context(service: Arc<MockService>) -> WorkerContext {
        WorkerContext {
            service,
            limiter: Arc::new(RateLimiter::new(1000)),
            policy: RetryPolicy::default(),
            prompts: Prompts::default(),
            cancel: CancellationToken::new(),
        }
    }

    fn jobs(count: usize) -> Vec<SliceJob> {
        (0..count)
            .map(|index| SliceJob {
                index,
                window: AudioWindow {
                    index,
                    start_ms: index as u64 * 1000,
                    end_ms: (index as u64 + 1) * 1000,
                },
                audio_path: PathBuf::from(format!("/tmp/part_{}.mp3", index)),
            })
            .collect()
    }

    fn test_workspace() -> (tempfile::TempDir, Workspace) {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::create(dir.path(), "test").unwrap();
        (dir, ws)
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_in_index_order_with_isolated_failure() {
        let service = Arc::new(MockService::new().with_failing_audio("part_1"));
        let ctx = context(service);
        let (_dir, ws) = test_workspace();

        let results = map_slices(&ctx, &ws, jobs(3), 2).await;

        assert_eq!(results.len(), 3);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.index, i);
        }

        assert!(!results[0].summary.is_empty());
        assert!(results[0].error.is_none());

        assert!(results[1].summary.is_empty());
        assert!(results[1].error.is_some());

        assert!(!results[2].summary.is_empty());
        assert!(results[2].error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_artifacts_written_per_slice() {
        let service = Arc::new(MockService::new().with_failing_audio("part_1"));
        let ctx = context(service);
        let (_dir, ws) = test_workspace();

        map_slices(&ctx, &ws, jobs(3), 2).await;

        assert!(ws.root().join("transcript/part_0.txt").exists());
        assert!(ws.root().join("summaries/part_0_summary.txt").exists());
        assert!(!ws.root().join("transcript/part_1.txt").exists());
        assert!(!ws.root().join("summaries/part_1_summary.txt").exists());
        assert!(ws.root().join("summaries/part_2_summary.txt").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_job_list() {
        let service = Arc::new(MockService::new());
        let ctx = context(service);
        let (_dir, ws) = test_workspace();

        let results = map_slices(&ctx, &ws, Vec::new(), 2).await;
        assert!(results.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pool_wider_than_job_count() {
        let service = Arc::new(MockService::new());
        let ctx = context(service);
        let (_dir, ws) = test_workspace();

        // Cap far above the job count must still process everything.
        let results = map_slices(&ctx, &ws, jobs(2), 64).await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.error.is_none()));
    }
}
