//! Per-run workspace layout.
//!
//! Each run owns a directory under the configured workspace root, keyed by
//! the sanitized source name, with subdirectories for sliced audio,
//! transcripts, and summaries. The pipeline only writes artifacts here; it
//! never reads them back within the same run.

use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

const SLICE_DIR: &str = "slice_audio";
const TRANSCRIPT_DIR: &str = "transcript";
const SUMMARY_DIR: &str = "summaries";

/// Handle to one run's workspace directory.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Create the workspace for `run_key` under `base`, including all
    /// subdirectories. Existing directories are reused.
    pub fn create(base: &Path, run_key: &str) -> Result<Self> {
        let root = base.join(run_key);

        std::fs::create_dir_all(root.join(SLICE_DIR))?;
        std::fs::create_dir_all(root.join(TRANSCRIPT_DIR))?;
        std::fs::create_dir_all(root.join(SUMMARY_DIR))?;

        debug!("Workspace ready at {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path for slice `index`'s audio file.
    pub fn slice_path(&self, index: usize) -> PathBuf {
        self.root.join(SLICE_DIR).join(format!("part_{}.mp3", index))
    }

    /// Persist slice `index`'s transcript.
    pub fn write_transcript(&self, index: usize, text: &str) -> Result<()> {
        let path = self
            .root
            .join(TRANSCRIPT_DIR)
            .join(format!("part_{}.txt", index));
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Persist slice `index`'s summary.
    pub fn write_summary(&self, index: usize, text: &str) -> Result<()> {
        let path = self
            .root
            .join(SUMMARY_DIR)
            .join(format!("part_{}_summary.txt", index));
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Persist the final reduced summary.
    pub fn write_final_summary(&self, text: &str) -> Result<()> {
        let path = self.root.join(SUMMARY_DIR).join("final_summary.txt");
        std::fs::write(path, text)?;
        Ok(())
    }
}
