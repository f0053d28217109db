//! Referat - Long-form Audio Summarization
//!
//! A CLI tool and HTTP API that distills long recordings into one summary.
//!
//! The name "Referat" is the Norwegian word for a written summary of a
//! meeting or talk.
//!
//! # Overview
//!
//! Referat processes audio in a map-reduce shape:
//!
//! 1. The source is cut into overlapping time windows.
//! 2. Each window is uploaded, transcribed, and summarized through the
//!    Gemini API by a bounded pool of workers sharing one rate limiter.
//! 3. The per-window summaries are reduced into a single final summary.
//!
//! A failing window never takes the batch down; its error is carried in the
//! result and reported alongside the final summary.
//!
//! # Architecture
//!
//! - `config` - Configuration and prompt templates
//! - `ingest` - Input classification (YouTube URL vs local file)
//! - `audio` - Audio download and window extraction (yt-dlp/ffmpeg)
//! - `windowing` - Deterministic window planning
//! - `limiter` - Sliding-window rate limiting, shared across workers
//! - `retry` - Retry/backoff chokepoint for all remote calls
//! - `remote` - Generative-service boundary and the Gemini client
//! - `workspace` - Per-run artifact directory
//! - `pipeline` - Orchestration: slice, map, reduce
//!
//! # Example
//!
//! ```rust,no_run
//! use referat::config::Settings;
//! use referat::pipeline::Pipeline;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut settings = Settings::load()?;
//!     settings.gemini.api_key = Some("...".to_string());
//!
//!     let pipeline = Pipeline::new(settings)?;
//!     let run = pipeline
//!         .process_file("talk.mp3".as_ref(), "talk.mp3")
//!         .await?;
//!     println!("{}", run.final_summary);
//!
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod cli;
pub mod config;
pub mod error;
pub mod ingest;
pub mod limiter;
pub mod pipeline;
pub mod remote;
pub mod retry;
pub mod windowing;
pub mod workspace;

pub use error::{ReferatError, Result};
