//! Configuration module for Referat.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::Prompts;
pub use settings::{
    GeminiSettings, GeneralSettings, PipelineSettings, Settings, SlicingSettings,
};
