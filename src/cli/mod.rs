//! CLI module for Referat.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Referat - Long-form Audio Summarization
///
/// Slices long recordings into overlapping windows, transcribes and
/// summarizes each window through the Gemini API, and reduces the pieces
/// into one final summary. The name "Referat" is the Norwegian word for a
/// written summary of a meeting or talk.
#[derive(Parser, Debug)]
#[command(name = "referat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Gemini API key (overrides the config file)
    #[arg(long, env = "GEMINI_API_KEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Summarize a local audio file or YouTube URL
    Process {
        /// YouTube URL/ID, or local audio file path
        input: String,

        /// Print the final summary only, without run details
        #[arg(short, long)]
        quiet: bool,
    },

    /// Check system requirements and configuration
    Doctor,

    /// Start the HTTP API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the current (default-merged) configuration to disk
    Init,
}
