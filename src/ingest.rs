//! Input classification and resolution.
//!
//! The pipeline accepts either a YouTube URL/ID or a local audio file.
//! Resolution turns both into a local MP3 path plus a display name that
//! keys the run's workspace.

use crate::audio::download_youtube_audio;
use crate::error::{ReferatError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};

/// A classified media input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaInput {
    /// A YouTube video, identified by its 11-character video id.
    YouTube { video_id: String },
    /// A local audio file.
    Local(PathBuf),
}

fn youtube_url_regex() -> Regex {
    // Matches the common YouTube URL shapes; group 1 is the video id.
    Regex::new(
        r"(?x)
        (?:https?://)?
        (?:www\.)?
        (?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/v/)
        ([a-zA-Z0-9_-]{11})
        ",
    )
    .expect("Invalid regex")
}

fn bare_id_regex() -> Regex {
    Regex::new(r"^[a-zA-Z0-9_-]{11}$").expect("Invalid regex")
}

/// Classify an input string.
///
/// URL-shaped inputs win; otherwise an existing local path wins over the
/// bare-video-id interpretation, so a file that happens to be named like an
/// id is still treated as a file.
pub fn classify(input: &str) -> Result<MediaInput> {
    let input = input.trim();

    if let Some(caps) = youtube_url_regex().captures(input) {
        let video_id = caps
            .get(1)
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| ReferatError::InvalidInput(format!("Unparseable URL: {input}")))?;
        return Ok(MediaInput::YouTube { video_id });
    }

    let path = Path::new(input);
    if path.exists() {
        return Ok(MediaInput::Local(path.to_path_buf()));
    }

    if bare_id_regex().is_match(input) {
        return Ok(MediaInput::YouTube {
            video_id: input.to_string(),
        });
    }

    Err(ReferatError::InvalidInput(format!(
        "Not a YouTube URL/id or existing file: {input}"
    )))
}

/// Resolve an input to `(local audio path, display name)`.
///
/// YouTube inputs are downloaded into `audio_dir` (cached per video id);
/// local files are used in place.
pub async fn resolve(input: &str, audio_dir: &Path) -> Result<(PathBuf, String)> {
    match classify(input)? {
        MediaInput::YouTube { video_id } => {
            let url = format!("https://www.youtube.com/watch?v={video_id}");
            let path = download_youtube_audio(&url, &video_id, audio_dir).await?;
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("audio.mp3")
                .to_string();
            Ok((path, name))
        }
        MediaInput::Local(path) => {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(sanitize_filename)
                .unwrap_or_else(|| "audio.mp3".to_string());
            Ok((path, name))
        }
    }
}

/// Strip characters that cannot appear in a workspace directory name.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            other => other,
        })
        .collect();

    cleaned.chars().take(200).collect()
}
