//! YouTube audio download via yt-dlp.

use crate::error::{ReferatError, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Downloads the audio track of a YouTube video as MP3.
///
/// Returns the path of the downloaded file. An existing download for the
/// same video is reused without hitting the network again.
#[instrument(skip(output_dir), fields(video_id = %video_id))]
pub async fn download_youtube_audio(
    url: &str,
    video_id: &str,
    output_dir: &Path,
) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    let target = output_dir.join(format!("yt_{}.mp3", video_id));
    if target.exists() {
        info!("Using cached audio for {}", video_id);
        return Ok(target);
    }

    info!("Downloading audio from {}", url);

    let template = output_dir.join(format!("yt_{}.%(ext)s", video_id));

    let result = Command::new("yt-dlp")
        .arg("--extract-audio")
        .arg("--audio-format").arg("mp3")
        .arg("--audio-quality").arg("0")
        .arg("--output").arg(template.to_str().unwrap_or_default())
        .arg("--no-playlist")
        .arg("--quiet")
        .arg("--no-warnings")
        .arg(url)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ReferatError::ToolNotFound("yt-dlp".into()));
        }
        Err(e) => {
            return Err(ReferatError::AudioDownload(format!(
                "yt-dlp execution failed: {e}"
            )));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ReferatError::AudioDownload(format!("yt-dlp failed: {stderr}")));
    }

    // --audio-format mp3 should leave exactly the target; cover the odd case
    // where extraction was skipped and another container remains.
    if target.exists() {
        return Ok(target);
    }

    let leftover = locate_download(output_dir, video_id)?;
    debug!("Converting {} to MP3", leftover.display());
    convert_to_mp3(&leftover, &target).await?;
    let _ = std::fs::remove_file(&leftover);

    Ok(target)
}

/// Locate a non-MP3 download for the video.
fn locate_download(dir: &Path, video_id: &str) -> Result<PathBuf> {
    let prefix = format!("yt_{}", video_id);
    let entries = std::fs::read_dir(dir)?;

    for entry in entries.flatten() {
        if entry.file_name().to_string_lossy().starts_with(&prefix) {
            return Ok(entry.path());
        }
    }

    Err(ReferatError::AudioDownload(
        "Audio file not found after download".into(),
    ))
}

/// Re-encode an audio container to MP3 with ffmpeg.
async fn convert_to_mp3(source: &Path, dest: &Path) -> Result<()> {
    let result = Command::new("ffmpeg")
        .arg("-i").arg(source)
        .arg("-vn")
        .arg("-codec:a").arg("libmp3lame")
        .arg("-qscale:a").arg("2")
        .arg("-y")
        .arg("-loglevel").arg("error")
        .arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    match result {
        Ok(out) if out.status.success() => Ok(()),
        Ok(out) => {
            let err = String::from_utf8_lossy(&out.stderr);
            Err(ReferatError::AudioDownload(format!(
                "ffmpeg conversion failed: {err}"
            )))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ReferatError::ToolNotFound("ffmpeg".into()))
        }
        Err(e) => Err(ReferatError::AudioDownload(format!("ffmpeg error: {e}"))),
    }
}
