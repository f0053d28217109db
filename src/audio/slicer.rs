//! Window extraction from the source audio.
//!
//! Executes a window plan from [`crate::windowing`]: probes the source
//! duration with ffprobe, then cuts one MP3 per window with ffmpeg.

use crate::error::{ReferatError, Result};
use crate::windowing::AudioWindow;
use crate::workspace::Workspace;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// Queries the duration of an audio file in milliseconds.
pub async fn probe_duration_ms(path: &Path) -> Result<u64> {
    let result = Command::new("ffprobe")
        .arg("-v").arg("quiet")
        .arg("-print_format").arg("json")
        .arg("-show_format")
        .arg(path)
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ReferatError::ToolNotFound("ffprobe".into()));
        }
        Err(e) => {
            return Err(ReferatError::AudioSlicing(format!("ffprobe failed: {e}")));
        }
    };

    if !output.status.success() {
        return Err(ReferatError::AudioSlicing("ffprobe returned error".into()));
    }

    let json_str = String::from_utf8_lossy(&output.stdout);
    let parsed: serde_json::Value = serde_json::from_str(&json_str)
        .map_err(|_| ReferatError::AudioSlicing("Invalid ffprobe output".into()))?;

    let seconds = parsed["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| {
            ReferatError::AudioSlicing("Could not determine audio duration".into())
        })?;

    Ok((seconds * 1000.0).round() as u64)
}

/// Cut the source audio into the planned windows.
///
/// Each window is written to the workspace as `part_{index}.mp3`. Windows
/// are produced in index order; the files are what the map stage uploads.
#[instrument(skip_all, fields(source = %source.display()))]
pub async fn slice_audio(
    source: &Path,
    workspace: &Workspace,
    windows: &[AudioWindow],
) -> Result<()> {
    info!("Cutting {} window(s)", windows.len());

    for window in windows {
        let dest = workspace.slice_path(window.index);
        let start = window.start_ms as f64 / 1000.0;
        let length = window.len_ms() as f64 / 1000.0;

        extract_window(source, &dest, start, length).await?;
        debug!(
            "Wrote window {} [{}ms, {}ms)",
            window.index, window.start_ms, window.end_ms
        );
    }

    Ok(())
}

/// Extract one time range from the source.
async fn extract_window(source: &Path, dest: &Path, start: f64, length: f64) -> Result<()> {
    // First attempt: stream copy (fast, no quality loss)
    let copy_result = Command::new("ffmpeg")
        .arg("-ss").arg(format!("{:.3}", start))
        .arg("-i").arg(source)
        .arg("-t").arg(format!("{:.3}", length))
        .arg("-c").arg("copy")
        .arg("-y")
        .arg("-loglevel").arg("warning")
        .arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    if let Ok(status) = copy_result {
        if status.success() && dest.exists() {
            return Ok(());
        }
    }

    // Fallback: re-encode to MP3
    warn!("Stream copy failed, re-encoding window");

    let encode_result = Command::new("ffmpeg")
        .arg("-ss").arg(format!("{:.3}", start))
        .arg("-i").arg(source)
        .arg("-t").arg(format!("{:.3}", length))
        .arg("-codec:a").arg("libmp3lame")
        .arg("-qscale:a").arg("2")
        .arg("-y")
        .arg("-loglevel").arg("error")
        .arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    match encode_result {
        Ok(out) if out.status.success() => Ok(()),
        Ok(out) => {
            let err = String::from_utf8_lossy(&out.stderr);
            Err(ReferatError::AudioSlicing(format!(
                "Window extraction failed: {err}"
            )))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ReferatError::ToolNotFound("ffmpeg".into()))
        }
        Err(e) => Err(ReferatError::AudioSlicing(format!("ffmpeg error: {e}"))),
    }
}
