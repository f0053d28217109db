//! Doctor command - verify system requirements and configuration.

use crate::cli::Output;
use crate::config::Settings;
use console::style;
use std::process::Command;

/// Run all diagnostic checks. Returns an error exit when a required check
/// fails so scripts can gate on it.
pub fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Referat Doctor");
    println!();

    let mut failed = false;

    println!("{}", style("External Tools").bold());
    for (tool, hint) in [
        ("ffmpeg", "Required for slicing audio"),
        ("ffprobe", "Required for probing audio duration"),
        ("yt-dlp", "Required only for YouTube inputs"),
    ] {
        let ok = tool_available(tool);
        print_check(tool, ok, hint);
        // yt-dlp is optional; the others are not.
        if !ok && tool != "yt-dlp" {
            failed = true;
        }
    }

    println!();
    println!("{}", style("API Configuration").bold());
    let has_key = settings.gemini.api_key.is_some();
    print_check(
        "Gemini API key",
        has_key,
        "Set GEMINI_API_KEY or gemini.api_key in the config file",
    );
    if !has_key {
        failed = true;
    }
    Output::kv("Model", &settings.gemini.model);
    Output::kv(
        "Rate limit",
        &format!("{}/min", settings.gemini.max_requests_per_minute),
    );

    println!();
    println!("{}", style("Directories").bold());
    for (name, path) in [
        ("Data", settings.data_dir()),
        ("Audio", settings.audio_dir()),
        ("Workspace", settings.workspace_dir()),
    ] {
        Output::kv(name, &path.display().to_string());
    }

    println!();
    if failed {
        Output::error("Some required checks failed.");
        anyhow::bail!("doctor checks failed");
    }

    Output::success("All required checks passed.");
    Ok(())
}

fn tool_available(tool: &str) -> bool {
    // ffmpeg/ffprobe take -version, yt-dlp takes --version.
    for flag in ["-version", "--version"] {
        match Command::new(tool).arg(flag).output() {
            Ok(out) if out.status.success() => return true,
            Ok(_) => continue,
            // Spawn failure means the tool isn't on PATH at all.
            Err(_) => return false,
        }
    }
    false
}

fn print_check(name: &str, ok: bool, hint: &str) {
    let icon = if ok {
        style("✓").green()
    } else {
        style("✗").red()
    };
    println!("  {} {}", icon, style(name).bold());
    if !ok {
        println!("    {} {}", style("→").dim(), style(hint).dim());
    }
}
