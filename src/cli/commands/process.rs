//! Process command - run the full pipeline on one input.

use crate::cli::Output;
use crate::config::Settings;
use crate::ingest;
use crate::pipeline::Pipeline;

/// Summarize a local audio file or YouTube URL.
pub async fn run_process(input: &str, quiet: bool, settings: Settings) -> anyhow::Result<()> {
    let pipeline = Pipeline::new(settings.clone())?;

    // Abort the run cleanly on Ctrl+C; workers unwind at their next wait.
    let cancel = pipeline.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!();
            Output::warning("Interrupted, aborting run...");
            cancel.cancel();
        }
    });

    if !quiet {
        Output::info(&format!("Resolving input: {}", input));
    }
    let (audio_path, name) = ingest::resolve(input, &settings.audio_dir()).await?;

    if !quiet {
        Output::info(&format!("Processing {}", name));
    }
    let run = pipeline.process_file(&audio_path, &name).await?;

    if quiet {
        println!("{}", run.final_summary);
        return Ok(());
    }

    Output::header("Run complete");
    Output::kv("Run ID", &run.run_id.to_string());
    Output::kv("Slices", &run.slice_count.to_string());
    Output::kv(
        "Succeeded / failed",
        &format!("{} / {}", run.succeeded, run.failed),
    );
    Output::kv("Workspace", &run.workspace_path.display().to_string());
    println!();
    println!("{}", run.final_summary);

    if run.failed > 0 {
        println!();
        Output::warning(&format!(
            "{} slice(s) failed; the final summary may be incomplete",
            run.failed
        ));
    }

    Ok(())
}
