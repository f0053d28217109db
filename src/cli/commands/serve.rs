//! HTTP API server.
//!
//! Exposes the pipeline over REST for integration with other systems. One
//! pipeline instance (and therefore one rate limiter) is shared by all
//! requests, so the per-minute call budget holds across concurrent runs.

use crate::cli::Output;
use crate::config::Settings;
use crate::ingest::{self, sanitize_filename};
use crate::pipeline::Pipeline;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

/// Uploads are whole audio files; allow up to 512 MiB.
const MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

/// Shared application state.
struct AppState {
    pipeline: Pipeline,
    settings: Settings,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    let pipeline = Pipeline::new(settings.clone())?;

    let state = Arc::new(AppState { pipeline, settings });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/process_audio", post(process_audio))
        .route("/process_youtube", post(process_youtube))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Referat API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Process upload", "POST /process_audio");
    Output::kv("Process YouTube", "POST /process_youtube");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct YoutubeRequest {
    url: String,
}

#[derive(Serialize)]
struct ProcessResponse {
    status: String,
    message: String,
    file_name: String,
    workspace_path: String,
    final_summary: String,
    slice_count: usize,
    succeeded: usize,
    failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    status: String,
    message: String,
    final_summary: String,
}

fn error_response(message: String) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            status: "error".to_string(),
            message,
            final_summary: String::new(),
        }),
    )
}

// === Handlers ===

async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Referat Audio Summarization API",
        "endpoints": {
            "/process_audio": "POST - upload an audio file for summarization",
            "/process_youtube": "POST - summarize a YouTube video",
        }
    }))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

async fn process_audio(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    // Take the first field that carries a file.
    let (file_name, bytes) = loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                let name = field
                    .file_name()
                    .map(sanitize_filename)
                    .filter(|n| !n.is_empty());
                if let Some(name) = name {
                    match field.bytes().await {
                        Ok(bytes) => break (name, bytes),
                        Err(e) => {
                            return error_response(format!("Upload read failed: {}", e))
                                .into_response()
                        }
                    }
                }
            }
            Ok(None) => {
                return error_response("No file in upload".to_string()).into_response();
            }
            Err(e) => {
                return error_response(format!("Malformed multipart body: {}", e))
                    .into_response();
            }
        }
    };

    let audio_dir = state.settings.audio_dir();
    if let Err(e) = std::fs::create_dir_all(&audio_dir) {
        return error_response(format!("Cannot create audio directory: {}", e))
            .into_response();
    }

    let audio_path = audio_dir.join(&file_name);
    if let Err(e) = std::fs::write(&audio_path, &bytes) {
        return error_response(format!("Cannot store upload: {}", e)).into_response();
    }

    match state.pipeline.process_file(&audio_path, &file_name).await {
        Ok(run) => Json(ProcessResponse {
            status: "success".to_string(),
            message: "Audio processing complete".to_string(),
            file_name: run.file_name,
            workspace_path: run.workspace_path.display().to_string(),
            final_summary: run.final_summary,
            slice_count: run.slice_count,
            succeeded: run.succeeded,
            failed: run.failed,
            source: None,
        })
        .into_response(),
        Err(e) => {
            error!("Processing failed: {}", e);
            error_response(format!("Processing failed: {}", e)).into_response()
        }
    }
}

async fn process_youtube(
    State(state): State<Arc<AppState>>,
    Json(req): Json<YoutubeRequest>,
) -> impl IntoResponse {
    let (audio_path, name) =
        match ingest::resolve(&req.url, &state.settings.audio_dir()).await {
            Ok(resolved) => resolved,
            Err(e) => {
                error!("YouTube download failed: {}", e);
                return error_response(format!("YouTube processing failed: {}", e))
                    .into_response();
            }
        };

    match state.pipeline.process_file(&audio_path, &name).await {
        Ok(run) => Json(ProcessResponse {
            status: "success".to_string(),
            message: "Audio processing complete".to_string(),
            file_name: run.file_name,
            workspace_path: run.workspace_path.display().to_string(),
            final_summary: run.final_summary,
            slice_count: run.slice_count,
            succeeded: run.succeeded,
            failed: run.failed,
            source: Some("youtube".to_string()),
        })
        .into_response(),
        Err(e) => {
            error!("YouTube processing failed: {}", e);
            error_response(format!("YouTube processing failed: {}", e)).into_response()
        }
    }
}
