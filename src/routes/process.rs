//! Upload Processing Endpoint
//!
//! `POST /api/process` takes one `file` part and one `prompt` part. Every
//! field is read and validated before any upstream call; the stored upload
//! (and any intermediate page image) is removed when the request finishes,
//! whatever the outcome.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use tracing::{debug, info};

use crate::documents::{ensure_allowed, resolve_media_type};
use crate::models::{AppState, ProcessResponse};
use crate::storage::StoredUpload;
use crate::types::{AppError, AppResult};

/// Room for the prompt and multipart framing on top of the file itself.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

pub fn router(state: AppState) -> Router {
    let body_limit = state
        .config
        .upload
        .max_file_size
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/api/process", post(process_upload))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

async fn process_upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let environment = state.config.server.environment;

    let result = match multipart {
        Ok(multipart) => handle_upload(&state, multipart).await,
        Err(rejection) => Err(AppError::validation(format!(
            "Expected a multipart/form-data body: {}",
            rejection.body_text()
        ))),
    };

    match result {
        Ok(output) => (StatusCode::OK, Json(ProcessResponse::ok(output))).into_response(),
        Err(e) => e.into_response_for(environment),
    }
}

async fn handle_upload(state: &AppState, multipart: Multipart) -> AppResult<String> {
    let (upload, prompt) = read_fields(state, multipart).await?;

    let content = state.processor.prepare(&upload).await?;
    let output = state.agent.run(&prompt, &content).await?;

    info!(
        file_name = %upload.original_name,
        size = upload.size,
        output_len = output.len(),
        "Upload processed"
    );
    Ok(output)
}

/// Drain the form: exactly one allow-listed file within the size cap, and a non-empty prompt.
async fn read_fields(
    state: &AppState,
    mut multipart: Multipart,
) -> AppResult<(StoredUpload, String)> {
    let limits = &state.config.upload;
    let mut upload: Option<StoredUpload> = None;
    let mut prompt: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limits.max_file_size))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                if upload.is_some() {
                    return Err(AppError::validation("Only one file may be uploaded."));
                }

                let file_name = field.file_name().unwrap_or("upload").to_string();
                let media_type = resolve_media_type(field.content_type(), &file_name)
                    .ok_or_else(|| AppError::validation("Could not determine the file type."))?;
                ensure_allowed(&media_type, limits.pdf_strategy)?;

                let stored = state
                    .upload_dir
                    .store_stream(&file_name, &media_type, field, limits.max_file_size)
                    .await?;
                info!(
                    file_name = %stored.original_name,
                    media_type = %stored.media_type,
                    size = stored.size,
                    "Upload received"
                );
                upload = Some(stored);
            }
            Some("prompt") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| multipart_error(e, limits.max_file_size))?;
                prompt = Some(text);
            }
            other => debug!(field = ?other, "Ignoring unknown form field"),
        }
    }

    let upload = upload.ok_or_else(|| AppError::validation("No file uploaded."))?;
    let prompt = prompt
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::validation("A prompt is required."))?;

    Ok((upload, prompt))
}

fn multipart_error(e: MultipartError, max_file_size: usize) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::validation(format!(
            "File too large. Maximum size is {} MB.",
            max_file_size / (1024 * 1024)
        ));
    }
    AppError::validation(format!("Malformed upload: {}", e.body_text()))
}
