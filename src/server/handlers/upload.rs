use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::core::errors::ApiError;
use crate::rag::VectorIndex;
use crate::state::AppState;

const FILE_FIELD: &str = "file";
const NO_FILE_UPLOADED: &str = "No file uploaded";

/// `POST /upload`: stores the file, indexes it, and makes it the active document.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, ApiError> {
    let mut multipart =
        multipart.map_err(|_| ApiError::BadRequest(NO_FILE_UPLOADED.to_string()))?;

    let mut saved: Option<(PathBuf, String)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let original_name = sanitize_file_name(field.file_name().unwrap_or_default());
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;

        let path = state
            .paths
            .upload_dir
            .join(format!("{}-{}", Uuid::new_v4(), original_name));
        tokio::fs::write(&path, &data)
            .await
            .map_err(ApiError::internal)?;
        tracing::info!("Saved upload {} ({} bytes)", path.display(), data.len());

        saved = Some((path, original_name));
        break;
    }

    let Some((path, original_name)) = saved else {
        return Err(ApiError::BadRequest(NO_FILE_UPLOADED.to_string()));
    };

    match state.pipeline.ingest_named(&path, &original_name).await {
        Ok(index) => {
            let chunks = index.len();
            if let Some(previous) = state.index.replace(index) {
                tracing::info!("Replaced indexed document {}", previous.source());
                discard_previous_upload(&previous).await;
            }
            Ok(Json(json!({
                "message": "File uploaded and processed successfully",
                "chunks": chunks
            })))
        }
        Err(err) => {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                tracing::warn!("Failed to remove upload {}: {}", path.display(), e);
            }
            Err(err.into())
        }
    }
}

/// Only the active document's file is kept in the upload directory.
async fn discard_previous_upload(previous: &VectorIndex) {
    let Some(path) = previous.stored_path() else {
        return;
    };
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!("Failed to remove previous upload {}: {}", path.display(), e);
    }
}

/// Keeps only the final path component and replaces anything outside
/// `[A-Za-z0-9._-]`.
fn sanitize_file_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        "upload.txt".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_directories_and_odd_characters() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\docs\\my notes.txt"), "my_notes.txt");
        assert_eq!(sanitize_file_name("résumé.txt"), "r_sum_.txt");
    }

    #[test]
    fn falls_back_for_empty_or_hidden_names() {
        assert_eq!(sanitize_file_name(""), "upload.txt");
        assert_eq!(sanitize_file_name(".."), "upload.txt");
        assert_eq!(sanitize_file_name(".env"), "env");
    }
}
