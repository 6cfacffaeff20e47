//! Document upload and ingestion

use std::time::Instant;

use axum::extract::{Multipart, State};
use axum::Json;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::document::{Document, DocumentFormat};
use crate::types::response::IngestResponse;

/// Accept one or more files and rebuild the index from exactly this batch.
/// Validation happens per file before any pipeline work, so a bad file
/// rejects the upload while the current index stays untouched.
pub async fn upload_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<IngestResponse>> {
    let start = Instant::now();

    let mut documents = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::invalid_request(format!("failed to read multipart field: {e}")))?
    {
        // Non file fields are ignored.
        let Some(raw_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let filename = sanitize_filename(&raw_name);
        if filename.is_empty() {
            return Err(Error::invalid_request(format!(
                "unusable filename in upload: '{raw_name}'"
            )));
        }

        let format = DocumentFormat::detect(&filename)?;
        let data = field
            .bytes()
            .await
            .map_err(|e| Error::invalid_request(format!("failed to read '{filename}': {e}")))?;
        if data.is_empty() {
            return Err(Error::empty_document(filename));
        }

        tracing::info!(
            "Received '{}' ({}, {} bytes)",
            filename,
            format.display_name(),
            data.len()
        );
        documents.push(Document::new(filename, format, data.to_vec()));
    }

    if documents.is_empty() {
        return Err(Error::invalid_request("upload contained no files"));
    }

    save_upload_copies(&state, &documents).await;

    let _guard = state.ingest_lock().lock().await;
    let summary = state.pipeline().ingest(&documents).await?;

    let files = documents.iter().map(|d| d.filename.clone()).collect();
    Ok(Json(IngestResponse::ingested(
        summary.document_count,
        summary.chunk_count,
        files,
        start.elapsed().as_millis() as u64,
    )))
}

/// Keep raw copies under the uploads directory. Copies are a convenience
/// for the user, so failures are logged and do not fail the request.
async fn save_upload_copies(state: &AppState, documents: &[Document]) {
    let uploads_dir = state.config().storage.uploads_dir();
    for document in documents {
        let dest = uploads_dir.join(&document.filename);
        if let Err(e) = tokio::fs::write(&dest, &document.bytes).await {
            tracing::warn!("Failed to save upload copy '{}': {}", dest.display(), e);
        }
    }
}

/// Strip any path the client smuggled into the filename.
fn sanitize_filename(name: &str) -> String {
    std::path::Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_string()
}
