//! Ingestion endpoints (§2, §5): file upload and the Gmail push webhook.

use axum::{
    Json, Router,
    extract::{Multipart, State},
    http::StatusCode,
    routing::post,
};
use eventline_core::error::CoreError;
use eventline_core::models::{Attachment, MessageProvider};
use eventline_core::types::MessageId;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message_id: MessageId,
    pub filename: String,
    pub size: u64,
}

/// Accept a single multipart file (image or PDF), store it under
/// `UPLOAD_DIR`, and enqueue the ingestion pipeline (C5) for it.
async fn upload(
    State(pool): State<PgPool>,
    State(config): State<eventline_core::config::CoreConfig>,
    AuthUser(user_id): AuthUser,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| CoreError::InputInvalid(format!("invalid multipart body: {e}")))?
    else {
        return Err(CoreError::InputInvalid("no file part in upload".to_string()).into());
    };

    let filename = field.file_name().unwrap_or("upload").to_string();
    let mime_type = field.content_type().unwrap_or("application/octet-stream").to_string();
    let bytes = field
        .bytes()
        .await
        .map_err(|e| CoreError::InputInvalid(format!("failed to read upload body: {e}")))?;

    if bytes.len() as u64 > config.max_upload_size {
        return Err(CoreError::PayloadTooLarge(format!(
            "upload of {} bytes exceeds the {}-byte limit",
            bytes.len(),
            config.max_upload_size
        ))
        .into());
    }

    let ext = std::path::Path::new(&filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("bin");
    let stored_name = format!("{}.{ext}", Uuid::new_v4());
    let stored_path = std::path::Path::new(&config.upload_dir).join(&stored_name);

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .map_err(|e| CoreError::Internal(format!("failed to create upload dir: {e}")))?;
    tokio::fs::write(&stored_path, &bytes)
        .await
        .map_err(|e| CoreError::Internal(format!("failed to write upload: {e}")))?;

    let attachment = Attachment::File {
        filename: filename.clone(),
        mime_type,
        size: bytes.len() as u64,
        path: stored_path.to_string_lossy().into_owned(),
        ocr_text: None,
        ocr_confidence: None,
    };

    let message = eventline_shared::repo::create_message(
        &pool,
        user_id,
        MessageProvider::Upload,
        None,
        Some(filename.clone()),
        None,
        None,
        None,
        None,
        vec![attachment],
    )
    .await?;

    eventline_shared::jobs::enqueue_process_message(&pool, message.id).await?;

    Ok(Json(UploadResponse {
        message_id: message.id,
        filename,
        size: bytes.len() as u64,
    }))
}

/// Gmail push notification receiver. The subscription/history-sync side
/// of C8's Gmail adapter is out of scope; this just acknowledges delivery
/// so Pub/Sub doesn't retry, and logs the payload for later manual replay.
async fn gmail_webhook(body: String) -> StatusCode {
    tracing::info!(bytes = body.len(), "received gmail webhook notification");
    StatusCode::OK
}

pub fn routes() -> Router<crate::AppState> {
    Router::new().route("/ingestion/upload", post(upload))
}

pub fn webhook_routes() -> Router<crate::AppState> {
    Router::new().route("/ingestion/webhooks/gmail", post(gmail_webhook))
}
