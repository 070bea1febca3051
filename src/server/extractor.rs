use axum::{
    extract::{ Multipart, State },
    Json,
};
use log::debug;
use serde_json::{ Map, Value };
use std::sync::Arc;

use super::{ ApiResponse, AppState };
use crate::error::AppError;
use crate::models::extractor::{ ExtractionRecord, TranslateRequest, UploadedFile };
use crate::services::uploads::ensure_image;

const FILE_FIELD: &str = "file";

struct ImageUpload {
    data: Vec<u8>,
    content_type: String,
}

/// Pulls the `file` field out of a multipart body, rejecting anything that is not an image.
async fn read_image(mut multipart: Multipart) -> Result<ImageUpload, AppError> {
    while
        let Some(field) = multipart
            .next_field().await
            .map_err(|e| AppError::validation(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            debug!("Skipping multipart field {:?}", field.name());
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        ensure_image(&content_type)?;
        let data = field
            .bytes().await
            .map_err(|e| AppError::validation(format!("Failed to read upload: {}", e)))?;

        return Ok(ImageUpload { data: data.to_vec(), content_type });
    }

    Err(AppError::validation("An image file is required in the 'file' field"))
}

pub async fn extract_handler(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<ExtractionRecord>>, AppError> {
    let image = read_image(multipart).await?;
    let record = state.extractor.extract(&image.content_type, &image.data).await?;
    Ok(ApiResponse::data(record))
}

pub async fn translate_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TranslateRequest>,
) -> Result<Json<ApiResponse<Map<String, Value>>>, AppError> {
    let translated = state.extractor.translate(&req.info, &req.language).await?;
    Ok(ApiResponse::data(translated))
}

pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<UploadedFile>>, AppError> {
    let image = read_image(multipart).await?;
    let saved = state.uploads.save(&image.data, &image.content_type).await?;
    Ok(ApiResponse::data(saved))
}
