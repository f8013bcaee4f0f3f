use crate::api::error::AppError;
use crate::services::storage::UploadedFile;
use axum::extract::multipart::{Field, MultipartError};
use axum::http::StatusCode;

pub(crate) fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::Validation(e.body_text())
    }
}

/// Buffers a file part. The declared content type is kept as a hint only.
pub(crate) async fn read_file(field: Field<'_>) -> Result<UploadedFile, AppError> {
    let filename = field.file_name().unwrap_or("upload").to_string();
    let content_type = field.content_type().map(str::to_string);
    let data = field.bytes().await.map_err(multipart_error)?;

    Ok(UploadedFile {
        filename,
        content_type,
        data,
    })
}

pub(crate) async fn read_text(field: Field<'_>) -> Result<String, AppError> {
    field.text().await.map_err(multipart_error)
}
