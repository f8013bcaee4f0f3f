use crate::api::error::AppError;
use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::info;

/// File storage collaborator used for lesson videos and resource files.
#[async_trait]
pub trait StorageService: Send + Sync {
    async fn upload_file(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<()>;
    async fn delete_file(&self, key: &str) -> Result<()>;
    async fn file_exists(&self, key: &str) -> Result<bool>;
    fn public_url(&self, key: &str) -> String;
}

pub struct S3StorageService {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl S3StorageService {
    pub fn new(client: Client, bucket: String, public_base_url: String) -> Self {
        Self {
            client,
            bucket,
            public_base_url,
        }
    }
}

#[async_trait]
impl StorageService for S3StorageService {
    async fn upload_file(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await?;
        Ok(())
    }

    async fn delete_file(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await?;
        Ok(())
    }

    async fn file_exists(&self, key: &str) -> Result<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Ok(false)
                } else {
                    Err(service_error.into())
                }
            }
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }
}

/// A file part pulled out of a multipart request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Where an upload ended up and what we learned about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub key: String,
    pub url: String,
    pub file_type: String,
    pub size_bytes: i64,
}

/// Declared content type unless it is missing or generic, then sniffed from the bytes.
pub fn resolve_file_type(declared: Option<&str>, data: &[u8]) -> String {
    let declared = declared
        .map(|ct| ct.split(';').next().unwrap_or("").trim().to_lowercase())
        .filter(|ct| !ct.is_empty() && ct != "application/octet-stream");

    match declared {
        Some(ct) => ct,
        None => infer::get(data)
            .map(|kind| kind.mime_type().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string()),
    }
}

fn sanitize_filename(filename: &str) -> String {
    let cleaned: String = filename
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim_matches('.').trim();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Stores `file` under `{prefix}/{uuid}-{filename}`.
pub async fn store_upload(
    storage: &dyn StorageService,
    prefix: &str,
    file: UploadedFile,
    max_size: usize,
) -> Result<StoredFile, AppError> {
    if file.data.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }
    if file.data.len() > max_size {
        return Err(AppError::PayloadTooLarge(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            file.data.len(),
            max_size
        )));
    }

    let file_type = resolve_file_type(file.content_type.as_deref(), &file.data);
    let key = format!(
        "{}/{}-{}",
        prefix,
        uuid::Uuid::new_v4(),
        sanitize_filename(&file.filename)
    );
    let size_bytes = file.data.len() as i64;

    storage
        .upload_file(&key, file.data.to_vec(), &file_type)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to store file: {}", e)))?;

    info!("📦 Stored {} ({} bytes, {})", key, size_bytes, file_type);

    Ok(StoredFile {
        url: storage.public_url(&key),
        key,
        file_type,
        size_bytes,
    })
}

/// Deletes a previously stored object; storage failures are logged, not surfaced.
pub async fn discard_stored(storage: &dyn StorageService, key: &str) {
    if let Err(e) = storage.delete_file(key).await {
        tracing::warn!("Failed to delete stored object {}: {}", key, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_type_wins() {
        assert_eq!(
            resolve_file_type(Some("application/pdf; charset=binary"), b"whatever"),
            "application/pdf"
        );
    }

    #[test]
    fn test_generic_type_is_sniffed() {
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        assert_eq!(
            resolve_file_type(Some("application/octet-stream"), &png),
            "image/png"
        );
        assert_eq!(resolve_file_type(None, &png), "image/png");
    }

    #[test]
    fn test_unknown_bytes_fall_back() {
        assert_eq!(
            resolve_file_type(None, b"plain words"),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "_.._etc_passwd");
        assert_eq!(sanitize_filename("..."), "file");
        assert_eq!(sanitize_filename("week 1.pdf"), "week 1.pdf");
    }
}
