//! Multipart form collection and image storage under the media root.

use axum::extract::Multipart;
use std::collections::HashMap;
use std::path::Path;

use crate::error::{AppError, AppResult};

/// Avatars land here, relative to the media root.
pub const AVATAR_DIR: &str = "images";
/// Gift snapshots land here, relative to the media root.
pub const SNAPSHOT_DIR: &str = "gifts/snapshots";

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Webp,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Gif => "gif",
            ImageFormat::Webp => "webp",
        }
    }
}

/// Identify an image by its leading magic bytes.
pub fn sniff_image(bytes: &[u8]) -> Option<ImageFormat> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some(ImageFormat::Png)
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(ImageFormat::Jpeg)
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some(ImageFormat::Gif)
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some(ImageFormat::Webp)
    } else {
        None
    }
}

/// A fully read multipart body: text fields plus attached files.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
}

impl MultipartForm {
    pub async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = MultipartForm::default();

        while let Some(field) = multipart.next_field().await.map_err(|e| {
            tracing::warn!("Failed to read multipart field: {}", e);
            AppError::BadRequest(e.body_text())
        })? {
            let name = field.name().unwrap_or("").to_string();
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);

            match file_name {
                Some(file_name) => {
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::BadRequest(e.body_text()))?;
                    // Browsers submit an empty part for an untouched file input.
                    if file_name.is_empty() && bytes.is_empty() {
                        continue;
                    }
                    form.files.insert(
                        name,
                        UploadedFile {
                            file_name,
                            content_type,
                            bytes: bytes.to_vec(),
                        },
                    );
                }
                None => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.body_text()))?;
                    form.fields.insert(name, text);
                }
            }
        }

        Ok(form)
    }

    pub fn text(&self, name: &str) -> String {
        self.fields.get(name).cloned().unwrap_or_default()
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name)
    }

    #[cfg(test)]
    pub(crate) fn from_parts(fields: &[(&str, &str)], files: Vec<(&str, UploadedFile)>) -> Self {
        Self {
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            files: files
                .into_iter()
                .map(|(k, f)| (k.to_string(), f))
                .collect(),
        }
    }
}

/// Write image bytes under `media_root/subdir` with a fresh name.
/// Returns the path relative to the media root, with `/` separators.
pub async fn save_image(
    media_root: &Path,
    subdir: &str,
    format: ImageFormat,
    bytes: &[u8],
) -> AppResult<String> {
    let dir = media_root.join(subdir);
    tokio::fs::create_dir_all(&dir).await?;

    let file_name = format!("{}.{}", uuid::Uuid::now_v7(), format.extension());
    tokio::fs::write(dir.join(&file_name), bytes).await?;

    let relative = format!("{}/{}", subdir, file_name);
    tracing::info!(path = %relative, size = bytes.len(), "Stored upload");
    Ok(relative)
}

/// Remove a stored image whose database row was never written.
pub async fn discard_image(media_root: &Path, relative: &str) {
    match tokio::fs::remove_file(media_root.join(relative)).await {
        Ok(()) => tracing::info!(path = %relative, "Discarded orphaned upload"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %relative, "Failed to discard upload: {}", e),
    }
}
