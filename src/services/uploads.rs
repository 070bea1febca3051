use log::info;
use std::path::{ Path, PathBuf };
use url::Url;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::extractor::UploadedFile;

pub const UPLOAD_ROUTE: &str = "/uploads";

/// Writes uploaded images to disk and hands back their public URL.
#[derive(Clone, Debug)]
pub struct UploadStore {
    dir: PathBuf,
    public_base: Url,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>, public_base_url: &str) -> Result<Self, url::ParseError> {
        let base = format!("{}{}/", public_base_url.trim_end_matches('/'), UPLOAD_ROUTE);
        Ok(Self {
            dir: dir.into(),
            public_base: Url::parse(&base)?,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stores an image under a generated name. The extension comes from the declared content
    /// type alone; the client's file name is never used.
    pub async fn save(&self, data: &[u8], content_type: &str) -> Result<UploadedFile, AppError> {
        ensure_image(content_type)?;
        let extension = extension_for(content_type).ok_or_else(||
            AppError::validation(format!("Unsupported image type '{}'", content_type))
        )?;
        if data.is_empty() {
            return Err(AppError::validation("Uploaded file is empty"));
        }

        let filename = format!("{}.{}", Uuid::new_v4().simple(), extension);
        tokio::fs::create_dir_all(&self.dir).await
            .map_err(|e| AppError::Storage(format!("cannot create upload dir: {}", e)))?;
        tokio::fs::write(self.dir.join(&filename), data).await
            .map_err(|e| AppError::Storage(format!("cannot write upload: {}", e)))?;

        let url = self.public_base
            .join(&filename)
            .map_err(|e| AppError::Storage(format!("cannot build upload URL: {}", e)))?;

        info!("Stored upload {} ({} bytes)", filename, data.len());
        Ok(UploadedFile { url: url.to_string(), filename })
    }
}

pub fn ensure_image(content_type: &str) -> Result<(), AppError> {
    if content_type.starts_with("image/") {
        Ok(())
    } else {
        Err(AppError::validation("File must be an image"))
    }
}

/// Raster formats we are willing to serve back. Anything scriptable, like SVG, is refused.
fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    match essence.as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/heic" => Some("heic"),
        "image/heif" => Some("heif"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_follows_the_content_type() {
        assert_eq!(extension_for("image/jpeg"), Some("jpg"));
        assert_eq!(extension_for("image/PNG; charset=binary"), Some("png"));
        assert_eq!(extension_for("image/webp"), Some("webp"));
        assert_eq!(extension_for("image/svg+xml"), None);
        assert_eq!(extension_for("image/x-icon"), None);
    }

    #[test]
    fn only_images_are_accepted() {
        assert!(ensure_image("image/png").is_ok());
        assert!(matches!(ensure_image("application/pdf"), Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn saves_and_returns_public_url() {
        let dir = std::env::temp_dir().join(format!("uploads-{}", Uuid::new_v4()));
        let store = UploadStore::new(&dir, "http://localhost:8000/").unwrap();

        let saved = store.save(b"\x89PNG", "image/png").await.unwrap();
        assert!(saved.filename.ends_with(".png"));
        assert_eq!(saved.url, format!("http://localhost:8000/uploads/{}", saved.filename));
        assert_eq!(tokio::fs::read(dir.join(&saved.filename)).await.unwrap(), b"\x89PNG");

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn rejects_non_images_without_writing() {
        let dir = std::env::temp_dir().join(format!("uploads-{}", Uuid::new_v4()));
        let store = UploadStore::new(&dir, "http://localhost:8000").unwrap();

        let err = store.save(b"%PDF", "application/pdf").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn svg_is_refused() {
        let dir = std::env::temp_dir().join(format!("uploads-{}", Uuid::new_v4()));
        let store = UploadStore::new(&dir, "http://localhost:8000").unwrap();

        let svg = b"<svg xmlns='http://www.w3.org/2000/svg'><script>alert(1)</script></svg>";
        let err = store.save(svg, "image/svg+xml").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(!dir.exists());
    }
}
