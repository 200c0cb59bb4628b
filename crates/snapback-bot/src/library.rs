//! Local image directory and its manifest
//!
//! The manifest is re-read for every reply, so edits to `images.json` take
//! effect without a restart.

use snapback_core::{ImageDescriptor, Result, SnapbackConfig, SnapbackError};
use std::path::{Path, PathBuf};

/// Images on disk plus the manifest describing them
#[derive(Debug, Clone)]
pub struct ImageLibrary {
    dir: PathBuf,
    manifest: String,
    default_encoding: String,
}

impl ImageLibrary {
    pub fn new(dir: impl Into<PathBuf>, manifest: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            manifest: manifest.into(),
            default_encoding: "image/jpeg".to_string(),
        }
    }

    pub fn from_config(config: &SnapbackConfig) -> Self {
        Self::new(&config.images_dir, &config.manifest)
            .with_default_encoding(&config.default_encoding)
    }

    pub fn with_default_encoding(mut self, encoding: &str) -> Self {
        self.default_encoding = encoding.to_string();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read and parse the manifest
    pub async fn load_manifest(&self) -> Result<Vec<ImageDescriptor>> {
        let path = self.dir.join(&self.manifest);
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            SnapbackError::ResourceUnavailable(format!(
                "Failed to read manifest {}: {}",
                path.display(),
                e
            ))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            SnapbackError::ResourceUnavailable(format!(
                "Failed to parse manifest {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Read the bytes of one image
    pub async fn read_image(&self, image: &ImageDescriptor) -> Result<Vec<u8>> {
        let path = self.dir.join(&image.path);
        tokio::fs::read(&path).await.map_err(|e| {
            SnapbackError::ResourceUnavailable(format!(
                "Failed to read image {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// MIME type to declare on upload, guessed from the file extension
    pub fn encoding_for(&self, image: &ImageDescriptor) -> String {
        mime_guess::from_path(&image.path)
            .first()
            .filter(|mime| mime.type_() == mime_guess::mime::IMAGE)
            .map(|mime| mime.essence_str().to_string())
            .unwrap_or_else(|| self.default_encoding.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn descriptor(path: &str) -> ImageDescriptor {
        ImageDescriptor {
            path: path.to_string(),
            alt: String::new(),
        }
    }

    #[tokio::test]
    async fn test_load_manifest() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("images.json"),
            r#"[{"path":"cat.png","alt":"a cat"},{"path":"dog.jpg","alt":"a dog"}]"#,
        )
        .unwrap();

        let library = ImageLibrary::new(dir.path(), "images.json");
        let images = library.load_manifest().await.unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[1].alt, "a dog");
    }

    #[tokio::test]
    async fn test_missing_manifest() {
        let dir = TempDir::new().unwrap();
        let library = ImageLibrary::new(dir.path(), "images.json");
        let result = library.load_manifest().await;
        assert!(matches!(result, Err(SnapbackError::ResourceUnavailable(_))));
    }

    #[tokio::test]
    async fn test_malformed_manifest() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("images.json"), r#"{"path":"cat.png"}"#).unwrap();
        let library = ImageLibrary::new(dir.path(), "images.json");
        assert!(library.load_manifest().await.is_err());
    }

    #[tokio::test]
    async fn test_read_missing_image() {
        let dir = TempDir::new().unwrap();
        let library = ImageLibrary::new(dir.path(), "images.json");
        let result = library.read_image(&descriptor("nope.jpg")).await;
        assert!(matches!(result, Err(SnapbackError::ResourceUnavailable(_))));
    }

    #[test]
    fn test_encoding_from_extension() {
        let library = ImageLibrary::new("images", "images.json");
        assert_eq!(library.encoding_for(&descriptor("a.png")), "image/png");
        assert_eq!(library.encoding_for(&descriptor("a.JPG")), "image/jpeg");
        assert_eq!(library.encoding_for(&descriptor("a.webp")), "image/webp");
    }

    #[test]
    fn test_encoding_falls_back_to_default() {
        let library = ImageLibrary::new("images", "images.json").with_default_encoding("image/png");
        assert_eq!(library.encoding_for(&descriptor("no_extension")), "image/png");
        assert_eq!(library.encoding_for(&descriptor("notes.txt")), "image/png");
    }
}
