use std::fmt;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

/// File extensions the upload field accepts.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("No image path entered")]
    EmptyPath,
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("Unsupported image type '{0}' (expected jpg, jpeg or png)")]
    Unsupported(String),
    #[error("Could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// An uploaded image: raw bytes plus the declared mime type.
#[derive(Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl ImagePayload {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Read an image from disk, deriving its mime type from the extension.
    pub fn load(path: &Path) -> Result<Self, ImageError> {
        if path.as_os_str().is_empty() {
            return Err(ImageError::EmptyPath);
        }
        let mime_type = mime_for_path(path)?;
        if !path.exists() {
            return Err(ImageError::NotFound(path.to_path_buf()));
        }

        let data = std::fs::read(path).map_err(|source| ImageError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self::new(file_name, mime_type, data))
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.data)
    }

    /// Human-readable size, e.g. "2.4 MB".
    pub fn display_size(&self) -> String {
        let bytes = self.size() as f64;
        if bytes >= 1024.0 * 1024.0 {
            format!("{:.1} MB", bytes / (1024.0 * 1024.0))
        } else if bytes >= 1024.0 {
            format!("{:.1} KB", bytes / 1024.0)
        } else {
            format!("{} B", self.size())
        }
    }
}

// Image bytes are not useful in logs or panics.
impl fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImagePayload")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("size", &self.data.len())
            .finish()
    }
}

pub fn mime_for_path(path: &Path) -> Result<&'static str, ImageError> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "png" => Ok("image/png"),
        _ => Err(ImageError::Unsupported(if ext.is_empty() {
            "none".to_string()
        } else {
            ext
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_mime_for_accepted_extensions() {
        assert_eq!(mime_for_path(Path::new("car.jpg")).unwrap(), "image/jpeg");
        assert_eq!(mime_for_path(Path::new("car.JPEG")).unwrap(), "image/jpeg");
        assert_eq!(mime_for_path(Path::new("/tmp/bike.Png")).unwrap(), "image/png");
    }

    #[test]
    fn test_mime_rejects_other_types() {
        assert!(matches!(
            mime_for_path(Path::new("car.gif")),
            Err(ImageError::Unsupported(ext)) if ext == "gif"
        ));
        assert!(matches!(
            mime_for_path(Path::new("car")),
            Err(ImageError::Unsupported(ext)) if ext == "none"
        ));
    }

    #[test]
    fn test_load_reads_bytes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scooter.png");
        fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();

        let image = ImagePayload::load(&path).unwrap();
        assert_eq!(image.file_name, "scooter.png");
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.data, vec![0x89, b'P', b'N', b'G']);
        assert_eq!(image.to_base64(), "iVBORw==");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.jpg");
        assert!(matches!(ImagePayload::load(&path), Err(ImageError::NotFound(_))));
        assert!(matches!(ImagePayload::load(Path::new("")), Err(ImageError::EmptyPath)));
    }

    #[test]
    fn test_display_size() {
        assert_eq!(ImagePayload::new("a", "image/png", vec![0; 512]).display_size(), "512 B");
        assert_eq!(ImagePayload::new("a", "image/png", vec![0; 2048]).display_size(), "2.0 KB");
    }

    #[test]
    fn test_debug_omits_bytes() {
        let image = ImagePayload::new("car.jpg", "image/jpeg", vec![1, 2, 3]);
        let debug = format!("{:?}", image);
        assert!(debug.contains("size: 3"));
        assert!(!debug.contains("[1, 2, 3]"));
    }
}
