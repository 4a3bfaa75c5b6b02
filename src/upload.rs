//! Upload boundary: filename validation, storage naming and persistence.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

// ---

pub const ALLOWED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "bmp"];

/// URL prefix under which stored uploads are served back.
pub const PUBLIC_PREFIX: &str = "/static/uploads";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("no image was provided")]
    MissingFile,

    #[error("empty file name")]
    EmptyFilename,

    #[error("unsupported image format; allowed: png, jpg, jpeg, gif, bmp")]
    UnsupportedExtension,

    #[error("upload of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },

    #[error("failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

/// Keep ASCII alphanumerics, `.`, `-` and `_`; drop directory components.
pub fn sanitize_filename(name: &str) -> String {
    // ---
    let base = name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    cleaned.trim_matches(|c: char| c == '.' || c == '_').to_string()
}

/// Validate an uploaded file name against the extension allow-list.
pub fn validate_filename(name: &str) -> Result<(), UploadError> {
    // ---
    if name.trim().is_empty() {
        return Err(UploadError::EmptyFilename);
    }

    let allowed = Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false);

    if allowed {
        Ok(())
    } else {
        Err(UploadError::UnsupportedExtension)
    }
}

pub fn check_size(size: usize, limit: usize) -> Result<(), UploadError> {
    if size > limit {
        return Err(UploadError::TooLarge { size, limit });
    }
    Ok(())
}

/// `<uuid-hex>_<sanitized name>`; unique per call.
pub fn storage_name(original: &str) -> String {
    // ---
    let clean = sanitize_filename(original);
    let id = Uuid::new_v4().simple();
    if clean.is_empty() {
        format!("{id}")
    } else {
        format!("{id}_{clean}")
    }
}

/// A file written once to the upload directory.
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub name: String,
    pub path: PathBuf,
}

impl StoredUpload {
    pub fn public_url(&self) -> String {
        format!("{PUBLIC_PREFIX}/{}", self.name)
    }
}

/// Persist `bytes` under a fresh storage name in `dir`.
pub async fn store(
    dir: &Path,
    original: &str,
    bytes: &[u8],
) -> Result<StoredUpload, UploadError> {
    // ---
    tokio::fs::create_dir_all(dir).await?;

    let name = storage_name(original);
    let path = dir.join(&name);
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .await?;
    file.write_all(bytes).await?;
    file.flush().await?;

    tracing::debug!(path = %path.display(), size = bytes.len(), "Upload stored");

    Ok(StoredUpload { name, path })
}
