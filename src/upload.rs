//! Client-side upload validation.
//!
//! SYSTEM CONTEXT
//! ==============
//! Files are checked for type and size before any network call. A rejected
//! file never becomes the pending selection, so a later submit cannot send
//! it by accident.

use std::path::Path;

/// Upper bound on accepted file size; files must be strictly smaller.
pub const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

const IMAGE_TYPE_PREFIX: &str = "image/";
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("You can only upload image files! (got {content_type})")]
    NotAnImage { content_type: String },
    #[error("Image must be smaller than 5MB! ({size} bytes)")]
    TooLarge { size: u64 },
    #[error("Please select an image to upload")]
    NothingSelected,
    #[error("could not read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A file chosen for upload, with its declared metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    /// Declared size in bytes.
    pub size: u64,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    /// Build an in-memory file; the declared size is the byte length.
    #[must_use]
    pub fn from_bytes(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        let size = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        Self { file_name: file_name.into(), content_type: content_type.into(), size, bytes }
    }

    /// Load a file from disk, guessing its content type from the extension.
    ///
    /// Type and size are checked from metadata first, so oversized or
    /// non-image files are rejected without reading their contents.
    ///
    /// # Errors
    ///
    /// Returns a validation error or the I/O error that prevented reading.
    pub fn from_path(path: &Path) -> Result<Self, UploadError> {
        let read_err = |source| UploadError::Read { path: path.display().to_string(), source };
        let file_name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned());
        let content_type = content_type_for(path).to_owned();
        let size = std::fs::metadata(path).map_err(read_err)?.len();
        validate(&content_type, size)?;
        let bytes = std::fs::read(path).map_err(read_err)?;
        Ok(Self { file_name, content_type, size, bytes })
    }
}

/// Content type implied by a file's extension.
#[must_use]
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        _ => FALLBACK_CONTENT_TYPE,
    }
}

/// Check declared content type and size against upload rules.
///
/// # Errors
///
/// Returns [`UploadError::NotAnImage`] or [`UploadError::TooLarge`].
pub fn validate(content_type: &str, size: u64) -> Result<(), UploadError> {
    if !content_type.starts_with(IMAGE_TYPE_PREFIX) {
        return Err(UploadError::NotAnImage { content_type: content_type.to_owned() });
    }
    if size >= MAX_UPLOAD_BYTES {
        return Err(UploadError::TooLarge { size });
    }
    Ok(())
}

/// A validated upload ready to send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadRequest {
    pub file: UploadFile,
    /// Add to the reference corpus instead of submitting as a query.
    pub is_reference: bool,
}

/// Pending-file selection plus the reference toggle.
#[derive(Clone, Debug, Default)]
pub struct UploadForm {
    pending: Option<UploadFile>,
    is_reference: bool,
}

impl UploadForm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a file. A rejected file clears any previous selection.
    ///
    /// # Errors
    ///
    /// Returns the validation failure for the rejected file.
    pub fn select(&mut self, file: UploadFile) -> Result<(), UploadError> {
        if let Err(err) = validate(&file.content_type, file.size) {
            self.pending = None;
            return Err(err);
        }
        self.pending = Some(file);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.pending = None;
    }

    pub fn set_reference(&mut self, is_reference: bool) {
        self.is_reference = is_reference;
    }

    #[must_use]
    pub fn pending(&self) -> Option<&UploadFile> {
        self.pending.as_ref()
    }

    #[must_use]
    pub fn is_reference(&self) -> bool {
        self.is_reference
    }

    /// Take the pending file as a request, leaving the selection empty.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::NothingSelected`] when no file is pending.
    pub fn take_request(&mut self) -> Result<UploadRequest, UploadError> {
        let file = self.pending.take().ok_or(UploadError::NothingSelected)?;
        Ok(UploadRequest { file, is_reference: self.is_reference })
    }
}

#[cfg(test)]
#[path = "upload_test.rs"]
mod upload_test;
