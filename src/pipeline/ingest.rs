//! Image ingestion: one uploaded smear → validated, decoded bitmap.
//!
//! The declared type (multipart `Content-Type`, or the file extension when the
//! browser sends nothing useful) must be on the allow-list. The real format is
//! then sniffed from magic bytes and must also be allowed. The header's pixel
//! dimensions are checked before any bitmap is allocated, and the bytes must
//! decode. Only then does an `UploadedImage` exist; nothing downstream ever
//! sees an undecodable file.

use std::io::Cursor;

use base64::Engine as _;
use image::{DynamicImage, GenericImageView, ImageFormat};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::config::{MAX_DIMENSION_PX, MAX_IMAGE_BYTES, MAX_IMAGE_PIXELS};

/// Declared content types accepted from the upload widget.
pub const ACCEPTED_MIME_TYPES: &[&str] = &["image/png", "image/jpeg"];

/// File extensions offered by the upload widget's picker.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

const OCTET_STREAM: &str = "application/octet-stream";

// ═══════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IngestionError {
    #[error("No image data received")]
    Empty,

    #[error("Unsupported file type '{0}'. Upload a PNG or JPEG image.")]
    UnsupportedType(String),

    #[error("Image exceeds the {} MB upload limit", .max / (1024 * 1024))]
    TooLarge { max: usize },

    #[error("Image is {width}×{height} pixels, larger than the supported size")]
    DimensionsTooLarge { width: u32, height: u32 },

    #[error("File content is not a PNG or JPEG image")]
    UnrecognizedContent,

    #[error("Could not decode image: {0}")]
    Decode(String),
}

// ═══════════════════════════════════════════════════════════
// SmearFormat
// ═══════════════════════════════════════════════════════════

/// Bitmap formats the pipeline accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SmearFormat {
    Png,
    Jpeg,
}

impl SmearFormat {
    pub fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    /// Map a declared content type onto an accepted format.
    ///
    /// Case-insensitive, ignores parameters, and takes `image/jpg` as an
    /// alias since some browsers still send it.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    /// Detect the format from magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }
        if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }
        None
    }

    fn image_format(self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::Jpeg => ImageFormat::Jpeg,
        }
    }
}

/// Resolve the declared type of an upload.
///
/// Browsers sometimes send no `Content-Type` or a generic octet-stream for
/// files; in that case fall back to guessing from the file name.
pub fn resolve_declared_mime(content_type: Option<&str>, file_name: &str) -> String {
    match content_type.map(str::trim) {
        Some(ct) if !ct.is_empty() && !ct.eq_ignore_ascii_case(OCTET_STREAM) => ct.to_string(),
        _ => mime_guess::from_path(file_name)
            .first_raw()
            .unwrap_or(OCTET_STREAM)
            .to_string(),
    }
}

// ═══════════════════════════════════════════════════════════
// UploadedImage
// ═══════════════════════════════════════════════════════════

/// One validated upload: raw bytes plus the decoded bitmap.
///
/// Held in memory for the current attempt only and replaced by the next
/// upload. Never written to disk.
#[derive(Clone)]
pub struct UploadedImage {
    file_name: String,
    declared_mime: String,
    format: SmearFormat,
    bytes: Vec<u8>,
    bitmap: DynamicImage,
    fingerprint: String,
}

impl UploadedImage {
    /// Validate and decode one uploaded file.
    pub fn ingest(
        file_name: &str,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<Self, IngestionError> {
        if bytes.is_empty() {
            return Err(IngestionError::Empty);
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(IngestionError::TooLarge {
                max: MAX_IMAGE_BYTES,
            });
        }

        let declared_mime = resolve_declared_mime(content_type, file_name);
        let declared = SmearFormat::from_mime(&declared_mime)
            .ok_or_else(|| IngestionError::UnsupportedType(declared_mime.clone()))?;

        let format = SmearFormat::sniff(&bytes).ok_or(IngestionError::UnrecognizedContent)?;
        if format != declared {
            tracing::debug!(
                declared = declared.mime(),
                detected = format.mime(),
                "Declared image type differs from content; using detected type"
            );
        }

        let (width, height) =
            image::io::Reader::with_format(Cursor::new(&bytes), format.image_format())
                .into_dimensions()
                .map_err(|e| IngestionError::Decode(e.to_string()))?;
        check_dimensions(width, height)?;

        let bitmap = image::load_from_memory_with_format(&bytes, format.image_format())
            .map_err(|e| IngestionError::Decode(e.to_string()))?;

        let fingerprint = format!("{:x}", Sha256::digest(&bytes));
        tracing::info!(
            image = &fingerprint[..12],
            format = format.mime(),
            width,
            height,
            size_bytes = bytes.len(),
            "Smear image ingested"
        );

        Ok(Self {
            file_name: display_file_name(file_name),
            declared_mime,
            format,
            bytes,
            bitmap,
            fingerprint,
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn declared_mime(&self) -> &str {
        &self.declared_mime
    }

    pub fn format(&self) -> SmearFormat {
        self.format
    }

    /// MIME type of the bytes actually sent to the model.
    pub fn mime(&self) -> &'static str {
        self.format.mime()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn bitmap(&self) -> &DynamicImage {
        &self.bitmap
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.bitmap.dimensions()
    }

    /// Full SHA-256 hex digest of the uploaded bytes.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Short digest prefix, used to correlate log lines.
    pub fn short_fingerprint(&self) -> &str {
        &self.fingerprint[..12]
    }

    /// Base64 of the original bytes, as sent inline to the model.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.bytes())
    }

    /// `data:` URL for the preview `<img>`.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime(), self.to_base64())
    }
}

impl std::fmt::Debug for UploadedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadedImage")
            .field("file_name", &self.file_name)
            .field("format", &self.format)
            .field("dimensions", &self.dimensions())
            .field("size_bytes", &self.bytes.len())
            .field("fingerprint", &self.short_fingerprint())
            .finish()
    }
}

/// Reject images whose decoded bitmap would exceed the pixel budget.
pub fn check_dimensions(width: u32, height: u32) -> Result<(), IngestionError> {
    let too_wide = width > MAX_DIMENSION_PX || height > MAX_DIMENSION_PX;
    if too_wide || u64::from(width) * u64::from(height) > MAX_IMAGE_PIXELS {
        return Err(IngestionError::DimensionsTooLarge { width, height });
    }
    Ok(())
}

/// File name safe to show back to the user.
fn display_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");
    let cleaned: String = base
        .chars()
        .filter(|c| !c.is_control())
        .take(100)
        .collect();
    if cleaned.trim().is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}
