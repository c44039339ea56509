//! Document Preparation
//!
//! Turns an upload into something the completion model can read. The upload
//! is inspected once and classified as a [`FileKind`]; everything downstream
//! matches on that instead of re-reading MIME strings.
//!
//! | Kind         | Model input                                   |
//! |--------------|-----------------------------------------------|
//! | `Image`      | the image itself, base64 inline               |
//! | `TextPdf`    | locally extracted text                        |
//! | `ScannedPdf` | page 1 rasterized to PNG, base64 inline       |
//! | `HostedPdf`  | markdown from the hosted parsing service      |

pub mod pdf;
pub mod processor;
pub mod rasterize;

pub use processor::DocumentProcessor;
pub use rasterize::{PageRasterizer, PopplerRasterizer};

use crate::config::PdfStrategy;
use crate::types::{AppError, AppResult};

pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Image types the vision model accepts.
pub const IMAGE_MEDIA_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

#[derive(Debug, Clone, PartialEq)]
pub enum FileKind {
    Image { media_type: String },
    TextPdf { text: String },
    ScannedPdf,
    HostedPdf,
}

impl FileKind {
    pub fn label(&self) -> &'static str {
        match self {
            FileKind::Image { .. } => "image",
            FileKind::TextPdf { .. } => "text_pdf",
            FileKind::ScannedPdf => "scanned_pdf",
            FileKind::HostedPdf => "hosted_pdf",
        }
    }
}

/// What gets sent to the model alongside the prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum PreparedContent {
    Text(String),
    Image { base64: String, media_type: String },
}

/// Normalized media type for an upload part.
///
/// The declared part type wins unless it is missing or generic, in which case
/// the file name extension decides.
pub fn resolve_media_type(declared: Option<&str>, file_name: &str) -> Option<String> {
    let declared = declared
        .and_then(|ct| ct.parse::<mime::Mime>().ok())
        .map(|m| m.essence_str().to_ascii_lowercase())
        .filter(|essence| essence != mime::APPLICATION_OCTET_STREAM.essence_str());

    let essence = declared.or_else(|| {
        mime_guess::from_path(file_name)
            .first()
            .map(|m| m.essence_str().to_ascii_lowercase())
    })?;

    Some(match essence.as_str() {
        "image/jpg" | "image/pjpeg" => "image/jpeg".to_string(),
        _ => essence,
    })
}

/// Reject anything that is not an allow-listed image or, when enabled, a PDF.
pub fn ensure_allowed(media_type: &str, strategy: PdfStrategy) -> AppResult<()> {
    let pdf_allowed = strategy != PdfStrategy::Disabled;

    if IMAGE_MEDIA_TYPES.contains(&media_type) || (pdf_allowed && media_type == PDF_MEDIA_TYPE) {
        return Ok(());
    }

    let allowed = if pdf_allowed {
        "Only JPEG, PNG, GIF, WEBP images and PDF files are allowed."
    } else {
        "Only JPEG, PNG, GIF and WEBP images are allowed."
    };
    Err(AppError::validation(format!(
        "Invalid file type '{}'. {}",
        media_type, allowed
    )))
}

/// Truncate to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_media_type_prefers_declared() {
        assert_eq!(
            resolve_media_type(Some("image/PNG; charset=binary"), "x.jpg").as_deref(),
            Some("image/png")
        );
    }

    #[test]
    fn test_resolve_media_type_guesses_from_extension() {
        assert_eq!(
            resolve_media_type(Some("application/octet-stream"), "scan.pdf").as_deref(),
            Some("application/pdf")
        );
        assert_eq!(resolve_media_type(None, "photo.JPG").as_deref(), Some("image/jpeg"));
        assert_eq!(resolve_media_type(None, "no-extension"), None);
    }

    #[test]
    fn test_resolve_media_type_normalizes_jpg() {
        assert_eq!(resolve_media_type(Some("image/jpg"), "a").as_deref(), Some("image/jpeg"));
    }

    #[test]
    fn test_allow_list() {
        assert!(ensure_allowed("image/png", PdfStrategy::Local).is_ok());
        assert!(ensure_allowed("application/pdf", PdfStrategy::Local).is_ok());
        assert!(ensure_allowed("application/pdf", PdfStrategy::Hosted).is_ok());
        assert!(ensure_allowed("image/webp", PdfStrategy::Disabled).is_ok());

        assert!(matches!(
            ensure_allowed("application/pdf", PdfStrategy::Disabled),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            ensure_allowed("text/plain", PdfStrategy::Local),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            ensure_allowed("image/svg+xml", PdfStrategy::Local),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo");
        assert_eq!(truncate_chars("", 5), "");
    }
}
