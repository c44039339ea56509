//! Upload → model input.
//!
//! [`DocumentProcessor::classify`] inspects a stored upload once;
//! [`DocumentProcessor::prepare`] turns the resulting [`FileKind`] into the
//! [`PreparedContent`] the completion step sends. Intermediate files (the
//! rasterized page) live in the upload directory under their own guard.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::pdf;
use super::rasterize::PageRasterizer;
use super::{truncate_chars, FileKind, PreparedContent, IMAGE_MEDIA_TYPES, PDF_MEDIA_TYPE};
use crate::config::{PdfStrategy, UploadConfig};
use crate::parser::LlamaCloudParser;
use crate::storage::{ScratchFile, StoredUpload, UploadDir};
use crate::types::{AppError, AppResult};

const RASTERIZED_MEDIA_TYPE: &str = "image/png";

pub struct DocumentProcessor {
    upload_dir: UploadDir,
    rasterizer: Arc<dyn PageRasterizer>,
    parser: Arc<LlamaCloudParser>,
    strategy: PdfStrategy,
    max_content_chars: usize,
}

impl DocumentProcessor {
    pub fn new(
        upload_dir: UploadDir,
        rasterizer: Arc<dyn PageRasterizer>,
        parser: Arc<LlamaCloudParser>,
        config: &UploadConfig,
    ) -> Self {
        Self {
            upload_dir,
            rasterizer,
            parser,
            strategy: config.pdf_strategy,
            max_content_chars: config.max_content_chars,
        }
    }

    /// Decide how an upload reaches the model.
    pub async fn classify(&self, upload: &StoredUpload) -> AppResult<FileKind> {
        let media_type = upload.media_type.as_str();

        if IMAGE_MEDIA_TYPES.contains(&media_type) {
            return Ok(FileKind::Image {
                media_type: media_type.to_string(),
            });
        }

        if media_type != PDF_MEDIA_TYPE {
            return Err(AppError::validation(format!(
                "Invalid file type '{}'.",
                media_type
            )));
        }

        match self.strategy {
            PdfStrategy::Hosted => Ok(FileKind::HostedPdf),
            PdfStrategy::Disabled => Err(AppError::validation("PDF uploads are disabled.")),
            PdfStrategy::Local => {
                let bytes = upload.read().await?;
                let extracted = tokio::task::spawn_blocking(move || pdf::extract_text(&bytes))
                    .await
                    .map_err(|e| AppError::Internal(format!("PDF extraction task failed: {}", e)))?;

                match extracted {
                    Ok(text) if pdf::has_text_layer(&text) => Ok(FileKind::TextPdf { text }),
                    Ok(text) => {
                        debug!(chars = text.trim().chars().count(), "PDF has no usable text layer");
                        Ok(FileKind::ScannedPdf)
                    }
                    Err(e) => {
                        warn!(file_name = %upload.original_name, error = %e, "PDF not parseable, treating as scanned");
                        Ok(FileKind::ScannedPdf)
                    }
                }
            }
        }
    }

    /// Classify and convert an upload into model input.
    pub async fn prepare(&self, upload: &StoredUpload) -> AppResult<PreparedContent> {
        let kind = self.classify(upload).await?;
        info!(
            file_name = %upload.original_name,
            size = upload.size,
            kind = kind.label(),
            "Preparing upload"
        );

        match kind {
            FileKind::Image { media_type } => {
                let bytes = upload.read().await?;
                Ok(PreparedContent::Image {
                    base64: BASE64.encode(bytes),
                    media_type,
                })
            }
            FileKind::TextPdf { text } => Ok(PreparedContent::Text(self.truncate(&text))),
            FileKind::ScannedPdf => self.rasterize(upload).await,
            FileKind::HostedPdf => {
                let markdown = self
                    .parser
                    .parse(upload.path(), &upload.original_name, &upload.media_type)
                    .await?;
                Ok(PreparedContent::Text(self.truncate(&markdown)))
            }
        }
    }

    async fn rasterize(&self, upload: &StoredUpload) -> AppResult<PreparedContent> {
        let page = ScratchFile::new(self.upload_dir.scratch_path(&upload.original_name, "png"));

        self.rasterizer
            .rasterize_first_page(upload.path(), page.path())
            .await?;
        let png = tokio::fs::read(page.path()).await?;
        page.release();

        Ok(PreparedContent::Image {
            base64: BASE64.encode(png),
            media_type: RASTERIZED_MEDIA_TYPE.to_string(),
        })
    }

    fn truncate(&self, text: &str) -> String {
        let truncated = truncate_chars(text, self.max_content_chars);
        if truncated.len() < text.len() {
            debug!(max_chars = self.max_content_chars, "Document content truncated");
        }
        truncated.to_string()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub const FAKE_PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake-page-one";

    /// Writes a fixed PNG instead of running poppler.
    #[derive(Default)]
    pub struct FakeRasterizer {
        pub calls: AtomicUsize,
        pub fail: bool,
    }

    impl FakeRasterizer {
        pub fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: true,
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PageRasterizer for FakeRasterizer {
        async fn rasterize_first_page(&self, _pdf: &Path, output: &Path) -> AppResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AppError::Internal("pdftoppm exited with 1".to_string()));
            }
            tokio::fs::write(output, FAKE_PNG).await?;
            Ok(())
        }
    }
}
