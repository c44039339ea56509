use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::pin::pin;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use uuid::Uuid;

use super::ScratchFile;
use crate::types::{AppError, AppResult};

/// Directory that holds in-flight uploads and intermediate files.
#[derive(Debug, Clone)]
pub struct UploadDir {
    root: PathBuf,
}

/// An upload written to disk. Dropping it removes the file.
#[derive(Debug)]
pub struct StoredUpload {
    pub file: ScratchFile,
    pub original_name: String,
    pub media_type: String,
    pub size: u64,
}

impl StoredUpload {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub async fn read(&self) -> AppResult<Vec<u8>> {
        Ok(fs::read(self.path()).await?)
    }
}

impl UploadDir {
    /// Create the directory (recursively, idempotently). Called once before the listener starts.
    pub async fn init(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        info!(path = %root.display(), "Upload directory ready");
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Unique path for an intermediate file with the given extension.
    pub fn scratch_path(&self, stem: &str, extension: &str) -> PathBuf {
        self.root.join(format!(
            "{}-{}-{}.{}",
            chrono::Utc::now().timestamp_millis(),
            sanitize_filename(stem),
            Uuid::new_v4().simple(),
            extension
        ))
    }

    /// Stream an upload body to `{timestamp}-{sanitized name}`, enforcing `limit` bytes.
    ///
    /// The file is guarded from the moment it is created, so a read error or an
    /// oversize body leaves nothing behind.
    pub async fn store_stream<S, E>(
        &self,
        original_name: &str,
        media_type: &str,
        stream: S,
        limit: usize,
    ) -> AppResult<StoredUpload>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: std::fmt::Display,
    {
        let (file, path) = self.create_upload_file(original_name).await?;
        let guard = ScratchFile::new(path);
        let mut file = file;
        let mut stream = pin!(stream);
        let mut size: usize = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                AppError::validation(format!("Failed to read uploaded file: {}", e))
            })?;
            size += chunk.len();
            if size > limit {
                return Err(AppError::validation(format!(
                    "File too large. Maximum size is {}.",
                    describe_size(limit)
                )));
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        if size == 0 {
            return Err(AppError::validation("Uploaded file is empty."));
        }

        debug!(path = %guard.path().display(), size, "Stored upload");

        Ok(StoredUpload {
            file: guard,
            original_name: original_name.to_string(),
            media_type: media_type.to_string(),
            size: size as u64,
        })
    }

    async fn create_upload_file(&self, original_name: &str) -> std::io::Result<(File, PathBuf)> {
        let stamp = chrono::Utc::now().timestamp_millis();
        let name = sanitize_filename(original_name);

        let path = self.root.join(format!("{}-{}", stamp, name));
        match OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => Ok((file, path)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                // Same name within the same millisecond.
                let path = self
                    .root
                    .join(format!("{}-{}-{}", stamp, Uuid::new_v4().simple(), name));
                let file = OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(&path)
                    .await?;
                Ok((file, path))
            }
            Err(e) => Err(e),
        }
    }
}

/// Strip every character outside `[a-zA-Z0-9.-]`.
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.' || *c == '-')
        .collect();

    if sanitized.is_empty() {
        "upload".to_string()
    } else {
        sanitized
    }
}

fn describe_size(bytes: usize) -> String {
    const MB: usize = 1024 * 1024;
    if bytes >= MB && bytes % MB == 0 {
        format!("{} MB", bytes / MB)
    } else {
        format!("{} bytes", bytes)
    }
}
