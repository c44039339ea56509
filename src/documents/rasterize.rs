//! First-page rasterization for PDFs without a text layer.
//!
//! Shells out to poppler's `pdftoppm`, the same way the rest of the service
//! runs external commands: `tokio::process::Command` bounded by a timeout.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::types::{AppError, AppResult};

#[async_trait]
pub trait PageRasterizer: Send + Sync {
    /// Render page 1 of `pdf` as a PNG at exactly `output`.
    async fn rasterize_first_page(&self, pdf: &Path, output: &Path) -> AppResult<()>;
}

pub struct PopplerRasterizer {
    binary: PathBuf,
    dpi: u32,
    timeout: Duration,
}

impl PopplerRasterizer {
    pub fn new(dpi: u32, timeout: Duration) -> Self {
        Self {
            binary: PathBuf::from("pdftoppm"),
            dpi,
            timeout,
        }
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    fn command(&self, pdf: &Path, output_prefix: &Path) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-png")
            .args(["-f", "1", "-l", "1"])
            .arg("-singlefile")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg(pdf)
            .arg(output_prefix)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl PageRasterizer for PopplerRasterizer {
    async fn rasterize_first_page(&self, pdf: &Path, output: &Path) -> AppResult<()> {
        // pdftoppm appends ".png" to the prefix it is given.
        let prefix = output.with_extension("");
        let start = std::time::Instant::now();

        let result = timeout(self.timeout, self.command(pdf, &prefix).output()).await;

        let output_status = match result {
            Ok(Ok(out)) => out,
            Ok(Err(e)) if e.kind() == ErrorKind::NotFound => {
                return Err(AppError::Configuration(format!(
                    "{} not found; install poppler-utils to enable scanned PDF support",
                    self.binary.display()
                )));
            }
            Ok(Err(e)) => return Err(AppError::Io(e)),
            Err(_) => {
                return Err(AppError::Timeout(format!(
                    "rasterizing page 1 took longer than {}s",
                    self.timeout.as_secs()
                )));
            }
        };

        if !output_status.status.success() {
            let stderr = String::from_utf8_lossy(&output_status.stderr);
            return Err(AppError::Internal(format!(
                "pdftoppm exited with {}: {}",
                output_status.status,
                stderr.trim()
            )));
        }

        if !output.exists() {
            return Err(AppError::Internal(
                "pdftoppm reported success but produced no image".to_string(),
            ));
        }

        info!(
            pdf = %pdf.display(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Rasterized first PDF page"
        );
        debug!(output = %output.display(), dpi = self.dpi, "Rasterized page written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_arguments() {
        let rasterizer = PopplerRasterizer::new(150, Duration::from_secs(5));
        let cmd = rasterizer.command(Path::new("/tmp/in.pdf"), Path::new("/tmp/out"));
        let std_cmd = cmd.as_std();

        assert_eq!(std_cmd.get_program(), "pdftoppm");
        let args: Vec<_> = std_cmd
            .get_args()
            .map(|a| a.to_string_lossy().to_string())
            .collect();
        assert_eq!(
            args,
            vec!["-png", "-f", "1", "-l", "1", "-singlefile", "-r", "150", "/tmp/in.pdf", "/tmp/out"]
        );
    }

    #[tokio::test]
    async fn test_missing_binary_is_a_configuration_error() {
        let rasterizer = PopplerRasterizer::new(72, Duration::from_secs(5))
            .with_binary("/nonexistent/bin/pdftoppm-missing");

        let result = rasterizer
            .rasterize_first_page(Path::new("/tmp/in.pdf"), Path::new("/tmp/out.png"))
            .await;

        assert!(matches!(result, Err(AppError::Configuration(_))));
    }
}
