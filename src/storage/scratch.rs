use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Owns a file on disk and removes it exactly once.
///
/// Removal happens on [`ScratchFile::release`] or on drop, whichever comes
/// first. A file that is already gone is not an error; any other failure is
/// logged and swallowed so cleanup never masks the request's own outcome.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    released: bool,
}

impl ScratchFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            released: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the file now instead of at end of scope.
    pub fn release(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed scratch file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Scratch file already removed");
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to remove scratch file");
            }
        }
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        self.remove();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_drop_removes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("upload.png");
        std::fs::write(&path, b"data").unwrap();

        {
            let scratch = ScratchFile::new(&path);
            assert!(scratch.path().exists());
        }

        assert!(!path.exists());
    }

    #[test]
    fn test_release_removes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("page.png");
        std::fs::write(&path, b"data").unwrap();

        ScratchFile::new(&path).release();
        assert!(!path.exists());
    }

    #[test]
    fn test_already_removed_file_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gone.pdf");
        std::fs::write(&path, b"data").unwrap();

        let scratch = ScratchFile::new(&path);
        std::fs::remove_file(&path).unwrap();
        drop(scratch);

        assert!(!path.exists());
    }

    #[test]
    fn test_never_created_file_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        ScratchFile::new(dir.path().join("never-written.bin")).release();
    }
}
