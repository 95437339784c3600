// PID file lifecycle: written at startup, removed when the guard drops.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Guard owning a written PID file
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Write the current process id to `path`
    ///
    /// An existing file is overwritten; a stale file from a crashed run must
    /// not block startup.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        fs::write(&path, format!("{}\n", std::process::id()))
            .with_context(|| format!("Failed to write PID file {}", path.display()))?;
        tracing::debug!("Wrote PID file {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!("Failed to remove PID file {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pid_file_written_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ddnsd.pid");

        let guard = PidFile::create(&path).unwrap();
        let contents = fs::read_to_string(guard.path()).unwrap();
        assert_eq!(contents.trim(), std::process::id().to_string());

        drop(guard);
        assert!(!path.exists());
    }

    #[test]
    fn test_stale_pid_file_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ddnsd.pid");
        fs::write(&path, "99999\n").unwrap();

        let _guard = PidFile::create(&path).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.trim(), std::process::id().to_string());
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("ddnsd.pid");

        assert!(PidFile::create(&path).is_err());
    }
}
