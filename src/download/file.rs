//! Destination file assembly.
//!
//! A [`FeedFile`] owns the output handle for the whole retrieval. Chunks are
//! appended strictly in arrival order through a buffered writer; any write
//! failure is a fatal [`DownloadError::FileCreation`]. A window whose body was
//! cut off mid-stream is rolled back with [`FeedFile::truncate_to`] before it
//! is requested again.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncSeekExt, AsyncWriteExt, BufWriter};
use tracing::{debug, instrument};

use super::DownloadError;

/// Append-only output file for one retrieval.
#[derive(Debug)]
pub struct FeedFile {
    path: PathBuf,
    writer: BufWriter<File>,
    bytes_written: u64,
}

impl FeedFile {
    /// Creates (or truncates) the file at `path`, creating missing parent
    /// directories first.
    ///
    /// After this returns the file exists with size zero, so callers can tell
    /// "no bytes received" apart from "failed before any I/O".
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::FileCreation`] if a directory or the file
    /// cannot be created.
    #[instrument(skip(path), fields(path = %path.display()))]
    pub async fn create(path: &Path) -> Result<Self, DownloadError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DownloadError::file_creation(path, e))?;
        }

        let file = File::create(path)
            .await
            .map_err(|e| DownloadError::file_creation(path, e))?;
        debug!("created destination file");

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            bytes_written: 0,
        })
    }

    /// Appends one chunk after everything written so far.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::FileCreation`] on any write failure.
    pub async fn append(&mut self, chunk: &[u8]) -> Result<(), DownloadError> {
        self.writer
            .write_all(chunk)
            .await
            .map_err(|e| DownloadError::file_creation(&self.path, e))?;
        self.bytes_written += chunk.len() as u64;
        Ok(())
    }

    /// Discards everything after the first `len` bytes and continues writing
    /// from there. Lengths past the current end are clamped.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::FileCreation`] if the flush, resize or seek fails.
    pub async fn truncate_to(&mut self, len: u64) -> Result<(), DownloadError> {
        let len = len.min(self.bytes_written);
        self.writer
            .flush()
            .await
            .map_err(|e| DownloadError::file_creation(&self.path, e))?;
        self.writer
            .get_mut()
            .set_len(len)
            .await
            .map_err(|e| DownloadError::file_creation(&self.path, e))?;
        self.writer
            .seek(SeekFrom::Start(len))
            .await
            .map_err(|e| DownloadError::file_creation(&self.path, e))?;
        debug!(from = self.bytes_written, to = len, "truncated destination file");
        self.bytes_written = len;
        Ok(())
    }

    /// Total bytes appended so far.
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes buffered bytes to disk and closes the handle.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::FileCreation`] if the final flush fails.
    pub async fn close(mut self) -> Result<u64, DownloadError> {
        self.writer
            .flush()
            .await
            .map_err(|e| DownloadError::file_creation(&self.path, e))?;
        self.writer
            .shutdown()
            .await
            .map_err(|e| DownloadError::file_creation(&self.path, e))?;
        debug!(path = %self.path.display(), bytes = self.bytes_written, "closed destination file");
        Ok(self.bytes_written)
    }
}
