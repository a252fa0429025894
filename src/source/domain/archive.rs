//! Outcome and failure types for uploaded source archives.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Facts about an expanded archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    /// Archive size in bytes.
    pub size_bytes: u64,
    /// Lowercase hex SHA-256 digest of the archive.
    pub sha256: String,
    /// Number of regular files written.
    pub file_count: usize,
    /// Directory the archive was expanded into.
    pub destination: Utf8PathBuf,
}

impl ArchiveSummary {
    /// Renders the summary as one transcript chunk.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Uploaded archive ({} bytes, sha256 {})\nExtracted {} files to: {}",
            self.size_bytes, self.sha256, self.file_count, self.destination
        )
    }
}

/// Archive expansion failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ArchiveError {
    /// The bytes are not a readable ZIP archive.
    #[error("invalid archive: {0}")]
    Invalid(String),

    /// An entry would be written outside the code directory.
    #[error("archive entry escapes the code directory: {0}")]
    UnsafeEntry(String),

    /// A local filesystem operation failed.
    #[error("archive extraction failed: {0}")]
    Io(String),
}

impl From<std::io::Error> for ArchiveError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
