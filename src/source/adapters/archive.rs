//! ZIP archive expansion into a bot's code directory.

use crate::source::domain::{ArchiveError, ArchiveSummary};
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use sha2::{Digest, Sha256};
use std::io::{Cursor, ErrorKind};
use tracing::{info, instrument};
use zip::ZipArchive;

/// Replaces a code directory with the contents of an uploaded ZIP archive.
///
/// The archive is fully validated before the directory is cleared, so an
/// unreadable or hostile upload leaves the previous sources untouched.
/// Entries are written through a directory handle that cannot be escaped.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchiveExpander;

impl ZipArchiveExpander {
    /// Creates an expander.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Clears `code_path` and expands `archive` into it.
    ///
    /// This performs blocking filesystem work.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Invalid`] for unreadable archives,
    /// [`ArchiveError::UnsafeEntry`] for entries with absolute or parent
    /// components, and [`ArchiveError::Io`] for filesystem failures.
    #[instrument(skip(self, archive), fields(size_bytes = archive.len()))]
    pub fn expand(
        &self,
        archive: &[u8],
        code_path: &Utf8Path,
    ) -> Result<ArchiveSummary, ArchiveError> {
        let mut zip = ZipArchive::new(Cursor::new(archive))
            .map_err(|err| ArchiveError::Invalid(err.to_string()))?;
        let entries = validated_entries(&mut zip)?;

        let code_dir = recreate_dir(code_path)?;
        let mut file_count = 0;
        for (index, (relative, is_dir)) in entries.iter().enumerate() {
            if *is_dir {
                code_dir.create_dir_all(relative)?;
                continue;
            }
            if let Some(parent) = relative.parent().filter(|parent| !parent.as_str().is_empty()) {
                code_dir.create_dir_all(parent)?;
            }
            let mut entry = zip
                .by_index(index)
                .map_err(|err| ArchiveError::Invalid(err.to_string()))?;
            let mut output = code_dir.create(relative)?;
            std::io::copy(&mut entry, &mut output)?;
            file_count += 1;
        }

        let summary = ArchiveSummary {
            size_bytes: u64::try_from(archive.len()).unwrap_or(u64::MAX),
            sha256: format!("{:x}", Sha256::digest(archive)),
            file_count,
            destination: code_path.to_path_buf(),
        };
        info!(file_count, sha256 = %summary.sha256, "archive expanded");
        Ok(summary)
    }
}

fn validated_entries(
    zip: &mut ZipArchive<Cursor<&[u8]>>,
) -> Result<Vec<(Utf8PathBuf, bool)>, ArchiveError> {
    (0..zip.len())
        .map(|index| {
            let entry = zip
                .by_index(index)
                .map_err(|err| ArchiveError::Invalid(err.to_string()))?;
            let enclosed = entry
                .enclosed_name()
                .ok_or_else(|| ArchiveError::UnsafeEntry(entry.name().to_owned()))?;
            let relative = Utf8PathBuf::from_path_buf(enclosed)
                .map_err(|_| ArchiveError::UnsafeEntry(entry.name().to_owned()))?;
            Ok((relative, entry.is_dir()))
        })
        .collect()
}

fn recreate_dir(code_path: &Utf8Path) -> Result<Dir, ArchiveError> {
    let name = code_path
        .file_name()
        .ok_or_else(|| ArchiveError::Io(format!("code path {code_path} has no final component")))?;
    let parent = code_path.parent().unwrap_or_else(|| Utf8Path::new("."));
    let parent = if parent.as_str().is_empty() {
        Utf8Path::new(".")
    } else {
        parent
    };

    Dir::create_ambient_dir_all(parent, ambient_authority())?;
    let parent_dir = Dir::open_ambient_dir(parent, ambient_authority())?;
    match parent_dir.remove_dir_all(name) {
        Ok(()) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => return Err(err.into()),
    }
    parent_dir.create_dir(name)?;
    Ok(parent_dir.open_dir(name)?)
}
