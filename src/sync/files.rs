use crate::error::{Result, SyncError};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A file found under the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    /// Path on disk
    pub local_path: PathBuf,
    /// Path relative to the output directory, always with `/` separators
    pub relative_path: String,
}

/// List all regular files under `root`, recursively.
///
/// Entries are sorted by file name within each directory, so the result is
/// stable across runs. A missing root lists as empty.
pub fn list_local_files(root: &Path) -> Result<Vec<LocalFile>> {
    if !root.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| SyncError::Enumerate {
            dir: root.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        if let Ok(relative) = entry.path().strip_prefix(root) {
            let relative_path = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            files.push(LocalFile {
                local_path: entry.path().to_path_buf(),
                relative_path,
            });
        }
    }

    Ok(files)
}

/// Move the entry document to the end, keeping every other file in place.
/// The site must not serve a page before the assets it references exist.
pub fn order_for_upload(files: Vec<LocalFile>, entry_document: &str) -> Vec<LocalFile> {
    let (entry, mut rest): (Vec<_>, Vec<_>) = files
        .into_iter()
        .partition(|file| file.relative_path == entry_document);
    rest.extend(entry);
    rest
}
