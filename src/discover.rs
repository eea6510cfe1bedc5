//! Input discovery: every file with a given extension under a root directory.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::BatchError;

/// Recursively collect matching files, as absolute paths in sorted order.
///
/// The extension match is case-insensitive and does not include the dot.
/// Unreadable entries below the root are skipped; a missing root is an error.
pub fn find_files(root: &Path, extension: &str) -> Result<Vec<PathBuf>, BatchError> {
    let root = root.canonicalize().map_err(|e| BatchError::Discovery {
        root: root.to_path_buf(),
        reason: e.to_string(),
    })?;
    if !root.is_dir() {
        return Err(BatchError::Discovery {
            root,
            reason: "not a directory".to_string(),
        });
    }

    let wanted = extension.trim_start_matches('.').to_lowercase();
    let mut files: Vec<PathBuf> = WalkDir::new(&root)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_lowercase() == wanted)
                .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    Ok(files)
}
