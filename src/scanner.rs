//! Recursive file discovery with suffix filtering
//!
//! Walks a directory tree and returns (path, size, mtime) for every regular
//! file matching a suffix. Per-entry access errors are logged and skipped so
//! one unreadable directory does not abort a scan; a missing or non-directory
//! root is a hard error because the caller referenced it directly.

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use walkdir::{DirEntry, WalkDir};

use crate::error::{Error, Result};

/// Junk files ignored during traversal
const IGNORE_PATTERNS: &[&str] = &[".DS_Store", "Thumbs.db", ".git", ".svn"];

/// One discovered file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Modification time as epoch seconds; 0 when the filesystem cannot say
    pub modified_at: i64,
}

/// Collect every regular file under `root` whose name ends with `suffix`.
///
/// Matching is case-insensitive on the suffix. Results are in traversal
/// order, which is not guaranteed stable across platforms.
pub fn scan_suffix(root: &Path, suffix: &str) -> Result<Vec<FileInfo>> {
    if !root.exists() {
        return Err(Error::NotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(Error::NotADirectory(root.to_path_buf()));
    }

    let suffix_lower = suffix.to_ascii_lowercase();
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(should_process_entry);

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Error accessing entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_ascii_lowercase();
        if !name.ends_with(&suffix_lower) {
            continue;
        }
        match entry.metadata() {
            Ok(metadata) => {
                let modified_at = metadata
                    .modified()
                    .ok()
                    .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                    .map(|d| d.as_secs() as i64)
                    .unwrap_or(0);
                files.push(FileInfo {
                    path: entry.path().to_path_buf(),
                    size_bytes: metadata.len(),
                    modified_at,
                });
            }
            Err(e) => {
                tracing::warn!("Error reading metadata for {}: {}", entry.path().display(), e);
            }
        }
    }

    tracing::debug!(
        "Scan complete: {} files matching *{} under {}",
        files.len(),
        suffix,
        root.display()
    );
    Ok(files)
}

fn should_process_entry(entry: &DirEntry) -> bool {
    let file_name = entry.file_name().to_string_lossy();
    !IGNORE_PATTERNS
        .iter()
        .any(|pattern| file_name.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn finds_matching_files_recursively() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("Alesis")).unwrap();
        fs::write(dir.path().join("Alesis/D4.midnam"), "<x/>").unwrap();
        fs::write(dir.path().join("Alesis/D4.middev"), "<x/>").unwrap();
        fs::write(dir.path().join("README.txt"), "hi").unwrap();

        let files = scan_suffix(dir.path(), ".midnam").unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].path.ends_with("Alesis/D4.midnam"));
        assert_eq!(files[0].size_bytes, 4);
        assert!(files[0].modified_at > 0);
    }

    #[test]
    fn suffix_match_is_case_insensitive() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("D4.MIDNAM"), "<x/>").unwrap();
        let files = scan_suffix(dir.path(), ".midnam").unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn missing_root_is_not_found() {
        let result = scan_suffix(Path::new("/nonexistent/midnam/root"), ".midnam");
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn file_root_is_not_a_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.midnam");
        fs::write(&file, "<x/>").unwrap();
        let result = scan_suffix(&file, ".midnam");
        assert!(matches!(result, Err(Error::NotADirectory(_))));
    }
}
