//! Filesystem helpers - path normalisation and directory listing
//!
//! Identifiers for scripts and libraries are the normalised paths produced by
//! [`format_path`], so two spellings of the same location compare equal.

use std::path::{Component, Path, PathBuf};

use tracing::debug;

/// Normalise a path into its identifier form.
///
/// The result is absolute and cleaned lexically. The filesystem is never
/// consulted, so a path maps to the same identifier whether or not it exists.
pub fn format_path(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    normalize_lexically(&absolute)
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

pub fn is_dir(path: &Path) -> bool {
    path.is_dir()
}

pub fn is_file(path: &Path) -> bool {
    path.is_file()
}

/// Lower-cased extension without the leading dot
pub fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// File name without extension, used as the display name
pub fn display_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

/// Last path component, used for directory display names
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

/// Files directly inside `dir` (no recursion), sorted for stable ordering
pub fn files_in_directory(dir: &Path) -> Vec<PathBuf> {
    list(dir, |p| p.is_file())
}

/// Immediate sub-directories of `dir`, sorted
pub fn sub_directories(dir: &Path) -> Vec<PathBuf> {
    list(dir, |p| p.is_dir())
}

fn list(dir: &Path, keep: impl Fn(&Path) -> bool) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Failed to list {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| keep(p))
        .map(format_path)
        .collect();
    paths.sort();
    paths
}
