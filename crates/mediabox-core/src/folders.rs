//! Folder suggestions for the output-directory picker.

use std::fs;
use std::path::{Path, PathBuf};

/// Quick-access folders for `cur_dir`: itself, the filesystem root, its
/// parent and the home directory, without duplicates.
pub fn quick_access(cur_dir: &Path) -> Vec<PathBuf> {
    let mut res = vec![cur_dir.to_path_buf()];
    let parent = if cur_dir.exists() {
        cur_dir.parent().unwrap_or(cur_dir).to_path_buf()
    } else {
        cur_dir.to_path_buf()
    };
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/"));
    for f in [PathBuf::from(std::path::MAIN_SEPARATOR_STR), parent, home] {
        if !res.contains(&f) {
            res.push(f);
        }
    }
    res
}

/// [`quick_access`] followed by the sorted, non-hidden subdirectories of
/// `cur_dir`. Unreadable directories contribute no children.
pub fn subfolders(cur_dir: &Path) -> Vec<PathBuf> {
    let mut res = quick_access(cur_dir);
    let mut children: Vec<PathBuf> = match fs::read_dir(cur_dir) {
        Ok(entries) => entries
            .flatten()
            .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
            .map(|e| e.path())
            .collect(),
        Err(e) => {
            tracing::debug!(dir = %cur_dir.display(), "list subfolders: {}", e);
            Vec::new()
        }
    };
    children.sort();
    for c in children {
        if !res.contains(&c) {
            res.push(c);
        }
    }
    res
}
