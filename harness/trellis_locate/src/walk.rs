//! Source tree walking.
//!
//! Finds Go test packages: directories holding at least one `*_test.go`.

use std::fs;
use std::path::{Path, PathBuf};

/// Suffix of Go test source files.
pub const TEST_FILE_SUFFIX: &str = "_test.go";

/// Directory names never descended into.
const SKIPPED_DIRS: &[&str] = &["vendor", "testdata", "node_modules", "target"];

/// `*_test.go` files directly inside `dir`, sorted by path.
pub fn test_source_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_test_source(path))
        .collect();
    files.sort();
    files
}

/// Directories at or below `root` that contain test sources, sorted.
pub fn test_package_dirs(root: &Path) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    collect_package_dirs(root, &mut dirs);
    dirs.sort();
    dirs
}

fn collect_package_dirs(dir: &Path, dirs: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    let mut has_tests = false;
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        // Skip hidden files and directories
        if name.starts_with('.') {
            continue;
        }

        if path.is_dir() {
            if SKIPPED_DIRS.contains(&name) {
                continue;
            }
            collect_package_dirs(&path, dirs);
        } else if is_test_source(&path) {
            has_tests = true;
        }
    }

    if has_tests {
        dirs.push(dir.to_path_buf());
    }
}

fn is_test_source(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(TEST_FILE_SUFFIX) && !n.starts_with('.'))
}
