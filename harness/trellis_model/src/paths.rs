//! Package path normalization.
//!
//! Package paths are root-relative, `./`-prefixed and `/`-separated
//! (`./pkg/api`); the root package is `.`. Directory keys drop the prefix
//! (`pkg/api`, `.`).

use std::path::Path;

/// Strip the `./` prefix and trailing separators from a package path.
pub fn package_dir(package: &str) -> &str {
    let trimmed = package.trim_end_matches('/');
    let trimmed = trimmed.strip_prefix("./").unwrap_or(trimmed);
    if trimmed.is_empty() {
        "."
    } else {
        trimmed
    }
}

/// Canonical `./`-prefixed form of a package path or directory key.
pub fn package_path(dir: &str) -> String {
    match package_dir(dir) {
        "." => ".".to_string(),
        d => format!("./{d}"),
    }
}

/// Render a path with `/` separators.
pub fn slash_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Root-relative directory key of `path`, or `None` if it is outside `root`.
pub fn relative_dir(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let rel = slash_path(rel);
    Some(if rel.is_empty() { ".".to_string() } else { rel })
}

/// Normalize a reported source file to a root-relative `/`-separated path.
///
/// Relative inputs only have their separators normalized; absolute paths
/// outside `root` are kept as they are.
pub fn normalize_file(root: &Path, file: &str) -> String {
    if file.is_empty() {
        return String::new();
    }
    let path = Path::new(file);
    if path.is_absolute() {
        if let Ok(rel) = path.strip_prefix(root) {
            return slash_path(rel);
        }
    }
    file.replace('\\', "/")
}
