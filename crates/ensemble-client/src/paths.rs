//! Node path helpers

use ensemble_core::{Error, Result};

/// Path separator
pub const SEPARATOR: char = '/';

/// Check that `path` is an absolute node path
pub fn validate_path(path: &str) -> Result<()> {
    let reject = |reason: &str| {
        Err(Error::InvalidPath {
            path: path.to_string(),
            reason: reason.to_string(),
        })
    };

    if path.is_empty() {
        return reject("path must not be empty");
    }
    if !path.starts_with(SEPARATOR) {
        return reject("path must start with /");
    }
    if path.len() > 1 && path.ends_with(SEPARATOR) {
        return reject("path must not end with /");
    }
    if path.contains("//") {
        return reject("empty segment");
    }
    if path.chars().any(|c| c == '\0') {
        return reject("null character");
    }
    Ok(())
}

/// Join `parent` and `child` with exactly one separator
pub fn make_path(parent: &str, child: &str) -> String {
    let parent = parent.trim_end_matches(SEPARATOR);
    let child = child.trim_matches(SEPARATOR);

    match (parent.is_empty(), child.is_empty()) {
        (true, true) => SEPARATOR.to_string(),
        (true, false) => format!("/{}", child),
        (false, true) => ensure_leading(parent),
        (false, false) => format!("{}/{}", ensure_leading(parent), child),
    }
}

/// Apply `namespace` to an absolute `path`
///
/// An empty namespace leaves the path untouched.
pub fn fix_for_namespace(namespace: &str, path: &str) -> Result<String> {
    validate_path(path)?;
    if namespace.is_empty() {
        return Ok(path.to_string());
    }
    Ok(make_path(namespace, path))
}

fn ensure_leading(path: &str) -> String {
    if path.starts_with(SEPARATOR) {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}
