//! Turns the user's target argument into a URL.
//!
//! Absolute `http`, `https` and `file` URLs pass through untouched. Anything
//! else is a filesystem path: relative paths are joined to the working
//! directory, then converted to a `file://` URL with proper escaping.

use crate::error::{CliError, Result};
use std::path::Path;
use url::Url;

const PASSTHROUGH_SCHEMES: [&str; 3] = ["http://", "https://", "file://"];

/// Normalizes `target` relative to `cwd`.
///
/// # Errors
///
/// Returns `InvalidTarget` for empty input or paths that cannot be expressed
/// as a file URL.
pub fn normalize_target(target: &str, cwd: &Path) -> Result<String> {
    let trimmed = target.trim();
    if trimmed.is_empty() {
        return Err(invalid(target, "target is empty"));
    }

    let lower = trimmed.to_ascii_lowercase();
    if PASSTHROUGH_SCHEMES.iter().any(|scheme| lower.starts_with(scheme)) {
        return Ok(trimmed.to_string());
    }

    let path = Path::new(trimmed);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    };

    Url::from_file_path(&absolute)
        .map(String::from)
        .map_err(|()| invalid(target, "cannot be converted to a file URL"))
}

/// Normalizes `target` relative to the process working directory.
///
/// # Errors
///
/// Returns an error if the working directory is unavailable or the target
/// is invalid.
pub fn normalize_target_from_cwd(target: &str) -> Result<String> {
    let cwd = std::env::current_dir()?;
    normalize_target(target, &cwd)
}

fn invalid(target: &str, reason: &str) -> CliError {
    CliError::InvalidTarget {
        target: target.to_string(),
        reason: reason.to_string(),
    }
}
