//! Location → storage target resolution.

use std::path::{Path, PathBuf};

use crate::config::{non_empty_env, Config, PACKAGE_DIR_ENV};
use crate::engine::Target;
use crate::error::{Error, Result};

/// Locations starting with this marker resolve against the package data directory.
pub const PACKAGE_MARKER: &str = ":ss:";

/// Connection-string prefixes handed to the remote engine unresolved.
pub const REMOTE_SCHEMES: [&str; 3] = ["redis://", "rediss://", "redis+unix://"];

/// Whether `location` is a remote connection string.
pub fn is_remote(location: &str) -> bool {
    REMOTE_SCHEMES.iter().any(|scheme| location.starts_with(scheme))
}

/// The directory `:ss:` locations resolve against: the configured one,
/// then `SIMPSAVE_PACKAGE_DIR`, then `<data dir>/simpsave`.
pub fn package_dir(config: &Config) -> Option<PathBuf> {
    config
        .package_dir
        .clone()
        .or_else(|| non_empty_env(PACKAGE_DIR_ENV).map(PathBuf::from))
        .or_else(|| dirs::data_dir().map(|dir| dir.join("simpsave")))
}

/// Resolve a file location to an absolute path.
///
/// `None` becomes `<default_stem><default_suffix>` in the working directory.
/// Apart from `:ss:` locations, the file or at least its parent directory
/// must already exist.
pub fn resolve_path(location: Option<&str>, default_suffix: &str, config: &Config) -> Result<PathBuf> {
    let location = match location {
        Some(location) => location.to_string(),
        None => format!("{}{}", config.default_stem, default_suffix),
    };

    if let Some(relative) = location.strip_prefix(PACKAGE_MARKER) {
        let base = package_dir(config).ok_or_else(|| Error::PackageDirUnavailable(location.clone()))?;
        return Ok(base.join(relative.trim_start_matches(['/', '\\'])));
    }

    if location.is_empty() {
        return Err(Error::InvalidPath(location));
    }
    let absolute = std::path::absolute(&location).map_err(|_| Error::InvalidPath(location.clone()))?;
    if !absolute.is_file() && !absolute.parent().is_some_and(Path::is_dir) {
        return Err(Error::InvalidPath(absolute.display().to_string()));
    }
    Ok(absolute)
}

/// Resolve any location: connection strings pass through, everything else
/// goes through [`resolve_path`].
pub fn resolve_target(location: Option<&str>, default_suffix: &str, config: &Config) -> Result<Target> {
    match location {
        Some(url) if is_remote(url) => Ok(Target::Remote(url.to_string())),
        _ => resolve_path(location, default_suffix, config).map(Target::File),
    }
}

/// Lowercase extension with its dot, e.g. `.json`.
pub(crate) fn dotted_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
}
