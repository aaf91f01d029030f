//! Unified error type for the simpsave library.
//!
//! Every engine, the registry, the path resolver and the facade report
//! failures through the single [`Error`] enum, so callers can match on the
//! failure kind without caring which backend produced it.

use thiserror::Error;

/// Unified error type for all simpsave operations.
///
/// # Example
///
/// ```ignore
/// use simpsave::{Error, Result};
///
/// fn load_score() -> Result<i64> {
///     match simpsave::read("score", Some("scores.json")) {
///         Ok(value) => Ok(value.as_i64().unwrap_or_default()),
///         Err(e) if e.is_not_found() => Ok(0),
///         Err(e) => Err(e),
///     }
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A value (or one of its nested keys/members) is outside the supported type set.
    #[error("Unsupported value: {0}")]
    UnsupportedType(String),

    /// The key cannot be represented by the selected engine's format.
    #[error("Invalid key '{key}' for the {engine} engine: {reason}")]
    InvalidKey {
        key: String,
        engine: &'static str,
        reason: &'static str,
    },

    /// The storage target itself does not exist.
    #[error("The specified target does not exist: {0}")]
    TargetNotFound(String),

    /// The key does not exist in an existing target.
    #[error("Key '{key}' does not exist in {target}")]
    KeyNotFound { key: String, target: String },

    /// A stored transport form cannot be coerced to its recorded type.
    #[error("Unable to convert value {value} to type {type_tag}")]
    Conversion { value: String, type_tag: String },

    /// A stored literal is malformed.
    #[error("Malformed literal at offset {offset}: {message}")]
    Literal { offset: usize, message: String },

    /// A stored document cannot be parsed by its format.
    #[error("Malformed {format} document {target}: {message}")]
    Format {
        format: &'static str,
        target: String,
        message: String,
    },

    /// The engine is known but its optional dependency is not compiled in.
    #[error(
        "Engine '{engine}' is not available. Required dependency '{dependency}' is not installed \
         (enable the `{feature}` feature). Available engines: {available:?}"
    )]
    EngineUnavailable {
        engine: String,
        dependency: &'static str,
        feature: &'static str,
        available: Vec<&'static str>,
    },

    /// The engine name was never registered.
    #[error("Unknown engine '{name}'. Available engines: {available:?}")]
    UnknownEngine {
        name: String,
        available: Vec<&'static str>,
    },

    /// Neither the target file nor its parent directory exists.
    #[error("Invalid path in the system: {0}")]
    InvalidPath(String),

    /// A package-relative location was used but no package directory is known.
    #[error(
        "Package data directory could not be located for '{0}' \
         (set `package_dir` in the config or SIMPSAVE_PACKAGE_DIR)"
    )]
    PackageDirUnavailable(String),

    /// The engine cannot address this kind of target.
    #[error("The {engine} engine cannot address target '{target}'")]
    TargetMismatch {
        engine: &'static str,
        target: String,
    },

    /// The match pattern is not a valid regular expression.
    #[error("Invalid match pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Embedded database error.
    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Remote store error.
    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// A [`Result`] type alias using the unified [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn literal(offset: usize, message: impl Into<String>) -> Self {
        Self::Literal {
            offset,
            message: message.into(),
        }
    }

    pub(crate) fn conversion(value: impl std::fmt::Display, type_tag: impl Into<String>) -> Self {
        Self::Conversion {
            value: value.to_string(),
            type_tag: type_tag.into(),
        }
    }

    pub(crate) fn format(
        format: &'static str,
        target: impl std::fmt::Display,
        message: impl std::fmt::Display,
    ) -> Self {
        Self::Format {
            format,
            target: target.to_string(),
            message: message.to_string(),
        }
    }

    /// Returns `true` if the target or the key does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::TargetNotFound(_) | Self::KeyNotFound { .. })
    }

    /// Returns `true` if the call was rejected before any I/O took place.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::UnsupportedType(_) | Self::InvalidKey { .. })
    }

    /// Returns `true` if an engine could not be selected.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::EngineUnavailable { .. } | Self::UnknownEngine { .. })
    }

    /// Returns `true` if this is an I/O error.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
