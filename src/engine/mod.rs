//! Storage engines.
//!
//! Every backend implements [`StorageEngine`], the same six operations over
//! one physical medium. Whole-file formats share the load/mutate/persist
//! skeleton in [`document`]; the embedded database and the remote store
//! mutate single keys in place.

mod document;
mod ini;
mod simp;
mod structured;

#[cfg(feature = "redis")]
mod redis;
#[cfg(feature = "sqlite")]
mod sqlite;
#[cfg(feature = "xml")]
mod xml;

use std::fmt;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use regex::Regex;

use crate::error::{Error, Result};
use crate::value::Value;

pub use document::{DocumentEngine, DocumentFormat, Entries};
pub use ini::{IniEngine, IniFormat};
pub use simp::{SimpEngine, SimpFormat};
pub use structured::TomlEngine;
#[cfg(feature = "json")]
pub use structured::JsonEngine;
#[cfg(feature = "yaml")]
pub use structured::YamlEngine;

#[cfg(feature = "redis")]
pub use self::redis::RedisEngine;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteEngine;
#[cfg(feature = "xml")]
pub use xml::{XmlEngine, XmlFormat};

/// A physical storage location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// An absolute file path.
    File(PathBuf),
    /// A connection string handed to the remote engine unchanged.
    Remote(String),
}

impl Target {
    /// The file path, or [`Error::TargetMismatch`] for a remote target.
    pub fn file_path(&self, engine: &'static str) -> Result<&Path> {
        match self {
            Self::File(path) => Ok(path),
            Self::Remote(url) => Err(Error::TargetMismatch {
                engine,
                target: url.clone(),
            }),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Remote(url) => f.write_str(url),
        }
    }
}

/// The storage contract every backend satisfies.
///
/// Failure policy shared by all engines:
///
/// - an unsupported value or a key the format cannot hold is rejected
///   before any I/O;
/// - `write`, `remove` and `delete` report physical I/O failures as
///   `Ok(false)`;
/// - a missing target is `false` for `has`/`remove`/`delete`, an empty map
///   for `match_keys` and [`Error::TargetNotFound`] for `read`.
pub trait StorageEngine: Send + Sync {
    /// Symbolic registry name, e.g. `"JSON"`.
    fn name(&self) -> &'static str;

    /// Canonical file extension including the dot; empty for engines
    /// addressed by connection string.
    fn default_suffix(&self) -> &'static str;

    /// Upsert `key`. Existing entries under the key are replaced regardless of type.
    fn write(&self, key: &str, value: &Value, target: &Target) -> Result<bool>;

    /// Read and type-restore the value under `key`.
    fn read(&self, key: &str, target: &Target) -> Result<Value>;

    fn has(&self, key: &str, target: &Target) -> Result<bool>;

    /// Remove one key; `false` if the target or key is absent.
    fn remove(&self, key: &str, target: &Target) -> Result<bool>;

    /// Every entry whose key matches `pattern` from its first character.
    fn match_keys(&self, pattern: &str, target: &Target) -> Result<IndexMap<String, Value>>;

    /// Remove the whole target; `false` if there was nothing to delete.
    fn delete(&self, target: &Target) -> Result<bool>;
}

/// Compile a match pattern anchored at the start of the key.
pub(crate) fn key_pattern(pattern: &str) -> Result<Regex> {
    Ok(Regex::new(&format!("^(?:{})", pattern))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_pattern_is_start_anchored() {
        let re = key_pattern("test_").unwrap();
        assert!(re.is_match("test_001"));
        assert!(!re.is_match("my_test_001"));

        let re = key_pattern("^a|b").unwrap();
        assert!(re.is_match("bcd"));
        assert!(!re.is_match("cab"));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(matches!(key_pattern("("), Err(Error::Pattern(_))));
    }

    #[test]
    fn test_remote_target_is_not_a_file() {
        let target = Target::Remote("redis://localhost:6379/0".into());
        assert!(matches!(target.file_path("JSON"), Err(Error::TargetMismatch { .. })));
        assert!(target.is_remote());
    }
}
