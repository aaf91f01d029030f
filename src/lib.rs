//! Type-preserving key-value persistence over pluggable storage engines.
//!
//! Values of a small, closed type set (integers of any size, floats, booleans,
//! text, `None`, lists, tuples, sets, frozen sets, mappings, bytes and complex
//! numbers) are stored under string keys together with a type tag, so they
//! read back as exactly what was written, whichever engine holds them.
//!
//! # Quick Start
//!
//! ```ignore
//! use simpsave::prelude::*;
//!
//! simpsave::write("scores", vec![1, 2, 3], Some("game.json"))?;
//! let scores = simpsave::read("scores", Some("game.json"))?;
//! assert_eq!(scores, Value::from(vec![1, 2, 3]));
//!
//! let tests = simpsave::match_keys("test_", Some("game.json"))?;
//! ```
//!
//! The engine is picked from the location: `redis://` connection strings go
//! to the remote engine, files by extension (`.simpsave`, `.ini`, `.yml` /
//! `.yaml`, `.xml`, `.json`, `.toml`, `.db` / `.sqlite`), anything else to the
//! line-based `.simpsave` format. `None` means `__ss__.simpsave` in the
//! working directory; `:ss:name` resolves against the package data directory.
//!
//! # Modules
//!
//! - [`value`] - The value model and type tags
//! - [`codec`] - Literal syntax and transport forms
//! - [`engine`] - The storage contract and its implementations
//! - [`registry`] - Engine discovery and lookup
//! - [`path`] - Location resolution
//! - [`store`] - The dispatch facade
//!
//! # Feature Flags
//!
//! - `json`, `yaml`, `xml`, `sqlite` - Optional engines (enabled by default)
//! - `redis` - The remote engine
//! - `logging` - Library-level tracing (consumers provide their own subscriber; enabled by default)
//! - `cli` - The command-line interface binary
//! - `full` - Enable all features

pub mod codec;
pub mod config;
pub mod engine;
mod error;
mod logging;
pub mod path;
pub mod prelude;
pub mod registry;
pub mod store;
pub mod value;

pub use config::{Config, ConfigError};
pub use engine::{StorageEngine, Target};
pub use error::{Error, Result};
pub use registry::{EngineDescriptor, EngineRegistry};
pub use store::SimpSave;
pub use value::{validate_basic_type, TypeTag, Value, MAX_NESTING};

use indexmap::IndexMap;

/// Write `value` under `key`. `Ok(false)` means the target could not be written.
pub fn write(key: &str, value: impl Into<Value>, file: Option<&str>) -> Result<bool> {
    SimpSave::global().write(key, &value.into(), file)
}

/// Read the value under `key`, restored to its original type.
pub fn read(key: &str, file: Option<&str>) -> Result<Value> {
    SimpSave::global().read(key, file)
}

/// Whether `key` exists; `false` for a missing target.
pub fn has(key: &str, file: Option<&str>) -> Result<bool> {
    SimpSave::global().has(key, file)
}

/// Remove one key; `false` if it or the target is missing.
pub fn remove(key: &str, file: Option<&str>) -> Result<bool> {
    SimpSave::global().remove(key, file)
}

/// Entries whose key matches the regular expression `pattern` at its start.
/// An empty pattern matches every key.
pub fn match_keys(pattern: &str, file: Option<&str>) -> Result<IndexMap<String, Value>> {
    SimpSave::global().match_keys(pattern, file)
}

/// Remove the whole target; `false` if there was nothing to delete.
pub fn delete(file: Option<&str>) -> Result<bool> {
    SimpSave::global().delete(file)
}

/// Engines usable in this build, in declaration order.
pub fn list_available_engines() -> Vec<&'static str> {
    EngineRegistry::global().list_available_engines()
}

/// Every declared engine with its availability.
pub fn list_all_engines() -> IndexMap<&'static str, bool> {
    EngineRegistry::global().list_all_engines()
}
