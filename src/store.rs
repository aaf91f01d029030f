//! Dispatch facade.
//!
//! Picks an engine from the location string (connection-string prefix or
//! file extension), resolves the target and forwards the call. There is no
//! caching or retrying at this layer.

use indexmap::IndexMap;
use once_cell::sync::Lazy;

use crate::config::Config;
use crate::engine::{StorageEngine, Target};
use crate::error::Result;
use crate::logging::{debug, warn};
use crate::path::{dotted_extension, is_remote, resolve_path};
use crate::registry::EngineRegistry;
use crate::value::Value;

static DEFAULT: Lazy<SimpSave<'static>> =
    Lazy::new(|| SimpSave::with_registry(EngineRegistry::global(), Config::from_env()));

/// The public storage surface over an [`EngineRegistry`].
///
/// # Example
///
/// ```ignore
/// use simpsave::{Config, SimpSave, Value};
///
/// let store = SimpSave::new(Config::default());
/// store.write("score", &Value::from(42), Some("scores.json"))?;
/// assert_eq!(store.read("score", Some("scores.json"))?, Value::from(42));
/// ```
#[derive(Debug)]
pub struct SimpSave<'r> {
    registry: &'r EngineRegistry,
    config: Config,
}

impl SimpSave<'static> {
    /// A facade over the process-wide registry.
    pub fn new(config: Config) -> Self {
        Self::with_registry(EngineRegistry::global(), config)
    }

    /// The facade used by the crate-level functions, configured from the environment.
    pub fn global() -> &'static SimpSave<'static> {
        &DEFAULT
    }
}

impl<'r> SimpSave<'r> {
    pub fn with_registry(registry: &'r EngineRegistry, config: Config) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &'r EngineRegistry {
        self.registry
    }

    /// Select the engine and target for `location`.
    ///
    /// Connection strings select the remote engine. Files select by
    /// extension, defaulting to the first available file engine; if the
    /// selected engine is unavailable, that default is used instead and the
    /// target's extension is switched to its suffix.
    pub fn resolve(&self, location: Option<&str>) -> Result<(&'r dyn StorageEngine, Target)> {
        if let Some(url) = location.filter(|l| is_remote(l)) {
            let engine = self.registry.get_engine("REDIS")?;
            return Ok((engine, Target::Remote(url.to_string())));
        }

        let default = self.registry.default_file_engine()?;
        let path = resolve_path(location, default.default_suffix(), &self.config)?;
        let extension = dotted_extension(&path);
        let name = extension
            .as_deref()
            .and_then(EngineRegistry::engine_for_suffix)
            .unwrap_or(default.name());

        match self.registry.get_engine(name) {
            Ok(engine) => {
                debug!(engine = engine.name(), path = %path.display(), "resolved target");
                Ok((engine, Target::File(path)))
            }
            Err(e) => {
                let fallback_ext = default.default_suffix().trim_start_matches('.');
                let fallback = path.with_extension(fallback_ext);
                warn!(
                    error = %e,
                    fallback = default.name(),
                    path = %fallback.display(),
                    "engine unavailable, falling back to the default engine"
                );
                Ok((default, Target::File(fallback)))
            }
        }
    }

    pub fn write(&self, key: &str, value: &Value, location: Option<&str>) -> Result<bool> {
        let (engine, target) = self.resolve(location)?;
        engine.write(key, value, &target)
    }

    pub fn read(&self, key: &str, location: Option<&str>) -> Result<Value> {
        let (engine, target) = self.resolve(location)?;
        engine.read(key, &target)
    }

    pub fn has(&self, key: &str, location: Option<&str>) -> Result<bool> {
        let (engine, target) = self.resolve(location)?;
        engine.has(key, &target)
    }

    pub fn remove(&self, key: &str, location: Option<&str>) -> Result<bool> {
        let (engine, target) = self.resolve(location)?;
        engine.remove(key, &target)
    }

    /// Entries whose key matches `pattern` from its first character.
    pub fn match_keys(&self, pattern: &str, location: Option<&str>) -> Result<IndexMap<String, Value>> {
        let (engine, target) = self.resolve(location)?;
        engine.match_keys(pattern, &target)
    }

    pub fn delete(&self, location: Option<&str>) -> Result<bool> {
        let (engine, target) = self.resolve(location)?;
        engine.delete(&target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_suffix_selects_engine() -> std::result::Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let store = SimpSave::new(Config::default());
        for (file, engine) in [
            ("a.simpsave", "SIMP"),
            ("a.ini", "INI"),
            ("a.toml", "TOML"),
            ("a.TOML", "TOML"),
            ("a.txt", "SIMP"),
            ("noext", "SIMP"),
        ] {
            let location = dir.path().join(file);
            let (selected, target) = store.resolve(location.to_str())?;
            assert_eq!(selected.name(), engine, "{file}");
            assert_eq!(target, Target::File(location));
        }
        Ok(())
    }

    #[cfg(not(feature = "redis"))]
    #[test]
    fn test_remote_location_without_engine() {
        let store = SimpSave::new(Config::default());
        let err = store.resolve(Some("redis://localhost:6379/0")).err();
        assert!(matches!(err, Some(Error::EngineUnavailable { .. })));
    }

    #[cfg(not(feature = "json"))]
    #[test]
    fn test_unavailable_engine_falls_back_to_default() -> std::result::Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let store = SimpSave::new(Config::default());
        let (engine, target) = store.resolve(dir.path().join("data.json").to_str())?;
        assert_eq!(engine.name(), "SIMP");
        assert_eq!(target, Target::File(dir.path().join("data.simpsave")));
        Ok(())
    }

    #[test]
    fn test_invalid_path_is_reported() {
        let store = SimpSave::new(Config::default());
        let err = store.read("k", Some("/definitely/not/a/real/dir/x.json")).err();
        assert!(matches!(err, Some(Error::InvalidPath(_))));
    }
}
