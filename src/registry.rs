//! Engine registry.
//!
//! Every engine is declared once, in a fixed order, together with the cargo
//! feature that compiles it in. An engine whose feature is off is still
//! listed (so lookups can name the missing dependency) but has no
//! implementation behind it.

use indexmap::IndexMap;
use once_cell::sync::Lazy;

use crate::config::Config;
use crate::engine::{IniEngine, SimpEngine, StorageEngine, TomlEngine};
use crate::error::{Error, Result};

#[cfg(feature = "json")]
use crate::engine::JsonEngine;
#[cfg(feature = "redis")]
use crate::engine::RedisEngine;
#[cfg(feature = "sqlite")]
use crate::engine::SqliteEngine;
#[cfg(feature = "xml")]
use crate::engine::XmlEngine;
#[cfg(feature = "yaml")]
use crate::engine::YamlEngine;

struct Declaration {
    name: &'static str,
    suffix: &'static str,
    dependency: &'static str,
    feature: &'static str,
}

/// Declaration order; the first available file engine is the default.
const DECLARATIONS: [Declaration; 8] = [
    Declaration { name: "SIMP", suffix: ".simpsave", dependency: "", feature: "" },
    Declaration { name: "YML", suffix: ".yml", dependency: "serde_yaml", feature: "yaml" },
    Declaration { name: "INI", suffix: ".ini", dependency: "", feature: "" },
    Declaration { name: "XML", suffix: ".xml", dependency: "quick-xml", feature: "xml" },
    Declaration { name: "JSON", suffix: ".json", dependency: "serde_json", feature: "json" },
    Declaration { name: "TOML", suffix: ".toml", dependency: "", feature: "" },
    Declaration { name: "SQLITE", suffix: ".db", dependency: "rusqlite", feature: "sqlite" },
    Declaration { name: "REDIS", suffix: "", dependency: "redis", feature: "redis" },
];

/// File extension (lowercase, with dot) to engine name.
const SUFFIX_ENGINES: [(&str, &str); 9] = [
    (".simpsave", "SIMP"),
    (".ini", "INI"),
    (".yml", "YML"),
    (".yaml", "YML"),
    (".toml", "TOML"),
    (".json", "JSON"),
    (".xml", "XML"),
    (".db", "SQLITE"),
    (".sqlite", "SQLITE"),
];

static GLOBAL: Lazy<EngineRegistry> = Lazy::new(|| EngineRegistry::with_config(&Config::from_env()));

/// One registered engine.
pub struct EngineDescriptor {
    pub name: &'static str,
    /// Canonical suffix, empty for connection-string engines.
    pub default_suffix: &'static str,
    /// Crate the engine needs; empty when built in.
    pub dependency: &'static str,
    /// Cargo feature that compiles the engine in; empty when built in.
    pub feature: &'static str,
    engine: Option<Box<dyn StorageEngine>>,
}

impl EngineDescriptor {
    pub fn is_available(&self) -> bool {
        self.engine.is_some()
    }

    pub fn engine(&self) -> Option<&dyn StorageEngine> {
        self.engine.as_deref()
    }
}

impl std::fmt::Debug for EngineDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineDescriptor")
            .field("name", &self.name)
            .field("default_suffix", &self.default_suffix)
            .field("available", &self.is_available())
            .finish()
    }
}

#[cfg_attr(not(feature = "redis"), allow(unused_variables))]
fn build(name: &str, config: &Config) -> Option<Box<dyn StorageEngine>> {
    let engine: Box<dyn StorageEngine> = match name {
        "SIMP" => Box::new(SimpEngine::new()),
        #[cfg(feature = "yaml")]
        "YML" => Box::new(YamlEngine::new()),
        "INI" => Box::new(IniEngine::new()),
        #[cfg(feature = "xml")]
        "XML" => Box::new(XmlEngine::new()),
        #[cfg(feature = "json")]
        "JSON" => Box::new(JsonEngine::new()),
        "TOML" => Box::new(TomlEngine::new()),
        #[cfg(feature = "sqlite")]
        "SQLITE" => Box::new(SqliteEngine::new()),
        #[cfg(feature = "redis")]
        "REDIS" => Box::new(RedisEngine::new(config.redis_namespace.clone())),
        _ => return None,
    };
    Some(engine)
}

/// Immutable name → engine table, built once.
#[derive(Debug)]
pub struct EngineRegistry {
    descriptors: Vec<EngineDescriptor>,
}

impl EngineRegistry {
    /// Build a registry with default engine settings.
    pub fn init() -> Self {
        Self::with_config(&Config::default())
    }

    /// Build a registry whose engines honour `config` (e.g. the remote namespace).
    pub fn with_config(config: &Config) -> Self {
        let descriptors = DECLARATIONS
            .iter()
            .map(|decl| EngineDescriptor {
                name: decl.name,
                default_suffix: decl.suffix,
                dependency: decl.dependency,
                feature: decl.feature,
                engine: build(decl.name, config),
            })
            .collect();
        Self { descriptors }
    }

    /// The process-wide registry used by the crate-level functions.
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    pub fn descriptors(&self) -> &[EngineDescriptor] {
        &self.descriptors
    }

    /// Case-insensitive descriptor lookup. `FILE` is an alias for `SIMP`.
    pub fn descriptor(&self, name: &str) -> Option<&EngineDescriptor> {
        let name = if name.eq_ignore_ascii_case("FILE") { "SIMP" } else { name };
        self.descriptors
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(name))
    }

    /// Look up an available engine by name.
    pub fn get_engine(&self, name: &str) -> Result<&dyn StorageEngine> {
        let Some(descriptor) = self.descriptor(name) else {
            return Err(Error::UnknownEngine {
                name: name.to_string(),
                available: self.list_available_engines(),
            });
        };
        descriptor.engine().ok_or_else(|| Error::EngineUnavailable {
            engine: descriptor.name.to_string(),
            dependency: descriptor.dependency,
            feature: descriptor.feature,
            available: self.list_available_engines(),
        })
    }

    /// Names of the engines usable in this build, in declaration order.
    pub fn list_available_engines(&self) -> Vec<&'static str> {
        self.descriptors
            .iter()
            .filter(|d| d.is_available())
            .map(|d| d.name)
            .collect()
    }

    /// Every declared engine with its availability.
    pub fn list_all_engines(&self) -> IndexMap<&'static str, bool> {
        self.descriptors
            .iter()
            .map(|d| (d.name, d.is_available()))
            .collect()
    }

    /// The first available engine that writes files.
    pub fn default_file_engine(&self) -> Result<&dyn StorageEngine> {
        self.descriptors
            .iter()
            .filter(|d| !d.default_suffix.is_empty())
            .find_map(|d| d.engine())
            .ok_or_else(|| Error::UnknownEngine {
                name: "default file engine".to_string(),
                available: self.list_available_engines(),
            })
    }

    /// Engine name for a file extension such as `.json` (case-insensitive).
    pub fn engine_for_suffix(suffix: &str) -> Option<&'static str> {
        SUFFIX_ENGINES
            .iter()
            .find(|(ext, _)| ext.eq_ignore_ascii_case(suffix))
            .map(|(_, name)| *name)
    }
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::init()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declaration_order() {
        let registry = EngineRegistry::init();
        let names: Vec<_> = registry.list_all_engines().keys().copied().collect();
        assert_eq!(
            names,
            ["SIMP", "YML", "INI", "XML", "JSON", "TOML", "SQLITE", "REDIS"]
        );
    }

    #[test]
    fn test_built_in_engines_always_available() {
        let registry = EngineRegistry::init();
        let available = registry.list_available_engines();
        for name in ["SIMP", "INI", "TOML"] {
            assert!(available.contains(&name));
        }
        assert_eq!(registry.default_file_engine().unwrap().name(), "SIMP");
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = EngineRegistry::init();
        assert_eq!(registry.get_engine("toml").unwrap().name(), "TOML");
        assert_eq!(registry.get_engine("Simp").unwrap().name(), "SIMP");
        assert_eq!(registry.get_engine("file").unwrap().name(), "SIMP");
    }

    #[test]
    fn test_unknown_engine() {
        let err = EngineRegistry::init().get_engine("CSV").err().unwrap();
        assert!(matches!(err, Error::UnknownEngine { .. }));
        assert!(err.is_unavailable());
    }

    #[cfg(not(feature = "redis"))]
    #[test]
    fn test_unavailable_engine_names_dependency() {
        let err = EngineRegistry::init().get_engine("REDIS").err().unwrap();
        let message = err.to_string();
        assert!(message.contains("REDIS"));
        assert!(message.contains("redis"));
        assert!(matches!(err, Error::EngineUnavailable { feature: "redis", .. }));
    }

    #[test]
    fn test_suffix_table() {
        assert_eq!(EngineRegistry::engine_for_suffix(".yaml"), Some("YML"));
        assert_eq!(EngineRegistry::engine_for_suffix(".JSON"), Some("JSON"));
        assert_eq!(EngineRegistry::engine_for_suffix(".sqlite"), Some("SQLITE"));
        assert_eq!(EngineRegistry::engine_for_suffix(".txt"), None);
    }
}
