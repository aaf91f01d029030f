//! Facade configuration.
//!
//! ```toml
//! default_stem = "__ss__"
//! package_dir = "/usr/share/myapp/data"
//! redis_namespace = "ss:"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Environment variable naming the directory `:ss:` locations resolve against.
pub const PACKAGE_DIR_ENV: &str = "SIMPSAVE_PACKAGE_DIR";

/// Environment variable overriding the remote key namespace.
pub const REDIS_NAMESPACE_ENV: &str = "SIMPSAVE_REDIS_NAMESPACE";

/// Facade configuration, loaded from TOML or built from defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// File stem used when no location is given; the engine suffix is appended.
    pub default_stem: String,
    /// Directory that `:ss:`-prefixed locations resolve against.
    pub package_dir: Option<PathBuf>,
    /// Key prefix for entries in the remote store.
    pub redis_namespace: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_stem: "__ss__".to_string(),
            package_dir: None,
            redis_namespace: "ss:".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(path.as_ref().display().to_string(), e))?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string. Missing fields take their defaults.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `SIMPSAVE_PACKAGE_DIR` and `SIMPSAVE_REDIS_NAMESPACE`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(dir) = non_empty_env(PACKAGE_DIR_ENV) {
            config.package_dir = Some(PathBuf::from(dir));
        }
        if let Some(namespace) = non_empty_env(REDIS_NAMESPACE_ENV) {
            config.redis_namespace = namespace;
        }
        config
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_stem.is_empty() {
            return Err(ConfigError::Invalid("default_stem cannot be empty"));
        }
        if self.default_stem.contains(['/', '\\']) {
            return Err(ConfigError::Invalid("default_stem must be a file name, not a path"));
        }
        Ok(())
    }
}

pub(crate) fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(String, std::io::Error),
    /// TOML parse error.
    Parse(toml::de::Error),
    /// A field holds an unusable value.
    Invalid(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Failed to read config file '{}': {}", path, e),
            ConfigError::Parse(e) => write!(f, "Failed to parse config: {}", e),
            ConfigError::Invalid(reason) => write!(f, "Invalid config: {}", reason),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
default_stem = "store"
package_dir = "/opt/app/data"
redis_namespace = "app:"
"#;
        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.default_stem, "store");
        assert_eq!(config.package_dir.as_deref(), Some(Path::new("/opt/app/data")));
        assert_eq!(config.redis_namespace, "app:");
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let config = Config::from_str("redis_namespace = \"x:\"").unwrap();
        assert_eq!(config.default_stem, "__ss__");
        assert_eq!(config.package_dir, None);
        assert_eq!(Config::from_str("").unwrap(), Config::default());
    }

    #[test]
    fn test_rejects_bad_config() {
        assert!(matches!(Config::from_str("stem = 1"), Err(ConfigError::Parse(_))));
        assert!(matches!(
            Config::from_str("default_stem = \"a/b\""),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("simpsave.toml");
        std::fs::write(&path, "default_stem = \"data\"\n").unwrap();
        assert_eq!(Config::from_file(&path).unwrap().default_stem, "data");
        assert!(matches!(
            Config::from_file(dir.path().join("missing.toml")),
            Err(ConfigError::Io(..))
        ));
    }
}
