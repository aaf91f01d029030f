//! Remote key-value engine.
//!
//! Each entry is a hash `<namespace><key>` with fields `value` (literal
//! text) and `type`. Deleting the target removes every key under the
//! namespace and leaves the rest of the keyspace alone.

use std::collections::HashMap;

use ::redis::{Client, Commands, Connection};
use indexmap::IndexMap;

use crate::codec::{self, StoredEntry, Transport};
use crate::error::{Error, Result};
use crate::logging::{debug, info, warn};
use crate::value::{validate_basic_type, TypeTag, Value};

use super::{key_pattern, StorageEngine, Target};

const ENGINE: &str = "REDIS";

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "ss:";

/// Redis-backed engine addressed by a `redis://` connection string.
#[derive(Debug, Clone)]
pub struct RedisEngine {
    namespace: String,
}

impl Default for RedisEngine {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

impl RedisEngine {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn connect(target: &Target) -> Result<Connection> {
        let url = match target {
            Target::Remote(url) => url,
            Target::File(path) => {
                return Err(Error::TargetMismatch {
                    engine: ENGINE,
                    target: path.display().to_string(),
                });
            }
        };
        let client = Client::open(url.as_str())?;
        Ok(client.get_connection()?)
    }

    fn hash_key(&self, key: &str) -> String {
        format!("{}{}", self.namespace, key)
    }

    /// All keys under the namespace, sorted, with the namespace still attached.
    fn namespaced_keys(&self, conn: &mut Connection) -> Result<Vec<String>> {
        let pattern = format!("{}*", escape_glob(&self.namespace));
        let mut keys: Vec<String> = conn.scan_match::<_, String>(pattern)?.collect();
        keys.sort();
        Ok(keys)
    }

    fn fetch(&self, conn: &mut Connection, key: &str, target: &Target) -> Result<Option<Value>> {
        let fields: HashMap<String, String> = conn.hgetall(self.hash_key(key))?;
        if fields.is_empty() {
            return Ok(None);
        }
        let (Some(literal), Some(tag)) = (fields.get("value"), fields.get("type")) else {
            return Err(Error::format(
                ENGINE,
                target,
                format!("hash {} lacks value/type fields", self.hash_key(key)),
            ));
        };
        StoredEntry::new(Transport::Literal(literal.clone()), TypeTag::parse(tag))
            .decode()
            .map(Some)
    }
}

/// Escape glob metacharacters so the namespace matches literally in SCAN.
fn escape_glob(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

impl StorageEngine for RedisEngine {
    fn name(&self) -> &'static str {
        ENGINE
    }

    fn default_suffix(&self) -> &'static str {
        ""
    }

    fn write(&self, key: &str, value: &Value, target: &Target) -> Result<bool> {
        validate_basic_type(value)?;
        debug!(engine = ENGINE, key = key, "writing entry");

        let literal = codec::encode_literal(value);
        let tag = value.type_tag();
        let written = Self::connect(target).and_then(|mut conn| {
            conn.hset_multiple::<_, _, _, ()>(
                self.hash_key(key),
                &[("value", literal.as_str()), ("type", tag.as_str())],
            )?;
            Ok(())
        });
        match written {
            Ok(()) => Ok(true),
            Err(e @ Error::TargetMismatch { .. }) => Err(e),
            Err(e) => {
                warn!(engine = ENGINE, key = key, error = %e, "write failed");
                Ok(false)
            }
        }
    }

    fn read(&self, key: &str, target: &Target) -> Result<Value> {
        debug!(engine = ENGINE, key = key, "reading entry");
        let mut conn = Self::connect(target)?;
        self.fetch(&mut conn, key, target)?
            .ok_or_else(|| Error::KeyNotFound {
                key: key.to_string(),
                target: target.to_string(),
            })
    }

    fn has(&self, key: &str, target: &Target) -> Result<bool> {
        let mut conn = Self::connect(target)?;
        Ok(conn.exists(self.hash_key(key))?)
    }

    fn remove(&self, key: &str, target: &Target) -> Result<bool> {
        debug!(engine = ENGINE, key = key, "removing entry");
        let removed = Self::connect(target)
            .and_then(|mut conn| Ok(conn.del::<_, i64>(self.hash_key(key))?));
        match removed {
            Ok(count) => Ok(count > 0),
            Err(e @ Error::TargetMismatch { .. }) => Err(e),
            Err(e) => {
                warn!(engine = ENGINE, key = key, error = %e, "remove failed");
                Ok(false)
            }
        }
    }

    fn match_keys(&self, pattern: &str, target: &Target) -> Result<IndexMap<String, Value>> {
        let re = key_pattern(pattern)?;
        debug!(engine = ENGINE, pattern = pattern, "matching keys");
        let mut conn = Self::connect(target)?;

        let mut out = IndexMap::new();
        for full in self.namespaced_keys(&mut conn)? {
            let Some(key) = full.strip_prefix(self.namespace.as_str()) else {
                continue;
            };
            if !re.is_match(key) {
                continue;
            }
            // A key removed between SCAN and HGETALL is skipped.
            if let Some(value) = self.fetch(&mut conn, key, target)? {
                out.insert(key.to_string(), value);
            }
        }
        Ok(out)
    }

    fn delete(&self, target: &Target) -> Result<bool> {
        let deleted = Self::connect(target).and_then(|mut conn| {
            let keys = self.namespaced_keys(&mut conn)?;
            if keys.is_empty() {
                return Ok(0);
            }
            Ok(conn.del::<_, i64>(keys)?)
        });
        match deleted {
            Ok(count) => {
                info!(engine = ENGINE, namespace = %self.namespace, removed = count, "deleted namespace");
                Ok(count > 0)
            }
            Err(e @ Error::TargetMismatch { .. }) => Err(e),
            Err(e) => {
                warn!(engine = ENGINE, namespace = %self.namespace, error = %e, "delete failed");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_glob() {
        assert_eq!(escape_glob("ss:"), "ss:");
        assert_eq!(escape_glob("a*b?[c]\\"), "a\\*b\\?\\[c\\]\\\\");
    }

    #[test]
    fn test_hash_key_uses_namespace() {
        assert_eq!(RedisEngine::default().hash_key("k"), "ss:k");
        assert_eq!(RedisEngine::new("app:").hash_key("k"), "app:k");
    }

    #[test]
    fn test_file_target_is_rejected() {
        let target = Target::File("/tmp/x.db".into());
        let engine = RedisEngine::default();
        assert!(matches!(
            engine.write("k", &Value::from(1), &target),
            Err(Error::TargetMismatch { .. })
        ));
        assert!(matches!(engine.has("k", &target), Err(Error::TargetMismatch { .. })));
    }

    #[test]
    fn test_unsupported_value_rejected_before_connecting() {
        let target = Target::Remote("redis://127.0.0.1:1/0".into());
        let bad = Value::dict([(Value::list([]), Value::None)]);
        assert!(matches!(
            RedisEngine::default().write("k", &bad, &target),
            Err(Error::UnsupportedType(_))
        ));
    }
}
