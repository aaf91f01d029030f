//! Embedded database engine.
//!
//! One table, `simpsave(key, value, type)`, with the value column holding
//! literal text. Each call opens its own connection, so the engine holds no
//! state and concurrent callers serialize on SQLite's file lock. Only
//! writes create the table; a file without it reads as an empty store.

use std::path::Path;

use indexmap::IndexMap;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};

use crate::codec::{self, StoredEntry, Transport};
use crate::error::{Error, Result};
use crate::logging::{debug, warn};
use crate::value::{validate_basic_type, TypeTag, Value};

use super::document::delete_file;
use super::{key_pattern, StorageEngine, Target};

const ENGINE: &str = "SQLITE";

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS simpsave (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    type TEXT NOT NULL
)";

/// SQLite-backed engine for `.db` / `.sqlite` targets.
#[derive(Debug, Default)]
pub struct SqliteEngine;

impl SqliteEngine {
    pub fn new() -> Self {
        Self
    }

    fn connect(path: &Path) -> Result<Connection> {
        let conn = Connection::open(path)?;
        conn.execute(CREATE_TABLE, [])?;
        Ok(conn)
    }

    /// Open an existing file without creating the table. `None` when the
    /// file holds no `simpsave` table, which reads as an empty store.
    fn open_existing(path: &Path, flags: OpenFlags) -> Result<Option<Connection>> {
        let conn = Connection::open_with_flags(path, flags)?;
        let has_table = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'simpsave'",
                [],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        Ok(has_table.then_some(conn))
    }

    fn reader(path: &Path) -> Result<Option<Connection>> {
        Self::open_existing(path, OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX)
    }

    fn existing(target: &Target) -> Result<Option<&Path>> {
        let path = target.file_path(ENGINE)?;
        Ok(path.is_file().then_some(path))
    }

    fn upsert(path: &Path, key: &str, literal: &str, type_tag: &TypeTag) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Self::connect(path)?;
        conn.execute(
            "INSERT OR REPLACE INTO simpsave (key, value, type) VALUES (?1, ?2, ?3)",
            params![key, literal, type_tag.as_str()],
        )?;
        Ok(())
    }
}

fn entry(literal: String, tag: String) -> StoredEntry {
    StoredEntry::new(Transport::Literal(literal), TypeTag::parse(&tag))
}

impl StorageEngine for SqliteEngine {
    fn name(&self) -> &'static str {
        ENGINE
    }

    fn default_suffix(&self) -> &'static str {
        ".db"
    }

    fn write(&self, key: &str, value: &Value, target: &Target) -> Result<bool> {
        let path = target.file_path(ENGINE)?;
        validate_basic_type(value)?;
        debug!(engine = ENGINE, key = key, path = %path.display(), "writing entry");

        let literal = codec::encode_literal(value);
        match Self::upsert(path, key, &literal, &value.type_tag()) {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!(engine = ENGINE, path = %path.display(), error = %e, "write failed");
                Ok(false)
            }
        }
    }

    fn read(&self, key: &str, target: &Target) -> Result<Value> {
        let path = Self::existing(target)?
            .ok_or_else(|| Error::TargetNotFound(target.to_string()))?;
        debug!(engine = ENGINE, key = key, path = %path.display(), "reading entry");

        let missing = || Error::KeyNotFound {
            key: key.to_string(),
            target: path.display().to_string(),
        };
        let conn = Self::reader(path)?.ok_or_else(missing)?;
        let row = conn
            .query_row(
                "SELECT value, type FROM simpsave WHERE key = ?1",
                params![key],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        let (literal, tag) = row.ok_or_else(missing)?;
        entry(literal, tag).decode()
    }

    fn has(&self, key: &str, target: &Target) -> Result<bool> {
        let Some(path) = Self::existing(target)? else {
            return Ok(false);
        };
        let Some(conn) = Self::reader(path)? else {
            return Ok(false);
        };
        let found = conn
            .query_row("SELECT 1 FROM simpsave WHERE key = ?1", params![key], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    fn remove(&self, key: &str, target: &Target) -> Result<bool> {
        let Some(path) = Self::existing(target)? else {
            return Ok(false);
        };
        debug!(engine = ENGINE, key = key, path = %path.display(), "removing entry");
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let removed = Self::open_existing(path, flags).and_then(|conn| match conn {
            Some(conn) => Ok(conn.execute("DELETE FROM simpsave WHERE key = ?1", params![key])?),
            None => Ok(0),
        });
        match removed {
            Ok(rows) => Ok(rows > 0),
            Err(e) => {
                warn!(engine = ENGINE, path = %path.display(), error = %e, "remove failed");
                Ok(false)
            }
        }
    }

    fn match_keys(&self, pattern: &str, target: &Target) -> Result<IndexMap<String, Value>> {
        let re = key_pattern(pattern)?;
        let Some(path) = Self::existing(target)? else {
            return Ok(IndexMap::new());
        };
        debug!(engine = ENGINE, pattern = pattern, path = %path.display(), "matching keys");

        let Some(conn) = Self::reader(path)? else {
            return Ok(IndexMap::new());
        };
        let mut stmt = conn.prepare("SELECT key, value, type FROM simpsave ORDER BY rowid")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut out = IndexMap::new();
        for row in rows {
            let (key, literal, tag) = row?;
            if re.is_match(&key) {
                let value = entry(literal, tag).decode()?;
                out.insert(key, value);
            }
        }
        Ok(out)
    }

    fn delete(&self, target: &Target) -> Result<bool> {
        let path = target.file_path(ENGINE)?;
        Ok(delete_file(ENGINE, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_layout() -> std::result::Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let target = Target::File(dir.path().join("data.db"));
        let engine = SqliteEngine::new();
        assert!(engine.write("k", &Value::set([Value::from(1)]), &target)?);

        let conn = Connection::open(dir.path().join("data.db"))?;
        let (value, tag): (String, String) = conn.query_row(
            "SELECT value, type FROM simpsave WHERE key = 'k'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        assert_eq!(value, "[1]");
        assert_eq!(tag, "set");
        Ok(())
    }

    #[test]
    fn test_overwrite_replaces_type() -> std::result::Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let target = Target::File(dir.path().join("nested").join("data.sqlite"));
        let engine = SqliteEngine::new();
        assert!(engine.write("k", &Value::from(1), &target)?);
        assert!(engine.write("k", &Value::from("one"), &target)?);
        assert_eq!(engine.read("k", &target)?, Value::from("one"));
        assert_eq!(engine.match_keys("", &target)?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_lookups_do_not_create_the_table() -> std::result::Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let engine = SqliteEngine::new();

        let empty = dir.path().join("empty.db");
        std::fs::write(&empty, "")?;
        let target = Target::File(empty.clone());
        assert!(!engine.has("k", &target)?);
        assert!(engine.match_keys("", &target)?.is_empty());
        assert!(matches!(engine.read("k", &target), Err(Error::KeyNotFound { .. })));
        assert!(!engine.remove("k", &target)?);
        assert_eq!(std::fs::metadata(&empty)?.len(), 0);

        let foreign = dir.path().join("foreign.db");
        Connection::open(&foreign)?.execute("CREATE TABLE other (id INTEGER)", [])?;
        let target = Target::File(foreign.clone());
        assert!(!engine.has("k", &target)?);
        assert!(engine.match_keys("", &target)?.is_empty());
        assert!(!engine.remove("k", &target)?);
        let tables: i64 = Connection::open(&foreign)?.query_row(
            "SELECT count(*) FROM sqlite_master WHERE type = 'table'",
            [],
            |row| row.get(0),
        )?;
        assert_eq!(tables, 1);

        assert!(engine.write("k", &Value::from(1), &target)?);
        assert_eq!(engine.read("k", &target)?, Value::from(1));
        Ok(())
    }

    #[test]
    fn test_not_a_database() -> std::result::Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("bogus.db");
        std::fs::write(&path, "not a database ".repeat(100))?;
        let target = Target::File(path);
        assert!(matches!(SqliteEngine::new().read("k", &target), Err(Error::Sqlite(_))));
        Ok(())
    }
}
