//! Whole-file engines: load the full entry set, mutate it, rewrite it.
//!
//! Each single-key write or remove rewrites the entire target. The rewrite
//! goes to a temporary file in the target's directory which is then renamed
//! over the target, so a reader sees either the old or the new document.

use std::fs;
use std::io::{self, Write};
use std::marker::PhantomData;
use std::path::Path;

use indexmap::IndexMap;
use tempfile::NamedTempFile;

use crate::codec::{self, StoredEntry, Transport};
use crate::error::{Error, Result};
use crate::logging::{debug, info, trace, warn};
use crate::value::{validate_basic_type, Value};

use super::{key_pattern, StorageEngine, Target};

/// All entries of one target, in document order.
pub type Entries = IndexMap<String, StoredEntry>;

/// A text format holding a whole entry set.
pub trait DocumentFormat: Send + Sync + 'static {
    /// Registry name of the engine built on this format.
    const ENGINE: &'static str;
    /// Canonical file extension.
    const SUFFIX: &'static str;

    /// Transport form for a newly written value.
    fn encode(value: &Value) -> Transport {
        Transport::Literal(codec::encode_literal(value))
    }

    /// Parse a non-empty document.
    fn parse(text: &str) -> std::result::Result<Entries, String>;

    /// Render the full document.
    fn render(entries: &Entries) -> std::result::Result<String, String>;

    /// Reject keys the format cannot hold.
    fn check_key(_key: &str) -> std::result::Result<(), &'static str> {
        Ok(())
    }
}

/// Literal text for a transport, whichever form it is in.
pub(crate) fn literal_text(transport: &Transport) -> String {
    match transport {
        Transport::Literal(text) => text.clone(),
        Transport::Native(value) => codec::literal::render(value),
    }
}

/// [`StorageEngine`] over any [`DocumentFormat`].
pub struct DocumentEngine<F> {
    _format: PhantomData<fn() -> F>,
}

impl<F> Default for DocumentEngine<F> {
    fn default() -> Self {
        Self {
            _format: PhantomData,
        }
    }
}

impl<F: DocumentFormat> DocumentEngine<F> {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_key(key: &str) -> Result<()> {
        F::check_key(key).map_err(|reason| Error::InvalidKey {
            key: key.to_string(),
            engine: F::ENGINE,
            reason,
        })
    }

    fn load(path: &Path) -> Result<Entries> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::TargetNotFound(path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        if text.trim().is_empty() {
            return Ok(Entries::new());
        }
        let entries = F::parse(&text).map_err(|m| Error::format(F::ENGINE, path.display(), m))?;
        trace!(engine = F::ENGINE, path = %path.display(), entries = entries.len(), "loaded document");
        Ok(entries)
    }

    /// Load for a mutating call: I/O failures become `None` (reported as `false`).
    fn load_for_update(path: &Path) -> Result<Option<Entries>> {
        match Self::load(path) {
            Ok(entries) => Ok(Some(entries)),
            Err(Error::Io(e)) => {
                warn!(engine = F::ENGINE, path = %path.display(), error = %e, "failed to load target");
                Ok(None)
            }
            Err(other) => Err(other),
        }
    }

    /// Render and atomically replace the target. Render errors propagate;
    /// I/O errors are reported as `false`.
    fn persist(path: &Path, entries: &Entries) -> Result<bool> {
        let text = F::render(entries).map_err(|m| Error::format(F::ENGINE, path.display(), m))?;
        match write_atomic(path, &text) {
            Ok(()) => {
                trace!(engine = F::ENGINE, path = %path.display(), bytes = text.len(), "persisted document");
                Ok(true)
            }
            Err(e) => {
                warn!(engine = F::ENGINE, path = %path.display(), error = %e, "failed to persist target");
                Ok(false)
            }
        }
    }
}

/// Create the parent directory and an empty file if the target is missing.
pub(crate) fn ensure_file(path: &Path) -> io::Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::File::create(path)?;
    info!(path = %path.display(), "created storage target");
    Ok(())
}

fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    // The temp file is created owner-only; keep the target's mode.
    if let Ok(meta) = fs::metadata(path) {
        tmp.as_file().set_permissions(meta.permissions())?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Remove a file target; `false` if it is absent or cannot be removed.
pub(crate) fn delete_file(engine: &'static str, path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    match fs::remove_file(path) {
        Ok(()) => {
            info!(engine = engine, path = %path.display(), "deleted storage target");
            true
        }
        Err(e) => {
            warn!(engine = engine, path = %path.display(), error = %e, "failed to delete target");
            false
        }
    }
}

impl<F: DocumentFormat> StorageEngine for DocumentEngine<F> {
    fn name(&self) -> &'static str {
        F::ENGINE
    }

    fn default_suffix(&self) -> &'static str {
        F::SUFFIX
    }

    fn write(&self, key: &str, value: &Value, target: &Target) -> Result<bool> {
        let path = target.file_path(F::ENGINE)?;
        validate_basic_type(value)?;
        Self::check_key(key)?;
        debug!(engine = F::ENGINE, key = key, path = %path.display(), "writing entry");

        if let Err(e) = ensure_file(path) {
            warn!(engine = F::ENGINE, path = %path.display(), error = %e, "failed to create target");
            return Ok(false);
        }
        let Some(mut entries) = Self::load_for_update(path)? else {
            return Ok(false);
        };
        entries.insert(key.to_string(), StoredEntry::new(F::encode(value), value.type_tag()));
        Self::persist(path, &entries)
    }

    fn read(&self, key: &str, target: &Target) -> Result<Value> {
        let path = target.file_path(F::ENGINE)?;
        debug!(engine = F::ENGINE, key = key, path = %path.display(), "reading entry");

        let entries = Self::load(path)?;
        entries
            .get(key)
            .ok_or_else(|| Error::KeyNotFound {
                key: key.to_string(),
                target: path.display().to_string(),
            })?
            .decode()
    }

    fn has(&self, key: &str, target: &Target) -> Result<bool> {
        let path = target.file_path(F::ENGINE)?;
        if !path.is_file() {
            return Ok(false);
        }
        Ok(Self::load(path)?.contains_key(key))
    }

    fn remove(&self, key: &str, target: &Target) -> Result<bool> {
        let path = target.file_path(F::ENGINE)?;
        debug!(engine = F::ENGINE, key = key, path = %path.display(), "removing entry");
        if !path.is_file() {
            return Ok(false);
        }
        let Some(mut entries) = Self::load_for_update(path)? else {
            return Ok(false);
        };
        if entries.shift_remove(key).is_none() {
            return Ok(false);
        }
        Self::persist(path, &entries)
    }

    fn match_keys(&self, pattern: &str, target: &Target) -> Result<IndexMap<String, Value>> {
        let path = target.file_path(F::ENGINE)?;
        let re = key_pattern(pattern)?;
        debug!(engine = F::ENGINE, pattern = pattern, path = %path.display(), "matching keys");
        if !path.is_file() {
            return Ok(IndexMap::new());
        }
        Self::load(path)?
            .iter()
            .filter(|(k, _)| re.is_match(k))
            .map(|(k, entry)| Ok((k.clone(), entry.decode()?)))
            .collect()
    }

    fn delete(&self, target: &Target) -> Result<bool> {
        let path = target.file_path(F::ENGINE)?;
        Ok(delete_file(F::ENGINE, path))
    }
}
