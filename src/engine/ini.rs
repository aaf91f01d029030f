//! Sectioned `key = type|literal` format.
//!
//! Entries live in the `[simpsave]` section. Other sections are ignored on
//! read and not preserved on rewrite. Keys keep their case.

use crate::codec::{StoredEntry, Transport};
use crate::value::TypeTag;

use super::document::{literal_text, DocumentEngine, DocumentFormat, Entries};

const SECTION: &str = "simpsave";

/// The `.ini` format.
pub struct IniFormat;

pub type IniEngine = DocumentEngine<IniFormat>;

impl DocumentFormat for IniFormat {
    const ENGINE: &'static str = "INI";
    const SUFFIX: &'static str = ".ini";

    fn parse(text: &str) -> Result<Entries, String> {
        let mut entries = Entries::new();
        let mut in_section = false;

        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }
            if let Some(rest) = line.strip_prefix('[') {
                let name = rest
                    .strip_suffix(']')
                    .ok_or_else(|| format!("line {}: unterminated section header", index + 1))?;
                in_section = name.trim() == SECTION;
                continue;
            }
            if !in_section {
                continue;
            }

            // Keys never contain either delimiter, so the first one splits.
            let split = line
                .find(['=', ':'])
                .ok_or_else(|| format!("line {}: expected key = type|literal", index + 1))?;
            let (key, rest) = line.split_at(split);
            let value = rest.get(1..).unwrap_or_default().trim();
            let (tag, literal) = value
                .split_once('|')
                .ok_or_else(|| format!("line {}: expected type|literal", index + 1))?;

            entries.insert(
                key.trim().to_string(),
                StoredEntry::new(
                    Transport::Literal(literal.to_string()),
                    TypeTag::parse(tag.trim()),
                ),
            );
        }
        Ok(entries)
    }

    fn render(entries: &Entries) -> Result<String, String> {
        let mut out = format!("[{SECTION}]\n");
        for (key, entry) in entries {
            out.push_str(&format!(
                "{key} = {}|{}\n",
                entry.type_tag,
                literal_text(&entry.transport)
            ));
        }
        out.push('\n');
        Ok(out)
    }

    fn check_key(key: &str) -> Result<(), &'static str> {
        if key.is_empty() {
            return Err("keys cannot be empty");
        }
        if key.contains(['=', ':']) {
            return Err("keys cannot contain '=' or ':'");
        }
        if key.contains(['\n', '\r']) {
            return Err("keys cannot contain line breaks");
        }
        if key.starts_with(['[', ';', '#']) {
            return Err("keys cannot start with '[', ';' or '#'");
        }
        if key.trim() != key {
            return Err("keys cannot have leading or trailing whitespace");
        }
        Ok(())
    }
}
