//! Native line format: one `key|type|literal` entry per line.

use crate::codec::StoredEntry;
use crate::codec::Transport;
use crate::value::TypeTag;

use super::document::{literal_text, DocumentEngine, DocumentFormat, Entries};

const SEPARATOR: char = '|';

/// The `.simpsave` line format.
pub struct SimpFormat;

pub type SimpEngine = DocumentEngine<SimpFormat>;

impl DocumentFormat for SimpFormat {
    const ENGINE: &'static str = "SIMP";
    const SUFFIX: &'static str = ".simpsave";

    fn parse(text: &str) -> Result<Entries, String> {
        let mut entries = Entries::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            let mut parts = line.splitn(3, SEPARATOR);
            let (Some(key), Some(tag), Some(literal)) = (parts.next(), parts.next(), parts.next())
            else {
                return Err(format!("line {}: expected key|type|literal", index + 1));
            };
            entries.insert(
                key.to_string(),
                StoredEntry::new(
                    Transport::Literal(literal.to_string()),
                    TypeTag::parse(tag.trim()),
                ),
            );
        }
        Ok(entries)
    }

    fn render(entries: &Entries) -> Result<String, String> {
        let mut out = String::new();
        for (key, entry) in entries {
            out.push_str(key);
            out.push(SEPARATOR);
            out.push_str(entry.type_tag.as_str());
            out.push(SEPARATOR);
            out.push_str(&literal_text(&entry.transport));
            out.push('\n');
        }
        Ok(out)
    }

    fn check_key(key: &str) -> Result<(), &'static str> {
        if key.contains(SEPARATOR) {
            return Err("keys cannot contain '|'");
        }
        if key.contains(['\n', '\r']) {
            return Err("keys cannot contain line breaks");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_parse_splits_on_first_two_separators() {
        let entries = SimpFormat::parse("k|str|'a|b'\n\nn|int|42\n").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries["k"].decode().unwrap(), Value::from("a|b"));
        assert_eq!(entries["n"].decode().unwrap(), Value::from(42));
    }

    #[test]
    fn test_render_is_one_line_per_key() {
        let mut entries = Entries::new();
        entries.insert(
            "k".into(),
            StoredEntry::new(Transport::Literal("[1, 2]".into()), TypeTag::List),
        );
        assert_eq!(SimpFormat::render(&entries).unwrap(), "k|list|[1, 2]\n");
    }

    #[test]
    fn test_malformed_line() {
        assert!(SimpFormat::parse("just-a-key\n").is_err());
    }

    #[test]
    fn test_key_restrictions() {
        assert!(SimpFormat::check_key("a|b").is_err());
        assert!(SimpFormat::check_key("a\nb").is_err());
        assert!(SimpFormat::check_key("key with spaces").is_ok());
    }
}
