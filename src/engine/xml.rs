//! Markup format: `<simpsave><entry key=".." type="..">literal</entry></simpsave>`.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::codec::{StoredEntry, Transport};
use crate::value::TypeTag;

use super::document::{literal_text, DocumentEngine, DocumentFormat, Entries};

const ROOT: &str = "simpsave";
const ENTRY: &str = "entry";

/// The `.xml` format.
pub struct XmlFormat;

pub type XmlEngine = DocumentEngine<XmlFormat>;

fn entry_header(start: &BytesStart<'_>) -> Result<(String, TypeTag), String> {
    let mut key = None;
    let mut tag = None;
    for attr in start.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let value = attr.unescape_value().map_err(|e| e.to_string())?;
        match attr.key.as_ref() {
            b"key" => key = Some(value.into_owned()),
            b"type" => tag = Some(TypeTag::parse(&value)),
            _ => {}
        }
    }
    match (key, tag) {
        (Some(key), Some(tag)) => Ok((key, tag)),
        (None, _) => Err("<entry> without a key attribute".to_string()),
        (Some(key), None) => Err(format!("<entry key=\"{key}\"> without a type attribute")),
    }
}

impl DocumentFormat for XmlFormat {
    const ENGINE: &'static str = "XML";
    const SUFFIX: &'static str = ".xml";

    fn parse(text: &str) -> Result<Entries, String> {
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(true);

        let mut entries = Entries::new();
        let mut current: Option<(String, TypeTag, String)> = None;
        let mut saw_root = false;

        loop {
            match reader.read_event().map_err(|e| e.to_string())? {
                Event::Start(e) if e.name().as_ref() == ROOT.as_bytes() => saw_root = true,
                Event::Empty(e) if e.name().as_ref() == ROOT.as_bytes() => saw_root = true,
                Event::Start(e) if e.name().as_ref() == ENTRY.as_bytes() => {
                    let (key, tag) = entry_header(&e)?;
                    current = Some((key, tag, String::new()));
                }
                Event::Empty(e) if e.name().as_ref() == ENTRY.as_bytes() => {
                    let (key, tag) = entry_header(&e)?;
                    entries.insert(key, StoredEntry::new(Transport::Literal(String::new()), tag));
                }
                Event::Text(t) => {
                    if let Some((_, _, body)) = current.as_mut() {
                        body.push_str(&t.unescape().map_err(|e| e.to_string())?);
                    }
                }
                Event::CData(c) => {
                    if let Some((_, _, body)) = current.as_mut() {
                        body.push_str(&String::from_utf8_lossy(&c.into_inner()));
                    }
                }
                Event::End(e) if e.name().as_ref() == ENTRY.as_bytes() => {
                    if let Some((key, tag, body)) = current.take() {
                        entries.insert(key, StoredEntry::new(Transport::Literal(body), tag));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !saw_root {
            return Err(format!("missing <{ROOT}> root element"));
        }
        Ok(entries)
    }

    fn render(entries: &Entries) -> Result<String, String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
            .map_err(|e| e.to_string())?;
        writer
            .write_event(Event::Start(BytesStart::new(ROOT)))
            .map_err(|e| e.to_string())?;
        for (key, entry) in entries {
            let body = literal_text(&entry.transport);
            writer
                .create_element(ENTRY)
                .with_attribute(("key", key.as_str()))
                .with_attribute(("type", entry.type_tag.as_str()))
                .write_text_content(BytesText::new(&body))
                .map_err(|e| e.to_string())?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(ROOT)))
            .map_err(|e| e.to_string())?;

        let mut text = String::from_utf8(writer.into_inner()).map_err(|e| e.to_string())?;
        text.push('\n');
        Ok(text)
    }

    fn check_key(key: &str) -> Result<(), &'static str> {
        if key.chars().any(|c| c.is_control() && !matches!(c, '\t' | '\n' | '\r')) {
            return Err("keys cannot contain control characters");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_render_then_parse() {
        let mut entries = Entries::new();
        entries.insert(
            "a<b & \"c\"".into(),
            StoredEntry::new(Transport::Literal("'x < y'".into()), TypeTag::Str),
        );
        entries.insert(
            "n".into(),
            StoredEntry::new(Transport::Literal("{'k': [1, 2]}".into()), TypeTag::Dict),
        );
        let text = XmlFormat::render(&entries).unwrap();
        assert!(text.contains("<simpsave>"));

        let parsed = XmlFormat::parse(&text).unwrap();
        assert_eq!(parsed, entries);
        assert_eq!(parsed["a<b & \"c\""].decode().unwrap(), Value::from("x < y"));
    }

    #[test]
    fn test_parse_handwritten_document() {
        let text = r#"<?xml version="1.0"?>
<simpsave>
  <entry key="flag" type="bool">
    True
  </entry>
  <entry key="raw" type="str"><![CDATA['a&b']]></entry>
</simpsave>"#;
        let entries = XmlFormat::parse(text).unwrap();
        assert_eq!(entries["flag"].decode().unwrap(), Value::Bool(true));
        assert_eq!(entries["raw"].decode().unwrap(), Value::from("a&b"));
    }

    #[test]
    fn test_empty_root() {
        assert!(XmlFormat::parse("<simpsave/>").unwrap().is_empty());
        let text = XmlFormat::render(&Entries::new()).unwrap();
        assert!(XmlFormat::parse(&text).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_documents() {
        assert!(XmlFormat::parse("<other/>").is_err());
        assert!(XmlFormat::parse(r#"<simpsave><entry type="int">1</entry></simpsave>"#).is_err());
    }
}
