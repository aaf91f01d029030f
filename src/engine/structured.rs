//! Structured-config engines: JSON, YAML and TOML.
//!
//! All three persist one mapping `{key: {type, value}}`. A value goes in as a
//! native document value when the format can hold it without loss; otherwise
//! its literal text is stored as a string and the type tag tells the reader
//! to parse it back.

use std::fmt;

use indexmap::IndexMap;
use num_traits::ToPrimitive;
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::codec::{self, literal, StoredEntry, Transport};
use crate::value::{TypeTag, Value};

use super::document::{DocumentEngine, DocumentFormat, Entries};

/// Which values a format stores natively.
#[derive(Debug, Clone, Copy)]
struct Profile {
    /// NaN and infinities.
    non_finite: bool,
    /// Null, at any depth.
    null: bool,
}

/// The value tree shared by the three serde formats.
#[derive(Debug, Clone, PartialEq, Default)]
enum Native {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Seq(Vec<Native>),
    Map(IndexMap<String, Native>),
}

impl Native {
    /// Lossless native form of `value`, or `None` if the format cannot hold it.
    fn from_value(value: &Value, profile: Profile) -> Option<Self> {
        Some(match value {
            Value::None if profile.null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Int(n) => Self::Int(n.to_i64()?),
            Value::Float(f) if f.is_finite() || profile.non_finite => Self::Float(*f),
            Value::Str(s) => Self::Str(s.clone()),
            Value::List(items) => Self::Seq(
                items
                    .iter()
                    .map(|item| Self::from_value(item, profile))
                    .collect::<Option<_>>()?,
            ),
            Value::Dict(pairs) => Self::Map(
                pairs
                    .iter()
                    .map(|(k, v)| Some((k.as_str()?.to_string(), Self::from_value(v, profile)?)))
                    .collect::<Option<_>>()?,
            ),
            _ => return None,
        })
    }

    fn into_value(self) -> Value {
        match self {
            Self::Null => Value::None,
            Self::Bool(b) => Value::Bool(b),
            Self::Int(n) => Value::from(n),
            Self::Float(f) => Value::Float(f),
            Self::Str(s) => Value::Str(s),
            Self::Seq(items) => Value::List(items.into_iter().map(Self::into_value).collect()),
            Self::Map(map) => Value::Dict(
                map.into_iter()
                    .map(|(k, v)| (Value::Str(k), v.into_value()))
                    .collect(),
            ),
        }
    }

    fn key_text(self) -> String {
        match self {
            Self::Str(s) => s,
            Self::Null => "None".to_string(),
            other => literal::render(&other.into_value()),
        }
    }
}

impl Serialize for Native {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(n) => serializer.serialize_i64(*n),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::Str(s) => serializer.serialize_str(s),
            Self::Seq(items) => items.serialize(serializer),
            Self::Map(map) => map.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Native {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(NativeVisitor)
    }
}

struct NativeVisitor;

impl<'de> Visitor<'de> for NativeVisitor {
    type Value = Native;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a document value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Native, E> {
        Ok(Native::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Native, E> {
        Ok(Native::Int(v))
    }

    // Out-of-range integers stay exact as decimal text.
    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Native, E> {
        Ok(i64::try_from(v).map_or_else(|_| Native::Str(v.to_string()), Native::Int))
    }

    fn visit_i128<E: de::Error>(self, v: i128) -> Result<Native, E> {
        Ok(i64::try_from(v).map_or_else(|_| Native::Str(v.to_string()), Native::Int))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<Native, E> {
        Ok(i64::try_from(v).map_or_else(|_| Native::Str(v.to_string()), Native::Int))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Native, E> {
        Ok(Native::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Native, E> {
        Ok(Native::Str(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Native, E> {
        Ok(Native::Str(v))
    }

    fn visit_none<E: de::Error>(self) -> Result<Native, E> {
        Ok(Native::Null)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Native, E> {
        Ok(Native::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Native, D::Error> {
        Native::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Native, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Native::Seq(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Native, A::Error> {
        let mut out = IndexMap::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((key, value)) = map.next_entry::<Native, Native>()? {
            out.insert(key.key_text(), value);
        }
        Ok(Native::Map(out))
    }
}

/// One persisted entry. `type` precedes `value` so TOML emits it before any subtable.
#[derive(Debug, Serialize, Deserialize)]
struct DocEntry {
    #[serde(rename = "type")]
    type_tag: String,
    #[serde(default)]
    value: Native,
}

type Doc = IndexMap<String, DocEntry>;

fn encode_with(value: &Value, profile: Profile) -> Transport {
    let form = match codec::transport_form(value) {
        Value::Tuple(items) => Value::List(items),
        other => other,
    };
    if Native::from_value(&form, profile).is_some() {
        Transport::Native(form)
    } else {
        Transport::Literal(codec::encode_literal(value))
    }
}

fn to_doc(entries: &Entries, profile: Profile) -> Doc {
    entries
        .iter()
        .map(|(key, entry)| {
            let value = match &entry.transport {
                Transport::Literal(text) => Native::Str(text.clone()),
                Transport::Native(value) => Native::from_value(value, profile)
                    .unwrap_or_else(|| Native::Str(literal::render(value))),
            };
            let doc_entry = DocEntry {
                type_tag: entry.type_tag.to_string(),
                value,
            };
            (key.clone(), doc_entry)
        })
        .collect()
}

fn from_doc(doc: Doc) -> Entries {
    doc.into_iter()
        .map(|(key, entry)| {
            let stored = StoredEntry::new(
                Transport::Native(entry.value.into_value()),
                TypeTag::parse(&entry.type_tag),
            );
            (key, stored)
        })
        .collect()
}

/// The `.toml` format. Has no null; accepts non-finite floats.
pub struct TomlFormat;

pub type TomlEngine = DocumentEngine<TomlFormat>;

impl TomlFormat {
    const PROFILE: Profile = Profile {
        non_finite: true,
        null: false,
    };
}

impl DocumentFormat for TomlFormat {
    const ENGINE: &'static str = "TOML";
    const SUFFIX: &'static str = ".toml";

    fn encode(value: &Value) -> Transport {
        encode_with(value, Self::PROFILE)
    }

    fn parse(text: &str) -> Result<Entries, String> {
        toml::from_str::<Doc>(text)
            .map(from_doc)
            .map_err(|e| e.to_string())
    }

    fn render(entries: &Entries) -> Result<String, String> {
        toml::to_string(&to_doc(entries, Self::PROFILE)).map_err(|e| e.to_string())
    }
}

/// The `.json` format. Has null; rejects non-finite floats.
#[cfg(feature = "json")]
pub struct JsonFormat;

#[cfg(feature = "json")]
pub type JsonEngine = DocumentEngine<JsonFormat>;

#[cfg(feature = "json")]
impl JsonFormat {
    const PROFILE: Profile = Profile {
        non_finite: false,
        null: true,
    };
}

#[cfg(feature = "json")]
impl DocumentFormat for JsonFormat {
    const ENGINE: &'static str = "JSON";
    const SUFFIX: &'static str = ".json";

    fn encode(value: &Value) -> Transport {
        encode_with(value, Self::PROFILE)
    }

    fn parse(text: &str) -> Result<Entries, String> {
        serde_json::from_str::<Doc>(text)
            .map(from_doc)
            .map_err(|e| e.to_string())
    }

    fn render(entries: &Entries) -> Result<String, String> {
        serde_json::to_string_pretty(&to_doc(entries, Self::PROFILE)).map_err(|e| e.to_string())
    }
}

/// The `.yml` format. Holds every scalar natively.
#[cfg(feature = "yaml")]
pub struct YamlFormat;

#[cfg(feature = "yaml")]
pub type YamlEngine = DocumentEngine<YamlFormat>;

#[cfg(feature = "yaml")]
impl YamlFormat {
    const PROFILE: Profile = Profile {
        non_finite: true,
        null: true,
    };
}

#[cfg(feature = "yaml")]
impl DocumentFormat for YamlFormat {
    const ENGINE: &'static str = "YML";
    const SUFFIX: &'static str = ".yml";

    fn encode(value: &Value) -> Transport {
        encode_with(value, Self::PROFILE)
    }

    fn parse(text: &str) -> Result<Entries, String> {
        serde_yaml::from_str::<Doc>(text)
            .map(from_doc)
            .map_err(|e| e.to_string())
    }

    fn render(entries: &Entries) -> Result<String, String> {
        serde_yaml::to_string(&to_doc(entries, Self::PROFILE)).map_err(|e| e.to_string())
    }
}
