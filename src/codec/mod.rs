//! Type codec: converts values to the form an engine persists and back.
//!
//! Every entry is stored as a transport form plus the [`TypeTag`] of the
//! original value. Sets, frozen sets and bytes are flattened to a list
//! before storage (most formats have no native equivalent); the tag is what
//! restores them on read.

pub mod literal;

use num_bigint::BigInt;
use num_traits::{FromPrimitive, ToPrimitive, Zero};

use crate::error::{Error, Result};
use crate::value::{TypeTag, Value};

/// What an engine holds for one entry's value.
#[derive(Debug, Clone, PartialEq)]
pub enum Transport {
    /// Literal text still to be parsed (see [`literal`]).
    Literal(String),
    /// A value decoded natively by the storage format. A string here under
    /// any tag other than `str` is literal text.
    Native(Value),
}

/// One stored key's transport form and type tag.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEntry {
    pub transport: Transport,
    pub type_tag: TypeTag,
}

impl StoredEntry {
    pub fn new(transport: Transport, type_tag: TypeTag) -> Self {
        Self {
            transport,
            type_tag,
        }
    }

    /// Reconstruct the original value.
    pub fn decode(&self) -> Result<Value> {
        decode(&self.transport, &self.type_tag)
    }
}

/// Flatten a top-level set, frozen set or bytes value to a list.
pub fn transport_form(value: &Value) -> Value {
    match value {
        Value::Set(items) | Value::FrozenSet(items) => Value::List(items.clone()),
        Value::Bytes(bytes) => Value::List(bytes.iter().map(|&b| Value::from(b)).collect()),
        other => other.clone(),
    }
}

/// The literal text persisted by text-based engines.
pub fn encode_literal(value: &Value) -> String {
    literal::render(&transport_form(value))
}

/// Reconstruct a value of type `tag` from its transport form.
pub fn decode(transport: &Transport, tag: &TypeTag) -> Result<Value> {
    match (transport, tag) {
        (Transport::Literal(text), TypeTag::Unknown(_)) => Ok(literal::parse(text)
            .map(as_text)
            .unwrap_or_else(|_| Value::Str(text.clone()))),
        (Transport::Literal(text), _) => coerce(literal::parse(text)?, tag),
        (Transport::Native(value), TypeTag::Unknown(_)) => Ok(as_text(value.clone())),
        (Transport::Native(Value::Str(text)), TypeTag::Str) => Ok(Value::Str(text.clone())),
        (Transport::Native(Value::Str(text)), _) => match literal::parse(text) {
            Ok(parsed) => coerce(parsed, tag),
            Err(_) => coerce(Value::Str(text.clone()), tag),
        },
        (Transport::Native(value), _) => coerce(value.clone(), tag),
    }
}

fn as_text(value: Value) -> Value {
    match value {
        Value::Str(s) => Value::Str(s),
        other => Value::Str(literal::render(&other)),
    }
}

/// Cast a decoded transport value to the tagged type.
pub fn coerce(value: Value, tag: &TypeTag) -> Result<Value> {
    let fail = |value: &Value| Error::conversion(literal::render(value), tag.as_str());

    match tag {
        TypeTag::Int => match value {
            Value::Int(_) => Ok(value),
            Value::Bool(b) => Ok(Value::from(u8::from(b))),
            Value::Float(f) if f.is_finite() && f.fract() == 0.0 => {
                BigInt::from_f64(f).map(Value::Int).ok_or_else(|| fail(&value))
            }
            Value::Str(ref s) => s
                .trim()
                .parse::<BigInt>()
                .map(Value::Int)
                .map_err(|_| fail(&value)),
            _ => Err(fail(&value)),
        },
        TypeTag::Float => match value {
            Value::Float(_) => Ok(value),
            Value::Int(ref n) => n.to_f64().map(Value::Float).ok_or_else(|| fail(&value)),
            Value::Bool(b) => Ok(Value::Float(if b { 1.0 } else { 0.0 })),
            Value::Str(ref s) => s
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| fail(&value)),
            _ => Err(fail(&value)),
        },
        // Explicit re-cast: text is never judged by truthiness.
        TypeTag::Bool => match value {
            Value::Bool(_) => Ok(value),
            Value::Int(ref n) => Ok(Value::Bool(!n.is_zero())),
            Value::Float(f) => Ok(Value::Bool(f != 0.0)),
            Value::Str(ref s) => match s.trim() {
                "True" | "true" => Ok(Value::Bool(true)),
                "False" | "false" => Ok(Value::Bool(false)),
                _ => Err(fail(&value)),
            },
            _ => Err(fail(&value)),
        },
        TypeTag::Str => Ok(as_text(value)),
        TypeTag::None => Ok(Value::None),
        TypeTag::List => match value {
            Value::List(items)
            | Value::Tuple(items)
            | Value::Set(items)
            | Value::FrozenSet(items) => Ok(Value::List(items)),
            _ => Err(fail(&value)),
        },
        TypeTag::Tuple => match value {
            Value::List(items) | Value::Tuple(items) => Ok(Value::Tuple(items)),
            _ => Err(fail(&value)),
        },
        TypeTag::Set | TypeTag::FrozenSet => {
            let items = match value {
                Value::List(ref items)
                | Value::Tuple(ref items)
                | Value::Set(ref items)
                | Value::FrozenSet(ref items) => items.clone(),
                _ => return Err(fail(&value)),
            };
            if !items.iter().all(Value::is_hashable) {
                return Err(fail(&value));
            }
            Ok(if *tag == TypeTag::Set {
                Value::set(items)
            } else {
                Value::frozen_set(items)
            })
        }
        TypeTag::Dict => match value {
            Value::Dict(_) => Ok(value),
            _ => Err(fail(&value)),
        },
        TypeTag::Bytes => match value {
            Value::Bytes(_) => Ok(value),
            Value::List(ref items) | Value::Tuple(ref items) => items
                .iter()
                .map(|item| item.as_int().and_then(ToPrimitive::to_u8))
                .collect::<Option<Vec<u8>>>()
                .map(Value::Bytes)
                .ok_or_else(|| fail(&value)),
            _ => Err(fail(&value)),
        },
        TypeTag::Complex => match value {
            Value::Complex { .. } => Ok(value),
            Value::Float(re) => Ok(Value::Complex { re, im: 0.0 }),
            Value::Int(ref n) => n
                .to_f64()
                .map(|re| Value::Complex { re, im: 0.0 })
                .ok_or_else(|| fail(&value)),
            _ => Err(fail(&value)),
        },
        TypeTag::Unknown(_) => Ok(as_text(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn native(value: Value, tag: TypeTag) -> Result<Value> {
        decode(&Transport::Native(value), &tag)
    }

    #[test]
    fn test_transport_form_flattens_sets_and_bytes() {
        let set = Value::set([Value::from(1), Value::from(2)]);
        assert_eq!(transport_form(&set), Value::list([Value::from(1), Value::from(2)]));
        assert_eq!(
            transport_form(&Value::bytes(b"hi".to_vec())),
            Value::list([Value::from(104), Value::from(105)])
        );
        let tuple = Value::tuple([Value::from(1)]);
        assert_eq!(transport_form(&tuple), tuple);
    }

    #[test]
    fn test_literal_decode_restores_set() {
        let set = Value::set([1, 2, 3].map(Value::from));
        let text = encode_literal(&set);
        assert_eq!(text, "[1, 2, 3]");
        let decoded = decode(&Transport::Literal(text), &TypeTag::Set).unwrap();
        assert_eq!(decoded, set);
        assert_eq!(decoded.type_tag(), TypeTag::Set);
    }

    #[test]
    fn test_bool_is_recast_not_truthiness() {
        assert_eq!(native(Value::from("False"), TypeTag::Bool).unwrap(), Value::Bool(false));
        assert_eq!(native(Value::from("false"), TypeTag::Bool).unwrap(), Value::Bool(false));
        assert_eq!(native(Value::from(0), TypeTag::Bool).unwrap(), Value::Bool(false));
        assert!(native(Value::from("maybe"), TypeTag::Bool).is_err());
    }

    #[test]
    fn test_text_transport_under_numeric_tags() {
        let big = "100000000000000000000000000000000000000000000000000";
        let decoded = native(Value::from(big), TypeTag::Int).unwrap();
        assert_eq!(decoded.as_int().map(ToString::to_string).as_deref(), Some(big));

        let nan = native(Value::from("nan"), TypeTag::Float).unwrap();
        assert!(nan.as_f64().is_some_and(f64::is_nan));
        assert_eq!(native(Value::from(2.0), TypeTag::Int).unwrap(), Value::from(2));
    }

    #[test]
    fn test_string_that_looks_like_a_literal_stays_text() {
        let decoded = native(Value::from("[1, 2]"), TypeTag::Str).unwrap();
        assert_eq!(decoded, Value::from("[1, 2]"));
    }

    #[test]
    fn test_none_tag_ignores_transport() {
        assert_eq!(native(Value::from("None"), TypeTag::None).unwrap(), Value::None);
        assert_eq!(
            decode(&Transport::Literal("None".into()), &TypeTag::None).unwrap(),
            Value::None
        );
    }

    #[test]
    fn test_unknown_tag_decodes_as_text() {
        let tag = TypeTag::parse("decimal");
        assert_eq!(native(Value::from(1.5), tag.clone()).unwrap(), Value::from("1.5"));
        assert_eq!(
            decode(&Transport::Literal("'x'".into()), &tag).unwrap(),
            Value::from("x")
        );
        assert_eq!(
            decode(&Transport::Literal("not a literal".into()), &tag).unwrap(),
            Value::from("not a literal")
        );
    }

    #[test]
    fn test_conversion_errors() {
        assert!(matches!(
            native(Value::from("abc"), TypeTag::Int),
            Err(Error::Conversion { .. })
        ));
        assert!(native(Value::list([Value::from(300)]), TypeTag::Bytes).is_err());
        assert!(native(Value::list([Value::list([])]), TypeTag::Set).is_err());
        assert!(native(Value::from(1), TypeTag::Dict).is_err());
    }
}
