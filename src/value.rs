//! The supported semantic types and their persisted type tags.

use std::fmt;

use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::error::{Error, Result};

/// A value that can be stored under a key.
///
/// Sets and frozen sets keep their members in insertion order but compare as
/// unordered collections; dicts compare independent of insertion order.
/// Every other variant compares structurally. As with IEEE floats, a NaN
/// never equals itself.
///
/// # Example
///
/// ```ignore
/// use simpsave::Value;
///
/// let scores = Value::dict([
///     (Value::from("alice"), Value::from(90)),
///     (Value::from("bob"), Value::from(72.5)),
/// ]);
/// let tags = Value::set(["a", "b", "a"].map(Value::from));
/// assert_eq!(tags.as_items().map(<[Value]>::len), Some(2));
/// ```
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    /// Arbitrary-precision integer.
    Int(BigInt),
    Float(f64),
    Complex { re: f64, im: f64 },
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Set(Vec<Value>),
    FrozenSet(Vec<Value>),
    /// Insertion-ordered key/value pairs. Keys must be hashable.
    Dict(Vec<(Value, Value)>),
}

impl Value {
    pub fn int(n: impl Into<BigInt>) -> Self {
        Self::Int(n.into())
    }

    pub fn str(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }

    pub fn bytes(b: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(b.into())
    }

    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Self::List(items.into_iter().collect())
    }

    pub fn tuple(items: impl IntoIterator<Item = Value>) -> Self {
        Self::Tuple(items.into_iter().collect())
    }

    /// Build a set, dropping duplicate members.
    pub fn set(items: impl IntoIterator<Item = Value>) -> Self {
        Self::Set(dedup(items))
    }

    /// Build a frozen set, dropping duplicate members.
    pub fn frozen_set(items: impl IntoIterator<Item = Value>) -> Self {
        Self::FrozenSet(dedup(items))
    }

    /// Build a dict. A repeated key keeps its first position and its last value.
    pub fn dict(pairs: impl IntoIterator<Item = (Value, Value)>) -> Self {
        let mut out: Vec<(Value, Value)> = Vec::new();
        for (k, v) in pairs {
            match out.iter_mut().find(|(existing, _)| *existing == k) {
                Some(slot) => slot.1 = v,
                None => out.push((k, v)),
            }
        }
        Self::Dict(out)
    }

    /// The tag persisted next to this value.
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Self::None => TypeTag::None,
            Self::Bool(_) => TypeTag::Bool,
            Self::Int(_) => TypeTag::Int,
            Self::Float(_) => TypeTag::Float,
            Self::Complex { .. } => TypeTag::Complex,
            Self::Str(_) => TypeTag::Str,
            Self::Bytes(_) => TypeTag::Bytes,
            Self::List(_) => TypeTag::List,
            Self::Tuple(_) => TypeTag::Tuple,
            Self::Set(_) => TypeTag::Set,
            Self::FrozenSet(_) => TypeTag::FrozenSet,
            Self::Dict(_) => TypeTag::Dict,
        }
    }

    /// Whether the value may be used as a dict key or set member.
    pub fn is_hashable(&self) -> bool {
        match self {
            Self::List(_) | Self::Set(_) | Self::Dict(_) => false,
            Self::Tuple(items) => items.iter().all(Value::is_hashable),
            _ => true,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<&BigInt> {
        match self {
            Self::Int(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_int().and_then(ToPrimitive::to_i64)
    }

    /// Floats as-is; integers converted when representable.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(n) => n.to_f64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Members of a list, tuple, set or frozen set.
    pub fn as_items(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) | Self::Tuple(items) | Self::Set(items) | Self::FrozenSet(items) => {
                Some(items)
            }
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&[(Value, Value)]> {
        match self {
            Self::Dict(pairs) => Some(pairs),
            _ => None,
        }
    }

    /// Look up a string key in a dict.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_dict()?
            .iter()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, v)| v)
    }
}

fn dedup(items: impl IntoIterator<Item = Value>) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

fn same_members(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len() && a.iter().all(|x| b.contains(x)) && b.iter().all(|x| a.contains(x))
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Complex { re: ar, im: ai }, Self::Complex { re: br, im: bi }) => {
                ar == br && ai == bi
            }
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::List(a), Self::List(b)) | (Self::Tuple(a), Self::Tuple(b)) => a == b,
            (Self::Set(a), Self::Set(b)) | (Self::FrozenSet(a), Self::FrozenSet(b)) => {
                same_members(a, b)
            }
            (Self::Dict(a), Self::Dict(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(k, v)| {
                        b.iter()
                            .find(|(other_k, _)| other_k == k)
                            .is_some_and(|(_, other_v)| other_v == v)
                    })
            }
            _ => false,
        }
    }
}

/// Renders the value in the literal syntax used by text-based engines.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::codec::literal::render(self))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(n: $t) -> Self {
                    Self::Int(BigInt::from(n))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl From<BigInt> for Value {
    fn from(n: BigInt) -> Self {
        Self::Int(n)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Self::Float(f64::from(f))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::None, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

/// Identifier of a value's original semantic type.
///
/// The string forms are the identifiers found in existing store files.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Int,
    Float,
    Bool,
    Str,
    None,
    List,
    Tuple,
    Set,
    FrozenSet,
    Dict,
    Bytes,
    Complex,
    /// A tag this version does not recognise; decoded as text.
    Unknown(String),
}

impl TypeTag {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Str => "str",
            Self::None => "NoneType",
            Self::List => "list",
            Self::Tuple => "tuple",
            Self::Set => "set",
            Self::FrozenSet => "frozenset",
            Self::Dict => "dict",
            Self::Bytes => "bytes",
            Self::Complex => "complex",
            Self::Unknown(tag) => tag,
        }
    }

    pub fn parse(tag: &str) -> Self {
        match tag {
            "int" => Self::Int,
            "float" => Self::Float,
            "bool" => Self::Bool,
            "str" => Self::Str,
            "NoneType" => Self::None,
            "list" => Self::List,
            "tuple" => Self::Tuple,
            "set" => Self::Set,
            "frozenset" => Self::FrozenSet,
            "dict" => Self::Dict,
            "bytes" => Self::Bytes,
            "complex" => Self::Complex,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deepest container nesting a stored value may have.
///
/// Structured documents wrap each value in two more mapping levels, and
/// their parsers refuse deeply recursive input, so the bound sits well
/// below every reader's limit.
pub const MAX_NESTING: usize = 32;

/// Reject a value whose keys or members, at any depth, are not hashable,
/// or whose containers nest deeper than [`MAX_NESTING`].
///
/// Runs before any engine touches its target, so a rejected write never
/// modifies stored entries.
pub fn validate_basic_type(value: &Value) -> Result<()> {
    validate_at(value, 0)
}

fn validate_at(value: &Value, depth: usize) -> Result<()> {
    let is_container = matches!(
        value,
        Value::List(_) | Value::Tuple(_) | Value::Set(_) | Value::FrozenSet(_) | Value::Dict(_)
    );
    if is_container && depth >= MAX_NESTING {
        return Err(Error::UnsupportedType(format!(
            "{} nested deeper than {MAX_NESTING} levels",
            value.type_tag()
        )));
    }
    match value {
        Value::List(items) | Value::Tuple(items) => {
            items.iter().try_for_each(|item| validate_at(item, depth + 1))
        }
        Value::Set(items) | Value::FrozenSet(items) => {
            let kind = value.type_tag();
            for item in items {
                if !item.is_hashable() {
                    return Err(Error::UnsupportedType(format!(
                        "{} member of type {} is not hashable",
                        kind,
                        item.type_tag()
                    )));
                }
                validate_at(item, depth + 1)?;
            }
            Ok(())
        }
        Value::Dict(pairs) => {
            for (k, v) in pairs {
                if !k.is_hashable() {
                    return Err(Error::UnsupportedType(format!(
                        "dict key of type {} is not hashable",
                        k.type_tag()
                    )));
                }
                validate_at(k, depth + 1)?;
                validate_at(v, depth + 1)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nested(levels: usize) -> Value {
        (0..levels).fold(Value::from(1), |inner, _| Value::list([inner]))
    }

    #[test]
    fn test_nesting_limit() {
        assert!(validate_basic_type(&nested(MAX_NESTING)).is_ok());
        let err = validate_basic_type(&nested(MAX_NESTING + 1)).err();
        assert!(matches!(err, Some(Error::UnsupportedType(_))), "{err:?}");

        let deep_key = Value::dict([(
            (0..MAX_NESTING).fold(Value::from(1), |inner, _| Value::tuple([inner])),
            Value::None,
        )]);
        assert!(validate_basic_type(&deep_key).is_err());
    }

    #[test]
    fn test_set_equality_ignores_order() {
        let a = Value::set([1, 2, 3].map(Value::from));
        let b = Value::set([3, 1, 2].map(Value::from));
        assert_eq!(a, b);
        assert_ne!(a, Value::frozen_set([1, 2, 3].map(Value::from)));
        assert_ne!(a, Value::list([1, 2, 3].map(Value::from)));
    }

    #[test]
    fn test_set_drops_duplicates() {
        let s = Value::set(["a", "b", "a"].map(Value::from));
        assert_eq!(s.as_items().map(<[Value]>::len), Some(2));
    }

    #[test]
    fn test_dict_equality_ignores_order() {
        let a = Value::dict([(Value::from("x"), Value::from(1)), (Value::from("y"), Value::None)]);
        let b = Value::dict([(Value::from("y"), Value::None), (Value::from("x"), Value::from(1))]);
        assert_eq!(a, b);
        assert_eq!(a.get("x"), Some(&Value::from(1)));
    }

    #[test]
    fn test_nan_is_not_equal_to_itself() {
        assert_ne!(Value::Float(f64::NAN), Value::Float(f64::NAN));
    }

    #[test]
    fn test_type_tags_round_trip() {
        for tag in ["int", "float", "bool", "str", "NoneType", "list", "tuple", "set", "frozenset",
            "dict", "bytes", "complex"]
        {
            assert_eq!(TypeTag::parse(tag).as_str(), tag);
            assert!(!matches!(TypeTag::parse(tag), TypeTag::Unknown(_)));
        }
        assert_eq!(TypeTag::parse("decimal"), TypeTag::Unknown("decimal".to_string()));
    }

    #[test]
    fn test_validate_rejects_deep_unhashable_key() {
        let inner = Value::dict([(Value::list([Value::from(1)]), Value::from("bad"))]);
        let value = Value::list([Value::from(1), Value::tuple([Value::from("ok"), inner])]);
        let err = validate_basic_type(&value).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_validate_rejects_set_inside_set() {
        let value = Value::Set(vec![Value::set([Value::from(1)])]);
        assert!(validate_basic_type(&value).is_err());

        let frozen = Value::Set(vec![Value::frozen_set([Value::from(1)])]);
        assert!(validate_basic_type(&frozen).is_ok());
    }

    #[test]
    fn test_validate_accepts_tuple_keys() {
        let value = Value::dict([(Value::tuple([Value::from(1), Value::from("a")]), Value::None)]);
        assert!(validate_basic_type(&value).is_ok());
    }
}
