//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use num_bigint::BigInt;
use simpsave::{EngineRegistry, Value};

/// One file per available file engine, named with that engine's suffix.
pub fn engine_files(dir: &Path) -> Vec<(&'static str, PathBuf)> {
    EngineRegistry::global()
        .descriptors()
        .iter()
        .filter(|d| d.is_available() && !d.default_suffix.is_empty())
        .map(|d| (d.name, dir.join(format!("store{}", d.default_suffix))))
        .collect()
}

pub fn location(path: &Path) -> Option<&str> {
    path.to_str()
}

/// One value of every supported type, including the awkward edges.
pub fn sample_values() -> Vec<(&'static str, Value)> {
    vec![
        ("int", Value::from(42)),
        ("negative", Value::from(-7)),
        ("big", Value::int(BigInt::from(10).pow(50))),
        ("float", Value::from(3.25)),
        ("inf", Value::from(f64::INFINITY)),
        ("neg_inf", Value::from(f64::NEG_INFINITY)),
        ("true", Value::from(true)),
        ("false", Value::from(false)),
        ("text", Value::from("hello | world = [x]: 'q' \"dq\"")),
        ("empty_text", Value::from("")),
        ("looks_like_list", Value::from("[1, 2]")),
        ("none", Value::None),
        ("list", Value::list([Value::from(1), Value::from("two"), Value::None])),
        ("empty_list", Value::list([])),
        ("tuple", Value::tuple([Value::from(1), Value::from(2.5)])),
        ("single_tuple", Value::tuple([Value::from("x")])),
        ("set", Value::set([1, 2, 3].map(Value::from))),
        ("empty_set", Value::set([])),
        ("frozenset", Value::frozen_set(["a", "b"].map(Value::from))),
        ("bytes", Value::bytes(b"\x00\x01hi\xff".to_vec())),
        ("complex", Value::Complex { re: 1.5, im: -2.0 }),
        (
            "dict",
            Value::dict([
                (Value::from("name"), Value::from("Ada")),
                (Value::from("scores"), Value::list([Value::from(1), Value::from(2)])),
                (Value::from("nested"), Value::dict([(Value::from("ok"), Value::from(true))])),
            ]),
        ),
        (
            "int_keys",
            Value::dict([(Value::from(1), Value::from("one")), (Value::from(2), Value::None)]),
        ),
        (
            "deep",
            Value::list([Value::tuple([Value::set([Value::from(1)]), Value::bytes(b"z".to_vec())])]),
        ),
    ]
}
