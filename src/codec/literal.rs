//! Textual literal syntax for values.
//!
//! Text-based engines persist a value as a single-line literal such as
//! `{'name': 'Ada', 'tags': ['x', 'y'], 'id': (1, 2)}`. [`render`] writes it
//! and [`parse`] reads it back with a small recursive-descent parser; nothing
//! in stored text is ever evaluated.
//!
//! Grammar accepted by [`parse`]:
//!
//! - `None`, `True`, `False`
//! - integers of any size, floats (`1.5`, `1e-9`, `inf`, `-inf`, `nan`)
//! - complex numbers `2j`, `(1.5-2j)`
//! - strings in single or double quotes with `\n \r \t \0 \\ \' \" \xhh \uhhhh \Uhhhhhhhh`
//! - bytes `b'..'`
//! - `[..]`, `(..)`, `(x,)`, `{k: v}`, `{a, b}`, `set()`, `frozenset({..})`
//!
//! Trailing commas and surrounding whitespace are allowed.

use std::fmt::Write as _;
use std::str::FromStr;

use num_bigint::BigInt;

use crate::error::{Error, Result};
use crate::value::Value;

/// Nesting beyond this depth is rejected instead of recursing further.
const MAX_DEPTH: usize = 256;

/// Render a value as a single-line literal.
pub fn render(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::None => out.push_str("None"),
        Value::Bool(true) => out.push_str("True"),
        Value::Bool(false) => out.push_str("False"),
        Value::Int(n) => {
            let _ = write!(out, "{}", n);
        }
        Value::Float(f) => out.push_str(&format_float(*f)),
        Value::Complex { re, im } => {
            let (sign, magnitude) = if im.is_sign_negative() && !im.is_nan() {
                ('-', -im)
            } else {
                ('+', *im)
            };
            let _ = write!(out, "({}{}{}j)", format_float(*re), sign, format_float(magnitude));
        }
        Value::Str(s) => write_str(out, s),
        Value::Bytes(b) => write_bytes(out, b),
        Value::List(items) => {
            out.push('[');
            write_items(out, items);
            out.push(']');
        }
        Value::Tuple(items) => {
            out.push('(');
            write_items(out, items);
            if items.len() == 1 {
                out.push(',');
            }
            out.push(')');
        }
        Value::Set(items) if items.is_empty() => out.push_str("set()"),
        Value::Set(items) => {
            out.push('{');
            write_items(out, items);
            out.push('}');
        }
        Value::FrozenSet(items) if items.is_empty() => out.push_str("frozenset()"),
        Value::FrozenSet(items) => {
            out.push_str("frozenset({");
            write_items(out, items);
            out.push_str("})");
        }
        Value::Dict(pairs) => {
            out.push('{');
            for (i, (k, v)) in pairs.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, k);
                out.push_str(": ");
                write_value(out, v);
            }
            out.push('}');
        }
    }
}

fn write_items(out: &mut String, items: &[Value]) {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_value(out, item);
    }
}

/// Shortest round-trip form; always distinguishable from an integer.
pub(crate) fn format_float(f: f64) -> String {
    if f.is_nan() {
        "nan".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "inf" } else { "-inf" }.to_string()
    } else {
        // Debug formatting keeps a ".0" on integral values and switches to
        // exponent notation for very large or small magnitudes.
        format!("{:?}", f)
    }
}

fn write_str(out: &mut String, s: &str) {
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let code = u32::from(c);
                if code <= 0xff {
                    let _ = write!(out, "\\x{:02x}", code);
                } else {
                    let _ = write!(out, "\\u{:04x}", code);
                }
            }
            c => out.push(c),
        }
    }
    out.push('\'');
}

fn write_bytes(out: &mut String, bytes: &[u8]) {
    out.push_str("b'");
    for &b in bytes {
        match b {
            b'\\' => out.push_str("\\\\"),
            b'\'' => out.push_str("\\'"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7e => out.push(char::from(b)),
            _ => {
                let _ = write!(out, "\\x{:02x}", b);
            }
        }
    }
    out.push('\'');
}

/// Parse a literal produced by [`render`] (or hand-written in the same syntax).
pub fn parse(text: &str) -> Result<Value> {
    let mut parser = Parser { src: text, pos: 0 };
    let value = parser.value(0)?;
    parser.skip_ws();
    if parser.pos != text.len() {
        return Err(Error::literal(parser.pos, "unexpected trailing characters"));
    }
    Ok(value)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        self.src.get(self.pos..).unwrap_or("")
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.rest().chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if self.rest().starts_with(word) {
            self.pos += word.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<()> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", c)))
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::literal(self.pos, message)
    }

    fn value(&mut self, depth: usize) -> Result<Value> {
        if depth > MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        self.skip_ws();
        match self.peek() {
            Some('[') => {
                self.bump();
                Ok(Value::List(self.items(']', depth)?))
            }
            Some('(') => self.paren(depth),
            Some('{') => self.brace(depth),
            Some('\'' | '"') => Ok(Value::Str(self.string()?)),
            Some('b') if matches!(self.peek_second(), Some('\'' | '"')) => {
                self.bump();
                Ok(Value::Bytes(self.byte_string()?))
            }
            Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => self.number(),
            Some(c) if c.is_ascii_alphabetic() || c == '_' => self.word(depth),
            Some(c) => Err(self.error(format!("unexpected character '{}'", c))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    /// Comma-separated values up to `close`, which is consumed.
    fn items(&mut self, close: char, depth: usize) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.eat(close) {
                return Ok(items);
            }
            items.push(self.value(depth + 1)?);
            self.skip_ws();
            if !self.eat(',') {
                self.skip_ws();
                self.expect(close)?;
                return Ok(items);
            }
        }
    }

    /// Tuple, or a parenthesised single value such as `(1.5+2j)`.
    fn paren(&mut self, depth: usize) -> Result<Value> {
        self.expect('(')?;
        self.skip_ws();
        if self.eat(')') {
            return Ok(Value::Tuple(Vec::new()));
        }
        let first = self.value(depth + 1)?;
        self.skip_ws();
        if self.eat(')') {
            return Ok(first);
        }
        self.expect(',')?;
        let mut items = vec![first];
        items.extend(self.items(')', depth)?);
        Ok(Value::Tuple(items))
    }

    /// Dict or set literal.
    fn brace(&mut self, depth: usize) -> Result<Value> {
        self.expect('{')?;
        self.skip_ws();
        if self.eat('}') {
            return Ok(Value::Dict(Vec::new()));
        }
        let first = self.value(depth + 1)?;
        self.skip_ws();
        if !self.eat(':') {
            let mut items = vec![first];
            if self.eat(',') {
                items.extend(self.items('}', depth)?);
            } else {
                self.expect('}')?;
            }
            return Ok(Value::set(items));
        }

        let mut pairs = vec![(first, self.value(depth + 1)?)];
        loop {
            self.skip_ws();
            if self.eat('}') {
                break;
            }
            self.expect(',')?;
            self.skip_ws();
            if self.eat('}') {
                break;
            }
            let k = self.value(depth + 1)?;
            self.skip_ws();
            self.expect(':')?;
            let v = self.value(depth + 1)?;
            pairs.push((k, v));
        }
        Ok(Value::dict(pairs))
    }

    fn word(&mut self, depth: usize) -> Result<Value> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
            self.bump();
        }
        let word = self.src.get(start..self.pos).unwrap_or("");
        match word {
            "None" => Ok(Value::None),
            "True" => Ok(Value::Bool(true)),
            "False" => Ok(Value::Bool(false)),
            "inf" | "nan" | "infj" | "nanj" => {
                self.pos = start;
                self.number()
            }
            "set" => Ok(Value::set(self.constructor_args(depth)?)),
            "frozenset" => Ok(Value::frozen_set(self.constructor_args(depth)?)),
            other => Err(Error::literal(start, format!("unknown name '{}'", other))),
        }
    }

    /// `()` or `(<list|tuple|set>)` after `set` / `frozenset`.
    fn constructor_args(&mut self, depth: usize) -> Result<Vec<Value>> {
        self.expect('(')?;
        self.skip_ws();
        if self.eat(')') {
            return Ok(Vec::new());
        }
        let inner = self.value(depth + 1)?;
        self.skip_ws();
        self.expect(')')?;
        match inner {
            Value::List(items) | Value::Tuple(items) | Value::Set(items) => Ok(items),
            Value::Dict(pairs) if pairs.is_empty() => Ok(Vec::new()),
            _ => Err(self.error("set constructor expects a sequence")),
        }
    }

    fn number(&mut self) -> Result<Value> {
        let start = self.pos;
        let (real, imaginary) = self.real()?;
        if imaginary {
            return Ok(Value::Complex { re: 0.0, im: to_f64(&real) });
        }

        // `a+bj` / `a-bj`
        let checkpoint = self.pos;
        self.skip_ws();
        if matches!(self.peek(), Some('+' | '-')) {
            let sign = if self.bump() == Some('-') { -1.0 } else { 1.0 };
            self.skip_ws();
            if let Ok((im, true)) = self.real() {
                return Ok(Value::Complex {
                    re: to_f64(&real),
                    im: sign * to_f64(&im),
                });
            }
        }
        self.pos = checkpoint;

        if self.pos == start {
            return Err(self.error("expected a number"));
        }
        Ok(real)
    }

    /// One real literal; the flag reports a trailing `j`.
    fn real(&mut self) -> Result<(Value, bool)> {
        let start = self.pos;
        let negative = match self.peek() {
            Some('-') => {
                self.bump();
                true
            }
            Some('+') => {
                self.bump();
                false
            }
            _ => false,
        };

        let special = if self.eat_word("inf") {
            Some(f64::INFINITY)
        } else if self.eat_word("nan") {
            Some(f64::NAN)
        } else {
            None
        };
        if let Some(f) = special {
            let f = if negative { -f } else { f };
            return Ok((Value::Float(f), self.eat('j')));
        }

        let digits_start = self.pos;
        let mut is_float = false;
        let mut digit_count = self.digits();
        if self.eat('.') {
            is_float = true;
            digit_count += self.digits();
        }
        if digit_count == 0 {
            self.pos = start;
            return Err(Error::literal(start, "expected digits"));
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            is_float = true;
            self.bump();
            if matches!(self.peek(), Some('+' | '-')) {
                self.bump();
            }
            if self.digits() == 0 {
                return Err(self.error("expected exponent digits"));
            }
        }

        let body = self.src.get(digits_start..self.pos).unwrap_or("");
        let imaginary = self.eat('j');
        if is_float || imaginary {
            let f = f64::from_str(body).map_err(|e| Error::literal(start, e.to_string()))?;
            let f = if negative { -f } else { f };
            Ok((Value::Float(f), imaginary))
        } else {
            let n = BigInt::from_str(body).map_err(|e| Error::literal(start, e.to_string()))?;
            Ok((Value::Int(if negative { -n } else { n }), false))
        }
    }

    fn digits(&mut self) -> usize {
        let mut count = 0;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            count += 1;
        }
        count
    }

    fn string(&mut self) -> Result<String> {
        let start = self.pos;
        let quote = self.bump().ok_or_else(|| self.error("expected a quote"))?;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(Error::literal(start, "unterminated string")),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => {
                    let c = self.escape(false)?;
                    out.push(char::from_u32(c).ok_or_else(|| self.error("invalid code point"))?);
                }
                Some(c) => out.push(c),
            }
        }
    }

    fn byte_string(&mut self) -> Result<Vec<u8>> {
        let start = self.pos;
        let quote = self.bump().ok_or_else(|| self.error("expected a quote"))?;
        let mut out = Vec::new();
        loop {
            match self.bump() {
                None => return Err(Error::literal(start, "unterminated bytes")),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => {
                    let c = self.escape(true)?;
                    out.push(u8::try_from(c).map_err(|_| self.error("byte out of range"))?);
                }
                Some(c) if c.is_ascii() => out.push(c as u8),
                Some(_) => return Err(self.error("non-ASCII character in bytes")),
            }
        }
    }

    fn escape(&mut self, bytes: bool) -> Result<u32> {
        let c = self.bump().ok_or_else(|| self.error("unterminated escape"))?;
        Ok(match c {
            'n' => 0x0a,
            'r' => 0x0d,
            't' => 0x09,
            '0' => 0,
            '\\' => u32::from('\\'),
            '\'' => u32::from('\''),
            '"' => u32::from('"'),
            'x' => self.hex(2)?,
            'u' if !bytes => self.hex(4)?,
            'U' if !bytes => self.hex(8)?,
            other => return Err(self.error(format!("unknown escape '\\{}'", other))),
        })
    }

    fn hex(&mut self, len: usize) -> Result<u32> {
        let start = self.pos;
        for _ in 0..len {
            if !self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                return Err(self.error("invalid hex escape"));
            }
            self.bump();
        }
        let digits = self.src.get(start..self.pos).unwrap_or("");
        u32::from_str_radix(digits, 16).map_err(|e| Error::literal(start, e.to_string()))
    }
}

fn to_f64(value: &Value) -> f64 {
    value.as_f64().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(value: Value) {
        let text = render(&value);
        let parsed = parse(&text).unwrap();
        assert_eq!(parsed, value, "literal was {}", text);
        assert_eq!(parsed.type_tag(), value.type_tag());
    }

    #[test]
    fn test_render_scalars() {
        assert_eq!(render(&Value::None), "None");
        assert_eq!(render(&Value::Bool(false)), "False");
        assert_eq!(render(&Value::from(-42)), "-42");
        assert_eq!(render(&Value::Float(3.0)), "3.0");
        assert_eq!(render(&Value::Float(f64::NEG_INFINITY)), "-inf");
        assert_eq!(render(&Value::Complex { re: 1.0, im: -2.0 }), "(1.0-2.0j)");
        assert_eq!(render(&Value::from("it's")), r"'it\'s'");
        assert_eq!(render(&Value::bytes(vec![0u8, 65, 255])), r"b'\x00A\xff'");
    }

    #[test]
    fn test_render_containers() {
        assert_eq!(render(&Value::tuple([Value::from(1)])), "(1,)");
        assert_eq!(render(&Value::tuple([])), "()");
        assert_eq!(render(&Value::set([])), "set()");
        assert_eq!(render(&Value::frozen_set([Value::from(1)])), "frozenset({1})");
        let d = Value::dict([(Value::from("a"), Value::list([Value::from(1), Value::None]))]);
        assert_eq!(render(&d), "{'a': [1, None]}");
    }

    #[test]
    fn test_round_trip_nested() {
        round_trip(Value::dict([
            (Value::from("name"), Value::from("Ada\nLovelace")),
            (Value::tuple([Value::from(1), Value::from(2)]), Value::set([Value::from("x")])),
            (Value::from(7), Value::frozen_set([Value::from(1.5)])),
            (Value::None, Value::bytes(b"\x01\x02'".to_vec())),
        ]));
        round_trip(Value::list([
            Value::Complex { re: -0.5, im: 1e-9 },
            Value::Float(1e300),
            Value::from("ünïcødé ✓"),
            Value::tuple([]),
            Value::Dict(Vec::new()),
        ]));
    }

    #[test]
    fn test_big_integers_are_exact() {
        let big: BigInt = BigInt::from(10).pow(50);
        round_trip(Value::Int(big.clone()));
        round_trip(Value::Int(-big));
    }

    #[test]
    fn test_special_floats() {
        assert_eq!(parse("inf").unwrap(), Value::Float(f64::INFINITY));
        assert_eq!(parse("-inf").unwrap(), Value::Float(f64::NEG_INFINITY));
        assert!(parse("nan").unwrap().as_f64().unwrap().is_nan());
        assert!(matches!(parse("(1+nanj)").unwrap(), Value::Complex { im, .. } if im.is_nan()));
    }

    #[test]
    fn test_parse_hand_written_forms() {
        assert_eq!(parse(" [1, 2, ] ").unwrap(), Value::list([Value::from(1), Value::from(2)]));
        assert_eq!(parse("\"double\"").unwrap(), Value::from("double"));
        assert_eq!(parse("(5)").unwrap(), Value::from(5));
        assert_eq!(parse("2j").unwrap(), Value::Complex { re: 0.0, im: 2.0 });
        assert_eq!(parse("set([3, 3])").unwrap(), Value::set([Value::from(3)]));
        assert_eq!(parse(r"'é\x41'").unwrap(), Value::from("éA"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse("").is_err());
        assert!(parse("[1, 2").is_err());
        assert!(parse("'open").is_err());
        assert!(parse("__import__('os')").is_err());
        assert!(parse("1 2").is_err());
        assert!(parse("{1: }").is_err());
        assert!(matches!(parse("[1, ?]"), Err(Error::Literal { offset: 4, .. })));
    }

    #[test]
    fn test_depth_limit() {
        let deep = "[".repeat(MAX_DEPTH + 10);
        assert!(parse(&deep).is_err());
    }
}
