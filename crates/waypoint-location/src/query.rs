//! Query string codec
//!
//! The default codec understands:
//! - `a=1&a=2` → repeated keys collected into a list
//! - `c[]=x` → explicit list syntax, even for a single value
//! - `flag` → a bare key is `true`
//! - `"true"`, `"false"`, `"null"` and numeric-looking values → typed scalars

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use serde_json::Number;
use url::form_urlencoded;

/// Parsed query parameters, keyed by name.
pub type Query = BTreeMap<String, QueryValue>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<QueryValue>),
}

impl QueryValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            QueryValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[QueryValue]> {
        match self {
            QueryValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, QueryValue::Null)
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::String(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::String(value)
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        QueryValue::Bool(value)
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        QueryValue::Number(value.into())
    }
}

impl From<i32> for QueryValue {
    fn from(value: i32) -> Self {
        QueryValue::Number(value.into())
    }
}

impl From<f64> for QueryValue {
    fn from(value: f64) -> Self {
        Number::from_f64(value)
            .map(QueryValue::Number)
            .unwrap_or(QueryValue::Null)
    }
}

impl<T: Into<QueryValue>> From<Vec<T>> for QueryValue {
    fn from(values: Vec<T>) -> Self {
        QueryValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<QueryValue>> From<Option<T>> for QueryValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(QueryValue::Null)
    }
}

/// Pluggable parse/stringify pair used by the router.
pub trait QueryCodec: Send + Sync {
    fn parse(&self, raw: &str) -> Query;
    fn stringify(&self, query: &Query) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultQueryCodec;

impl QueryCodec for DefaultQueryCodec {
    fn parse(&self, raw: &str) -> Query {
        parse_query(raw)
    }

    fn stringify(&self, query: &Query) -> String {
        stringify_query(query)
    }
}

/// Parse a raw query string (with or without the leading `?`).
pub fn parse_query(raw: &str) -> Query {
    let raw = raw.strip_prefix('?').unwrap_or(raw);
    let mut query = Query::new();

    for pair in raw.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = match pair.split_once('=') {
            Some((key, value)) => (decode(key), coerce(&decode(value))),
            None => (decode(pair), QueryValue::Bool(true)),
        };

        let (key, explicit_list) = match key.strip_suffix("[]") {
            Some(base) => (base.to_string(), true),
            None => (key, false),
        };
        if key.is_empty() {
            continue;
        }

        match query.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(if explicit_list {
                    QueryValue::List(vec![value])
                } else {
                    value
                });
            }
            Entry::Occupied(mut slot) => {
                let existing = slot.get_mut();
                if let QueryValue::List(items) = existing {
                    items.push(value);
                } else {
                    let previous = std::mem::replace(existing, QueryValue::Null);
                    *existing = QueryValue::List(vec![previous, value]);
                }
            }
        }
    }

    query
}

/// Serialize a query back into `a=1&b&c[]=x` form (no leading `?`).
pub fn stringify_query(query: &Query) -> String {
    let mut parts = Vec::new();

    for (key, value) in query {
        let encoded_key = encode(key);
        match value {
            QueryValue::List(items) => {
                let list_key = format!("{}[]", encoded_key);
                for item in items {
                    push_pair(&mut parts, &list_key, item);
                }
            }
            other => push_pair(&mut parts, &encoded_key, other),
        }
    }

    parts.join("&")
}

fn push_pair(parts: &mut Vec<String>, key: &str, value: &QueryValue) {
    match value {
        QueryValue::Null => {}
        QueryValue::Bool(true) => parts.push(key.to_string()),
        QueryValue::Bool(false) => parts.push(format!("{}=false", key)),
        QueryValue::Number(n) => parts.push(format!("{}={}", key, n)),
        QueryValue::String(s) => parts.push(format!("{}={}", key, encode(s))),
        // Nested lists flatten into the same key
        QueryValue::List(items) => {
            for item in items {
                push_pair(parts, key, item);
            }
        }
    }
}

fn decode(component: &str) -> String {
    let spaced = component.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

fn encode(component: &str) -> String {
    form_urlencoded::byte_serialize(component.as_bytes()).collect()
}

fn coerce(text: &str) -> QueryValue {
    match text {
        "true" => QueryValue::Bool(true),
        "false" => QueryValue::Bool(false),
        "null" => QueryValue::Null,
        _ if looks_numeric(text) => parse_number(text)
            .map(QueryValue::Number)
            .unwrap_or_else(|| QueryValue::String(text.to_string())),
        _ => QueryValue::String(text.to_string()),
    }
}

/// `-?(0|[1-9][0-9]*)(\.[0-9]+)?`
///
/// Leading zeros stay strings so values like zip codes survive a round trip.
fn looks_numeric(text: &str) -> bool {
    let unsigned = text.strip_prefix('-').unwrap_or(text);
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (unsigned, None),
    };

    if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    if int_part.len() > 1 && int_part.starts_with('0') {
        return false;
    }
    match frac_part {
        Some(frac) => !frac.is_empty() && frac.bytes().all(|b| b.is_ascii_digit()),
        None => true,
    }
}

fn parse_number(text: &str) -> Option<Number> {
    if text.contains('.') {
        text.parse::<f64>().ok().and_then(Number::from_f64)
    } else {
        text.parse::<i64>().ok().map(Number::from)
    }
}
