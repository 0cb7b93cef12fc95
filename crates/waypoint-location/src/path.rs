//! Path normalization helpers
//!
//! Every path handed to the route table or the matcher goes through
//! [`normalize_path`] first, so the rest of the router can assume a
//! `/`-prefixed path with no empty segments.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters escaped when a param value is written into a path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Ensure a leading `/` and collapse repeated slashes.
///
/// A trailing slash is preserved; whether it matters is up to the
/// matcher's trailing-slash policy.
pub fn normalize_path(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 1);
    out.push('/');
    for ch in raw.trim().chars() {
        if ch == '/' && out.ends_with('/') {
            continue;
        }
        out.push(ch);
    }
    out
}

/// Drop a single trailing slash, leaving the root path untouched.
pub fn trim_trailing_slash(path: &str) -> &str {
    if path.len() > 1 {
        path.strip_suffix('/').unwrap_or(path)
    } else {
        path
    }
}

pub fn has_trailing_slash(path: &str) -> bool {
    path.len() > 1 && path.ends_with('/')
}

/// Split a normalized path into its non-empty segments.
pub fn split_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Join a child route path onto its parent.
///
/// Absolute child paths (starting with `/`) replace the parent prefix.
pub fn join_paths(parent: &str, child: &str) -> String {
    if child.starts_with('/') {
        return normalize_path(child);
    }
    if child.is_empty() {
        return normalize_path(parent);
    }
    normalize_path(&format!("{}/{}", parent, child))
}

/// Split a raw location into `(path, query, hash)`.
///
/// The query is returned without its `?` and the hash without its `#`.
pub fn split_location(raw: &str) -> (&str, &str, &str) {
    let (before_hash, hash) = match raw.find('#') {
        Some(idx) => (&raw[..idx], &raw[idx + 1..]),
        None => (raw, ""),
    };
    let (path, query) = match before_hash.find('?') {
        Some(idx) => (&before_hash[..idx], &before_hash[idx + 1..]),
        None => (before_hash, ""),
    };
    (path, query, hash)
}

/// Normalize a hash fragment to either `""` or `#fragment`.
pub fn normalize_hash(raw: &str) -> String {
    let fragment = raw.strip_prefix('#').unwrap_or(raw);
    if fragment.is_empty() {
        String::new()
    } else {
        format!("#{}", fragment)
    }
}

pub fn decode_segment(segment: &str) -> String {
    percent_decode_str(segment).decode_utf8_lossy().into_owned()
}

pub fn encode_segment(value: &str) -> String {
    utf8_percent_encode(value, SEGMENT).to_string()
}
