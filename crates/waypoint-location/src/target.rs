//! Locations and navigation targets

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::path::{normalize_hash, normalize_path, split_location};
use crate::query::{Query, QueryCodec, QueryValue};

/// Path params keyed by name.
pub type Params = BTreeMap<String, String>;

/// A concrete location split into path, parsed query and hash.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Location {
    pub path: String,
    pub query: Query,
    /// Either empty or `#`-prefixed
    pub hash: String,
}

impl Location {
    pub fn parse(raw: &str, codec: &dyn QueryCodec) -> Self {
        let (path, query, hash) = split_location(raw.trim());
        Self {
            path: normalize_path(path),
            query: codec.parse(query),
            hash: normalize_hash(hash),
        }
    }

    pub fn full_path(&self, codec: &dyn QueryCodec) -> String {
        build_full_path(&self.path, &self.query, &self.hash, codec)
    }
}

/// Join path, serialized query and hash into `path?query#hash`.
pub fn build_full_path(path: &str, query: &Query, hash: &str, codec: &dyn QueryCodec) -> String {
    let query = codec.stringify(query);
    let mut full = String::with_capacity(path.len() + query.len() + hash.len() + 1);
    full.push_str(path);
    if !query.is_empty() {
        full.push('?');
        full.push_str(&query);
    }
    full.push_str(hash);
    full
}

/// A location-like value: where a caller, or a redirecting guard, wants to go.
///
/// Either `path` or `name` identifies the destination. A path may embed its
/// own `?query#hash`; explicit `query`/`hash`/`params` set here win over
/// anything parsed out of it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NavigationTarget {
    pub path: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub params: Params,
    #[serde(default)]
    pub query: Query,
    pub hash: Option<String>,
}

impl NavigationTarget {
    pub fn path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }
}

impl fmt::Display for NavigationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.name, &self.path) {
            (Some(name), _) => write!(f, "route '{}'", name),
            (None, Some(path)) => write!(f, "{}", path),
            (None, None) => write!(f, "<current>"),
        }
    }
}

impl From<&str> for NavigationTarget {
    fn from(path: &str) -> Self {
        Self::path(path)
    }
}

impl From<String> for NavigationTarget {
    fn from(path: String) -> Self {
        Self::path(path)
    }
}

impl From<&String> for NavigationTarget {
    fn from(path: &String) -> Self {
        Self::path(path.clone())
    }
}
