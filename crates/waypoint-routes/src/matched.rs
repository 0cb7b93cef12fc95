//! Match results handed to guards and published to the current-route cell

use serde::Serialize;

use waypoint_location::{Params, Query};

use crate::record::{ComponentRef, Meta};

/// One record in a matched chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedRecord {
    /// Index of the entry in the route table
    pub index: usize,
    /// Full resolved pattern of the entry
    pub path: String,
    pub name: Option<String>,
    pub component: Option<ComponentRef>,
    /// The entry's own meta (not merged)
    pub meta: Meta,
}

/// The resolved result of matching a location against the route table.
///
/// Built fresh for every navigation and shared behind an `Arc` once
/// published; nothing mutates it afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedRoute {
    pub path: String,
    pub full_path: String,
    pub name: Option<String>,
    pub params: Params,
    pub query: Query,
    /// Either empty or `#`-prefixed
    pub hash: String,
    /// Ancestor → leaf
    pub matched: Vec<MatchedRecord>,
    pub meta: Meta,
}

impl MatchedRoute {
    /// The route the router reports before its first navigation.
    pub fn start() -> Self {
        Self::unmatched("/".to_string())
    }

    pub fn unmatched(path: String) -> Self {
        Self {
            full_path: path.clone(),
            path,
            name: None,
            params: Params::new(),
            query: Query::new(),
            hash: String::new(),
            matched: Vec::new(),
            meta: Meta::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.matched.is_empty()
    }

    pub fn leaf(&self) -> Option<&MatchedRecord> {
        self.matched.last()
    }

    /// Record rendered at a given nesting depth (0 = outermost)
    pub fn at_depth(&self, depth: usize) -> Option<&MatchedRecord> {
        self.matched.get(depth)
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}
