//! Path matcher
//!
//! Resolution order for a path:
//! 1. exact static lookup
//! 2. first hit in the specificity-sorted list
//! 3. first catch-all record
//! 4. empty match
//!
//! The result depends only on the path and the table.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use waypoint_location::{
    build_full_path, has_trailing_slash, normalize_path, split_location, split_segments,
    trim_trailing_slash, Location, Params, Query, QueryCodec,
};

use crate::error::RouteError;
use crate::matched::MatchedRoute;
use crate::table::RouteTable;
use crate::Result;

/// How a trailing slash on the incoming path is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrailingSlash {
    /// `/users/` matches like `/users`
    #[default]
    Trim,
    /// Non-root paths must end with `/` to match anything
    Require,
}

#[derive(Debug, Clone)]
pub struct Matcher {
    table: Arc<RouteTable>,
    trailing_slash: TrailingSlash,
}

impl Matcher {
    pub fn new(table: RouteTable, trailing_slash: TrailingSlash) -> Self {
        Self {
            table: Arc::new(table),
            trailing_slash,
        }
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub fn trailing_slash(&self) -> TrailingSlash {
        self.trailing_slash
    }

    /// Match a path; any query or hash on it is ignored.
    pub fn match_path(&self, raw: &str) -> MatchedRoute {
        let (path, _, _) = split_location(raw);
        let normalized = normalize_path(path);

        let (lookup, display) = match self.trailing_slash {
            TrailingSlash::Trim => {
                let trimmed = trim_trailing_slash(&normalized).to_string();
                (trimmed.clone(), trimmed)
            }
            TrailingSlash::Require => {
                if normalized != "/" && !has_trailing_slash(&normalized) {
                    return MatchedRoute::unmatched(normalized);
                }
                (trim_trailing_slash(&normalized).to_string(), normalized)
            }
        };

        match self.find(&lookup) {
            Some((index, params)) => self.build_match(display, index, params),
            None => {
                tracing::trace!(path = %lookup, "No route matched");
                MatchedRoute::unmatched(display)
            }
        }
    }

    /// Match a parsed location, carrying its query and hash onto the result.
    pub fn resolve(&self, location: &Location, codec: &dyn QueryCodec) -> MatchedRoute {
        let mut route = self.match_path(&location.path);
        route.query = location.query.clone();
        route.hash = location.hash.clone();
        route.full_path = build_full_path(&route.path, &route.query, &route.hash, codec);
        route
    }

    /// Build the path of a named route from params.
    pub fn resolve_named(&self, name: &str, params: &Params) -> Result<String> {
        let entry = self
            .table
            .by_name(name)
            .ok_or_else(|| RouteError::UnknownName(name.to_string()))?;
        let path = entry.pattern.build(params, name)?;

        Ok(match self.trailing_slash {
            TrailingSlash::Require if path != "/" => format!("{}/", path),
            _ => path,
        })
    }

    fn find(&self, path: &str) -> Option<(usize, Params)> {
        let case_sensitive = self.table.case_sensitive();
        let key = if case_sensitive {
            path.to_string()
        } else {
            path.to_lowercase()
        };

        if let Some(entry) = self.table.exact(&key) {
            return Some((entry.index, Params::new()));
        }

        let segments = split_segments(path);

        self.table
            .sorted()
            .chain(self.table.catch_all())
            .find_map(|entry| {
                entry
                    .pattern
                    .match_segments(&segments, case_sensitive)
                    .map(|params| (entry.index, params))
            })
    }

    fn build_match(&self, path: String, index: usize, params: Params) -> MatchedRoute {
        let chain = self.table.chain(index);

        // Descendants override ancestors
        let mut meta = self.table.default_meta().clone();
        for entry in &chain {
            for (key, value) in &entry.meta {
                meta.insert(key.clone(), value.clone());
            }
        }

        MatchedRoute {
            full_path: path.clone(),
            path,
            name: chain.last().and_then(|e| e.name.clone()),
            params,
            query: Query::new(),
            hash: String::new(),
            matched: chain.iter().map(|e| e.to_matched()).collect(),
            meta,
        }
    }
}
