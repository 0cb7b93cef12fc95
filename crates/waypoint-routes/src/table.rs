//! Route table builder
//!
//! Flattens the nested record tree into an index-addressed list where each
//! entry points at its parent, then derives two lookup structures once:
//! - an exact-path map for fully static entries
//! - a specificity-sorted list for ordered fallback scanning
//!
//! Pure catch-all entries are kept apart and only tried when nothing else
//! matched.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use waypoint_location::{join_paths, trim_trailing_slash};

use crate::error::RouteError;
use crate::guard::Guard;
use crate::matched::MatchedRecord;
use crate::pattern::PathPattern;
use crate::record::{ComponentRef, Meta, RouteRecord};
use crate::Result;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableOptions {
    /// Compare static segments case-sensitively
    #[serde(default)]
    pub case_sensitive: bool,
    /// Meta merged beneath every route's own meta
    #[serde(default)]
    pub default_meta: Meta,
}

/// A flattened route record.
#[derive(Debug, Clone)]
pub struct RouteEntry {
    pub index: usize,
    pub parent: Option<usize>,
    pub depth: usize,
    /// Full resolved path pattern, normalized
    pub path: String,
    pub pattern: PathPattern,
    pub name: Option<String>,
    pub component: Option<ComponentRef>,
    pub meta: Meta,
    pub before_enter: Vec<Guard>,
}

impl RouteEntry {
    pub fn to_matched(&self) -> MatchedRecord {
        MatchedRecord {
            index: self.index,
            path: self.path.clone(),
            name: self.name.clone(),
            component: self.component.clone(),
            meta: self.meta.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
    exact: HashMap<String, usize>,
    sorted: Vec<usize>,
    catch_all: Vec<usize>,
    names: HashMap<String, usize>,
    options: TableOptions,
}

impl RouteTable {
    pub fn build(records: &[RouteRecord], options: TableOptions) -> Result<Self> {
        let mut entries = Vec::new();
        flatten(records, None, "/", 0, &mut entries)?;

        let mut names = HashMap::new();
        for entry in &entries {
            if let Some(name) = &entry.name {
                if names.insert(name.clone(), entry.index).is_some() {
                    return Err(RouteError::DuplicateName(name.clone()));
                }
            }
        }

        let mut exact: HashMap<String, usize> = HashMap::new();
        for entry in &entries {
            let Some(key) = entry.pattern.static_key(options.case_sensitive) else {
                continue;
            };
            match exact.get(&key).map(|&idx| &entries[idx]) {
                None => {
                    exact.insert(key, entry.index);
                }
                // An index child shares its parent's path and should win
                Some(existing) if entry.depth > existing.depth => {
                    exact.insert(key, entry.index);
                }
                Some(existing) if entry.depth == existing.depth => {
                    tracing::warn!(
                        path = %entry.path,
                        kept = existing.index,
                        ignored = entry.index,
                        "Duplicate static route path; keeping the first registered"
                    );
                }
                Some(_) => {}
            }
        }

        let mut sorted: Vec<usize> = entries
            .iter()
            .filter(|e| !e.pattern.is_catch_all())
            .map(|e| e.index)
            .collect();
        sorted.sort_by(|&a, &b| compare_specificity(&entries[a], &entries[b]));

        let catch_all = entries
            .iter()
            .filter(|e| e.pattern.is_catch_all())
            .map(|e| e.index)
            .collect();

        tracing::debug!(
            routes = entries.len(),
            exact = exact.len(),
            "Built route table"
        );

        Ok(Self {
            entries,
            exact,
            sorted,
            catch_all,
            names,
            options,
        })
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> Option<&RouteEntry> {
        self.entries.get(index)
    }

    pub fn by_name(&self, name: &str) -> Option<&RouteEntry> {
        self.names.get(name).and_then(|&idx| self.entries.get(idx))
    }

    /// Exact lookup; `key` must already be case-folded if the table is case-insensitive.
    pub fn exact(&self, key: &str) -> Option<&RouteEntry> {
        self.exact.get(key).and_then(|&idx| self.entries.get(idx))
    }

    pub fn sorted(&self) -> impl Iterator<Item = &RouteEntry> {
        self.sorted.iter().filter_map(|&idx| self.entries.get(idx))
    }

    pub fn catch_all(&self) -> impl Iterator<Item = &RouteEntry> {
        self.catch_all.iter().filter_map(|&idx| self.entries.get(idx))
    }

    /// Entry and its ancestors, outermost first.
    pub fn chain(&self, index: usize) -> Vec<&RouteEntry> {
        let mut chain = Vec::new();
        let mut cursor = self.entries.get(index);
        while let Some(entry) = cursor {
            chain.push(entry);
            cursor = entry.parent.and_then(|p| self.entries.get(p));
        }
        chain.reverse();
        chain
    }

    pub fn case_sensitive(&self) -> bool {
        self.options.case_sensitive
    }

    pub fn default_meta(&self) -> &Meta {
        &self.options.default_meta
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn flatten(
    records: &[RouteRecord],
    parent: Option<usize>,
    parent_path: &str,
    depth: usize,
    entries: &mut Vec<RouteEntry>,
) -> Result<()> {
    for record in records {
        let joined = join_paths(parent_path, &record.path);
        let path = trim_trailing_slash(&joined).to_string();
        let pattern = PathPattern::parse(&path)?;
        let index = entries.len();

        entries.push(RouteEntry {
            index,
            parent,
            depth,
            path: path.clone(),
            pattern,
            name: record.name.clone(),
            component: record.component.clone(),
            meta: record.meta.clone(),
            before_enter: record.before_enter.clone(),
        });

        flatten(&record.children, Some(index), &path, depth + 1, entries)?;
    }
    Ok(())
}

/// Ordering used for the fallback scan:
/// 1. wildcard routes last
/// 2. more segments first
/// 3. fully static before dynamic
/// 4. fewer dynamic segments first
/// 5. longer literal path first
///
/// Remaining ties prefer the deeper entry, so an index child beats its parent.
fn compare_specificity(a: &RouteEntry, b: &RouteEntry) -> Ordering {
    let (pa, pb) = (&a.pattern, &b.pattern);
    pa.has_wildcard()
        .cmp(&pb.has_wildcard())
        .then_with(|| pb.segment_count().cmp(&pa.segment_count()))
        .then_with(|| (!pa.is_static()).cmp(&!pb.is_static()))
        .then_with(|| pa.dynamic_count().cmp(&pb.dynamic_count()))
        .then_with(|| b.path.len().cmp(&a.path.len()))
        .then_with(|| b.depth.cmp(&a.depth))
}
