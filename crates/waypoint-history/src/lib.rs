//! Waypoint History - location backends
//!
//! Provides:
//! - The [`HistoryAdapter`] trait the router commits through
//! - [`WebHistory`] over a host [`BrowsingContext`], in path or hash mode
//! - [`MemoryHistory`] for tests and non-browser hosts

mod adapter;
mod context;
mod error;
mod listeners;
mod memory;
mod state;
mod web;

use std::sync::Arc;

pub use adapter::{normalize_base, CommitOutcome, HistoryAdapter, HistoryListener, HistoryMode};
pub use context::{BrowsingContext, ContextError, ContextEvent, ContextListener};
pub use error::HistoryError;
pub use listeners::{ListenerSet, Subscription};
pub use memory::{MemoryEntry, MemoryHistory};
pub use state::{ChangeKind, HistoryChange, HistoryState, NavigationDirection, ScrollPosition};
pub use web::{is_file_origin, WebHistory};

pub type Result<T> = std::result::Result<T, HistoryError>;

/// Build the backend for `mode`.
///
/// Path-mode history on a `file:` page cannot address routes through the
/// URL path, so it falls back to hash mode.
pub fn create_history(
    mode: HistoryMode,
    base: &str,
    context: Option<Arc<dyn BrowsingContext>>,
) -> Result<Arc<dyn HistoryAdapter>> {
    if mode == HistoryMode::Memory {
        return Ok(Arc::new(MemoryHistory::new(base)));
    }

    let context = context.ok_or(HistoryError::MissingContext(mode))?;
    if mode == HistoryMode::History && is_file_origin(&context.href()) {
        tracing::info!("Page loaded from file: origin, using hash history");
        return Ok(Arc::new(WebHistory::hash(context, base)));
    }

    Ok(match mode {
        HistoryMode::Hash => Arc::new(WebHistory::hash(context, base)),
        _ => Arc::new(WebHistory::new(context, base)),
    })
}
