//! Bridge to the host's native session history

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::listeners::Subscription;
use crate::state::{HistoryState, ScrollPosition};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// The host refused the call (sandboxed frame, opaque origin, ...)
    #[error("Blocked by the host: {0}")]
    Security(String),

    #[error("{0}")]
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextEvent {
    PopState,
    HashChange,
}

impl fmt::Display for ContextEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextEvent::PopState => f.write_str("popstate"),
            ContextEvent::HashChange => f.write_str("hashchange"),
        }
    }
}

/// Receives the state of the entry the host moved to, if it has one.
pub type ContextListener = dyn Fn(Option<HistoryState>) + Send + Sync;

/// Native history as exposed by the embedding host.
pub trait BrowsingContext: Send + Sync {
    /// Absolute URL currently shown, e.g. `https://example.com/app/users?x=1`.
    fn href(&self) -> String;

    fn history_state(&self) -> Option<HistoryState>;

    fn push_state(&self, state: &HistoryState, url: &str) -> Result<(), ContextError>;

    fn replace_state(&self, state: &HistoryState, url: &str) -> Result<(), ContextError>;

    fn go(&self, delta: i32) -> Result<(), ContextError>;

    fn subscribe(&self, event: ContextEvent, listener: Arc<ContextListener>) -> Subscription;

    fn scroll_position(&self) -> ScrollPosition {
        ScrollPosition::default()
    }

    fn scroll_to(&self, _position: ScrollPosition) {}
}
