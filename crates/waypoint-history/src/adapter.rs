//! The uniform history backend interface

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use waypoint_location::{normalize_path, trim_trailing_slash};

use crate::listeners::Subscription;
use crate::state::{HistoryChange, HistoryState, ScrollPosition};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryMode {
    #[default]
    History,
    Hash,
    Memory,
}

impl HistoryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryMode::History => "history",
            HistoryMode::Hash => "hash",
            HistoryMode::Memory => "memory",
        }
    }
}

impl fmt::Display for HistoryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistoryMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "history" | "web" => Ok(HistoryMode::History),
            "hash" => Ok(HistoryMode::Hash),
            "memory" => Ok(HistoryMode::Memory),
            _ => Err(format!("Unknown history mode: {}", s)),
        }
    }
}

/// Whether a push/replace reached the real backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Applied,
    /// The host refused the mutation; only the internal tracker moved
    Degraded,
}

pub type HistoryListener = dyn Fn(&HistoryChange) + Send + Sync;

/// A location store the router commits to.
///
/// Locations are router-relative full paths (`/users/1?tab=a#top`); `base`
/// is only applied when producing hrefs.
pub trait HistoryAdapter: Send + Sync {
    fn mode(&self) -> HistoryMode;

    /// Normalized base, `""` for the root.
    fn base(&self) -> &str;

    fn location(&self) -> String;

    fn state(&self) -> HistoryState;

    fn push(&self, to: &str) -> Result<CommitOutcome>;

    fn replace(&self, to: &str) -> Result<CommitOutcome>;

    /// Traverse the session stack. With `trigger_listeners == false` the
    /// resulting change is applied silently.
    fn go(&self, delta: i32, trigger_listeners: bool) -> Result<()>;

    fn listen(&self, listener: Arc<HistoryListener>) -> Subscription;

    fn create_href(&self, location: &str) -> String {
        format!("{}{}", self.base(), location)
    }

    /// Record `position` on the current entry.
    fn save_scroll(&self, position: ScrollPosition);

    fn scroll_position(&self) -> ScrollPosition;

    fn scroll_to(&self, position: ScrollPosition);
}

/// `"/app/"` → `"/app"`, `"/"` and `""` → `""`.
pub fn normalize_base(base: &str) -> String {
    let base = base.trim();
    if base.is_empty() {
        return String::new();
    }
    let normalized = normalize_path(base);
    let trimmed = trim_trailing_slash(&normalized);
    if trimmed == "/" {
        String::new()
    } else {
        trimmed.to_string()
    }
}

/// Reject anything that is not a router-relative absolute path.
pub(crate) fn check_location(location: &str) -> Result<()> {
    if location.starts_with('/') {
        Ok(())
    } else {
        Err(crate::HistoryError::InvalidLocation(location.to_string()))
    }
}
