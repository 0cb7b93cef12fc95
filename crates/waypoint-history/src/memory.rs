//! In-process history backend
//!
//! Used for tests and non-browser hosts. Push and replace notify listeners
//! synchronously; `go` clamps to the available entries.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::adapter::{
    check_location, normalize_base, CommitOutcome, HistoryAdapter, HistoryListener, HistoryMode,
};
use crate::listeners::{ListenerSet, Subscription};
use crate::state::{ChangeKind, HistoryChange, HistoryState, NavigationDirection, ScrollPosition};
use crate::Result;

#[derive(Debug, Clone)]
pub struct MemoryEntry {
    pub location: String,
    pub state: HistoryState,
    pub visited_at: DateTime<Utc>,
}

impl MemoryEntry {
    fn new(state: HistoryState) -> Self {
        Self {
            location: state.current.clone(),
            state,
            visited_at: Utc::now(),
        }
    }
}

struct MemoryStack {
    entries: Vec<MemoryEntry>,
    position: usize,
    scroll: ScrollPosition,
}

impl MemoryStack {
    fn current(&self) -> &MemoryEntry {
        &self.entries[self.position]
    }
}

pub struct MemoryHistory {
    base: String,
    stack: Arc<RwLock<MemoryStack>>,
    listeners: ListenerSet<HistoryListener>,
}

impl MemoryHistory {
    pub fn new(base: &str) -> Self {
        Self::with_initial(base, "/")
    }

    /// Start with a single entry at `initial`.
    pub fn with_initial(base: &str, initial: &str) -> Self {
        let initial = if initial.starts_with('/') {
            initial.to_string()
        } else {
            format!("/{}", initial)
        };

        Self {
            base: normalize_base(base),
            stack: Arc::new(RwLock::new(MemoryStack {
                entries: vec![MemoryEntry::new(HistoryState::new(initial, 0))],
                position: 0,
                scroll: ScrollPosition::default(),
            })),
            listeners: ListenerSet::new(),
        }
    }

    pub fn entries(&self) -> Vec<MemoryEntry> {
        self.stack.read().entries.clone()
    }

    pub fn position(&self) -> usize {
        self.stack.read().position
    }

    fn notify(&self, change: HistoryChange) {
        for listener in self.listeners.snapshot() {
            listener(&change);
        }
    }
}

impl Clone for MemoryHistory {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            stack: Arc::clone(&self.stack),
            listeners: self.listeners.clone(),
        }
    }
}

impl HistoryAdapter for MemoryHistory {
    fn mode(&self) -> HistoryMode {
        HistoryMode::Memory
    }

    fn base(&self) -> &str {
        &self.base
    }

    fn location(&self) -> String {
        self.stack.read().current().location.clone()
    }

    fn state(&self) -> HistoryState {
        self.stack.read().current().state.clone()
    }

    fn push(&self, to: &str) -> Result<CommitOutcome> {
        check_location(to)?;

        let from = {
            let mut stack = self.stack.write();
            let position = stack.position;
            stack.entries.truncate(position + 1);

            let current = &mut stack.entries[position];
            current.state.forward = Some(to.to_string());
            let from = current.location.clone();
            let state = current.state.next(to);

            stack.entries.push(MemoryEntry::new(state));
            stack.position = position + 1;
            from
        };

        tracing::trace!(from = %from, to = %to, "Memory history push");
        self.notify(HistoryChange {
            kind: ChangeKind::Push,
            to: to.to_string(),
            from,
            delta: 1,
            direction: NavigationDirection::Forward,
        });
        Ok(CommitOutcome::Applied)
    }

    fn replace(&self, to: &str) -> Result<CommitOutcome> {
        check_location(to)?;

        let from = {
            let mut stack = self.stack.write();
            let position = stack.position;
            let current = &stack.entries[position];
            let from = current.location.clone();
            let state = current.state.replaced_by(to);
            stack.entries[position] = MemoryEntry::new(state);
            from
        };

        self.notify(HistoryChange {
            kind: ChangeKind::Replace,
            to: to.to_string(),
            from,
            delta: 0,
            direction: NavigationDirection::Unknown,
        });
        Ok(CommitOutcome::Applied)
    }

    fn go(&self, delta: i32, trigger_listeners: bool) -> Result<()> {
        let change = {
            let mut stack = self.stack.write();
            let last = stack.entries.len() as i64 - 1;
            let target = (stack.position as i64 + delta as i64).clamp(0, last) as usize;
            if target == stack.position {
                return Ok(());
            }

            let from = stack.current().location.clone();
            let applied = target as i32 - stack.position as i32;
            stack.position = target;
            HistoryChange::pop(stack.current().location.clone(), from, applied)
        };

        if trigger_listeners {
            self.notify(change);
        }
        Ok(())
    }

    fn listen(&self, listener: Arc<HistoryListener>) -> Subscription {
        self.listeners.add(listener)
    }

    fn save_scroll(&self, position: ScrollPosition) {
        let mut stack = self.stack.write();
        let index = stack.position;
        stack.entries[index].state.scroll = Some(position);
    }

    fn scroll_position(&self) -> ScrollPosition {
        self.stack.read().scroll
    }

    fn scroll_to(&self, position: ScrollPosition) {
        self.stack.write().scroll = position;
    }
}
