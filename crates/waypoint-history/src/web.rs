//! Browser-backed history, in path mode or fragment (`#/...`) mode

use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use url::Url;

use crate::adapter::{
    check_location, normalize_base, CommitOutcome, HistoryAdapter, HistoryListener, HistoryMode,
};
use crate::context::{BrowsingContext, ContextError, ContextEvent};
use crate::listeners::{ListenerSet, Subscription};
use crate::state::{ChangeKind, HistoryChange, HistoryState, NavigationDirection, ScrollPosition};
use crate::{HistoryError, Result};

struct Tracker {
    location: String,
    state: HistoryState,
}

struct WebInner {
    mode: HistoryMode,
    base: String,
    context: Arc<dyn BrowsingContext>,
    tracker: RwLock<Tracker>,
    listeners: ListenerSet<HistoryListener>,
    /// Location a silent traversal started from
    paused_at: Mutex<Option<String>>,
    context_subscription: Mutex<Option<Subscription>>,
}

impl WebInner {
    fn href_for(&self, location: &str) -> String {
        match self.mode {
            HistoryMode::Hash => format!("{}/#{}", self.base, location),
            _ => format!("{}{}", self.base, location),
        }
    }

    fn on_pop(&self, state: Option<HistoryState>) {
        let to = read_location(self.mode, &self.base, &self.context.href());
        let change = {
            let mut tracker = self.tracker.write();
            let from = std::mem::replace(&mut tracker.location, to.clone());
            let from_position = tracker.state.position;
            let state = state.unwrap_or_else(|| HistoryState::new(to.clone(), from_position + 1));
            let delta = state.position as i32 - from_position as i32;
            tracker.state = state;
            HistoryChange::pop(to, from, delta)
        };

        let silenced = {
            let mut paused_at = self.paused_at.lock();
            match paused_at.as_deref() {
                Some(origin) if origin == change.from => {
                    *paused_at = None;
                    true
                }
                _ => false,
            }
        };
        if silenced {
            tracing::debug!(to = %change.to, "Silent traversal applied");
            return;
        }

        tracing::debug!(from = %change.from, to = %change.to, delta = change.delta, "History traversal");
        self.notify(&change);
    }

    fn notify(&self, change: &HistoryChange) {
        for listener in self.listeners.snapshot() {
            listener(change);
        }
    }

    fn outcome(&self, result: std::result::Result<(), ContextError>, to: &str) -> Result<CommitOutcome> {
        match result {
            Ok(()) => Ok(CommitOutcome::Applied),
            Err(ContextError::Security(reason)) => {
                tracing::warn!(
                    location = %to,
                    reason = %reason,
                    "History mutation blocked; tracking location internally"
                );
                Ok(CommitOutcome::Degraded)
            }
            Err(ContextError::Failed(reason)) => Err(HistoryError::Backend(reason)),
        }
    }

    /// Stamp the current entry with where we are heading and the scroll offset we leave at.
    fn annotate_current(&self, forward: &str) -> Result<CommitOutcome> {
        let (location, mut state) = {
            let tracker = self.tracker.read();
            (tracker.location.clone(), tracker.state.clone())
        };
        state.forward = Some(forward.to_string());
        state.scroll = Some(self.context.scroll_position());

        let href = self.href_for(&location);
        let outcome = self.outcome(self.context.replace_state(&state, &href), &location)?;
        self.tracker.write().state = state;
        Ok(outcome)
    }

    fn commit(&self, kind: ChangeKind, to: &str, state: HistoryState) -> Result<CommitOutcome> {
        let href = self.href_for(to);
        let result = match kind {
            ChangeKind::Replace => self.context.replace_state(&state, &href),
            _ => self.context.push_state(&state, &href),
        };
        let outcome = self.outcome(result, to)?;

        let from = {
            let mut tracker = self.tracker.write();
            tracker.state = state;
            std::mem::replace(&mut tracker.location, to.to_string())
        };

        let (delta, direction) = match kind {
            ChangeKind::Push => (1, NavigationDirection::Forward),
            _ => (0, NavigationDirection::Unknown),
        };
        self.notify(&HistoryChange {
            kind,
            to: to.to_string(),
            from,
            delta,
            direction,
        });
        Ok(outcome)
    }
}

impl Drop for WebInner {
    fn drop(&mut self) {
        if let Some(subscription) = self.context_subscription.get_mut().take() {
            subscription.unsubscribe();
        }
    }
}

/// History backend over a host [`BrowsingContext`].
#[derive(Clone)]
pub struct WebHistory {
    inner: Arc<WebInner>,
}

impl WebHistory {
    /// Path-mode history; router locations live in the URL path.
    pub fn new(context: Arc<dyn BrowsingContext>, base: &str) -> Self {
        Self::with_mode(context, base, HistoryMode::History)
    }

    /// Fragment-mode history; router locations live after `#`.
    pub fn hash(context: Arc<dyn BrowsingContext>, base: &str) -> Self {
        Self::with_mode(context, base, HistoryMode::Hash)
    }

    fn with_mode(context: Arc<dyn BrowsingContext>, base: &str, mode: HistoryMode) -> Self {
        let base = normalize_base(base);
        let location = read_location(mode, &base, &context.href());

        let inner = Arc::new(WebInner {
            mode,
            base,
            context: Arc::clone(&context),
            tracker: RwLock::new(Tracker {
                location: location.clone(),
                state: HistoryState::new(location.clone(), 0),
            }),
            listeners: ListenerSet::new(),
            paused_at: Mutex::new(None),
            context_subscription: Mutex::new(None),
        });

        match context.history_state() {
            Some(state) => inner.tracker.write().state = state,
            None => {
                // Seed the host entry so later traversals carry positions
                let state = inner.tracker.read().state.clone();
                if let Err(err) = context.replace_state(&state, &inner.href_for(&location)) {
                    tracing::warn!(error = %err, "Could not seed initial history state");
                }
            }
        }

        let event = match mode {
            HistoryMode::Hash => ContextEvent::HashChange,
            _ => ContextEvent::PopState,
        };
        let weak: Weak<WebInner> = Arc::downgrade(&inner);
        let subscription = context.subscribe(
            event,
            Arc::new(move |state: Option<HistoryState>| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_pop(state);
                }
            }),
        );
        *inner.context_subscription.lock() = Some(subscription);

        tracing::debug!(mode = %mode, base = %inner.base, location = %location, "Web history ready");
        Self { inner }
    }
}

impl HistoryAdapter for WebHistory {
    fn mode(&self) -> HistoryMode {
        self.inner.mode
    }

    fn base(&self) -> &str {
        &self.inner.base
    }

    fn location(&self) -> String {
        self.inner.tracker.read().location.clone()
    }

    fn state(&self) -> HistoryState {
        self.inner.tracker.read().state.clone()
    }

    fn push(&self, to: &str) -> Result<CommitOutcome> {
        check_location(to)?;
        let annotated = self.inner.annotate_current(to)?;
        let next = self.inner.tracker.read().state.next(to);
        let outcome = self.inner.commit(ChangeKind::Push, to, next)?;
        Ok(match (annotated, outcome) {
            (CommitOutcome::Applied, CommitOutcome::Applied) => CommitOutcome::Applied,
            _ => CommitOutcome::Degraded,
        })
    }

    fn replace(&self, to: &str) -> Result<CommitOutcome> {
        check_location(to)?;
        let state = self.inner.tracker.read().state.replaced_by(to);
        self.inner.commit(ChangeKind::Replace, to, state)
    }

    fn go(&self, delta: i32, trigger_listeners: bool) -> Result<()> {
        if delta == 0 {
            return Ok(());
        }
        if !trigger_listeners {
            *self.inner.paused_at.lock() = Some(self.location());
        }

        match self.inner.context.go(delta) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.inner.paused_at.lock().take();
                match err {
                    ContextError::Security(reason) => {
                        tracing::warn!(delta, reason = %reason, "History traversal blocked");
                        Ok(())
                    }
                    ContextError::Failed(reason) => Err(HistoryError::Backend(reason)),
                }
            }
        }
    }

    fn listen(&self, listener: Arc<HistoryListener>) -> Subscription {
        self.inner.listeners.add(listener)
    }

    fn create_href(&self, location: &str) -> String {
        self.inner.href_for(location)
    }

    fn save_scroll(&self, position: ScrollPosition) {
        self.inner.tracker.write().state.scroll = Some(position);
    }

    fn scroll_position(&self) -> ScrollPosition {
        self.inner.context.scroll_position()
    }

    fn scroll_to(&self, position: ScrollPosition) {
        self.inner.context.scroll_to(position);
    }
}

/// Router-relative location currently shown by the host.
fn read_location(mode: HistoryMode, base: &str, href: &str) -> String {
    let url = match Url::parse(href) {
        Ok(url) => url,
        Err(err) => {
            tracing::warn!(href = %href, error = %err, "Unreadable host URL; assuming root");
            return "/".to_string();
        }
    };

    if mode == HistoryMode::Hash {
        let fragment = url.fragment().unwrap_or("");
        return if fragment.starts_with('/') {
            fragment.to_string()
        } else {
            format!("/{}", fragment)
        };
    }

    let mut location = strip_base(url.path(), base).to_string();
    if let Some(query) = url.query() {
        location.push('?');
        location.push_str(query);
    }
    if let Some(fragment) = url.fragment() {
        location.push('#');
        location.push_str(fragment);
    }
    location
}

fn strip_base<'a>(path: &'a str, base: &str) -> &'a str {
    if base.is_empty() {
        return path;
    }
    match path.strip_prefix(base) {
        Some("") => "/",
        Some(rest) if rest.starts_with('/') => rest,
        _ => path,
    }
}

/// Whether the host page was loaded from the local filesystem.
pub fn is_file_origin(href: &str) -> bool {
    Url::parse(href)
        .map(|url| url.scheme() == "file")
        .unwrap_or(false)
}
