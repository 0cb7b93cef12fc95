//! Navigation controller
//!
//! Every push, replace and traversal becomes a [`NavigationTransaction`]:
//! resolve the target, run the guard pipeline, then commit to history and
//! the current-route cell. Each transaction takes a sequence number when it
//! starts; only the newest one may commit.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use waypoint_history::{
    create_history, BrowsingContext, CommitOutcome, HistoryAdapter, HistoryChange, HistoryMode,
    MemoryHistory, ScrollPosition, Subscription,
};
use waypoint_location::{
    normalize_hash, DefaultQueryCodec, Location, NavigationTarget, Query, QueryCodec,
};
use waypoint_routes::{Guard, GuardError, MatchedRoute, Matcher, RouteRecord, RouteTable, Verdict};

use crate::cell::{ChangeListener, RouteCell, SignalCell};
use crate::config::RouterConfig;
use crate::error::RouterError;
use crate::pipeline::{run_after_hooks, GuardPipeline};
use crate::transaction::{NavigationKind, NavigationTransaction, TransactionStatus};
use crate::Result;

/// Picks the scroll offset after a commit. `saved` is the offset recorded
/// on the entry a traversal landed on.
pub type ScrollBehavior = dyn Fn(&MatchedRoute, &MatchedRoute, Option<ScrollPosition>) -> Option<ScrollPosition>
    + Send
    + Sync;

/// A target resolved without navigating.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub href: String,
    pub route: MatchedRoute,
}

struct RouterInner {
    config: RouterConfig,
    matcher: Matcher,
    history: Arc<dyn HistoryAdapter>,
    codec: Arc<dyn QueryCodec>,
    cell: Arc<dyn RouteCell>,
    pipeline: GuardPipeline,
    scroll_behavior: Option<Arc<ScrollBehavior>>,
    sequence: AtomicU64,
    /// Sequence of the last transaction that committed
    committed: AtomicU64,
    commit_lock: Mutex<()>,
    /// Set while `go` is inside the backend call
    traversing: AtomicBool,
    /// Traversal reported during `go`, handled on the caller's future
    pending_pop: Mutex<Option<HistoryChange>>,
    history_subscription: Mutex<Option<Subscription>>,
}

impl Drop for RouterInner {
    fn drop(&mut self) {
        if let Some(subscription) = self.history_subscription.get_mut().take() {
            subscription.unsubscribe();
        }
    }
}

/// Cheaply clonable handle to one router instance.
#[derive(Clone)]
pub struct Router {
    inner: Arc<RouterInner>,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::default()
    }

    pub fn config(&self) -> &RouterConfig {
        &self.inner.config
    }

    pub fn matcher(&self) -> &Matcher {
        &self.inner.matcher
    }

    pub fn history(&self) -> &Arc<dyn HistoryAdapter> {
        &self.inner.history
    }

    pub fn current_route(&self) -> Arc<MatchedRoute> {
        self.inner.cell.get()
    }

    /// Initial navigation to wherever the history backend currently points.
    pub async fn start(&self) -> Result<Arc<MatchedRoute>> {
        let location = self.inner.history.location();
        tracing::info!(location = %location, mode = %self.inner.history.mode(), "Starting router");
        self.replace(location).await
    }

    pub async fn push(&self, target: impl Into<NavigationTarget>) -> Result<Arc<MatchedRoute>> {
        self.navigate(target.into(), NavigationKind::Push).await
    }

    pub async fn replace(&self, target: impl Into<NavigationTarget>) -> Result<Arc<MatchedRoute>> {
        self.navigate(target.into(), NavigationKind::Replace).await
    }

    /// Traverse history by `delta` entries.
    ///
    /// When the backend reports the move synchronously, the resulting
    /// navigation runs on this future and its error is returned. Hosts that
    /// report later are handled on the ambient tokio runtime.
    pub async fn go(&self, delta: i32) -> Result<()> {
        if delta == 0 {
            return Ok(());
        }

        self.inner.pending_pop.lock().take();
        self.inner.traversing.store(true, Ordering::SeqCst);
        let moved = self.inner.history.go(delta, true);
        self.inner.traversing.store(false, Ordering::SeqCst);
        moved?;

        let pending = self.inner.pending_pop.lock().take();
        match pending {
            Some(change) => self.handle_pop(change).await.map(|_| ()),
            None => Ok(()),
        }
    }

    pub async fn back(&self) -> Result<()> {
        self.go(-1).await
    }

    pub async fn forward(&self) -> Result<()> {
        self.go(1).await
    }

    pub fn before_each(&self, guard: Guard) -> Subscription {
        self.inner.pipeline.add_before_each(guard)
    }

    pub fn before_resolve(&self, guard: Guard) -> Subscription {
        self.inner.pipeline.add_before_resolve(guard)
    }

    pub fn after_each<F>(&self, hook: F) -> Subscription
    where
        F: Fn(&MatchedRoute, &MatchedRoute) -> std::result::Result<(), GuardError>
            + Send
            + Sync
            + 'static,
    {
        self.inner.pipeline.add_after_each(Arc::new(hook))
    }

    /// Call `listener` with the current route now and after every commit.
    pub fn on_change<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Arc<MatchedRoute>) + Send + Sync + 'static,
    {
        let listener: Arc<ChangeListener> = Arc::new(listener);
        listener(&self.current_route());
        self.inner.cell.subscribe(listener)
    }

    pub fn resolve(&self, target: impl Into<NavigationTarget>) -> Result<Resolved> {
        let route = self.resolve_target(&target.into())?;
        Ok(Resolved {
            href: self.inner.history.create_href(&route.full_path),
            route,
        })
    }

    fn resolve_target(&self, target: &NavigationTarget) -> Result<MatchedRoute> {
        let codec = self.inner.codec.as_ref();
        let matcher = &self.inner.matcher;

        let mut location = match (&target.name, &target.path) {
            (Some(name), _) => bare_location(matcher.resolve_named(name, &target.params)?),
            (None, Some(path)) => Location::parse(path, codec),
            // Params or query only: stay on the current route
            (None, None) => {
                let current = self.current_route();
                match &current.name {
                    Some(name) if !target.params.is_empty() => {
                        let mut params = current.params.clone();
                        params.extend(target.params.clone());
                        bare_location(matcher.resolve_named(name, &params)?)
                    }
                    _ => bare_location(current.path.clone()),
                }
            }
        };

        for (key, value) in &target.query {
            location.query.insert(key.clone(), value.clone());
        }
        if let Some(hash) = &target.hash {
            location.hash = normalize_hash(hash);
        }

        let mut route = matcher.resolve(&location, codec);
        if target.name.is_none() && target.path.is_some() && !route.is_empty() {
            route.params.extend(target.params.clone());
        }
        Ok(route)
    }

    async fn navigate(
        &self,
        target: NavigationTarget,
        kind: NavigationKind,
    ) -> Result<Arc<MatchedRoute>> {
        let sequence = self.next_sequence();
        self.run_navigation(sequence, target, kind).await
    }

    fn next_sequence(&self) -> u64 {
        self.inner.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn run_navigation(
        &self,
        sequence: u64,
        target: NavigationTarget,
        kind: NavigationKind,
    ) -> Result<Arc<MatchedRoute>> {
        let mut tx = NavigationTransaction::new(sequence, kind, target);
        tracing::debug!(sequence, target = %tx.target, kind = ?kind, "Navigation started");

        loop {
            let to = match self.resolve_target(&tx.target) {
                Ok(route) => Arc::new(route),
                Err(err) => {
                    tx.transition(TransactionStatus::Failed)?;
                    return Err(err);
                }
            };
            if to.is_empty() {
                tx.transition(TransactionStatus::Failed)?;
                tracing::debug!(path = %to.full_path, "No route matched");
                return Err(RouterError::NoRouteMatched(to.full_path.clone()));
            }

            let from = self.current_route();
            let guards = self.inner.pipeline.collect(&to, self.inner.matcher.table());
            let verdict = self
                .inner
                .pipeline
                .run(guards, Arc::clone(&to), Arc::clone(&from))
                .await;

            match verdict {
                Verdict::Continue => return self.commit(&mut tx, to, from),
                Verdict::Abort => {
                    tx.transition(TransactionStatus::Aborted)?;
                    tracing::info!(to = %to.full_path, from = %from.full_path, "Navigation aborted");
                    return Err(RouterError::Aborted(to.full_path.clone()));
                }
                Verdict::Redirect(next) => {
                    tracing::debug!(
                        from = %to.full_path,
                        to = %next,
                        count = tx.redirect_count + 1,
                        "Navigation redirected"
                    );
                    if let Err(err) = tx.redirect(next, self.inner.config.max_redirects) {
                        tracing::warn!(error = %err, sequence, "Giving up on navigation");
                        return Err(err);
                    }
                }
            }
        }
    }

    fn commit(
        &self,
        tx: &mut NavigationTransaction,
        to: Arc<MatchedRoute>,
        from: Arc<MatchedRoute>,
    ) -> Result<Arc<MatchedRoute>> {
        let history = &self.inner.history;

        let saved_scroll = {
            let _commit = self.inner.commit_lock.lock();
            if self.inner.sequence.load(Ordering::SeqCst) != tx.sequence {
                tx.transition(TransactionStatus::Failed)?;
                tracing::debug!(sequence = tx.sequence, to = %to.full_path, "Navigation superseded");
                return Err(RouterError::Superseded);
            }

            let written = match tx.kind {
                NavigationKind::Push => {
                    history.save_scroll(history.scroll_position());
                    history.push(&to.full_path).map(Some)
                }
                NavigationKind::Replace => history.replace(&to.full_path).map(Some),
                NavigationKind::Pop { .. } => Ok(None),
            };
            match written {
                Ok(Some(CommitOutcome::Degraded)) => {
                    tracing::debug!(path = %to.full_path, "Committed without touching host history");
                }
                Ok(_) => {}
                Err(err) => {
                    tx.transition(TransactionStatus::Failed)?;
                    return Err(err.into());
                }
            }

            self.inner.cell.set(Arc::clone(&to));
            tx.transition(TransactionStatus::Committed)?;
            self.inner.committed.store(tx.sequence, Ordering::SeqCst);

            match tx.kind {
                NavigationKind::Pop { .. } => history.state().scroll,
                _ => None,
            }
        };

        tracing::info!(
            path = %to.full_path,
            route = to.name.as_deref().unwrap_or(""),
            sequence = tx.sequence,
            redirects = tx.redirect_count,
            elapsed_ms = tx.elapsed_ms(),
            "Navigation committed"
        );

        self.dispatch_after_hooks(Arc::clone(&to), Arc::clone(&from));
        self.apply_scroll(&to, &from, saved_scroll);
        Ok(to)
    }

    /// Hooks run on the ambient runtime so they never delay the navigation.
    fn dispatch_after_hooks(&self, to: Arc<MatchedRoute>, from: Arc<MatchedRoute>) {
        let hooks = self.inner.pipeline.after_hooks();
        if hooks.is_empty() {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { run_after_hooks(&hooks, &to, &from) });
            }
            Err(_) => run_after_hooks(&hooks, &to, &from),
        }
    }

    fn apply_scroll(&self, to: &MatchedRoute, from: &MatchedRoute, saved: Option<ScrollPosition>) {
        let Some(behavior) = &self.inner.scroll_behavior else {
            return;
        };
        if let Some(position) = behavior(to, from, saved) {
            self.inner.history.scroll_to(position);
        }
    }

    fn on_history_change(&self, change: &HistoryChange) {
        // Push/replace notifications echo our own commits
        if !change.is_traversal() {
            return;
        }

        if self.inner.traversing.load(Ordering::SeqCst) {
            *self.inner.pending_pop.lock() = Some(change.clone());
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let router = self.clone();
                let change = change.clone();
                handle.spawn(async move {
                    let _ = router.handle_pop(change).await;
                });
            }
            Err(_) => {
                tracing::warn!(to = %change.to, "No async runtime; history traversal ignored");
            }
        }
    }

    async fn handle_pop(&self, change: HistoryChange) -> Result<Arc<MatchedRoute>> {
        let kind = NavigationKind::Pop {
            delta: change.delta,
        };
        let sequence = self.next_sequence();
        let result = self
            .run_navigation(sequence, NavigationTarget::from(change.to.as_str()), kind)
            .await;

        let rejected = match &result {
            Ok(_) => false,
            // Only a newer commit owns the location the traversal moved to
            Err(RouterError::Superseded) => self.inner.committed.load(Ordering::SeqCst) < sequence,
            Err(_) => true,
        };
        if rejected {
            if let Err(err) = &result {
                tracing::info!(error = %err, delta = change.delta, "Reverting rejected traversal");
            }
            if let Err(revert) = self.inner.history.go(-change.delta, false) {
                tracing::warn!(error = %revert, "Could not revert traversal");
            }
        }
        result
    }
}

fn bare_location(path: String) -> Location {
    Location {
        path,
        query: Query::new(),
        hash: String::new(),
    }
}

#[derive(Default)]
pub struct RouterBuilder {
    routes: Vec<RouteRecord>,
    config: RouterConfig,
    history: Option<Arc<dyn HistoryAdapter>>,
    context: Option<Arc<dyn BrowsingContext>>,
    codec: Option<Arc<dyn QueryCodec>>,
    scroll_behavior: Option<Arc<ScrollBehavior>>,
    cell: Option<Arc<dyn RouteCell>>,
}

impl RouterBuilder {
    pub fn routes(mut self, routes: Vec<RouteRecord>) -> Self {
        self.routes.extend(routes);
        self
    }

    pub fn route(mut self, route: RouteRecord) -> Self {
        self.routes.push(route);
        self
    }

    pub fn config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    /// Use this backend instead of building one from the config.
    pub fn history(mut self, history: Arc<dyn HistoryAdapter>) -> Self {
        self.history = Some(history);
        self
    }

    /// Host bridge for history and hash modes.
    pub fn context(mut self, context: Arc<dyn BrowsingContext>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn query_codec(mut self, codec: Arc<dyn QueryCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn scroll_behavior<F>(mut self, behavior: F) -> Self
    where
        F: Fn(&MatchedRoute, &MatchedRoute, Option<ScrollPosition>) -> Option<ScrollPosition>
            + Send
            + Sync
            + 'static,
    {
        self.scroll_behavior = Some(Arc::new(behavior));
        self
    }

    pub fn route_cell(mut self, cell: Arc<dyn RouteCell>) -> Self {
        self.cell = Some(cell);
        self
    }

    pub fn build(self) -> Result<Router> {
        self.config.validate()?;

        let table = RouteTable::build(&self.routes, self.config.table_options())?;
        let matcher = Matcher::new(table, self.config.trailing_slash);

        let history: Arc<dyn HistoryAdapter> = match self.history {
            Some(history) => history,
            None if self.config.mode == HistoryMode::Memory => {
                let initial = self.config.initial_location.as_deref().unwrap_or("/");
                Arc::new(MemoryHistory::with_initial(&self.config.base, initial))
            }
            None => create_history(self.config.mode, &self.config.base, self.context)?,
        };

        let codec = self
            .codec
            .unwrap_or_else(|| Arc::new(DefaultQueryCodec) as Arc<dyn QueryCodec>);
        let cell = self
            .cell
            .unwrap_or_else(|| Arc::new(SignalCell::default()) as Arc<dyn RouteCell>);

        let inner = Arc::new(RouterInner {
            config: self.config,
            matcher,
            history,
            codec,
            cell,
            pipeline: GuardPipeline::new(),
            scroll_behavior: self.scroll_behavior,
            sequence: AtomicU64::new(0),
            committed: AtomicU64::new(0),
            commit_lock: Mutex::new(()),
            traversing: AtomicBool::new(false),
            pending_pop: Mutex::new(None),
            history_subscription: Mutex::new(None),
        });

        let weak: Weak<RouterInner> = Arc::downgrade(&inner);
        let subscription = inner
            .history
            .listen(Arc::new(move |change: &HistoryChange| {
                if let Some(inner) = weak.upgrade() {
                    Router { inner }.on_history_change(change);
                }
            }));
        *inner.history_subscription.lock() = Some(subscription);

        tracing::info!(
            routes = inner.matcher.table().len(),
            mode = %inner.history.mode(),
            base = %inner.history.base(),
            "Router created"
        );
        Ok(Router { inner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    use futures_util::FutureExt;
    use serde_json::Value;
    use tokio::sync::Notify;
    use waypoint_history::{ContextError, ContextEvent, ContextListener, HistoryState, ListenerSet};

    fn routes() -> Vec<RouteRecord> {
        vec![
            RouteRecord::new("/").named("home"),
            RouteRecord::new("/users/:id").named("user"),
            RouteRecord::new("/login").named("login"),
            RouteRecord::new("/admin")
                .named("admin")
                .meta("requiresAuth", true),
        ]
    }

    fn memory_router(history: Arc<MemoryHistory>) -> Router {
        Router::builder()
            .routes(routes())
            .config(RouterConfig::memory())
            .history(history)
            .build()
            .unwrap()
    }

    async fn started() -> (Router, Arc<MemoryHistory>) {
        let history = Arc::new(MemoryHistory::new(""));
        let router = memory_router(Arc::clone(&history));
        router.start().await.unwrap();
        (router, history)
    }

    /// Yield to spawned tasks until `done` holds.
    async fn settle(done: impl Fn() -> bool) {
        for _ in 0..20 {
            if done() {
                return;
            }
            tokio::task::yield_now().await;
        }
    }

    /// Guard that parks navigations to `path` until `gate` is notified.
    fn parking_guard(path: &'static str, entered: &Arc<Notify>, gate: &Arc<Notify>) -> Guard {
        let entered = Arc::clone(entered);
        let gate = Arc::clone(gate);
        Guard::new(move |to: Arc<MatchedRoute>, _| {
            let entered = Arc::clone(&entered);
            let gate = Arc::clone(&gate);
            async move {
                if to.path == path {
                    entered.notify_one();
                    gate.notified().await;
                }
                Ok::<_, GuardError>(Verdict::Continue)
            }
        })
    }

    /// Host double whose history mutations may be refused.
    struct HostStub {
        href: String,
        refuse: Option<ContextError>,
        listeners: ListenerSet<ContextListener>,
    }

    impl HostStub {
        fn new(href: &str, refuse: Option<ContextError>) -> Arc<Self> {
            Arc::new(Self {
                href: href.to_string(),
                refuse,
                listeners: ListenerSet::new(),
            })
        }

        fn mutate(&self) -> std::result::Result<(), ContextError> {
            match &self.refuse {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            }
        }
    }

    impl BrowsingContext for HostStub {
        fn href(&self) -> String {
            self.href.clone()
        }

        fn history_state(&self) -> Option<HistoryState> {
            None
        }

        fn push_state(&self, _: &HistoryState, _: &str) -> std::result::Result<(), ContextError> {
            self.mutate()
        }

        fn replace_state(&self, _: &HistoryState, _: &str) -> std::result::Result<(), ContextError> {
            self.mutate()
        }

        fn go(&self, _: i32) -> std::result::Result<(), ContextError> {
            self.mutate()
        }

        fn subscribe(&self, _: ContextEvent, listener: Arc<ContextListener>) -> Subscription {
            self.listeners.add(listener)
        }
    }

    #[tokio::test]
    async fn test_push_resolves_user_route() {
        let (router, history) = started().await;

        let route = router.push("/users/42").await.unwrap();
        assert_eq!(route.path, "/users/42");
        assert_eq!(route.param("id"), Some("42"));
        let names: Vec<_> = route.matched.iter().map(|r| r.name.as_deref()).collect();
        assert_eq!(names, vec![Some("user")]);

        assert_eq!(router.current_route().path, "/users/42");
        assert_eq!(history.location(), "/users/42");
    }

    #[tokio::test]
    async fn test_named_push_with_query() {
        let (router, history) = started().await;

        let route = router
            .push(
                NavigationTarget::named("user")
                    .with_param("id", "9")
                    .with_query("tab", "posts")
                    .with_hash("top"),
            )
            .await
            .unwrap();
        assert_eq!(route.full_path, "/users/9?tab=posts#top");
        assert_eq!(history.location(), "/users/9?tab=posts#top");
    }

    #[tokio::test]
    async fn test_abort_keeps_current_route() {
        let (router, history) = started().await;
        let _guard = router.before_each(Guard::from_fn(|to, _| (to.path != "/admin").into()));

        let result = router.push("/admin").await;
        assert!(matches!(result, Err(RouterError::Aborted(path)) if path == "/admin"));
        assert_eq!(router.current_route().path, "/");
        assert_eq!(history.location(), "/");
    }

    #[tokio::test]
    async fn test_redirect_restarts_as_replace() {
        let (router, history) = started().await;
        let _guard = router.before_each(Guard::from_fn(|to, _| {
            if to.meta.get("requiresAuth") == Some(&Value::Bool(true)) {
                Verdict::from("/login")
            } else {
                Verdict::Continue
            }
        }));

        let route = router.push("/admin").await.unwrap();
        assert_eq!(route.name.as_deref(), Some("login"));
        assert_eq!(history.location(), "/login");
        assert_eq!(history.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_too_many_redirects() {
        let (router, _history) = started().await;
        let _guard = router.before_each(Guard::from_fn(|to, _| {
            if to.path == "/users/1" {
                Verdict::from("/users/2")
            } else if to.path == "/users/2" {
                Verdict::from("/users/1")
            } else {
                Verdict::Continue
            }
        }));

        let result = router.push("/users/1").await;
        assert!(matches!(result, Err(RouterError::TooManyRedirects { count: 11 })));
        assert_eq!(router.current_route().path, "/");
    }

    #[tokio::test]
    async fn test_redirects_up_to_limit_succeed() {
        let (router, _history) = started().await;
        let hops = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&hops);
        let _guard = router.before_each(Guard::from_fn(move |to, _| {
            if to.name.as_deref() == Some("user") && counter.load(Ordering::SeqCst) < 10 {
                let next = counter.fetch_add(1, Ordering::SeqCst) + 1;
                Verdict::from(NavigationTarget::path(format!("/users/{}", next)))
            } else {
                Verdict::Continue
            }
        }));

        let route = router.push("/users/0").await.unwrap();
        assert_eq!(route.path, "/users/10");
        assert_eq!(hops.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_no_route_matched() {
        let history = Arc::new(MemoryHistory::new(""));
        let router = Router::builder()
            .route(RouteRecord::new("/").named("home"))
            .config(RouterConfig::memory())
            .history(history.clone())
            .build()
            .unwrap();
        router.start().await.unwrap();

        let result = router.push("/missing?x=1").await;
        assert!(matches!(result, Err(RouterError::NoRouteMatched(path)) if path == "/missing?x=1"));
        assert_eq!(history.location(), "/");
    }

    #[tokio::test]
    async fn test_on_change_fires_immediately_then_on_commit() {
        let (router, _history) = started().await;
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let subscription = router.on_change(move |route| sink.lock().push(route.path.clone()));

        assert_eq!(*seen.lock(), vec!["/".to_string()]);
        router.push("/users/1").await.unwrap();
        assert_eq!(*seen.lock(), vec!["/".to_string(), "/users/1".to_string()]);

        subscription.unsubscribe();
        router.push("/users/2").await.unwrap();
        assert_eq!(seen.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_after_each_failures_do_not_affect_navigation() {
        let (router, _history) = started().await;
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let _a = router.after_each(|_, _| Err(GuardError::new("tracker offline")));
        let _b = router.after_each(|_, _| panic!("hook bug"));
        let _c = router.after_each(move |to, from| {
            assert_eq!(to.path, "/users/3");
            assert_eq!(from.path, "/");
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let route = router.push("/users/3").await.unwrap();
        assert_eq!(route.path, "/users/3");
        settle(|| calls.load(Ordering::SeqCst) == 1).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_after_each_does_not_hold_up_navigation() {
        let (router, _history) = started().await;
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _hook = router.after_each(move |to, _| {
            sink.lock().push(to.path.clone());
            Ok(())
        });

        router.push("/users/1").await.unwrap();
        assert!(seen.lock().is_empty());

        settle(|| !seen.lock().is_empty()).await;
        assert_eq!(*seen.lock(), vec!["/users/1".to_string()]);
    }

    #[tokio::test]
    async fn test_explicit_params_win_on_path_target() {
        let (router, _history) = started().await;

        let route = router
            .push(NavigationTarget::path("/users/1").with_param("id", "2"))
            .await
            .unwrap();
        assert_eq!(route.path, "/users/1");
        assert_eq!(route.param("id"), Some("2"));

        let resolved = router
            .resolve(NavigationTarget::path("/login").with_param("next", "/admin"))
            .unwrap();
        assert_eq!(resolved.route.param("next"), Some("/admin"));
    }

    #[tokio::test]
    async fn test_guard_error_aborts() {
        let (router, _history) = started().await;
        let _guard = router.before_resolve(
            Guard::new(|_, _| async { Err::<Verdict, _>(GuardError::new("session lookup failed")) })
                .labeled("session"),
        );

        assert!(matches!(
            router.push("/users/1").await,
            Err(RouterError::Aborted(_))
        ));
        assert_eq!(router.current_route().path, "/");
    }

    #[tokio::test]
    async fn test_newer_navigation_supersedes_older() {
        let (router, history) = started().await;
        let gate = Arc::new(Notify::new());
        let waiter = Arc::clone(&gate);
        let _guard = router.before_each(Guard::new(move |to: Arc<MatchedRoute>, _| {
            let waiter = Arc::clone(&waiter);
            async move {
                if to.path == "/users/slow" {
                    waiter.notified().await;
                }
                Ok::<_, GuardError>(Verdict::Continue)
            }
        }));

        let slow = tokio::spawn({
            let router = router.clone();
            async move { router.push("/users/slow").await }
        });
        tokio::task::yield_now().await;

        router.push("/users/fast").await.unwrap();
        gate.notify_one();

        let result = slow.await.unwrap();
        assert!(matches!(result, Err(RouterError::Superseded)));
        assert_eq!(router.current_route().path, "/users/fast");
        assert_eq!(history.location(), "/users/fast");
    }

    #[tokio::test]
    async fn test_traversal_superseded_by_failed_push_is_reverted() {
        let (router, history) = started().await;
        router.push("/users/1").await.unwrap();
        router.push("/users/2").await.unwrap();

        let entered = Arc::new(Notify::new());
        let gate = Arc::new(Notify::new());
        let _guard = router.before_each(parking_guard("/users/1", &entered, &gate));

        let back = tokio::spawn({
            let router = router.clone();
            async move { router.back().await }
        });
        entered.notified().await;
        assert_eq!(history.location(), "/users/1");

        let pushed = router.push("/missing").await;
        assert!(matches!(pushed, Err(RouterError::NoRouteMatched(_))));
        gate.notify_one();

        assert!(matches!(back.await.unwrap(), Err(RouterError::Superseded)));
        assert_eq!(router.current_route().path, "/users/2");
        assert_eq!(history.location(), "/users/2");
    }

    #[tokio::test]
    async fn test_traversal_superseded_by_committed_push_keeps_new_entry() {
        let (router, history) = started().await;
        router.push("/users/1").await.unwrap();
        router.push("/users/2").await.unwrap();

        let entered = Arc::new(Notify::new());
        let gate = Arc::new(Notify::new());
        let _guard = router.before_each(parking_guard("/users/1", &entered, &gate));

        let back = tokio::spawn({
            let router = router.clone();
            async move { router.back().await }
        });
        entered.notified().await;

        router.push("/login").await.unwrap();
        gate.notify_one();

        assert!(matches!(back.await.unwrap(), Err(RouterError::Superseded)));
        assert_eq!(router.current_route().path, "/login");
        assert_eq!(history.location(), "/login");
        let paths: Vec<_> = history.entries().into_iter().map(|e| e.location).collect();
        assert_eq!(paths, vec!["/", "/users/1", "/login"]);
    }

    #[tokio::test]
    async fn test_before_enter_runs_between_global_guards() {
        let log = Arc::new(Mutex::new(Vec::<String>::new()));
        let record = |label: &'static str| {
            let log = Arc::clone(&log);
            Guard::from_fn(move |_, _| {
                log.lock().push(label.to_string());
                Verdict::Continue
            })
        };

        let router = Router::builder()
            .route(RouteRecord::new("/").named("home"))
            .route(
                RouteRecord::new("/settings")
                    .before_enter(record("enter-settings"))
                    .child(RouteRecord::new("profile").before_enter(record("enter-profile"))),
            )
            .config(RouterConfig::memory())
            .build()
            .unwrap();
        router.start().await.unwrap();

        let _a = router.before_resolve(record("resolve"));
        let _b = router.before_each(record("each"));

        router.push("/settings/profile").await.unwrap();
        assert_eq!(
            *log.lock(),
            vec!["each", "enter-settings", "enter-profile", "resolve"]
        );
    }

    #[tokio::test]
    async fn test_back_and_forward() {
        let (router, history) = started().await;
        router.push("/users/1").await.unwrap();
        router.push("/users/2").await.unwrap();

        router.back().await.unwrap();
        assert_eq!(router.current_route().path, "/users/1");
        assert_eq!(history.location(), "/users/1");

        router.forward().await.unwrap();
        assert_eq!(router.current_route().path, "/users/2");

        router.go(-2).await.unwrap();
        assert_eq!(router.current_route().name.as_deref(), Some("home"));
        assert_eq!(history.entries().len(), 3);
    }

    #[tokio::test]
    async fn test_rejected_traversal_is_reverted() {
        let (router, history) = started().await;
        router.push("/users/1").await.unwrap();
        router.push("/users/2").await.unwrap();
        let _guard = router.before_each(Guard::from_fn(|to, _| (to.path != "/users/1").into()));

        let result = router.back().await;
        assert!(matches!(result, Err(RouterError::Aborted(_))));
        assert_eq!(router.current_route().path, "/users/2");
        assert_eq!(history.location(), "/users/2");
    }

    #[tokio::test]
    async fn test_external_traversal_is_handled() {
        let (router, history) = started().await;
        router.push("/users/1").await.unwrap();

        history.go(-1, true).unwrap();
        for _ in 0..10 {
            if router.current_route().path == "/" {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(router.current_route().path, "/");
    }

    #[tokio::test]
    async fn test_scroll_behavior_restores_saved_position() {
        let history = Arc::new(MemoryHistory::new(""));
        let router = Router::builder()
            .routes(routes())
            .config(RouterConfig::memory())
            .history(history.clone())
            .scroll_behavior(|_, _, saved| saved.or(Some(ScrollPosition::default())))
            .build()
            .unwrap();
        router.start().await.unwrap();

        history.scroll_to(ScrollPosition::new(0.0, 250.0));
        router.push("/users/1").await.unwrap();
        assert_eq!(history.scroll_position(), ScrollPosition::default());

        router.back().await.unwrap();
        assert_eq!(history.scroll_position(), ScrollPosition::new(0.0, 250.0));
    }

    #[tokio::test]
    async fn test_resolve_does_not_navigate() {
        let router = Router::builder()
            .routes(routes())
            .config(RouterConfig {
                base: "/app/".into(),
                ..RouterConfig::memory()
            })
            .build()
            .unwrap();
        router.start().await.unwrap();

        let resolved = router
            .resolve(NavigationTarget::named("user").with_param("id", "7").with_query("tab", "posts"))
            .unwrap();
        assert_eq!(resolved.href, "/app/users/7?tab=posts");
        assert_eq!(resolved.route.name.as_deref(), Some("user"));
        assert_eq!(router.current_route().path, "/");

        assert!(matches!(
            router.resolve(NavigationTarget::named("ghost")),
            Err(RouterError::Route(_))
        ));
    }

    #[tokio::test]
    async fn test_params_only_target_stays_on_route() {
        let (router, _history) = started().await;
        router.push("/users/1").await.unwrap();

        let route = router
            .push(NavigationTarget::default().with_param("id", "2"))
            .await
            .unwrap();
        assert_eq!(route.path, "/users/2");
    }

    #[tokio::test]
    async fn test_start_from_initial_location() {
        let router = Router::builder()
            .routes(routes())
            .config(RouterConfig::from_json(r#"{"mode": "memory", "initial_location": "/users/5"}"#).unwrap())
            .build()
            .unwrap();

        let route = router.start().await.unwrap();
        assert_eq!(route.name.as_deref(), Some("user"));
        assert_eq!(route.param("id"), Some("5"));
    }

    #[tokio::test]
    async fn test_blocked_host_history_degrades() {
        let host = HostStub::new(
            "https://example.com/",
            Some(ContextError::Security("sandboxed iframe".into())),
        );
        let router = Router::builder()
            .routes(routes())
            .context(host)
            .build()
            .unwrap();
        router.start().await.unwrap();

        let route = router.push("/users/42").await.unwrap();
        assert_eq!(route.path, "/users/42");
        assert_eq!(router.history().location(), "/users/42");
    }

    #[tokio::test]
    async fn test_failing_host_history_rejects() {
        let host = HostStub::new(
            "https://example.com/",
            Some(ContextError::Failed("quota exceeded".into())),
        );
        let router = Router::builder()
            .routes(routes())
            .context(host)
            .build()
            .unwrap();

        assert!(matches!(
            router.push("/users/42").await,
            Err(RouterError::HistoryBackend(_))
        ));
        assert_eq!(router.current_route().path, "/");
        assert!(router.current_route().is_empty());
    }

    #[tokio::test]
    async fn test_file_origin_falls_back_to_hash() {
        let host = HostStub::new("file:///srv/app/index.html#/users/3", None);
        let router = Router::builder()
            .routes(routes())
            .context(host)
            .build()
            .unwrap();

        assert_eq!(router.history().mode(), HistoryMode::Hash);
        let route = router.start().await.unwrap();
        assert_eq!(route.param("id"), Some("3"));
        assert_eq!(router.resolve("/login").unwrap().href, "/#/login");
    }

    #[test]
    fn test_traversal_without_runtime_runs_inline() {
        let history = Arc::new(MemoryHistory::new(""));
        let router = memory_router(Arc::clone(&history));

        assert!(router.start().now_or_never().unwrap().is_ok());
        assert!(router.push("/users/1").now_or_never().unwrap().is_ok());

        let moved = router.back().now_or_never().unwrap();
        assert!(moved.is_ok());
        assert_eq!(router.current_route().path, "/");
        assert_eq!(history.location(), "/");
    }

    #[test]
    fn test_history_mode_requires_context() {
        let result = Router::builder().routes(routes()).build();
        assert!(matches!(result, Err(RouterError::HistoryBackend(_))));
    }

    #[test]
    fn test_invalid_routes_rejected() {
        let result = Router::builder()
            .route(RouteRecord::new("/a").named("dup"))
            .route(RouteRecord::new("/b").named("dup"))
            .config(RouterConfig::memory())
            .build();
        assert!(matches!(result, Err(RouterError::Route(_))));
    }
}
