//! Guard pipeline
//!
//! Guards for one navigation run strictly in sequence:
//! 1. global `before_each` guards
//! 2. `before_enter` guards of the matched chain, outermost first
//! 3. global `before_resolve` guards
//!
//! The first guard that does not continue decides the outcome. A guard
//! that errors or panics counts as an abort.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use parking_lot::Mutex;

use waypoint_history::{ListenerSet, Subscription};
use waypoint_routes::{Guard, GuardError, MatchedRoute, RouteTable, Verdict};

use crate::error::RouterError;

pub type AfterHook =
    dyn Fn(&MatchedRoute, &MatchedRoute) -> std::result::Result<(), GuardError> + Send + Sync;

pub struct GuardPipeline {
    before_each: ListenerSet<Guard>,
    before_resolve: ListenerSet<Guard>,
    after_each: ListenerSet<AfterHook>,
    /// `before_enter` guards per matched leaf record
    enter_cache: Arc<Mutex<HashMap<usize, Vec<Guard>>>>,
}

impl GuardPipeline {
    pub fn new() -> Self {
        Self {
            before_each: ListenerSet::new(),
            before_resolve: ListenerSet::new(),
            after_each: ListenerSet::new(),
            enter_cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn add_before_each(&self, guard: Guard) -> Subscription {
        self.before_each.add(Arc::new(guard))
    }

    pub fn add_before_resolve(&self, guard: Guard) -> Subscription {
        self.before_resolve.add(Arc::new(guard))
    }

    pub fn add_after_each(&self, hook: Arc<AfterHook>) -> Subscription {
        self.after_each.add(hook)
    }

    /// All guards for a navigation to `to`, in execution order.
    pub fn collect(&self, to: &MatchedRoute, table: &RouteTable) -> Vec<Arc<Guard>> {
        let mut guards = self.before_each.snapshot();
        guards.extend(self.enter_guards(to, table).into_iter().map(Arc::new));
        guards.extend(self.before_resolve.snapshot());
        guards
    }

    fn enter_guards(&self, to: &MatchedRoute, table: &RouteTable) -> Vec<Guard> {
        let Some(leaf) = to.leaf() else {
            return Vec::new();
        };
        let mut cache = self.enter_cache.lock();
        cache
            .entry(leaf.index)
            .or_insert_with(|| {
                to.matched
                    .iter()
                    .filter_map(|record| table.entry(record.index))
                    .flat_map(|entry| entry.before_enter.iter().cloned())
                    .collect()
            })
            .clone()
    }

    pub async fn run(
        &self,
        guards: Vec<Arc<Guard>>,
        to: Arc<MatchedRoute>,
        from: Arc<MatchedRoute>,
    ) -> Verdict {
        for guard in guards {
            // Sync guards decide inside `check`, so the call itself is guarded too
            let outcome = AssertUnwindSafe(async {
                guard.check(Arc::clone(&to), Arc::clone(&from)).await
            })
            .catch_unwind()
            .await;

            let failure = match outcome {
                Ok(Ok(Verdict::Continue)) => continue,
                Ok(Ok(verdict)) => {
                    tracing::debug!(guard = %guard.label(), to = %to.full_path, verdict = ?verdict, "Guard stopped navigation");
                    return verdict;
                }
                Ok(Err(err)) => RouterError::GuardExecution {
                    guard: guard.label().to_string(),
                    message: err.message().to_string(),
                },
                Err(panic) => RouterError::GuardExecution {
                    guard: guard.label().to_string(),
                    message: panic_message(&*panic),
                },
            };
            tracing::warn!(to = %to.full_path, error = %failure, "Guard failed; aborting navigation");
            return Verdict::Abort;
        }
        Verdict::Continue
    }

    pub fn after_hooks(&self) -> Vec<Arc<AfterHook>> {
        self.after_each.snapshot()
    }
}

/// Run `after_each` hooks. Their failures are logged and otherwise ignored.
pub fn run_after_hooks(hooks: &[Arc<AfterHook>], to: &MatchedRoute, from: &MatchedRoute) {
    for hook in hooks {
        match std::panic::catch_unwind(AssertUnwindSafe(|| hook(to, from))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::warn!(to = %to.full_path, error = %err, "after_each hook failed");
            }
            Err(panic) => {
                tracing::warn!(to = %to.full_path, panic = %panic_message(&*panic), "after_each hook panicked");
            }
        }
    }
}

impl Default for GuardPipeline {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic".to_string()
    }
}
