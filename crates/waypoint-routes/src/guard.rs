//! Navigation guard types
//!
//! A guard is a single asynchronous check `(to, from) -> Verdict`. Guards
//! only ever see the routes they are handed, never a shared "current"
//! location, so a guard's answer does not depend on which navigation
//! happens to be in flight elsewhere.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::{self, BoxFuture, FutureExt};
use thiserror::Error;

use waypoint_location::NavigationTarget;

use crate::matched::MatchedRoute;

/// Outcome of a single guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Continue,
    Abort,
    Redirect(NavigationTarget),
}

impl From<bool> for Verdict {
    fn from(allow: bool) -> Self {
        if allow {
            Verdict::Continue
        } else {
            Verdict::Abort
        }
    }
}

impl From<NavigationTarget> for Verdict {
    fn from(target: NavigationTarget) -> Self {
        Verdict::Redirect(target)
    }
}

impl From<&str> for Verdict {
    fn from(path: &str) -> Self {
        Verdict::Redirect(NavigationTarget::path(path))
    }
}

/// Failure raised by a guard or an after-hook.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct GuardError {
    message: String,
}

impl GuardError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub type GuardResult = std::result::Result<Verdict, GuardError>;

type GuardFn =
    dyn Fn(Arc<MatchedRoute>, Arc<MatchedRoute>) -> BoxFuture<'static, GuardResult> + Send + Sync;

#[derive(Clone)]
pub struct Guard {
    label: Option<String>,
    check: Arc<GuardFn>,
}

impl Guard {
    /// Wrap an async guard.
    pub fn new<F, Fut>(check: F) -> Self
    where
        F: Fn(Arc<MatchedRoute>, Arc<MatchedRoute>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = GuardResult> + Send + 'static,
    {
        Self {
            label: None,
            check: Arc::new(move |to, from| check(to, from).boxed()),
        }
    }

    /// Wrap a guard that decides synchronously and cannot fail.
    pub fn from_fn<F>(check: F) -> Self
    where
        F: Fn(&MatchedRoute, &MatchedRoute) -> Verdict + Send + Sync + 'static,
    {
        Self::new(move |to, from| future::ready(GuardResult::Ok(check(&to, &from))))
    }

    /// Name used in logs when the guard fails.
    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or("anonymous")
    }

    pub fn check(
        &self,
        to: Arc<MatchedRoute>,
        from: Arc<MatchedRoute>,
    ) -> BoxFuture<'static, GuardResult> {
        (self.check)(to, from)
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guard").field("label", &self.label()).finish()
    }
}
