//! Waypoint Core
//!
//! Navigation controller for client-side routing: turns push, replace and
//! traversal requests into guarded transactions over a route table and a
//! history backend.

mod cell;
mod config;
mod error;
mod pipeline;
mod router;
mod transaction;

pub use cell::{ChangeListener, RouteCell, SignalCell};
pub use config::{RouterConfig, DEFAULT_MAX_REDIRECTS};
pub use error::RouterError;
pub use pipeline::{AfterHook, GuardPipeline};
pub use router::{Resolved, Router, RouterBuilder, ScrollBehavior};
pub use transaction::{NavigationKind, NavigationTransaction, TransactionStatus};

// Re-export the lower layers
pub use waypoint_history::{
    create_history, BrowsingContext, CommitOutcome, ContextError, ContextEvent, HistoryAdapter,
    HistoryChange, HistoryError, HistoryMode, HistoryState, MemoryHistory, ScrollPosition,
    Subscription, WebHistory,
};
pub use waypoint_location::{
    DefaultQueryCodec, Location, NavigationTarget, Params, Query, QueryCodec, QueryValue,
};
pub use waypoint_routes::{
    routes_from_json, ComponentRef, Guard, GuardError, MatchedRecord, MatchedRoute, Matcher, Meta,
    RouteConfig, RouteError, RouteRecord, TrailingSlash, Verdict,
};

pub type Result<T> = std::result::Result<T, RouterError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
