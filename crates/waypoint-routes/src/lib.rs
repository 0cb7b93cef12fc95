//! Waypoint Routes
//!
//! Turns a user-supplied route tree into a flattened, pre-sorted lookup
//! table and matches normalized paths against it.
//!
//! Resolution priority, most specific first:
//! - exact static paths
//! - dynamic patterns ordered by segment count and specificity
//! - prefixed wildcards (`/files/*`)
//! - pure catch-alls (`/:pathMatch(.*)*`)

mod error;
mod guard;
mod matched;
mod matcher;
mod pattern;
mod record;
mod table;

pub use error::RouteError;
pub use guard::{Guard, GuardError, GuardResult, Verdict};
pub use matched::{MatchedRecord, MatchedRoute};
pub use matcher::{Matcher, TrailingSlash};
pub use pattern::{PathPattern, PatternSegment, CATCH_ALL_PARAM};
pub use record::{routes_from_json, ComponentRef, Meta, RouteConfig, RouteRecord};
pub use table::{RouteEntry, RouteTable, TableOptions};

pub type Result<T> = std::result::Result<T, RouteError>;
