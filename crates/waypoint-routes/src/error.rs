//! Route table error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("Invalid route pattern '{path}': {reason}")]
    InvalidPattern { path: String, reason: String },

    #[error("Unsupported route pattern '{path}': {reason}")]
    UnsupportedPattern { path: String, reason: String },

    #[error("Duplicate route name: {0}")]
    DuplicateName(String),

    #[error("Unknown route name: {0}")]
    UnknownName(String),

    #[error("Missing param '{param}' for route '{route}'")]
    MissingParam { route: String, param: String },
}
