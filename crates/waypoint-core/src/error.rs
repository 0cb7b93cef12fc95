//! Router error types

use thiserror::Error;

use crate::transaction::TransactionStatus;

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("No route matched: {0}")]
    NoRouteMatched(String),

    #[error("Navigation to {0} was aborted")]
    Aborted(String),

    #[error("Too many redirects ({count})")]
    TooManyRedirects { count: u32 },

    #[error("History error: {0}")]
    HistoryBackend(#[from] waypoint_history::HistoryError),

    #[error("Guard '{guard}' failed: {message}")]
    GuardExecution { guard: String, message: String },

    #[error("Navigation superseded by a newer one")]
    Superseded,

    #[error("Route error: {0}")]
    Route(#[from] waypoint_routes::RouteError),

    #[error("Invalid transaction transition: {from} -> {to}")]
    InvalidTransition {
        from: TransactionStatus,
        to: TransactionStatus,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
