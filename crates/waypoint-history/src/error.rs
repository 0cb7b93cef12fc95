//! History backend error types

use thiserror::Error;

use crate::adapter::HistoryMode;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("History backend error: {0}")]
    Backend(String),

    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    #[error("A browsing context is required for {0} history")]
    MissingContext(HistoryMode),
}
