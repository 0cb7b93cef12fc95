//! Router configuration

use serde::{Deserialize, Serialize};

use waypoint_history::HistoryMode;
use waypoint_routes::{Meta, TableOptions, TrailingSlash};

use crate::error::RouterError;
use crate::Result;

pub const DEFAULT_MAX_REDIRECTS: u32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Which history backend to build when none is supplied
    pub mode: HistoryMode,
    /// Path prefix the app is served under
    pub base: String,
    pub trailing_slash: TrailingSlash,
    pub case_sensitive: bool,
    /// Meta every route inherits
    pub default_meta: Meta,
    /// Redirects allowed within one navigation
    pub max_redirects: u32,
    /// Starting location for memory history
    pub initial_location: Option<String>,
}

impl RouterConfig {
    pub fn memory() -> Self {
        Self {
            mode: HistoryMode::Memory,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.base.contains(['?', '#']) {
            return Err(RouterError::Config(format!(
                "base must be a plain path, got '{}'",
                self.base
            )));
        }
        if let Some(initial) = &self.initial_location {
            if !initial.starts_with('/') {
                return Err(RouterError::Config(format!(
                    "initial_location must start with '/', got '{}'",
                    initial
                )));
            }
        }
        Ok(())
    }

    pub fn table_options(&self) -> TableOptions {
        TableOptions {
            case_sensitive: self.case_sensitive,
            default_meta: self.default_meta.clone(),
        }
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            mode: HistoryMode::History,
            base: String::new(),
            trailing_slash: TrailingSlash::Trim,
            case_sensitive: false,
            default_meta: Meta::new(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            initial_location: None,
        }
    }
}
