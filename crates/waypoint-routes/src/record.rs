//! User-facing route definitions

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::guard::Guard;

/// Free-form route metadata.
pub type Meta = serde_json::Map<String, Value>;

/// Opaque handle the rendering layer uses to pick what to show.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentRef(String);

impl ComponentRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ComponentRef {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// One routable path and its nested children.
///
/// Child paths are relative to the parent unless they start with `/`.
#[derive(Debug, Clone, Default)]
pub struct RouteRecord {
    pub path: String,
    pub name: Option<String>,
    pub component: Option<ComponentRef>,
    pub meta: Meta,
    pub children: Vec<RouteRecord>,
    pub before_enter: Vec<Guard>,
}

impl RouteRecord {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn component(mut self, component: impl Into<ComponentRef>) -> Self {
        self.component = Some(component.into());
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn child(mut self, child: RouteRecord) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: Vec<RouteRecord>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn before_enter(mut self, guard: Guard) -> Self {
        self.before_enter.push(guard);
        self
    }
}

/// Serializable mirror of [`RouteRecord`] for loading route trees from config.
///
/// Guards cannot be expressed in config; attach them after conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteConfig {
    pub path: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub component: Option<ComponentRef>,
    #[serde(default)]
    pub meta: Meta,
    #[serde(default)]
    pub children: Vec<RouteConfig>,
}

impl From<RouteConfig> for RouteRecord {
    fn from(config: RouteConfig) -> Self {
        Self {
            path: config.path,
            name: config.name,
            component: config.component,
            meta: config.meta,
            children: config.children.into_iter().map(RouteRecord::from).collect(),
            before_enter: Vec::new(),
        }
    }
}

/// Parse a JSON array of route configs into records.
pub fn routes_from_json(json: &str) -> serde_json::Result<Vec<RouteRecord>> {
    let configs: Vec<RouteConfig> = serde_json::from_str(json)?;
    Ok(configs.into_iter().map(RouteRecord::from).collect())
}
