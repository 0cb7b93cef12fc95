//! Per-entry history state and change notifications

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScrollPosition {
    pub left: f64,
    pub top: f64,
}

impl ScrollPosition {
    pub fn new(left: f64, top: f64) -> Self {
        Self { left, top }
    }
}

/// State attached to every history entry a backend creates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryState {
    pub key: Uuid,
    /// Index of this entry in the session stack
    pub position: usize,
    pub back: Option<String>,
    pub current: String,
    pub forward: Option<String>,
    pub replaced: bool,
    /// Scroll offset recorded when the entry was left
    pub scroll: Option<ScrollPosition>,
}

impl HistoryState {
    pub fn new(current: impl Into<String>, position: usize) -> Self {
        Self {
            key: Uuid::new_v4(),
            position,
            back: None,
            current: current.into(),
            forward: None,
            replaced: false,
            scroll: None,
        }
    }

    /// State for an entry pushed on top of `self`.
    pub fn next(&self, to: &str) -> Self {
        Self {
            back: Some(self.current.clone()),
            ..Self::new(to, self.position + 1)
        }
    }

    /// State for an entry that replaces `self` at the same position.
    pub fn replaced_by(&self, to: &str) -> Self {
        Self {
            back: self.back.clone(),
            forward: self.forward.clone(),
            replaced: true,
            scroll: None,
            ..Self::new(to, self.position)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationDirection {
    Back,
    Forward,
    Unknown,
}

impl NavigationDirection {
    pub fn from_delta(delta: i32) -> Self {
        match delta {
            d if d < 0 => NavigationDirection::Back,
            d if d > 0 => NavigationDirection::Forward,
            _ => NavigationDirection::Unknown,
        }
    }
}

/// What caused a location change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Push,
    Replace,
    /// A traversal through the session stack
    Pop,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryChange {
    pub kind: ChangeKind,
    pub to: String,
    pub from: String,
    pub delta: i32,
    pub direction: NavigationDirection,
}

impl HistoryChange {
    pub fn pop(to: String, from: String, delta: i32) -> Self {
        Self {
            kind: ChangeKind::Pop,
            to,
            from,
            delta,
            direction: NavigationDirection::from_delta(delta),
        }
    }

    pub fn is_traversal(&self) -> bool {
        self.kind == ChangeKind::Pop
    }
}
