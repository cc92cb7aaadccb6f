//! Mount point identity and layout

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Identifier of the element the provider client renders into.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(String);

impl ContainerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContainerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ContainerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Read-only snapshot of a mount point's computed style and box size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContainerLayout {
    /// `false` when the computed `display` is `none`
    pub displayed: bool,
    /// `false` when the computed `visibility` is `hidden`
    pub visible: bool,
    pub width: f64,
    pub height: f64,
}

impl ContainerLayout {
    /// A displayed, visible box of the given size.
    pub fn shown(width: f64, height: f64) -> Self {
        Self { displayed: true, visible: true, width, height }
    }

    /// All four readiness conditions hold at once (existence is implied by
    /// having a layout at all).
    pub fn is_ready(&self) -> bool {
        self.displayed && self.visible && self.width > 0.0 && self.height > 0.0
    }
}

/// Result of a successful readiness probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerReadiness {
    pub container: ContainerId,
    /// Checks consumed, including the one that succeeded
    pub attempts: u32,
    pub max_attempts: u32,
    pub check_interval: Duration,
}
