//! Session state machine labels, status snapshot and exit triggers

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::STEP_IDLE;

/// States of the single provider client.
///
/// `Cleaning` is reachable from every state and always ends in
/// `Uninitialized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Uninitialized,
    Initializing,
    Ready,
    Joining,
    Joined,
    Cleaning,
}

crate::impl_label_conversions!(SessionState {
    Uninitialized => "uninitialized",
    Initializing => "initializing",
    Ready => "ready",
    Joining => "joining",
    Joined => "joined",
    Cleaning => "cleaning",
});

impl SessionState {
    /// A client handle exists in this state.
    pub const fn has_client(self) -> bool {
        matches!(self, Self::Ready | Self::Joining | Self::Joined)
    }
}

/// Log-correlation token for one client lifetime. Timestamp-ordered, never
/// used for identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Queryable status for a loading overlay / error panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub is_loading: bool,
    pub is_joining: bool,
    pub is_joined: bool,
    pub has_error: bool,
    pub current_step: String,
    pub retry_count: u32,
    pub max_retries: u32,
    /// Classified, user-facing message when `has_error` is set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl StatusSnapshot {
    pub fn idle(max_retries: u32) -> Self {
        Self {
            is_loading: false,
            is_joining: false,
            is_joined: false,
            has_error: false,
            current_step: STEP_IDLE.to_string(),
            retry_count: 0,
            max_retries,
            error_message: None,
        }
    }
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self::idle(crate::constants::DEFAULT_MAX_RETRIES)
    }
}

/// Events that end a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitTrigger {
    /// Explicit "leave" action
    UserLeave,
    /// Page visibility changed to hidden
    VisibilityHidden,
    /// Page or tab unload; teardown cannot be awaited
    PageUnload,
    /// The meeting view was unmounted
    Unmount,
    /// Client-side navigation away from the meeting view
    Navigation,
}

crate::impl_label_conversions!(ExitTrigger {
    UserLeave => "user_leave",
    VisibilityHidden => "visibility_hidden",
    PageUnload => "page_unload",
    Unmount => "unmount",
    Navigation => "navigation",
});

impl ExitTrigger {
    /// Whether the trigger should only end an already-joined session.
    pub const fn requires_joined(self) -> bool {
        matches!(self, Self::VisibilityHidden)
    }

    /// Whether teardown must be fire-and-forget.
    pub const fn is_unload(self) -> bool {
        matches!(self, Self::PageUnload)
    }
}
