//! # RoomLink Domain
//!
//! Data types shared by the session lifecycle layer.
//!
//! This crate contains:
//! - Meeting, credential and participant types
//! - Session state, status snapshot and exit triggers
//! - `SessionError` and the classified error taxonomy
//! - Policy configuration with its defaults
//!
//! ## Architecture
//! - Depends only on the foundation tier of `roomlink-common`
//! - No async runtime, no I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
