//! Client session management
//!
//! [`SessionManager`] is the only owner of the provider client handle.

pub mod manager;

pub use manager::SessionManager;
