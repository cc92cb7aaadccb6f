//! # RoomLink Infrastructure
//!
//! Concrete adapters for the ports defined in `roomlink-core`.
//!
//! This crate contains:
//! - The HTTP credential issuer (reqwest)
//! - Configuration loading from the environment and TOML/JSON files
//! - `tracing-subscriber` initialization
//!
//! ## Architecture
//! - Implements traits defined in `roomlink-core`
//! - Contains all "impure" code (network, filesystem, process environment)

pub mod config;
pub mod credentials;
pub mod errors;
pub mod http;
pub mod observability;

// Re-export commonly used items
pub use config::{load, load_from_env, load_from_file, probe_config_paths};
pub use credentials::HttpCredentialIssuer;
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
pub use observability::init_tracing;
