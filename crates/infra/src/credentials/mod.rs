//! Credential issuer adapters

mod client;

pub use client::HttpCredentialIssuer;
