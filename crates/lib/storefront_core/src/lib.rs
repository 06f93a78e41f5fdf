//! # storefront_core
//!
//! Core authentication and session logic for the storefront: credential and
//! revocation stores, the bearer token codec, and the revocation reaper.

pub mod auth;
pub mod fixtures;
pub mod migrate;
pub mod models;
pub mod uuid;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
