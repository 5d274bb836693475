//! # CrewDesk Shared Library
//!
//! This crate contains the types and infrastructure shared by the CrewDesk
//! entity services: the error taxonomy, configuration, entity models, the
//! in-memory entity store, and the internal service bus (domain events +
//! synchronous cross-service actions).
//!
//! ## Module Organization
//!
//! - `models`: Entity models and Create/Update input types
//! - `store`: Generic per-entity-type collection with a change hook
//! - `bus`: Event bus (fire-and-forget) and action bus (request/response)
//! - `auth`: Password hashing and caller identity
//! - `config`: Configuration management
//! - `error`: Common error types

pub mod auth;
pub mod bus;
pub mod config;
pub mod error;
pub mod models;
pub mod store;

/// Current version of the CrewDesk shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
