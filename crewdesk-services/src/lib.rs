//! # CrewDesk Services
//!
//! The four entity services (users, organisations, projects, tasks), the
//! token service, and the node wiring that connects them over the shared
//! event and action buses.
//!
//! ## Consistency model
//!
//! Each service owns exactly one entity collection. Before committing a
//! dependent write, a service synchronously verifies foreign-key existence
//! and caller authorization over the action bus; after committing, it emits
//! exactly one domain event. Other services apply that event to their own
//! denormalized back-reference lists, idempotently and best-effort — there
//! is no shared transaction and no acknowledgment channel, so consistency is
//! eventual by design.
//!
//! ## Module Organization
//!
//! - `users`: User service (identity, credentials, roles, authorization)
//! - `organisations`: Organisation service (membership, project roster)
//! - `projects`: Project service (membership, task roster)
//! - `tasks`: Task service (assignment, comments, attachment roster)
//! - `tokens`: Single-use token lifecycle (reset/verification flows)
//! - `node`: Wiring and background loops

pub mod node;
pub mod organisations;
pub mod projects;
pub mod tasks;
pub mod tokens;
pub mod users;

pub use node::Node;
