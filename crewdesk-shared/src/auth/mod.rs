/// Authentication primitives shared by the services
///
/// - `password`: Argon2id hashing and verification for stored credentials
/// - `context`: the authenticated caller identity attached to every action
pub mod context;
pub mod password;

pub use context::AuthContext;
