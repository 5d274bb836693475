/// Caller identity attached to every service action
///
/// The gateway authenticates the request (out of scope here) and hands the
/// services an `AuthContext`. Protected actions delegate the actual role
/// lookup to the user service over the action bus; the context only says
/// *who* is calling, never what they may do.
use uuid::Uuid;

/// Authenticated caller identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,
}

impl AuthContext {
    /// Creates a context for an authenticated user
    pub fn for_user(user_id: Uuid) -> Self {
        Self { user_id }
    }
}
