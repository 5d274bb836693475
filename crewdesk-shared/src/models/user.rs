/// User model
///
/// Users are owned by the user service. The email is unique among live
/// users; the credential is an Argon2id hash, never plaintext. Other
/// services never cache role data — they delegate every role check to the
/// user service over the action bus.
///
/// # Example
///
/// ```
/// use crewdesk_shared::models::user::{CreateUser, Role, User};
///
/// let user = User::new(CreateUser {
///     email: "user@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     name: "Jo Doe".to_string(),
///     role: Some(Role::Employee),
///     organisation: None,
/// });
/// assert_eq!(user.role, Role::Employee);
/// ```
use crate::store::Entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Closed role set
///
/// Authorization is a pure set-membership test over this enum; there are no
/// string-delimited role lists anywhere in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full control over users, organisations, and projects
    Admin,

    /// Can create and manage projects and their membership
    ProjectManager,

    /// Can create tasks and comments
    #[default]
    Employee,
}

impl Role {
    /// Converts role to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::ProjectManager => "project_manager",
            Role::Employee => "employee",
        }
    }
}

/// Roles allowed to manage organisations and users
pub const ADMINS_ONLY: &[Role] = &[Role::Admin];

/// Roles allowed to manage projects and their membership
pub const PROJECT_MANAGERS: &[Role] = &[Role::Admin, Role::ProjectManager];

/// Every authenticated role
pub const ANY_ROLE: &[Role] = &[Role::Admin, Role::ProjectManager, Role::Employee];

/// User account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Email address, unique among live users
    pub email: String,

    /// Argon2id password hash
    pub password_hash: String,

    /// Display name
    pub name: String,

    /// Current role
    pub role: Role,

    /// Organisation the user belongs to, if any (weak reference)
    pub organisation: Option<Uuid>,

    /// Projects the user is a member of (weak references, maintained by
    /// propagation handlers)
    pub projects: Vec<Uuid>,

    /// Arbitrary per-user settings
    pub settings: serde_json::Value,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,
}

/// Basic user data exposed to other services via `user.get_basic_data`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicUserData {
    /// User ID
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Current role
    pub role: Role,
}

/// Input for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateUser {
    /// Email address
    #[validate(email(message = "not a valid email address"))]
    pub email: String,

    /// Argon2id password hash (NOT a plaintext password)
    pub password_hash: String,

    /// Display name
    #[validate(length(min = 1, max = 255, message = "must be 1-255 characters"))]
    pub name: String,

    /// Role; `None` lets the service pick the default
    pub role: Option<Role>,

    /// Organisation reference; existence is checked by the service
    pub organisation: Option<Uuid>,
}

/// Input for updating an existing user
///
/// All fields are optional. Only non-None fields are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateUser {
    /// New display name
    #[validate(length(min = 1, max = 255, message = "must be 1-255 characters"))]
    pub name: Option<String>,

    /// New password hash
    pub password_hash: Option<String>,

    /// New settings blob (replaces the old one)
    pub settings: Option<serde_json::Value>,
}

impl User {
    /// Builds a user document from validated creation input
    ///
    /// The service layer is responsible for validation, uniqueness, and the
    /// first-admin bootstrap rule before calling this.
    pub fn new(data: CreateUser) -> Self {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: data.email,
            password_hash: data.password_hash,
            name: data.name,
            role: data.role.unwrap_or_default(),
            organisation: data.organisation,
            projects: Vec::new(),
            settings: serde_json::Value::Null,
            created_at: now,
            updated_at: now,
        }
    }

    /// Projection for `user.get_basic_data`
    pub fn basic_data(&self) -> BasicUserData {
        BasicUserData {
            id: self.id,
            name: self.name.clone(),
            role: self.role,
        }
    }

    /// Applies a partial update in place and bumps `updated_at`
    pub fn apply(&mut self, data: UpdateUser) {
        if let Some(name) = data.name {
            self.name = name;
        }
        if let Some(hash) = data.password_hash {
            self.password_hash = hash;
        }
        if let Some(settings) = data.settings {
            self.settings = settings;
        }
        self.updated_at = Utc::now();
    }
}

impl Entity for User {
    fn id(&self) -> Uuid {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_input() -> CreateUser {
        CreateUser {
            email: "test@example.com".to_string(),
            password_hash: "hash".to_string(),
            name: "Test User".to_string(),
            role: None,
            organisation: None,
        }
    }

    #[test]
    fn test_default_role_is_employee() {
        let user = User::new(create_input());
        assert_eq!(user.role, Role::Employee);
    }

    #[test]
    fn test_role_as_str() {
        assert_eq!(Role::Admin.as_str(), "admin");
        assert_eq!(Role::ProjectManager.as_str(), "project_manager");
        assert_eq!(Role::Employee.as_str(), "employee");
    }

    #[test]
    fn test_create_user_validation() {
        let mut input = create_input();
        assert!(input.validate().is_ok());

        input.email = "not-an-email".to_string();
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_basic_data_projection() {
        let user = User::new(create_input());
        let basic = user.basic_data();
        assert_eq!(basic.id, user.id);
        assert_eq!(basic.name, "Test User");
        assert_eq!(basic.role, Role::Employee);
    }

    #[test]
    fn test_apply_update() {
        let mut user = User::new(create_input());
        let before = user.updated_at;

        user.apply(UpdateUser {
            name: Some("Renamed".to_string()),
            ..Default::default()
        });

        assert_eq!(user.name, "Renamed");
        assert!(user.updated_at >= before);
        assert_eq!(user.email, "test@example.com");
    }
}
