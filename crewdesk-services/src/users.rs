/// User service
///
/// Owns user identity, credentials, role, and every authorization decision
/// in the system. Other services never cache role data; they call
/// `user.is_authorized` over the action bus on the hot path of each
/// protected mutation, and that call fails closed when the user is missing.
///
/// # Registration
///
/// The very first registration bootstraps the deployment: that user becomes
/// `Admin`. Every later registration defaults to `Employee`; explicit roles
/// are assigned through the admin-only `create` and `set_role` actions.
///
/// # Removal cascade
///
/// Removing a user emits `UserRemoved { user, org, old_name }`. The
/// organisation service drops the member entry, the project service drops
/// project memberships, and the task service clears assignments — each on
/// its own schedule, each as a no-op if the reference was already gone.
use async_trait::async_trait;
use chrono::Utc;
use crewdesk_shared::auth::password::{hash_password, verify_password};
use crewdesk_shared::auth::AuthContext;
use crewdesk_shared::bus::event::{DomainEvent, EventBus, EventHandler, UserOrgAdded, UserRemoved};
use crewdesk_shared::bus::{ActionBus, UserActions};
use crewdesk_shared::error::{ServiceError, ServiceResult};
use crewdesk_shared::models::token::TokenKind;
use crewdesk_shared::models::user::{
    BasicUserData, CreateUser, Role, UpdateUser, User, ADMINS_ONLY,
};
use crewdesk_shared::store::Collection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::tokens::TokenService;

/// Input for self-service registration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterUser {
    /// Email address
    #[validate(email(message = "not a valid email address"))]
    pub email: String,

    /// Plaintext password, hashed before storage
    #[validate(length(min = 8, message = "must be at least 8 characters"))]
    pub password: String,

    /// Display name
    #[validate(length(min = 1, max = 255, message = "must be 1-255 characters"))]
    pub name: String,
}

/// User service
pub struct UserService {
    users: Arc<Collection<User>>,
    events: Arc<EventBus>,
    actions: Arc<ActionBus>,
    tokens: Arc<TokenService>,
}

impl UserService {
    /// Creates the service over its collection and buses
    pub fn new(
        users: Arc<Collection<User>>,
        events: Arc<EventBus>,
        actions: Arc<ActionBus>,
        tokens: Arc<TokenService>,
    ) -> Self {
        UserService {
            users,
            events,
            actions,
            tokens,
        }
    }

    /// Self-service registration
    ///
    /// The first user ever registered becomes `Admin` (deployment
    /// bootstrap); everyone after that starts as `Employee`.
    ///
    /// # Errors
    ///
    /// `Validation` for malformed input, `Conflict` when the email is
    /// already taken by a live user.
    pub async fn register(&self, data: RegisterUser) -> ServiceResult<User> {
        data.validate()?;

        let email = data.email.to_lowercase();
        self.ensure_email_free(&email).await?;

        let password_hash =
            hash_password(&data.password).map_err(|e| ServiceError::Internal(e.to_string()))?;

        let bootstrap = self.users.count().await == 0;
        let user = User::new(CreateUser {
            email,
            password_hash,
            name: data.name,
            role: Some(if bootstrap { Role::Admin } else { Role::Employee }),
            organisation: None,
        });

        let user = self.users.insert(user).await;
        tracing::info!(user = %user.id, role = user.role.as_str(), "user registered");
        Ok(user)
    }

    /// Admin-only creation with an explicit role
    ///
    /// Validation chain: input validation → email uniqueness → organisation
    /// existence (when referenced) → caller authorization. All must pass
    /// before the insert; on success the organisation membership propagates
    /// via `UserOrgAdded`.
    pub async fn create(&self, ctx: &AuthContext, data: CreateUser) -> ServiceResult<User> {
        data.validate()?;

        let email = data.email.to_lowercase();
        self.ensure_email_free(&email).await?;

        if let Some(org) = data.organisation {
            if !self.actions.organisation_is_created(org).await? {
                return Err(ServiceError::not_found(
                    "organisation",
                    format!("no organisation with id {}", org),
                ));
            }
        }

        self.actions.require_role(ctx, ADMINS_ONLY).await?;

        let user = self.users.insert(User::new(CreateUser { email, ..data })).await;
        if let Some(org) = user.organisation {
            self.events.emit(DomainEvent::UserOrgAdded(UserOrgAdded {
                org,
                user: user.id,
            }));
        }
        tracing::info!(user = %user.id, "user created");
        Ok(user)
    }

    /// Fetches a user by ID
    pub async fn get(&self, id: Uuid) -> ServiceResult<User> {
        self.users
            .find_by_id(id)
            .await
            .ok_or_else(|| ServiceError::not_found("user", format!("no user with id {}", id)))
    }

    /// Lists all users
    pub async fn list(&self) -> Vec<User> {
        self.users.find(|_| true).await
    }

    /// Updates profile fields; callers may update themselves, admins anyone
    pub async fn update(
        &self,
        ctx: &AuthContext,
        id: Uuid,
        data: UpdateUser,
    ) -> ServiceResult<User> {
        data.validate()?;

        if ctx.user_id != id {
            self.actions.require_role(ctx, ADMINS_ONLY).await?;
        }

        self.users
            .update_by_id(id, |user| user.apply(data))
            .await
            .ok_or_else(|| ServiceError::not_found("user", format!("no user with id {}", id)))
    }

    /// Changes a user's role (admin-only)
    pub async fn set_role(&self, ctx: &AuthContext, id: Uuid, role: Role) -> ServiceResult<User> {
        self.actions.require_role(ctx, ADMINS_ONLY).await?;

        self.users
            .update_by_id(id, |user| {
                user.role = role;
                user.updated_at = Utc::now();
            })
            .await
            .ok_or_else(|| ServiceError::not_found("user", format!("no user with id {}", id)))
    }

    /// Assigns a user to an organisation (admin-only)
    ///
    /// The organisation's existence is checked over the action bus before
    /// the write; the membership roster converges via `UserOrgAdded`.
    pub async fn assign_organisation(
        &self,
        ctx: &AuthContext,
        user_id: Uuid,
        org_id: Uuid,
    ) -> ServiceResult<User> {
        self.actions.require_role(ctx, ADMINS_ONLY).await?;

        if !self.actions.organisation_is_created(org_id).await? {
            return Err(ServiceError::not_found(
                "organisation",
                format!("no organisation with id {}", org_id),
            ));
        }

        // The user may have been removed while we were on the bus; the
        // update is the re-check.
        let user = self
            .users
            .update_by_id(user_id, |user| {
                user.organisation = Some(org_id);
                user.updated_at = Utc::now();
            })
            .await
            .ok_or_else(|| {
                ServiceError::not_found("user", format!("no user with id {}", user_id))
            })?;

        self.events.emit(DomainEvent::UserOrgAdded(UserOrgAdded {
            org: org_id,
            user: user_id,
        }));
        Ok(user)
    }

    /// Deletes a user (admin-only) and announces the removal
    pub async fn remove(&self, ctx: &AuthContext, id: Uuid) -> ServiceResult<()> {
        self.actions.require_role(ctx, ADMINS_ONLY).await?;

        let user = self.get(id).await?;
        if !self.users.remove_by_id(id).await {
            return Err(ServiceError::not_found(
                "user",
                format!("no user with id {}", id),
            ));
        }

        self.events.emit(DomainEvent::UserRemoved(UserRemoved {
            user: id,
            org: user.organisation,
            old_name: Some(user.name),
        }));
        tracing::info!(user = %id, "user removed");
        Ok(())
    }

    /// Verifies credentials and returns the user
    ///
    /// A missing email and a wrong password are indistinguishable to the
    /// caller.
    pub async fn authenticate(&self, email: &str, password: &str) -> ServiceResult<User> {
        let email = email.to_lowercase();
        let user = self
            .users
            .find_one(|u| u.email == email)
            .await
            .ok_or_else(|| ServiceError::Unauthorized("invalid credentials".to_string()))?;

        let matches = verify_password(password, &user.password_hash)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        if !matches {
            return Err(ServiceError::Unauthorized("invalid credentials".to_string()));
        }
        Ok(user)
    }

    /// Starts a password reset and returns the single-use secret
    ///
    /// Mail delivery is an external collaborator; the secret is handed back
    /// to the caller (the gateway) for transport.
    pub async fn request_password_reset(&self, email: &str) -> ServiceResult<String> {
        let email = email.to_lowercase();
        let user = self
            .users
            .find_one(|u| u.email == email)
            .await
            .ok_or_else(|| {
                ServiceError::not_found("user", format!("no user with email {}", email))
            })?;

        let (_, secret) = self
            .tokens
            .generate(TokenKind::PasswordReset, user.id, None)
            .await?;
        Ok(secret)
    }

    /// Completes a password reset with a previously issued secret
    ///
    /// Consuming the token deletes it, so the secret works exactly once.
    pub async fn reset_password(&self, secret: &str, new_password: &str) -> ServiceResult<()> {
        if new_password.len() < 8 {
            return Err(ServiceError::invalid(
                "password",
                "must be at least 8 characters",
            ));
        }

        let token = self.tokens.consume(TokenKind::PasswordReset, secret).await?;
        let password_hash =
            hash_password(new_password).map_err(|e| ServiceError::Internal(e.to_string()))?;

        self.users
            .update_by_id(token.owner, |user| {
                user.password_hash = password_hash;
                user.updated_at = Utc::now();
            })
            .await
            .ok_or_else(|| {
                ServiceError::not_found("user", format!("no user with id {}", token.owner))
            })?;
        Ok(())
    }

    async fn ensure_email_free(&self, email: &str) -> ServiceResult<()> {
        if self.users.find_one(|u| u.email == email).await.is_some() {
            return Err(ServiceError::Conflict(format!(
                "email {} is already registered",
                email
            )));
        }
        Ok(())
    }

    // ---- propagation handlers ----

    /// Organisation gone: affected users fall back to the default role and
    /// lose their organisation reference.
    async fn on_organisation_removed(&self, org: Uuid) {
        let affected = self.users.find(|u| u.organisation == Some(org)).await;
        for user in &affected {
            self.users
                .update_by_id(user.id, |u| {
                    u.organisation = None;
                    u.role = Role::default();
                    u.updated_at = Utc::now();
                })
                .await;
        }
        if !affected.is_empty() {
            tracing::info!(org = %org, users = affected.len(), "organisation removed, users reset");
        }
    }

    async fn on_project_member_added(&self, project: Uuid, user: Uuid) {
        let updated = self
            .users
            .update_by_id(user, |u| {
                if !u.projects.contains(&project) {
                    u.projects.push(project);
                }
            })
            .await;
        if updated.is_none() {
            tracing::debug!(user = %user, "member-added for missing user ignored");
        }
    }

    async fn on_project_member_removed(&self, project: Uuid, user: Uuid) {
        self.users
            .update_by_id(user, |u| u.projects.retain(|p| *p != project))
            .await;
    }

    async fn on_project_removed(&self, project: Uuid) {
        let affected = self.users.find(|u| u.projects.contains(&project)).await;
        for user in affected {
            self.users
                .update_by_id(user.id, |u| u.projects.retain(|p| *p != project))
                .await;
        }
    }
}

#[async_trait]
impl UserActions for UserService {
    async fn is_created(&self, id: Uuid) -> ServiceResult<bool> {
        Ok(self.users.find_by_id(id).await.is_some())
    }

    async fn is_authorized(&self, id: Uuid, roles: &[Role]) -> ServiceResult<bool> {
        // Fail closed: no user, no authorization.
        Ok(self
            .users
            .find_by_id(id)
            .await
            .map(|u| roles.contains(&u.role))
            .unwrap_or(false))
    }

    async fn get_basic_data(&self, id: Uuid) -> ServiceResult<BasicUserData> {
        self.users
            .find_by_id(id)
            .await
            .map(|u| u.basic_data())
            .ok_or_else(|| ServiceError::not_found("user", format!("no user with id {}", id)))
    }
}

#[async_trait]
impl EventHandler for UserService {
    async fn handle(&self, event: &DomainEvent) {
        match event {
            DomainEvent::OrganisationRemoved(ev) => self.on_organisation_removed(ev.org).await,
            DomainEvent::ProjectMemberAdded(ev) => {
                self.on_project_member_added(ev.project, ev.user).await
            }
            DomainEvent::ProjectMemberRemoved(ev) => {
                self.on_project_member_removed(ev.project, ev.user).await
            }
            DomainEvent::ProjectRemoved(ev) => self.on_project_removed(ev.project).await,
            _ => {}
        }
    }
}
