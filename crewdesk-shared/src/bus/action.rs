/// Synchronous cross-service action calls
///
/// Every check a service makes against another service's data goes through
/// the `ActionBus`: foreign-key existence (`is_created`), authorization
/// delegation (`is_authorized`), and basic user lookups. Calls are modeled
/// as fallible remote calls — bounded timeout, structured error kinds — even
/// though this node runs them in-process. A callee that is not registered or
/// does not answer within the timeout yields `ServiceError::Unavailable`;
/// protected actions then fail instead of default-allowing.
///
/// Only idempotent read-only checks travel over this bus, so the retry
/// budget applies uniformly. Mutations always go through the owning
/// service's own action surface and are never retried here.
use crate::auth::AuthContext;
use crate::config::BusConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::models::user::{BasicUserData, Role};
use async_trait::async_trait;
use std::future::Future;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Checks the user service answers for its peers
#[async_trait]
pub trait UserActions: Send + Sync + 'static {
    /// Does a user with this ID currently exist?
    async fn is_created(&self, id: Uuid) -> ServiceResult<bool>;

    /// Is this user's current role one of `roles`?
    ///
    /// Fails closed: a missing user is not authorized.
    async fn is_authorized(&self, id: Uuid, roles: &[Role]) -> ServiceResult<bool>;

    /// Display data for another service's denormalized views
    async fn get_basic_data(&self, id: Uuid) -> ServiceResult<BasicUserData>;
}

/// Checks the organisation service answers for its peers
#[async_trait]
pub trait OrganisationActions: Send + Sync + 'static {
    /// Does an organisation with this ID currently exist?
    async fn is_created(&self, id: Uuid) -> ServiceResult<bool>;
}

/// Checks the project service answers for its peers
#[async_trait]
pub trait ProjectActions: Send + Sync + 'static {
    /// Does a project with this ID currently exist?
    async fn is_created(&self, id: Uuid) -> ServiceResult<bool>;
}

/// Checks the task service answers for its peers
#[async_trait]
pub trait TaskActions: Send + Sync + 'static {
    /// Does a task with this ID currently exist?
    async fn is_created(&self, id: Uuid) -> ServiceResult<bool>;
}

/// Request/response bus between the services
///
/// Services register themselves as callees at wiring time; callers use the
/// typed methods below. Holding the bus without a registered callee is
/// legal — the corresponding calls fail with `Unavailable` until wiring
/// completes, which is exactly the fail-closed behavior the protocol wants.
pub struct ActionBus {
    config: BusConfig,
    users: RwLock<Option<Arc<dyn UserActions>>>,
    organisations: RwLock<Option<Arc<dyn OrganisationActions>>>,
    projects: RwLock<Option<Arc<dyn ProjectActions>>>,
    tasks: RwLock<Option<Arc<dyn TaskActions>>>,
}

impl ActionBus {
    /// Creates a bus with no registered callees
    pub fn new(config: BusConfig) -> Self {
        ActionBus {
            config,
            users: RwLock::new(None),
            organisations: RwLock::new(None),
            projects: RwLock::new(None),
            tasks: RwLock::new(None),
        }
    }

    /// Registers the user service callee
    pub fn register_users(&self, callee: Arc<dyn UserActions>) {
        *self.users.write().expect("callee lock poisoned") = Some(callee);
    }

    /// Registers the organisation service callee
    pub fn register_organisations(&self, callee: Arc<dyn OrganisationActions>) {
        *self.organisations.write().expect("callee lock poisoned") = Some(callee);
    }

    /// Registers the project service callee
    pub fn register_projects(&self, callee: Arc<dyn ProjectActions>) {
        *self.projects.write().expect("callee lock poisoned") = Some(callee);
    }

    /// Registers the task service callee
    pub fn register_tasks(&self, callee: Arc<dyn TaskActions>) {
        *self.tasks.write().expect("callee lock poisoned") = Some(callee);
    }

    /// `user.is_created`
    pub async fn user_is_created(&self, id: Uuid) -> ServiceResult<bool> {
        let callee = self.resolve(&self.users, "user")?;
        self.call("user.is_created", || {
            let callee = callee.clone();
            async move { callee.is_created(id).await }
        })
        .await
    }

    /// `user.is_authorized` — the authorization delegation hot path
    pub async fn user_is_authorized(&self, id: Uuid, roles: &[Role]) -> ServiceResult<bool> {
        let callee = self.resolve(&self.users, "user")?;
        let roles = roles.to_vec();
        self.call("user.is_authorized", || {
            let callee = callee.clone();
            let roles = roles.clone();
            async move { callee.is_authorized(id, &roles).await }
        })
        .await
    }

    /// `user.get_basic_data`
    pub async fn user_basic_data(&self, id: Uuid) -> ServiceResult<BasicUserData> {
        let callee = self.resolve(&self.users, "user")?;
        self.call("user.get_basic_data", || {
            let callee = callee.clone();
            async move { callee.get_basic_data(id).await }
        })
        .await
    }

    /// Gates a protected action behind a role set
    ///
    /// Delegates the role lookup to the user service and maps a negative
    /// answer to `Forbidden`. Unreachable user service propagates as
    /// `Unavailable` — the action fails rather than default-allowing.
    pub async fn require_role(&self, ctx: &AuthContext, roles: &[Role]) -> ServiceResult<()> {
        let authorized = self.user_is_authorized(ctx.user_id, roles).await?;
        if !authorized {
            let wanted = roles
                .iter()
                .map(|r| r.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(ServiceError::Forbidden(format!(
                "requires one of: {}",
                wanted
            )));
        }
        Ok(())
    }

    /// `organisation.is_created`
    pub async fn organisation_is_created(&self, id: Uuid) -> ServiceResult<bool> {
        let callee = self.resolve(&self.organisations, "organisation")?;
        self.call("organisation.is_created", || {
            let callee = callee.clone();
            async move { callee.is_created(id).await }
        })
        .await
    }

    /// `project.is_created`
    pub async fn project_is_created(&self, id: Uuid) -> ServiceResult<bool> {
        let callee = self.resolve(&self.projects, "project")?;
        self.call("project.is_created", || {
            let callee = callee.clone();
            async move { callee.is_created(id).await }
        })
        .await
    }

    /// `task.is_created`
    pub async fn task_is_created(&self, id: Uuid) -> ServiceResult<bool> {
        let callee = self.resolve(&self.tasks, "task")?;
        self.call("task.is_created", || {
            let callee = callee.clone();
            async move { callee.is_created(id).await }
        })
        .await
    }

    fn resolve<S: ?Sized>(
        &self,
        slot: &RwLock<Option<Arc<S>>>,
        service: &'static str,
    ) -> ServiceResult<Arc<S>> {
        slot.read()
            .expect("callee lock poisoned")
            .clone()
            .ok_or_else(|| {
                ServiceError::Unavailable(format!("{} service is not registered", service))
            })
    }

    /// Runs a read-only check with timeout and retry budget
    ///
    /// Domain errors from the callee are deterministic and returned as-is;
    /// only timeouts consume the retry budget.
    async fn call<T, F, Fut>(&self, what: &'static str, make: F) -> ServiceResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = ServiceResult<T>>,
    {
        let attempts = self.config.call_retries.saturating_add(1);
        for attempt in 1..=attempts {
            match tokio::time::timeout(self.config.call_timeout, make()).await {
                Ok(result) => return result,
                Err(_) => {
                    tracing::warn!(call = what, attempt, "cross-service call timed out");
                }
            }
        }
        Err(ServiceError::Unavailable(format!("{} timed out", what)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct StubUsers {
        exists: bool,
        delay: Duration,
    }

    #[async_trait]
    impl UserActions for StubUsers {
        async fn is_created(&self, _id: Uuid) -> ServiceResult<bool> {
            tokio::time::sleep(self.delay).await;
            Ok(self.exists)
        }

        async fn is_authorized(&self, _id: Uuid, _roles: &[Role]) -> ServiceResult<bool> {
            Ok(self.exists)
        }

        async fn get_basic_data(&self, id: Uuid) -> ServiceResult<BasicUserData> {
            Err(ServiceError::not_found("user", format!("{} not found", id)))
        }
    }

    fn fast_bus() -> ActionBus {
        ActionBus::new(BusConfig {
            call_timeout: Duration::from_millis(20),
            call_retries: 1,
        })
    }

    #[tokio::test]
    async fn test_unregistered_callee_is_unavailable() {
        let bus = fast_bus();
        let err = bus.user_is_created(Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.kind(), "unavailable");
    }

    #[tokio::test]
    async fn test_registered_callee_answers() {
        let bus = fast_bus();
        bus.register_users(Arc::new(StubUsers {
            exists: true,
            delay: Duration::ZERO,
        }));
        assert!(bus.user_is_created(Uuid::new_v4()).await.unwrap());
    }

    #[tokio::test]
    async fn test_slow_callee_times_out_as_unavailable() {
        let bus = fast_bus();
        bus.register_users(Arc::new(StubUsers {
            exists: true,
            delay: Duration::from_millis(100),
        }));
        let err = bus.user_is_created(Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.kind(), "unavailable");
    }

    #[tokio::test]
    async fn test_require_role_fails_closed_without_user_service() {
        let bus = fast_bus();
        let ctx = AuthContext::for_user(Uuid::new_v4());
        let err = bus.require_role(&ctx, &[Role::Admin]).await.unwrap_err();
        assert_eq!(err.kind(), "unavailable");
    }

    #[tokio::test]
    async fn test_require_role_maps_denial_to_forbidden() {
        let bus = fast_bus();
        bus.register_users(Arc::new(StubUsers {
            exists: false,
            delay: Duration::ZERO,
        }));
        let ctx = AuthContext::for_user(Uuid::new_v4());
        let err = bus.require_role(&ctx, &[Role::Admin]).await.unwrap_err();
        assert_eq!(err.kind(), "forbidden");
        assert!(err.to_string().contains("admin"));
    }

    #[tokio::test]
    async fn test_domain_errors_pass_through_untouched() {
        let bus = fast_bus();
        bus.register_users(Arc::new(StubUsers {
            exists: true,
            delay: Duration::ZERO,
        }));
        let err = bus.user_basic_data(Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }
}
