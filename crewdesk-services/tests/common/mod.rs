/// Common test utilities for integration tests
///
/// Builds a fully wired node and the fixture data most scenarios need:
/// a bootstrap admin, plus helpers for registering further users and
/// creating organisations and projects through the real service calls.
use crewdesk_services::users::RegisterUser;
use crewdesk_services::Node;
use crewdesk_shared::auth::AuthContext;
use crewdesk_shared::config::Config;
use crewdesk_shared::models::organisation::{CreateOrganisation, Organisation};
use crewdesk_shared::models::project::{CreateProject, Project};
use crewdesk_shared::models::user::{Role, User};
use uuid::Uuid;

/// Test context containing a wired node and a bootstrap admin
pub struct TestContext {
    pub node: Node,
    pub admin: User,
    pub admin_ctx: AuthContext,
}

impl TestContext {
    /// Creates a fresh node; the first registered user is the admin
    pub async fn new() -> Self {
        let node = Node::new(Config::default());
        let admin = node
            .users
            .register(RegisterUser {
                email: "admin@example.com".to_string(),
                password: "admin-password".to_string(),
                name: "Admin".to_string(),
            })
            .await
            .unwrap();
        let admin_ctx = AuthContext::for_user(admin.id);
        TestContext {
            node,
            admin,
            admin_ctx,
        }
    }

    /// Registers a user (Employee by default) and optionally promotes them
    pub async fn register_user(&self, name: &str, role: Role) -> (User, AuthContext) {
        let user = self
            .node
            .users
            .register(RegisterUser {
                email: format!("{}-{}@example.com", name.to_lowercase(), Uuid::new_v4()),
                password: "user-password".to_string(),
                name: name.to_string(),
            })
            .await
            .unwrap();
        let user = if role == Role::Employee {
            user
        } else {
            self.node
                .users
                .set_role(&self.admin_ctx, user.id, role)
                .await
                .unwrap()
        };
        let ctx = AuthContext::for_user(user.id);
        (user, ctx)
    }

    /// Creates an organisation as the admin
    pub async fn create_org(&self, name: &str) -> Organisation {
        self.node
            .organisations
            .create(
                &self.admin_ctx,
                CreateOrganisation {
                    name: name.to_string(),
                    city: None,
                    street: None,
                    country: None,
                },
            )
            .await
            .unwrap()
    }

    /// Creates a project as the admin and waits for propagation
    pub async fn create_project(&self, name: &str, org: Uuid) -> Project {
        let project = self
            .node
            .projects
            .create(
                &self.admin_ctx,
                CreateProject {
                    name: name.to_string(),
                    organisation: org,
                    budget: None,
                },
            )
            .await
            .unwrap();
        self.node.settled().await;
        project
    }
}
