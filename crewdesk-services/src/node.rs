/// Node wiring
///
/// A node hosts every service in one process: it owns the collections and
/// both buses, constructs the services, registers each as an action callee
/// and an event subscriber, and runs the periodic maintenance work. The
/// wiring is the only place where the services see each other; everything
/// after construction goes through the buses.
use crewdesk_shared::bus::event::EventBus;
use crewdesk_shared::bus::ActionBus;
use crewdesk_shared::config::Config;
use crewdesk_shared::store::Collection;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::organisations::OrganisationService;
use crate::projects::ProjectService;
use crate::tasks::TaskService;
use crate::tokens::TokenService;
use crate::users::UserService;

/// A fully wired single-process node
pub struct Node {
    config: Config,
    events: Arc<EventBus>,
    actions: Arc<ActionBus>,
    pub users: Arc<UserService>,
    pub organisations: Arc<OrganisationService>,
    pub projects: Arc<ProjectService>,
    pub tasks: Arc<TaskService>,
    pub tokens: Arc<TokenService>,
    cancel: CancellationToken,
}

impl Node {
    /// Builds the node: collections, buses, services, registrations
    pub fn new(config: Config) -> Self {
        let events = Arc::new(EventBus::new());
        let actions = Arc::new(ActionBus::new(config.bus.clone()));

        let tokens = Arc::new(TokenService::new(
            Arc::new(Collection::new("tokens")),
            config.tokens.clone(),
        ));
        let users = Arc::new(UserService::new(
            Arc::new(Collection::new("users")),
            events.clone(),
            actions.clone(),
            tokens.clone(),
        ));
        let organisations = Arc::new(OrganisationService::new(
            Arc::new(Collection::new("organisations")),
            events.clone(),
            actions.clone(),
        ));
        let projects = Arc::new(ProjectService::new(
            Arc::new(Collection::new("projects")),
            events.clone(),
            actions.clone(),
        ));
        let tasks = Arc::new(TaskService::new(
            Arc::new(Collection::new("tasks")),
            Arc::new(Collection::new("task_comments")),
            events.clone(),
            actions.clone(),
        ));

        // Synchronous callees.
        actions.register_users(users.clone());
        actions.register_organisations(organisations.clone());
        actions.register_projects(projects.clone());
        actions.register_tasks(tasks.clone());

        // Event subscribers. Every service sees every event and matches
        // only the ones it cares about.
        events.subscribe(users.clone());
        events.subscribe(organisations.clone());
        events.subscribe(projects.clone());
        events.subscribe(tasks.clone());

        Node {
            config,
            events,
            actions,
            users,
            organisations,
            projects,
            tasks,
            tokens,
            cancel: CancellationToken::new(),
        }
    }

    /// The shared event bus
    pub fn events(&self) -> Arc<EventBus> {
        self.events.clone()
    }

    /// The shared action bus
    pub fn actions(&self) -> Arc<ActionBus> {
        self.actions.clone()
    }

    /// Waits until every in-flight event handler has finished
    ///
    /// Handlers emitted by other handlers count too, so this covers whole
    /// removal cascades.
    pub async fn settled(&self) {
        self.events.settled().await;
    }

    /// Spawns the periodic expired-token sweep
    ///
    /// Runs until [`Node::shutdown`] cancels it.
    pub fn start_token_sweep(&self) -> JoinHandle<()> {
        let tokens = self.tokens.clone();
        let cancel = self.cancel.clone();
        let period = self.config.tokens.sweep_interval;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick fires immediately; skip it so an empty store
            // is not swept at startup.
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!("token sweep stopped");
                        break;
                    }
                    _ = interval.tick() => {
                        tokens.sweep_expired().await;
                    }
                }
            }
        })
    }

    /// Stops background work and drains in-flight event handlers
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.events.settled().await;
        tracing::info!("node stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crewdesk_shared::auth::AuthContext;
    use crate::users::RegisterUser;

    #[tokio::test]
    async fn test_node_wires_all_callees() {
        let node = Node::new(Config::default());
        let admin = node
            .users
            .register(RegisterUser {
                email: "root@crewdesk.dev".to_string(),
                password: "bootstrap-pass".to_string(),
                name: "Root".to_string(),
            })
            .await
            .unwrap();
        let ctx = AuthContext::for_user(admin.id);

        // A protected call succeeds, proving the user callee is registered
        // and the bootstrap admin is authorized.
        node.organisations
            .create(
                &ctx,
                crewdesk_shared::models::organisation::CreateOrganisation {
                    name: "Acme".to_string(),
                    city: None,
                    street: None,
                    country: None,
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_cancels_sweep() {
        let node = Node::new(Config::default());
        let sweep = node.start_token_sweep();
        node.shutdown().await;
        sweep.await.unwrap();
    }
}
