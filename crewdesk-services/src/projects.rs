/// Project service
///
/// Owns project documents and their membership. Creation runs the full
/// validation chain: the owning organisation must exist (synchronous
/// `organisation.is_created` over the action bus) and the caller must hold
/// a managing role — both before the insert, so a rejected creation leaves
/// no partial write and emits nothing.
///
/// The `tasks` roster converges via `TaskCreated`/`TaskRemoved` events;
/// membership changes go out as `ProjectMemberAdded`/`ProjectMemberRemoved`
/// so the user service can maintain its mirrored project lists.
use async_trait::async_trait;
use crewdesk_shared::auth::AuthContext;
use crewdesk_shared::bus::event::{
    DomainEvent, EventBus, EventHandler, ProjectCreated, ProjectMemberAdded, ProjectMemberRemoved,
    ProjectRemoved,
};
use crewdesk_shared::bus::{ActionBus, ProjectActions};
use crewdesk_shared::error::{ServiceError, ServiceResult};
use crewdesk_shared::models::project::{CreateProject, Project, UpdateProject};
use crewdesk_shared::models::user::PROJECT_MANAGERS;
use crewdesk_shared::store::Collection;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Project service
pub struct ProjectService {
    projects: Arc<Collection<Project>>,
    events: Arc<EventBus>,
    actions: Arc<ActionBus>,
}

impl ProjectService {
    /// Creates the service over its collection and buses
    pub fn new(
        projects: Arc<Collection<Project>>,
        events: Arc<EventBus>,
        actions: Arc<ActionBus>,
    ) -> Self {
        ProjectService {
            projects,
            events,
            actions,
        }
    }

    /// Creates a project under an existing organisation
    ///
    /// # Errors
    ///
    /// `Validation` for malformed input, `NotFound` when the organisation
    /// does not exist, `Forbidden` when the caller is neither admin nor
    /// project manager. All checks precede the insert.
    pub async fn create(&self, ctx: &AuthContext, data: CreateProject) -> ServiceResult<Project> {
        data.validate()?;

        if !self
            .actions
            .organisation_is_created(data.organisation)
            .await?
        {
            return Err(ServiceError::not_found(
                "organisation",
                format!("no organisation with id {}", data.organisation),
            ));
        }

        self.actions.require_role(ctx, PROJECT_MANAGERS).await?;

        let project = self.projects.insert(Project::new(data)).await;
        self.events.emit(DomainEvent::ProjectCreated(ProjectCreated {
            org: project.organisation,
            project: project.id,
        }));
        tracing::info!(project = %project.id, org = %project.organisation, "project created");
        Ok(project)
    }

    /// Fetches a project by ID
    pub async fn get(&self, id: Uuid) -> ServiceResult<Project> {
        self.projects
            .find_by_id(id)
            .await
            .ok_or_else(|| ServiceError::not_found("project", format!("no project with id {}", id)))
    }

    /// Lists all projects
    pub async fn list(&self) -> Vec<Project> {
        self.projects.find(|_| true).await
    }

    /// Updates name/budget (managers only)
    pub async fn update(
        &self,
        ctx: &AuthContext,
        id: Uuid,
        data: UpdateProject,
    ) -> ServiceResult<Project> {
        data.validate()?;
        self.actions.require_role(ctx, PROJECT_MANAGERS).await?;

        self.projects
            .update_by_id(id, |project| project.apply(data))
            .await
            .ok_or_else(|| ServiceError::not_found("project", format!("no project with id {}", id)))
    }

    /// Adds a user to the project's member list (managers only)
    ///
    /// The user must exist at the moment of the check; the membership is
    /// deduplicated and mirrored onto the user document via the emitted
    /// event.
    pub async fn add_member(
        &self,
        ctx: &AuthContext,
        project_id: Uuid,
        user_id: Uuid,
    ) -> ServiceResult<Project> {
        if !self.actions.user_is_created(user_id).await? {
            return Err(ServiceError::not_found(
                "user",
                format!("no user with id {}", user_id),
            ));
        }

        self.actions.require_role(ctx, PROJECT_MANAGERS).await?;

        let project = self
            .projects
            .update_by_id(project_id, |p| {
                if !p.members.contains(&user_id) {
                    p.members.push(user_id);
                }
            })
            .await
            .ok_or_else(|| {
                ServiceError::not_found("project", format!("no project with id {}", project_id))
            })?;

        self.events
            .emit(DomainEvent::ProjectMemberAdded(ProjectMemberAdded {
                project: project_id,
                user: user_id,
            }));
        Ok(project)
    }

    /// Removes a user from the project's member list (managers only)
    ///
    /// Removing an absent member is a no-op on the roster but still emits,
    /// so a mirrored list that saw the add can always see the remove.
    pub async fn remove_member(
        &self,
        ctx: &AuthContext,
        project_id: Uuid,
        user_id: Uuid,
    ) -> ServiceResult<Project> {
        self.actions.require_role(ctx, PROJECT_MANAGERS).await?;

        let project = self
            .projects
            .update_by_id(project_id, |p| p.members.retain(|m| *m != user_id))
            .await
            .ok_or_else(|| {
                ServiceError::not_found("project", format!("no project with id {}", project_id))
            })?;

        self.events
            .emit(DomainEvent::ProjectMemberRemoved(ProjectMemberRemoved {
                project: project_id,
                user: user_id,
            }));
        Ok(project)
    }

    /// Deletes a project (managers only) and announces the removal
    ///
    /// The task service reaps the project's tasks, the organisation service
    /// drops the roster entry, and the user service strips mirrored
    /// memberships — each independently, driven by the event.
    pub async fn remove(&self, ctx: &AuthContext, id: Uuid) -> ServiceResult<()> {
        self.actions.require_role(ctx, PROJECT_MANAGERS).await?;

        let project = self.get(id).await?;
        if !self.projects.remove_by_id(id).await {
            return Err(ServiceError::not_found(
                "project",
                format!("no project with id {}", id),
            ));
        }

        self.events.emit(DomainEvent::ProjectRemoved(ProjectRemoved {
            project: id,
            org: project.organisation,
        }));
        tracing::info!(project = %id, "project removed");
        Ok(())
    }

    // ---- propagation handlers ----

    async fn add_task(&self, project: Uuid, task: Uuid) {
        let updated = self
            .projects
            .update_by_id(project, |p| {
                if !p.tasks.contains(&task) {
                    p.tasks.push(task);
                }
            })
            .await;
        if updated.is_none() {
            tracing::debug!(project = %project, "task event for missing project ignored");
        }
    }

    async fn remove_task(&self, project: Uuid, task: Uuid) {
        self.projects
            .update_by_id(project, |p| p.tasks.retain(|t| *t != task))
            .await;
    }

    /// Organisation gone: reap its projects, announcing each removal so the
    /// cascade continues into tasks and mirrored membership lists.
    async fn on_organisation_removed(&self, org: Uuid) {
        let owned = self.projects.find(|p| p.organisation == org).await;
        for project in owned {
            if self.projects.remove_by_id(project.id).await {
                self.events.emit(DomainEvent::ProjectRemoved(ProjectRemoved {
                    project: project.id,
                    org,
                }));
            }
        }
    }
}

#[async_trait]
impl ProjectActions for ProjectService {
    async fn is_created(&self, id: Uuid) -> ServiceResult<bool> {
        Ok(self.projects.find_by_id(id).await.is_some())
    }
}

#[async_trait]
impl EventHandler for ProjectService {
    async fn handle(&self, event: &DomainEvent) {
        match event {
            DomainEvent::TaskCreated(ev) => self.add_task(ev.project, ev.task).await,
            DomainEvent::TaskRemoved(ev) => self.remove_task(ev.project, ev.task).await,
            DomainEvent::OrganisationRemoved(ev) => self.on_organisation_removed(ev.org).await,
            _ => {}
        }
    }
}
