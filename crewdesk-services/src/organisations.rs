/// Organisation service
///
/// Owns organisation documents: name, address, and the denormalized
/// `members`/`projects` rosters. Only this service writes those rosters —
/// peers influence them exclusively through domain events, so write
/// ownership stays single and no cross-service locking exists.
use async_trait::async_trait;
use crewdesk_shared::auth::AuthContext;
use crewdesk_shared::bus::event::{DomainEvent, EventBus, EventHandler, OrganisationRemoved};
use crewdesk_shared::bus::{ActionBus, OrganisationActions};
use crewdesk_shared::error::{ServiceError, ServiceResult};
use crewdesk_shared::models::organisation::{
    CreateOrganisation, Organisation, UpdateOrganisation,
};
use crewdesk_shared::models::user::ADMINS_ONLY;
use crewdesk_shared::store::Collection;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Organisation service
pub struct OrganisationService {
    organisations: Arc<Collection<Organisation>>,
    events: Arc<EventBus>,
    actions: Arc<ActionBus>,
}

impl OrganisationService {
    /// Creates the service over its collection and buses
    pub fn new(
        organisations: Arc<Collection<Organisation>>,
        events: Arc<EventBus>,
        actions: Arc<ActionBus>,
    ) -> Self {
        OrganisationService {
            organisations,
            events,
            actions,
        }
    }

    /// Creates an organisation (admin-only; name is unique)
    pub async fn create(
        &self,
        ctx: &AuthContext,
        data: CreateOrganisation,
    ) -> ServiceResult<Organisation> {
        data.validate()?;
        self.ensure_name_free(&data.name).await?;
        self.actions.require_role(ctx, ADMINS_ONLY).await?;

        let org = self.organisations.insert(Organisation::new(data)).await;
        tracing::info!(org = %org.id, "organisation created");
        Ok(org)
    }

    /// Fetches an organisation by ID
    pub async fn get(&self, id: Uuid) -> ServiceResult<Organisation> {
        self.organisations.find_by_id(id).await.ok_or_else(|| {
            ServiceError::not_found("organisation", format!("no organisation with id {}", id))
        })
    }

    /// Lists all organisations
    pub async fn list(&self) -> Vec<Organisation> {
        self.organisations.find(|_| true).await
    }

    /// Updates name/address fields (admin-only)
    pub async fn update(
        &self,
        ctx: &AuthContext,
        id: Uuid,
        data: UpdateOrganisation,
    ) -> ServiceResult<Organisation> {
        data.validate()?;

        if let Some(name) = &data.name {
            let taken = self
                .organisations
                .find_one(|o| o.name == *name && o.id != id)
                .await;
            if taken.is_some() {
                return Err(ServiceError::Conflict(format!(
                    "organisation name {} is already taken",
                    name
                )));
            }
        }

        self.actions.require_role(ctx, ADMINS_ONLY).await?;

        self.organisations
            .update_by_id(id, |org| org.apply(data))
            .await
            .ok_or_else(|| {
                ServiceError::not_found("organisation", format!("no organisation with id {}", id))
            })
    }

    /// Deletes an organisation (admin-only) and announces the removal
    ///
    /// Downstream, the project service deletes the organisation's projects
    /// (cascading into tasks and comments) and the user service resets
    /// affected users — all asynchronously, via the emitted event.
    pub async fn remove(&self, ctx: &AuthContext, id: Uuid) -> ServiceResult<()> {
        self.actions.require_role(ctx, ADMINS_ONLY).await?;

        if !self.organisations.remove_by_id(id).await {
            return Err(ServiceError::not_found(
                "organisation",
                format!("no organisation with id {}", id),
            ));
        }

        self.events
            .emit(DomainEvent::OrganisationRemoved(OrganisationRemoved {
                org: id,
            }));
        tracing::info!(org = %id, "organisation removed");
        Ok(())
    }

    async fn ensure_name_free(&self, name: &str) -> ServiceResult<()> {
        if self
            .organisations
            .find_one(|o| o.name == name)
            .await
            .is_some()
        {
            return Err(ServiceError::Conflict(format!(
                "organisation name {} is already taken",
                name
            )));
        }
        Ok(())
    }

    // ---- propagation handlers ----

    async fn add_member(&self, org: Uuid, user: Uuid) {
        let updated = self
            .organisations
            .update_by_id(org, |o| {
                if !o.members.contains(&user) {
                    o.members.push(user);
                }
            })
            .await;
        if updated.is_none() {
            tracing::debug!(org = %org, "member event for missing organisation ignored");
        }
    }

    async fn remove_member(&self, org: Uuid, user: Uuid) {
        self.organisations
            .update_by_id(org, |o| o.members.retain(|m| *m != user))
            .await;
    }

    async fn add_project(&self, org: Uuid, project: Uuid) {
        let updated = self
            .organisations
            .update_by_id(org, |o| {
                if !o.projects.contains(&project) {
                    o.projects.push(project);
                }
            })
            .await;
        if updated.is_none() {
            // The organisation may already be deleted; the project service's
            // own organisation-removed handler will reap the project.
            tracing::debug!(org = %org, "project event for missing organisation ignored");
        }
    }

    async fn remove_project(&self, org: Uuid, project: Uuid) {
        self.organisations
            .update_by_id(org, |o| o.projects.retain(|p| *p != project))
            .await;
    }
}

#[async_trait]
impl OrganisationActions for OrganisationService {
    async fn is_created(&self, id: Uuid) -> ServiceResult<bool> {
        Ok(self.organisations.find_by_id(id).await.is_some())
    }
}

#[async_trait]
impl EventHandler for OrganisationService {
    async fn handle(&self, event: &DomainEvent) {
        match event {
            DomainEvent::UserOrgAdded(ev) => self.add_member(ev.org, ev.user).await,
            DomainEvent::UserRemoved(ev) => {
                if let Some(org) = ev.org {
                    self.remove_member(org, ev.user).await;
                }
            }
            DomainEvent::ProjectCreated(ev) => self.add_project(ev.org, ev.project).await,
            DomainEvent::ProjectRemoved(ev) => self.remove_project(ev.org, ev.project).await,
            _ => {}
        }
    }
}
