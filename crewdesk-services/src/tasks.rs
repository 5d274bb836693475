/// Task service
///
/// Owns tasks and their comments (two collections, one owner). The task
/// document's `comments` and `attachments` rosters converge through this
/// service's own events: a commit emits, the propagation handler applies.
/// Subscribing to its own events keeps the roster path identical to the
/// cross-service ones — idempotent, best-effort, safe against late arrivals.
///
/// Attachments themselves live in the external file pipeline; only the
/// uploaded/removed notifications and the roster on the task document exist
/// here.
use async_trait::async_trait;
use chrono::Utc;
use crewdesk_shared::auth::AuthContext;
use crewdesk_shared::bus::event::{
    CommentCreated, CommentRemoved, DomainEvent, EventBus, EventHandler, TaskCreated, TaskRemoved,
};
use crewdesk_shared::bus::{ActionBus, TaskActions};
use crewdesk_shared::error::{ServiceError, ServiceResult};
use crewdesk_shared::models::comment::{CreateComment, TaskComment};
use crewdesk_shared::models::task::{CreateTask, Task, UpdateTask};
use crewdesk_shared::models::user::{ADMINS_ONLY, ANY_ROLE, PROJECT_MANAGERS};
use crewdesk_shared::store::Collection;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Task service
pub struct TaskService {
    tasks: Arc<Collection<Task>>,
    comments: Arc<Collection<TaskComment>>,
    events: Arc<EventBus>,
    actions: Arc<ActionBus>,
}

impl TaskService {
    /// Creates the service over its collections and buses
    pub fn new(
        tasks: Arc<Collection<Task>>,
        comments: Arc<Collection<TaskComment>>,
        events: Arc<EventBus>,
        actions: Arc<ActionBus>,
    ) -> Self {
        TaskService {
            tasks,
            comments,
            events,
            actions,
        }
    }

    /// Creates a task under an existing project
    ///
    /// Validation chain before the insert: input validation → project
    /// existence → assignee existence (when given) → caller authorization.
    /// Any authenticated role may create tasks.
    pub async fn create(&self, ctx: &AuthContext, data: CreateTask) -> ServiceResult<Task> {
        data.validate()?;

        if !self.actions.project_is_created(data.project).await? {
            return Err(ServiceError::not_found(
                "project",
                format!("no project with id {}", data.project),
            ));
        }

        if let Some(assignee) = data.assignee {
            if !self.actions.user_is_created(assignee).await? {
                return Err(ServiceError::not_found(
                    "user",
                    format!("no user with id {}", assignee),
                ));
            }
        }

        self.actions.require_role(ctx, ANY_ROLE).await?;

        let task = self.tasks.insert(Task::new(data)).await;
        self.events.emit(DomainEvent::TaskCreated(TaskCreated {
            project: task.project,
            task: task.id,
            user: ctx.user_id,
        }));
        tracing::info!(task = %task.id, project = %task.project, "task created");
        Ok(task)
    }

    /// Fetches a task by ID
    pub async fn get(&self, id: Uuid) -> ServiceResult<Task> {
        self.tasks
            .find_by_id(id)
            .await
            .ok_or_else(|| ServiceError::not_found("task", format!("no task with id {}", id)))
    }

    /// Lists tasks under a project
    pub async fn list_by_project(&self, project: Uuid) -> Vec<Task> {
        self.tasks.find(|t| t.project == project).await
    }

    /// Updates task fields; a changed assignee is re-validated
    pub async fn update(
        &self,
        ctx: &AuthContext,
        id: Uuid,
        data: UpdateTask,
    ) -> ServiceResult<Task> {
        data.validate()?;

        if let Some(Some(assignee)) = data.assignee {
            if !self.actions.user_is_created(assignee).await? {
                return Err(ServiceError::not_found(
                    "user",
                    format!("no user with id {}", assignee),
                ));
            }
        }

        self.actions.require_role(ctx, ANY_ROLE).await?;

        self.tasks
            .update_by_id(id, |task| task.apply(data))
            .await
            .ok_or_else(|| ServiceError::not_found("task", format!("no task with id {}", id)))
    }

    /// Assigns the task to a user, or clears the assignment with `None`
    pub async fn assign(
        &self,
        ctx: &AuthContext,
        id: Uuid,
        assignee: Option<Uuid>,
    ) -> ServiceResult<Task> {
        self.update(
            ctx,
            id,
            UpdateTask {
                assignee: Some(assignee),
                ..Default::default()
            },
        )
        .await
    }

    /// Deletes a task (managers only), cascading into its comments
    pub async fn remove(&self, ctx: &AuthContext, id: Uuid) -> ServiceResult<()> {
        self.actions.require_role(ctx, PROJECT_MANAGERS).await?;

        let task = self.get(id).await?;
        self.remove_task_document(task).await;
        Ok(())
    }

    /// Adds a comment to an existing task
    ///
    /// The task is checked locally (this service owns it); the author is
    /// the caller, checked over the action bus. The task's comment roster
    /// converges via the emitted event.
    pub async fn create_comment(
        &self,
        ctx: &AuthContext,
        data: CreateComment,
    ) -> ServiceResult<TaskComment> {
        data.validate()?;

        if self.tasks.find_by_id(data.task).await.is_none() {
            return Err(ServiceError::not_found(
                "task",
                format!("no task with id {}", data.task),
            ));
        }

        if !self.actions.user_is_created(ctx.user_id).await? {
            return Err(ServiceError::not_found(
                "user",
                format!("no user with id {}", ctx.user_id),
            ));
        }

        let comment = self
            .comments
            .insert(TaskComment::new(data, ctx.user_id))
            .await;
        self.events.emit(DomainEvent::CommentCreated(CommentCreated {
            comment: comment.id,
            task: comment.task,
        }));
        Ok(comment)
    }

    /// Deletes a comment; allowed for its author or an admin
    pub async fn remove_comment(&self, ctx: &AuthContext, id: Uuid) -> ServiceResult<()> {
        let comment = self
            .comments
            .find_by_id(id)
            .await
            .ok_or_else(|| ServiceError::not_found("comment", format!("no comment with id {}", id)))?;

        if ctx.user_id != comment.author {
            self.actions.require_role(ctx, ADMINS_ONLY).await?;
        }

        if self.comments.remove_by_id(id).await {
            self.events.emit(DomainEvent::CommentRemoved(CommentRemoved {
                comment: id,
                task: comment.task,
            }));
        }
        Ok(())
    }

    /// Lists comments under a task
    pub async fn list_comments(&self, task: Uuid) -> Vec<TaskComment> {
        self.comments.find(|c| c.task == task).await
    }

    /// Deletes a task document plus the comments it exclusively owns,
    /// emitting a removal notice for every deleted child.
    async fn remove_task_document(&self, task: Task) {
        let owned = self.comments.find(|c| c.task == task.id).await;
        for comment in owned {
            if self.comments.remove_by_id(comment.id).await {
                self.events.emit(DomainEvent::CommentRemoved(CommentRemoved {
                    comment: comment.id,
                    task: task.id,
                }));
            }
        }

        if self.tasks.remove_by_id(task.id).await {
            self.events.emit(DomainEvent::TaskRemoved(TaskRemoved {
                task: task.id,
                project: task.project,
            }));
            tracing::info!(task = %task.id, "task removed");
        }
    }

    // ---- propagation handlers ----

    async fn add_comment_ref(&self, task: Uuid, comment: Uuid) {
        let updated = self
            .tasks
            .update_by_id(task, |t| {
                if !t.comments.contains(&comment) {
                    t.comments.push(comment);
                }
            })
            .await;
        if updated.is_none() {
            tracing::debug!(task = %task, "comment event for missing task ignored");
        }
    }

    async fn remove_comment_ref(&self, task: Uuid, comment: Uuid) {
        self.tasks
            .update_by_id(task, |t| t.comments.retain(|c| *c != comment))
            .await;
    }

    async fn add_attachment_ref(&self, task: Uuid, file: &str) {
        let updated = self
            .tasks
            .update_by_id(task, |t| {
                if !t.attachments.iter().any(|f| f == file) {
                    t.attachments.push(file.to_string());
                }
            })
            .await;
        if updated.is_none() {
            tracing::debug!(task = %task, "attachment event for missing task ignored");
        }
    }

    async fn remove_attachment_ref(&self, task: Uuid, file: &str) {
        self.tasks
            .update_by_id(task, |t| t.attachments.retain(|f| f != file))
            .await;
    }

    /// Project gone: reap its tasks, comments included, announcing each.
    async fn on_project_removed(&self, project: Uuid) {
        let owned = self.tasks.find(|t| t.project == project).await;
        for task in owned {
            self.remove_task_document(task).await;
        }
    }

    /// Assignee gone: tasks fall back to unassigned.
    async fn on_user_removed(&self, user: Uuid) {
        let assigned = self.tasks.find(|t| t.assignee == Some(user)).await;
        for task in assigned {
            self.tasks
                .update_by_id(task.id, |t| {
                    t.assignee = None;
                    t.updated_at = Utc::now();
                })
                .await;
        }
    }
}

#[async_trait]
impl TaskActions for TaskService {
    async fn is_created(&self, id: Uuid) -> ServiceResult<bool> {
        Ok(self.tasks.find_by_id(id).await.is_some())
    }
}

#[async_trait]
impl EventHandler for TaskService {
    async fn handle(&self, event: &DomainEvent) {
        match event {
            DomainEvent::CommentCreated(ev) => self.add_comment_ref(ev.task, ev.comment).await,
            DomainEvent::CommentRemoved(ev) => self.remove_comment_ref(ev.task, ev.comment).await,
            DomainEvent::AttachmentUploaded(ev) => {
                self.add_attachment_ref(ev.task, &ev.file).await
            }
            DomainEvent::AttachmentRemoved(ev) => {
                self.remove_attachment_ref(ev.task, &ev.file).await
            }
            DomainEvent::ProjectRemoved(ev) => self.on_project_removed(ev.project).await,
            DomainEvent::UserRemoved(ev) => self.on_user_removed(ev.user).await,
            _ => {}
        }
    }
}
