/// Task model
///
/// Tasks are owned by the task service. The `project` reference must exist
/// at creation time; the optional `assignee` must exist whenever it is set.
/// `comments` and `attachments` are rosters maintained by the task service's
/// own propagation handlers.
use crate::store::Entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Task workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started
    #[default]
    Backlog,

    /// Being worked on
    InProgress,

    /// Finished
    Done,
}

impl TaskStatus {
    /// Converts status to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Backlog => "backlog",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

/// Task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// Task name
    pub name: String,

    /// Longer description
    pub description: Option<String>,

    /// Workflow status
    pub status: TaskStatus,

    /// Assigned user, if any (weak reference)
    pub assignee: Option<Uuid>,

    /// Due date
    pub due_date: Option<DateTime<Utc>>,

    /// Owning project (weak reference; existed at creation time)
    pub project: Uuid,

    /// Priority
    pub priority: TaskPriority,

    /// Comment IDs under this task
    pub comments: Vec<Uuid>,

    /// Opaque storage keys of attached files
    pub attachments: Vec<String>,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new task
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateTask {
    /// Task name
    #[validate(length(min = 1, max = 255, message = "must be 1-255 characters"))]
    pub name: String,

    /// Longer description
    pub description: Option<String>,

    /// Owning project; existence is checked before the insert
    pub project: Uuid,

    /// Initial assignee; existence is checked when set
    pub assignee: Option<Uuid>,

    /// Due date
    pub due_date: Option<DateTime<Utc>>,

    /// Priority; defaults to medium
    pub priority: Option<TaskPriority>,
}

/// Input for updating a task
///
/// `assignee` and `due_date` use `Some(None)` to clear.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateTask {
    /// New name
    #[validate(length(min = 1, max = 255, message = "must be 1-255 characters"))]
    pub name: Option<String>,

    /// New description
    pub description: Option<Option<String>>,

    /// New status
    pub status: Option<TaskStatus>,

    /// New assignee; existence is checked by the service when `Some(Some(_))`
    pub assignee: Option<Option<Uuid>>,

    /// New due date
    pub due_date: Option<Option<DateTime<Utc>>>,

    /// New priority
    pub priority: Option<TaskPriority>,
}

impl Task {
    /// Builds a task document from validated creation input
    pub fn new(data: CreateTask) -> Self {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            name: data.name,
            description: data.description,
            status: TaskStatus::default(),
            assignee: data.assignee,
            due_date: data.due_date,
            project: data.project,
            priority: data.priority.unwrap_or_default(),
            comments: Vec::new(),
            attachments: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a partial update in place and bumps `updated_at`
    ///
    /// The service re-validates a changed assignee before calling this.
    pub fn apply(&mut self, data: UpdateTask) {
        if let Some(name) = data.name {
            self.name = name;
        }
        if let Some(description) = data.description {
            self.description = description;
        }
        if let Some(status) = data.status {
            self.status = status;
        }
        if let Some(assignee) = data.assignee {
            self.assignee = assignee;
        }
        if let Some(due_date) = data.due_date {
            self.due_date = due_date;
        }
        if let Some(priority) = data.priority {
            self.priority = priority;
        }
        self.updated_at = Utc::now();
    }
}

impl Entity for Task {
    fn id(&self) -> Uuid {
        self.id
    }
}
