/// Project model
///
/// Projects are owned by the project service. The `organisation` reference
/// must point to an existing organisation at creation time (checked
/// synchronously over the action bus); `members` is deduplicated; `tasks`
/// is maintained by the task-created/removed propagation handlers.
use crate::store::Entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Unique project ID
    pub id: Uuid,

    /// Project name
    pub name: String,

    /// Owning organisation (weak reference; existed at creation time)
    pub organisation: Uuid,

    /// Budget in whole currency units
    pub budget: i64,

    /// Member user IDs (weak references, no duplicates)
    pub members: Vec<Uuid>,

    /// Task IDs under this project (weak references)
    pub tasks: Vec<Uuid>,

    /// When the project was created
    pub created_at: DateTime<Utc>,

    /// When the project was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new project
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateProject {
    /// Project name
    #[validate(length(min = 1, max = 255, message = "must be 1-255 characters"))]
    pub name: String,

    /// Owning organisation; existence is checked before the insert
    pub organisation: Uuid,

    /// Budget; defaults to 0
    pub budget: Option<i64>,
}

/// Input for updating a project
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateProject {
    /// New name
    #[validate(length(min = 1, max = 255, message = "must be 1-255 characters"))]
    pub name: Option<String>,

    /// New budget
    pub budget: Option<i64>,
}

impl Project {
    /// Builds a project document from validated creation input
    pub fn new(data: CreateProject) -> Self {
        let now = Utc::now();
        Project {
            id: Uuid::new_v4(),
            name: data.name,
            organisation: data.organisation,
            budget: data.budget.unwrap_or(0),
            members: Vec::new(),
            tasks: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a partial update in place and bumps `updated_at`
    pub fn apply(&mut self, data: UpdateProject) {
        if let Some(name) = data.name {
            self.name = name;
        }
        if let Some(budget) = data.budget {
            self.budget = budget;
        }
        self.updated_at = Utc::now();
    }
}

impl Entity for Project {
    fn id(&self) -> Uuid {
        self.id
    }
}
