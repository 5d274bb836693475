/// Task comment model
///
/// Comments are owned by the task service, in their own collection; the
/// task's `comments` roster holds back-references only.
use crate::store::Entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Comment under a task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskComment {
    /// Unique comment ID
    pub id: Uuid,

    /// Owning task (weak reference)
    pub task: Uuid,

    /// Author (weak reference; existed at creation time)
    pub author: Uuid,

    /// Comment text
    pub text: String,

    /// When the comment was created
    pub created_at: DateTime<Utc>,
}

/// Input for creating a comment
///
/// The author comes from the caller's `AuthContext`, not from the input.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateComment {
    /// Owning task
    pub task: Uuid,

    /// Comment text
    #[validate(length(min = 1, max = 4000, message = "must be 1-4000 characters"))]
    pub text: String,
}

impl TaskComment {
    /// Builds a comment document
    pub fn new(data: CreateComment, author: Uuid) -> Self {
        TaskComment {
            id: Uuid::new_v4(),
            task: data.task,
            author,
            text: data.text,
            created_at: Utc::now(),
        }
    }
}

impl Entity for TaskComment {
    fn id(&self) -> Uuid {
        self.id
    }
}
