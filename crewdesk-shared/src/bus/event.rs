/// Domain events and the fire-and-forget event bus
///
/// Events are a closed enum with typed payload structs: a subscriber that
/// matches on `DomainEvent` is checked at compile time, there is no string
/// name to typo. The canonical dotted names survive only as log labels.
///
/// # Delivery contract
///
/// - `emit` never waits for subscribers and never reports their failures;
///   each subscriber runs on its own spawned task.
/// - Delivery is at-most-once and unordered across subscribers. A subscriber
///   may observe a `*Created` event after the subject has already been
///   deleted; handlers must treat that as a benign no-op.
/// - `settled()` waits for the in-flight delivery count (including events
///   emitted *by* handlers, i.e. whole cascades) to reach zero. Tests and
///   shutdown use it; publishers on the hot path never do.
///
/// # Example
///
/// ```no_run
/// use crewdesk_shared::bus::event::{DomainEvent, EventBus, ProjectCreated};
/// use uuid::Uuid;
///
/// # async fn example(bus: &EventBus) {
/// bus.emit(DomainEvent::ProjectCreated(ProjectCreated {
///     org: Uuid::new_v4(),
///     project: Uuid::new_v4(),
/// }));
/// bus.settled().await; // tests only
/// # }
/// ```
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use uuid::Uuid;

/// A user document was deleted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRemoved {
    /// The removed user
    pub user: Uuid,

    /// Organisation the user belonged to, if any
    pub org: Option<Uuid>,

    /// Display name at removal time, kept for audit lines
    pub old_name: Option<String>,
}

/// A user was assigned to an organisation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserOrgAdded {
    /// The organisation the user joined
    pub org: Uuid,

    /// The user
    pub user: Uuid,
}

/// An organisation document was deleted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganisationRemoved {
    /// The removed organisation
    pub org: Uuid,
}

/// A project was committed to the project service's store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectCreated {
    /// Owning organisation
    pub org: Uuid,

    /// The new project
    pub project: Uuid,
}

/// A project document was deleted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRemoved {
    /// The removed project
    pub project: Uuid,

    /// Organisation that owned it
    pub org: Uuid,
}

/// A user was added to a project's member list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMemberAdded {
    /// The project
    pub project: Uuid,

    /// The new member
    pub user: Uuid,
}

/// A user was removed from a project's member list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMemberRemoved {
    /// The project
    pub project: Uuid,

    /// The former member
    pub user: Uuid,
}

/// A task was committed to the task service's store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCreated {
    /// Owning project
    pub project: Uuid,

    /// The new task
    pub task: Uuid,

    /// The user who created it
    pub user: Uuid,
}

/// A task document was deleted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRemoved {
    /// The removed task
    pub task: Uuid,

    /// Project that owned it
    pub project: Uuid,
}

/// A comment was committed under a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentCreated {
    /// The new comment
    pub comment: Uuid,

    /// Owning task
    pub task: Uuid,
}

/// A comment was deleted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRemoved {
    /// The removed comment
    pub comment: Uuid,

    /// Task that owned it
    pub task: Uuid,
}

/// The file pipeline finished storing an attachment for a task
///
/// The upload/compression pipeline is an external collaborator; only the
/// roster update on the task document happens here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentUploaded {
    /// The task the file belongs to
    pub task: Uuid,

    /// Opaque storage key of the file
    pub file: String,
}

/// An attachment was deleted from storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRemoved {
    /// The task the file belonged to
    pub task: Uuid,

    /// Opaque storage key of the file
    pub file: String,
}

/// Every domain event the services exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    UserRemoved(UserRemoved),
    UserOrgAdded(UserOrgAdded),
    OrganisationRemoved(OrganisationRemoved),
    ProjectCreated(ProjectCreated),
    ProjectRemoved(ProjectRemoved),
    ProjectMemberAdded(ProjectMemberAdded),
    ProjectMemberRemoved(ProjectMemberRemoved),
    TaskCreated(TaskCreated),
    TaskRemoved(TaskRemoved),
    CommentCreated(CommentCreated),
    CommentRemoved(CommentRemoved),
    AttachmentUploaded(AttachmentUploaded),
    AttachmentRemoved(AttachmentRemoved),
}

impl DomainEvent {
    /// Canonical dotted event name, used as a log label
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::UserRemoved(_) => "user.removed",
            DomainEvent::UserOrgAdded(_) => "user.org_added",
            DomainEvent::OrganisationRemoved(_) => "organisation.removed",
            DomainEvent::ProjectCreated(_) => "project.created",
            DomainEvent::ProjectRemoved(_) => "project.removed",
            DomainEvent::ProjectMemberAdded(_) => "project.member_added",
            DomainEvent::ProjectMemberRemoved(_) => "project.member_removed",
            DomainEvent::TaskCreated(_) => "task.created",
            DomainEvent::TaskRemoved(_) => "task.removed",
            DomainEvent::CommentCreated(_) => "task.comment.created",
            DomainEvent::CommentRemoved(_) => "task.comment.removed",
            DomainEvent::AttachmentUploaded(_) => "task.attachment.uploaded",
            DomainEvent::AttachmentRemoved(_) => "task.attachment.removed",
        }
    }
}

/// A registered event subscriber
///
/// Handlers must be idempotent and must swallow their own failures: the
/// publisher is not awaiting a result and cannot retry on the subscriber's
/// behalf. Log and move on.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    /// Applies one event to this subscriber's own state
    async fn handle(&self, event: &DomainEvent);
}

struct Inflight {
    count: AtomicUsize,
    notify: Notify,
}

/// Fire-and-forget publish/subscribe bus
pub struct EventBus {
    subscribers: std::sync::RwLock<Vec<Arc<dyn EventHandler>>>,
    inflight: Arc<Inflight>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Creates a bus with no subscribers
    pub fn new() -> Self {
        EventBus {
            subscribers: std::sync::RwLock::new(Vec::new()),
            inflight: Arc::new(Inflight {
                count: AtomicUsize::new(0),
                notify: Notify::new(),
            }),
        }
    }

    /// Registers a subscriber for all events
    pub fn subscribe(&self, handler: Arc<dyn EventHandler>) {
        self.subscribers
            .write()
            .expect("subscriber lock poisoned")
            .push(handler);
    }

    /// Publishes an event to every subscriber, without waiting
    ///
    /// Each subscriber gets its own spawned task, so relative delivery order
    /// across subscribers is unspecified. There is no delivery confirmation.
    pub fn emit(&self, event: DomainEvent) {
        let handlers: Vec<Arc<dyn EventHandler>> = self
            .subscribers
            .read()
            .expect("subscriber lock poisoned")
            .clone();

        tracing::debug!(event = event.name(), subscribers = handlers.len(), "emit");

        for handler in handlers {
            self.inflight.count.fetch_add(1, Ordering::AcqRel);
            let inflight = self.inflight.clone();
            let event = event.clone();
            tokio::spawn(async move {
                handler.handle(&event).await;
                if inflight.count.fetch_sub(1, Ordering::AcqRel) == 1 {
                    inflight.notify.notify_waiters();
                }
            });
        }
    }

    /// Waits until no deliveries are in flight
    ///
    /// Handlers that emit further events extend the wait, so this covers a
    /// whole cascade. Quiescence probe for tests and shutdown only; it is
    /// not an acknowledgment channel.
    pub async fn settled(&self) {
        loop {
            let notified = self.inflight.notify.notified();
            if self.inflight.count.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }
}
