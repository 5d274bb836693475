/// The internal service bus
///
/// Two channels with very different contracts:
///
/// - `event`: fire-and-forget domain events. At-most-once, unordered across
///   subscribers, no acknowledgment. Subscribers keep their own denormalized
///   back-references consistent by applying these events idempotently.
/// - `action`: synchronous request/response calls between services, with a
///   bounded timeout and a retry budget for idempotent read-only checks.
///   This is how a service verifies foreign-key existence and delegates
///   authorization before committing a write.
pub mod action;
pub mod event;

pub use action::{ActionBus, OrganisationActions, ProjectActions, TaskActions, UserActions};
pub use event::{DomainEvent, EventBus, EventHandler};
