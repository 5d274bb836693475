/// Entity models for CrewDesk
///
/// This module contains every entity the services own, plus the
/// Create/Update input types the action surfaces accept.
///
/// # Models
///
/// - `user`: User accounts, roles, and credentials
/// - `organisation`: Organisations with member and project rosters
/// - `project`: Projects with member and task rosters
/// - `task`: Tasks with comment and attachment rosters
/// - `comment`: Comments under tasks
/// - `token`: Single-use verification/reset tokens
///
/// Each entity type is created, updated, and deleted by exactly one service.
/// The ID lists on a document (`members`, `projects`, `tasks`, `comments`,
/// `attachments`) are weak back-references into collections owned by other
/// services, maintained by propagation handlers, never authoritative.
pub mod comment;
pub mod organisation;
pub mod project;
pub mod task;
pub mod token;
pub mod user;
