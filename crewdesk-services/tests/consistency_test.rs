/// Integration tests for cross-service consistency
///
/// Every test drives a fully wired node through the real service calls and
/// then waits for the event bus to settle, so assertions observe the state
/// after propagation — the same guarantee a deployment converges to.
mod common;

use common::TestContext;
use crewdesk_shared::bus::event::{DomainEvent, UserOrgAdded};
use crewdesk_shared::models::comment::CreateComment;
use crewdesk_shared::models::project::CreateProject;
use crewdesk_shared::models::task::CreateTask;
use crewdesk_shared::models::token::TokenKind;
use crewdesk_shared::models::user::Role;
use uuid::Uuid;

fn new_task(name: &str, project: Uuid) -> CreateTask {
    CreateTask {
        name: name.to_string(),
        description: None,
        project,
        assignee: None,
        due_date: None,
        priority: None,
    }
}

/// A creation whose foreign key does not exist is rejected before any
/// write: no document, no event, nothing to roll back.
#[tokio::test]
async fn test_missing_reference_rejects_without_side_effects() {
    let ctx = TestContext::new().await;
    let ghost_org = Uuid::new_v4();

    let err = ctx
        .node
        .projects
        .create(
            &ctx.admin_ctx,
            CreateProject {
                name: "Orphan".to_string(),
                organisation: ghost_org,
                budget: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "not_found");

    ctx.node.settled().await;
    assert!(ctx.node.projects.list().await.is_empty());
}

/// A caller without the required role is rejected with no side effect,
/// even when every referenced document exists.
#[tokio::test]
async fn test_forbidden_caller_leaves_no_trace() {
    let ctx = TestContext::new().await;
    let org = ctx.create_org("Acme").await;
    let (_, employee_ctx) = ctx.register_user("Eve", Role::Employee).await;

    let err = ctx
        .node
        .projects
        .create(
            &employee_ctx,
            CreateProject {
                name: "P1".to_string(),
                organisation: org.id,
                budget: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "forbidden");

    ctx.node.settled().await;
    assert!(ctx.node.projects.list().await.is_empty());
    let org = ctx.node.organisations.get(org.id).await.unwrap();
    assert!(org.projects.is_empty());
}

/// Creating a task mirrors its ID onto the owning project once the bus
/// settles; creating a project mirrors onto the organisation.
#[tokio::test]
async fn test_creation_events_converge_rosters() {
    let ctx = TestContext::new().await;
    let org = ctx.create_org("Acme").await;
    let project = ctx.create_project("P1", org.id).await;

    let org_after = ctx.node.organisations.get(org.id).await.unwrap();
    assert_eq!(org_after.projects, vec![project.id]);

    let task = ctx
        .node
        .tasks
        .create(&ctx.admin_ctx, new_task("Ship it", project.id))
        .await
        .unwrap();
    ctx.node.settled().await;

    let project_after = ctx.node.projects.get(project.id).await.unwrap();
    assert_eq!(project_after.tasks, vec![task.id]);
}

/// Delivering the same event twice leaves the same state as delivering it
/// once.
#[tokio::test]
async fn test_duplicate_events_are_idempotent() {
    let ctx = TestContext::new().await;
    let org = ctx.create_org("Acme").await;
    let user_id = ctx.admin.id;

    let events = ctx.node.events();
    events.emit(DomainEvent::UserOrgAdded(UserOrgAdded {
        org: org.id,
        user: user_id,
    }));
    events.emit(DomainEvent::UserOrgAdded(UserOrgAdded {
        org: org.id,
        user: user_id,
    }));
    ctx.node.settled().await;

    let org_after = ctx.node.organisations.get(org.id).await.unwrap();
    assert_eq!(org_after.members, vec![user_id]);
}

/// Project membership mirrors onto the user document and unwinds again.
#[tokio::test]
async fn test_membership_mirrors_on_user() {
    let ctx = TestContext::new().await;
    let org = ctx.create_org("Acme").await;
    let project = ctx.create_project("P1", org.id).await;
    let (member, _) = ctx.register_user("Mallory", Role::Employee).await;

    ctx.node
        .projects
        .add_member(&ctx.admin_ctx, project.id, member.id)
        .await
        .unwrap();
    ctx.node.settled().await;
    assert_eq!(
        ctx.node.users.get(member.id).await.unwrap().projects,
        vec![project.id]
    );

    ctx.node
        .projects
        .remove_member(&ctx.admin_ctx, project.id, member.id)
        .await
        .unwrap();
    ctx.node.settled().await;
    assert!(ctx.node.users.get(member.id).await.unwrap().projects.is_empty());
}

/// Removing an organisation cascades: projects go, their tasks go, the
/// tasks' comments go, and affected users fall back to the default role.
#[tokio::test]
async fn test_organisation_removal_cascades_to_comments() {
    let ctx = TestContext::new().await;
    let org = ctx.create_org("Acme").await;
    let project = ctx.create_project("P1", org.id).await;
    let task = ctx
        .node
        .tasks
        .create(&ctx.admin_ctx, new_task("Ship it", project.id))
        .await
        .unwrap();
    ctx.node
        .tasks
        .create_comment(
            &ctx.admin_ctx,
            CreateComment {
                task: task.id,
                text: "on it".to_string(),
            },
        )
        .await
        .unwrap();
    ctx.node.settled().await;

    let (pm, _) = ctx.register_user("Pat", Role::ProjectManager).await;
    ctx.node
        .users
        .assign_organisation(&ctx.admin_ctx, pm.id, org.id)
        .await
        .unwrap();
    ctx.node.settled().await;

    ctx.node
        .organisations
        .remove(&ctx.admin_ctx, org.id)
        .await
        .unwrap();
    ctx.node.settled().await;

    assert!(ctx.node.projects.list().await.is_empty());
    assert!(ctx.node.tasks.list_by_project(project.id).await.is_empty());
    assert!(ctx.node.tasks.list_comments(task.id).await.is_empty());

    let pm_after = ctx.node.users.get(pm.id).await.unwrap();
    assert_eq!(pm_after.organisation, None);
    assert_eq!(pm_after.role, Role::Employee);
}

/// Removing a project reaps its tasks and drops the organisation's roster
/// entry within one propagation cycle.
#[tokio::test]
async fn test_project_removal_reaps_tasks_and_roster() {
    let ctx = TestContext::new().await;
    let org = ctx.create_org("Acme").await;
    let project = ctx.create_project("P1", org.id).await;
    ctx.node
        .tasks
        .create(&ctx.admin_ctx, new_task("Ship it", project.id))
        .await
        .unwrap();
    ctx.node.settled().await;

    ctx.node
        .projects
        .remove(&ctx.admin_ctx, project.id)
        .await
        .unwrap();
    ctx.node.settled().await;

    assert!(ctx.node.tasks.list_by_project(project.id).await.is_empty());
    let org_after = ctx.node.organisations.get(org.id).await.unwrap();
    assert!(org_after.projects.is_empty());
}

/// Removing a user clears their task assignments and organisation roster
/// entry.
#[tokio::test]
async fn test_user_removal_unwinds_references() {
    let ctx = TestContext::new().await;
    let org = ctx.create_org("Acme").await;
    let project = ctx.create_project("P1", org.id).await;
    let (member, _) = ctx.register_user("Mallory", Role::Employee).await;
    ctx.node
        .users
        .assign_organisation(&ctx.admin_ctx, member.id, org.id)
        .await
        .unwrap();
    let task = ctx
        .node
        .tasks
        .create(
            &ctx.admin_ctx,
            CreateTask {
                assignee: Some(member.id),
                ..new_task("Ship it", project.id)
            },
        )
        .await
        .unwrap();
    ctx.node.settled().await;

    ctx.node
        .users
        .remove(&ctx.admin_ctx, member.id)
        .await
        .unwrap();
    ctx.node.settled().await;

    assert_eq!(ctx.node.tasks.get(task.id).await.unwrap().assignee, None);
    let org_after = ctx.node.organisations.get(org.id).await.unwrap();
    assert!(!org_after.members.contains(&member.id));
}

/// Comments check their author over the action bus and converge onto the
/// task's roster; removal is allowed for the author or an admin.
#[tokio::test]
async fn test_comment_lifecycle() {
    let ctx = TestContext::new().await;
    let org = ctx.create_org("Acme").await;
    let project = ctx.create_project("P1", org.id).await;
    let task = ctx
        .node
        .tasks
        .create(&ctx.admin_ctx, new_task("Ship it", project.id))
        .await
        .unwrap();
    let (_, author_ctx) = ctx.register_user("Eve", Role::Employee).await;
    let (_, other_ctx) = ctx.register_user("Oscar", Role::Employee).await;

    let comment = ctx
        .node
        .tasks
        .create_comment(
            &author_ctx,
            CreateComment {
                task: task.id,
                text: "looks good".to_string(),
            },
        )
        .await
        .unwrap();
    ctx.node.settled().await;
    assert_eq!(
        ctx.node.tasks.get(task.id).await.unwrap().comments,
        vec![comment.id]
    );

    // A third party may not delete someone else's comment.
    let err = ctx
        .node
        .tasks
        .remove_comment(&other_ctx, comment.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "forbidden");

    ctx.node
        .tasks
        .remove_comment(&author_ctx, comment.id)
        .await
        .unwrap();
    ctx.node.settled().await;
    assert!(ctx.node.tasks.get(task.id).await.unwrap().comments.is_empty());
}

/// The expired-token sweep only touches tokens past their expiry.
#[tokio::test]
async fn test_token_sweep_on_node() {
    let ctx = TestContext::new().await;

    ctx.node
        .tokens
        .generate(
            TokenKind::PasswordReset,
            ctx.admin.id,
            Some(chrono::Duration::seconds(-1)),
        )
        .await
        .unwrap();
    ctx.node
        .tokens
        .generate(TokenKind::PasswordReset, ctx.admin.id, None)
        .await
        .unwrap();

    assert_eq!(ctx.node.tokens.sweep_expired().await, 1);
    assert_eq!(ctx.node.tokens.count().await, 1);
}

/// Full password reset through the user service on a wired node.
#[tokio::test]
async fn test_password_reset_flow() {
    let ctx = TestContext::new().await;

    let secret = ctx
        .node
        .users
        .request_password_reset("admin@example.com")
        .await
        .unwrap();
    ctx.node
        .users
        .reset_password(&secret, "a fresh password")
        .await
        .unwrap();

    assert!(ctx
        .node
        .users
        .authenticate("admin@example.com", "a fresh password")
        .await
        .is_ok());
}
