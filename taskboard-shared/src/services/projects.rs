/// Project operations
///
/// | Operation | Required |
/// |---|---|
/// | [`list_projects`] | authenticated |
/// | [`create_project`] | authenticated (caller becomes owner) |
/// | [`get_project`] | member |
/// | [`update_project`] | owner |
/// | [`replace_members`] | owner |
/// | [`delete_project`] | owner |

use tracing::info;
use uuid::Uuid;

use super::{gate_project, ServiceError};
use crate::auth::authorization::Operation;
use crate::events::{ChangeEvent, ChangeKind, Relay};
use crate::models::{CreateProject, MemberSet, ProjectDetails, ProjectSummary, UpdateProject};
use crate::store::Store;

/// Input for [`create_project`]
#[derive(Debug, Clone)]
pub struct NewProject {
    pub title: String,
    pub description: String,
    /// Initial team; duplicates are collapsed
    pub team_members: Vec<Uuid>,
}

/// Input for [`update_project`]
#[derive(Debug, Clone, Default)]
pub struct ProjectChanges {
    pub fields: UpdateProject,
    /// When present, the complete desired team, applied with the field update
    pub team_members: Option<Vec<Uuid>>,
}

async fn load_details(store: &dyn Store, project_id: Uuid) -> Result<ProjectDetails, ServiceError> {
    store
        .find_project_details(project_id)
        .await?
        .ok_or(ServiceError::ProjectNotFound(project_id))
}

/// Projects the caller owns or belongs to
pub async fn list_projects(
    store: &dyn Store,
    caller: Uuid,
) -> Result<Vec<ProjectSummary>, ServiceError> {
    Ok(store.list_projects_for_user(caller).await?)
}

/// One project with owner, team and tasks
pub async fn get_project(
    store: &dyn Store,
    caller: Uuid,
    project_id: Uuid,
) -> Result<ProjectDetails, ServiceError> {
    gate_project(store, caller, project_id, Operation::ViewProject).await?;
    load_details(store, project_id).await
}

/// Creates a project owned by the caller, with an optional initial team
///
/// # Errors
///
/// `UnknownUser` if any team member ID does not reference a user; no project
/// is created in that case.
pub async fn create_project(
    store: &dyn Store,
    relay: &dyn Relay,
    caller: Uuid,
    input: NewProject,
) -> Result<ProjectDetails, ServiceError> {
    let members = MemberSet::from_ids(input.team_members);

    let project = store
        .create_project(
            CreateProject {
                title: input.title,
                description: input.description,
                owner_id: caller,
            },
            &members,
        )
        .await?;

    info!(
        user_id = %caller,
        project_id = %project.id,
        members = members.len(),
        "Project created"
    );

    let mut audience = vec![caller];
    audience.extend(members.iter().filter(|id| **id != caller));
    relay.publish(ChangeEvent::new(
        ChangeKind::ProjectCreated,
        project.id,
        None,
        caller,
        audience,
    ));

    load_details(store, project.id).await
}

/// Updates title/description and optionally replaces the team, atomically
///
/// Owner only.
pub async fn update_project(
    store: &dyn Store,
    relay: &dyn Relay,
    caller: Uuid,
    project_id: Uuid,
    changes: ProjectChanges,
) -> Result<ProjectDetails, ServiceError> {
    let before = gate_project(store, caller, project_id, Operation::UpdateProject).await?;

    let members = changes.team_members.map(MemberSet::from_ids);

    store
        .update_project(project_id, changes.fields, members.as_ref())
        .await?
        .ok_or(ServiceError::ProjectNotFound(project_id))?;

    info!(
        user_id = %caller,
        project_id = %project_id,
        team_replaced = members.is_some(),
        "Project updated"
    );

    let mut audience = before.audience();
    if let Some(members) = &members {
        audience.extend(members.iter().filter(|id| !before.members.contains(*id)));
    }
    relay.publish(ChangeEvent::new(
        ChangeKind::ProjectUpdated,
        project_id,
        None,
        caller,
        audience,
    ));

    load_details(store, project_id).await
}

/// Replaces the project's team with `desired`
///
/// Owner only. Idempotent; an empty list removes every member and leaves the
/// owner's access unchanged.
///
/// # Errors
///
/// `UnknownUser` if any ID does not reference a user; the team is left as it
/// was.
pub async fn replace_members(
    store: &dyn Store,
    relay: &dyn Relay,
    caller: Uuid,
    project_id: Uuid,
    desired: Vec<Uuid>,
) -> Result<ProjectDetails, ServiceError> {
    let before = gate_project(store, caller, project_id, Operation::ReplaceMembers).await?;

    let desired = MemberSet::from_ids(desired);
    let delta = store
        .replace_members(project_id, &desired)
        .await?
        .ok_or(ServiceError::ProjectNotFound(project_id))?;

    info!(
        user_id = %caller,
        project_id = %project_id,
        added = delta.added.len(),
        removed = delta.removed.len(),
        "Project team replaced"
    );

    if !delta.is_noop() {
        let mut audience = before.audience();
        audience.extend(delta.added.iter().copied());
        relay.publish(ChangeEvent::new(
            ChangeKind::MembersReplaced,
            project_id,
            None,
            caller,
            audience,
        ));
    }

    load_details(store, project_id).await
}

/// Deletes a project with its tasks and membership
///
/// Owner only.
pub async fn delete_project(
    store: &dyn Store,
    relay: &dyn Relay,
    caller: Uuid,
    project_id: Uuid,
) -> Result<(), ServiceError> {
    let before = gate_project(store, caller, project_id, Operation::DeleteProject).await?;

    if !store.delete_project(project_id).await? {
        return Err(ServiceError::ProjectNotFound(project_id));
    }

    info!(user_id = %caller, project_id = %project_id, "Project deleted");

    relay.publish(ChangeEvent::new(
        ChangeKind::ProjectDeleted,
        project_id,
        None,
        caller,
        before.audience(),
    ));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::authorization::{AccessLevel, AuthzError};
    use crate::events::{BroadcastRelay, NoopRelay};
    use crate::models::{CreateUser, User};
    use crate::store::{MemoryStore, UserStore};

    async fn user(store: &MemoryStore, name: &str) -> User {
        store
            .create_user(CreateUser {
                name: name.to_string(),
                email: format!("{}@example.com", name.to_lowercase()),
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap()
    }

    async fn project(store: &MemoryStore, owner: Uuid, team: Vec<Uuid>) -> ProjectDetails {
        create_project(
            store,
            &NoopRelay,
            owner,
            NewProject {
                title: "Website".to_string(),
                description: "Marketing website rebuild".to_string(),
                team_members: team,
            },
        )
        .await
        .unwrap()
    }

    fn rename(title: &str) -> ProjectChanges {
        ProjectChanges {
            fields: UpdateProject {
                title: Some(title.to_string()),
                description: None,
            },
            team_members: None,
        }
    }

    #[tokio::test]
    async fn test_outsider_forbidden_member_allowed() {
        let store = MemoryStore::new();
        let a = user(&store, "Alice").await;
        let b = user(&store, "Bob").await;
        let p = project(&store, a.id, vec![]).await;
        let id = p.summary.project.id;

        assert!(matches!(
            get_project(&store, b.id, id).await,
            Err(ServiceError::Forbidden(_))
        ));

        replace_members(&store, &NoopRelay, a.id, id, vec![b.id])
            .await
            .unwrap();

        let seen = get_project(&store, b.id, id).await.unwrap();
        assert_eq!(seen.summary.team_members[0].id, b.id);

        let err = update_project(&store, &NoopRelay, b.id, id, rename("Hijacked"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Forbidden(AuthzError::Forbidden {
                actual: AccessLevel::Member,
                ..
            })
        ));
        assert!(matches!(
            replace_members(&store, &NoopRelay, b.id, id, vec![]).await,
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_project_is_not_found_for_everyone() {
        let store = MemoryStore::new();
        let a = user(&store, "Alice").await;
        let missing = Uuid::new_v4();

        assert!(matches!(
            get_project(&store, a.id, missing).await,
            Err(ServiceError::ProjectNotFound(id)) if id == missing
        ));
        assert!(matches!(
            delete_project(&store, &NoopRelay, a.id, missing).await,
            Err(ServiceError::ProjectNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_replace_members_idempotent_and_deduplicated() {
        let store = MemoryStore::new();
        let a = user(&store, "Alice").await;
        let b = user(&store, "Bob").await;
        let c = user(&store, "Carol").await;
        let id = project(&store, a.id, vec![]).await.summary.project.id;

        let first = replace_members(&store, &NoopRelay, a.id, id, vec![b.id, c.id, b.id])
            .await
            .unwrap();
        let second = replace_members(&store, &NoopRelay, a.id, id, vec![c.id, b.id])
            .await
            .unwrap();

        assert_eq!(first.summary.team_members.len(), 2);
        assert_eq!(first.summary.team_members, second.summary.team_members);
    }

    #[tokio::test]
    async fn test_empty_team_keeps_owner_access() {
        let store = MemoryStore::new();
        let a = user(&store, "Alice").await;
        let b = user(&store, "Bob").await;
        let id = project(&store, a.id, vec![b.id]).await.summary.project.id;

        let emptied = replace_members(&store, &NoopRelay, a.id, id, vec![])
            .await
            .unwrap();
        assert!(emptied.summary.team_members.is_empty());

        assert!(get_project(&store, a.id, id).await.is_ok());
        assert!(matches!(
            get_project(&store, b.id, id).await,
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_member_aborts_replacement() {
        let store = MemoryStore::new();
        let a = user(&store, "Alice").await;
        let b = user(&store, "Bob").await;
        let id = project(&store, a.id, vec![b.id]).await.summary.project.id;

        let result =
            replace_members(&store, &NoopRelay, a.id, id, vec![Uuid::new_v4(), b.id]).await;
        assert!(matches!(result, Err(ServiceError::UnknownUser)));

        let unchanged = get_project(&store, a.id, id).await.unwrap();
        assert_eq!(unchanged.summary.team_members.len(), 1);
    }

    #[tokio::test]
    async fn test_update_with_team_is_atomic() {
        let store = MemoryStore::new();
        let a = user(&store, "Alice").await;
        let id = project(&store, a.id, vec![]).await.summary.project.id;

        let mut changes = rename("Renamed");
        changes.team_members = Some(vec![Uuid::new_v4()]);
        assert!(matches!(
            update_project(&store, &NoopRelay, a.id, id, changes).await,
            Err(ServiceError::UnknownUser)
        ));

        let unchanged = get_project(&store, a.id, id).await.unwrap();
        assert_eq!(unchanged.summary.project.title, "Website");
    }

    #[tokio::test]
    async fn test_member_cannot_delete_project() {
        let store = MemoryStore::new();
        let a = user(&store, "Alice").await;
        let b = user(&store, "Bob").await;
        let id = project(&store, a.id, vec![b.id]).await.summary.project.id;

        assert!(matches!(
            delete_project(&store, &NoopRelay, b.id, id).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(get_project(&store, b.id, id).await.is_ok());
    }

    #[tokio::test]
    async fn test_list_projects_owned_and_joined() {
        let store = MemoryStore::new();
        let a = user(&store, "Alice").await;
        let b = user(&store, "Bob").await;
        let c = user(&store, "Carol").await;

        project(&store, a.id, vec![b.id]).await;
        project(&store, b.id, vec![]).await;
        project(&store, c.id, vec![]).await;

        assert_eq!(list_projects(&store, a.id).await.unwrap().len(), 1);
        assert_eq!(list_projects(&store, b.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_events_reach_old_and_new_audience() {
        let store = MemoryStore::new();
        let relay = BroadcastRelay::new(16);
        let a = user(&store, "Alice").await;
        let b = user(&store, "Bob").await;
        let c = user(&store, "Carol").await;
        let id = project(&store, a.id, vec![b.id]).await.summary.project.id;

        let mut rx = relay.subscribe();
        replace_members(&store, &relay, a.id, id, vec![c.id])
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, ChangeKind::MembersReplaced);
        assert!(event.is_visible_to(a.id));
        assert!(event.is_visible_to(b.id));
        assert!(event.is_visible_to(c.id));

        replace_members(&store, &relay, a.id, id, vec![c.id])
            .await
            .unwrap();
        assert!(rx.try_recv().is_err());
    }
}
