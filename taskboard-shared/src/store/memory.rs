/// In-memory store
///
/// All state sits behind one `RwLock`, so every write (including a project
/// update bundled with a team replacement) is applied under a single write
/// guard and readers see either the whole change or none of it. Referenced
/// users are checked before anything is mutated.
///
/// Backs the service and HTTP test suites.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{ProjectStore, StoreError, TaskStore, UserStore};
use crate::auth::authorization::ProjectAccess;
use crate::models::{
    CreateProject, CreateTask, CreateUser, MemberSet, MembershipDelta, Project, ProjectDetails,
    ProjectSummary, Task, TaskDetails, UpdateProject, UpdateTask, User, UserSummary,
};

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    /// Creation order
    projects: Vec<Project>,
    members: HashMap<Uuid, MemberSet>,
    /// Creation order
    tasks: Vec<Task>,
}

impl State {
    fn project(&self, id: Uuid) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    fn summary(&self, id: Uuid) -> Result<UserSummary, StoreError> {
        self.users
            .get(&id)
            .map(User::summary)
            .ok_or(StoreError::UnknownUser)
    }

    fn ensure_users_exist<'a, I>(&self, ids: I) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = &'a Uuid>,
    {
        for id in ids {
            if !self.users.contains_key(id) {
                return Err(StoreError::UnknownUser);
            }
        }
        Ok(())
    }

    fn project_summary(&self, project: &Project) -> Result<ProjectSummary, StoreError> {
        let mut team = Vec::new();
        if let Some(set) = self.members.get(&project.id) {
            for id in set.iter() {
                team.push(self.summary(*id)?);
            }
        }
        team.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

        Ok(ProjectSummary {
            project: project.clone(),
            owner: self.summary(project.owner_id)?,
            team_members: team,
        })
    }

    fn task_details(&self, task: &Task) -> Result<TaskDetails, StoreError> {
        Ok(TaskDetails {
            task: task.clone(),
            assignee: self.summary(task.assigned_to)?,
        })
    }

    /// Caller must have verified that every desired ID is a user
    fn replace_members(&mut self, project_id: Uuid, desired: &MemberSet) -> MembershipDelta {
        let current = self.members.entry(project_id).or_default();
        let delta = MembershipDelta::compute(current, desired);
        *current = desired.clone();
        delta
    }
}

/// Store kept entirely in process memory
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".into()))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, data: CreateUser) -> Result<User, StoreError> {
        let mut state = self.write()?;

        if state.users.values().any(|u| u.email == data.email) {
            return Err(StoreError::DuplicateEmail);
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: data.name,
            email: data.email,
            password_hash: data.password_hash,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn list_users_except(&self, user_id: Uuid) -> Result<Vec<UserSummary>, StoreError> {
        let state = self.read()?;

        let mut users: Vec<UserSummary> = state
            .users
            .values()
            .filter(|u| u.id != user_id)
            .map(User::summary)
            .collect();
        users.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

        Ok(users)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.read().map(|_| ())
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn load_project_access(
        &self,
        project_id: Uuid,
    ) -> Result<Option<ProjectAccess>, StoreError> {
        let state = self.read()?;

        Ok(state.project(project_id).map(|project| {
            ProjectAccess::new(
                project.id,
                project.owner_id,
                state.members.get(&project.id).cloned().unwrap_or_default(),
            )
        }))
    }

    async fn find_project_details(
        &self,
        project_id: Uuid,
    ) -> Result<Option<ProjectDetails>, StoreError> {
        let state = self.read()?;

        let Some(project) = state.project(project_id) else {
            return Ok(None);
        };

        let tasks = state
            .tasks
            .iter()
            .filter(|t| t.project_id == project_id)
            .map(|t| state.task_details(t))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(ProjectDetails {
            summary: state.project_summary(project)?,
            tasks,
        }))
    }

    async fn list_projects_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ProjectSummary>, StoreError> {
        let state = self.read()?;

        state
            .projects
            .iter()
            .rev()
            .filter(|p| {
                p.owner_id == user_id
                    || state
                        .members
                        .get(&p.id)
                        .is_some_and(|set| set.contains(&user_id))
            })
            .map(|p| state.project_summary(p))
            .collect()
    }

    async fn create_project(
        &self,
        data: CreateProject,
        members: &MemberSet,
    ) -> Result<Project, StoreError> {
        let mut state = self.write()?;

        state.ensure_users_exist(std::iter::once(&data.owner_id).chain(members.iter()))?;

        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            title: data.title,
            description: data.description,
            owner_id: data.owner_id,
            created_at: now,
            updated_at: now,
        };

        state.members.insert(project.id, members.clone());
        state.projects.push(project.clone());

        Ok(project)
    }

    async fn update_project(
        &self,
        project_id: Uuid,
        data: UpdateProject,
        members: Option<&MemberSet>,
    ) -> Result<Option<Project>, StoreError> {
        let mut state = self.write()?;

        if state.project(project_id).is_none() {
            return Ok(None);
        }
        if let Some(desired) = members {
            state.ensure_users_exist(desired.iter())?;
            state.replace_members(project_id, desired);
        }

        let Some(project) = state.projects.iter_mut().find(|p| p.id == project_id) else {
            return Ok(None);
        };
        data.apply_to(project);
        project.updated_at = Utc::now();

        Ok(Some(project.clone()))
    }

    async fn replace_members(
        &self,
        project_id: Uuid,
        desired: &MemberSet,
    ) -> Result<Option<MembershipDelta>, StoreError> {
        let mut state = self.write()?;

        if state.project(project_id).is_none() {
            return Ok(None);
        }
        state.ensure_users_exist(desired.iter())?;

        Ok(Some(state.replace_members(project_id, desired)))
    }

    async fn delete_project(&self, project_id: Uuid) -> Result<bool, StoreError> {
        let mut state = self.write()?;

        let before = state.projects.len();
        state.projects.retain(|p| p.id != project_id);
        if state.projects.len() == before {
            return Ok(false);
        }

        state.members.remove(&project_id);
        state.tasks.retain(|t| t.project_id != project_id);

        Ok(true)
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn list_tasks(&self, project_id: Uuid) -> Result<Vec<TaskDetails>, StoreError> {
        let state = self.read()?;

        state
            .tasks
            .iter()
            .filter(|t| t.project_id == project_id)
            .map(|t| state.task_details(t))
            .collect()
    }

    async fn find_task(&self, task_id: Uuid) -> Result<Option<Task>, StoreError> {
        Ok(self
            .read()?
            .tasks
            .iter()
            .find(|t| t.id == task_id)
            .cloned())
    }

    async fn find_task_details(&self, task_id: Uuid) -> Result<Option<TaskDetails>, StoreError> {
        let state = self.read()?;

        state
            .tasks
            .iter()
            .find(|t| t.id == task_id)
            .map(|t| state.task_details(t))
            .transpose()
    }

    async fn create_task(&self, data: CreateTask) -> Result<Task, StoreError> {
        let mut state = self.write()?;

        if state.project(data.project_id).is_none() {
            return Err(StoreError::MissingProject);
        }
        state.ensure_users_exist([&data.assigned_to])?;

        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            project_id: data.project_id,
            assigned_to: data.assigned_to,
            title: data.title,
            description: data.description,
            status: data.status,
            created_at: now,
            updated_at: now,
        };
        state.tasks.push(task.clone());

        Ok(task)
    }

    async fn update_task(
        &self,
        task_id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Task>, StoreError> {
        let mut state = self.write()?;

        if let Some(assignee) = &data.assigned_to {
            state.ensure_users_exist([assignee])?;
        }

        let Some(task) = state.tasks.iter_mut().find(|t| t.id == task_id) else {
            return Ok(None);
        };
        data.apply_to(task);
        task.updated_at = Utc::now();

        Ok(Some(task.clone()))
    }

    async fn delete_task(&self, task_id: Uuid) -> Result<bool, StoreError> {
        let mut state = self.write()?;

        let before = state.tasks.len();
        state.tasks.retain(|t| t.id != task_id);

        Ok(state.tasks.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskStatus;

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

    async fn project(store: &MemoryStore, owner: Uuid, members: &[Uuid]) -> Project {
        store
            .create_project(
                CreateProject {
                    title: "Website".to_string(),
                    description: "Marketing website rebuild".to_string(),
                    owner_id: owner,
                },
                &MemberSet::from_ids(members.iter().copied()),
            )
            .await
            .unwrap()
    }

    fn new_task(project_id: Uuid, assignee: Uuid) -> CreateTask {
        CreateTask {
            project_id,
            assigned_to: assignee,
            title: "Draft copy".to_string(),
            description: "Write the landing page copy".to_string(),
            status: TaskStatus::Pending,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = MemoryStore::new();
        user(&store, "Ada").await;

        let result = store
            .create_user(CreateUser {
                name: "Other Ada".to_string(),
                email: "ada@example.com".to_string(),
                password_hash: "hash".to_string(),
            })
            .await;
        assert!(matches!(result, Err(StoreError::DuplicateEmail)));
    }

    #[tokio::test]
    async fn test_list_users_except_caller_sorted() {
        let store = MemoryStore::new();
        let zed = user(&store, "Zed").await;
        user(&store, "Bob").await;
        user(&store, "Amy").await;

        let names: Vec<String> = store
            .list_users_except(zed.id)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.name)
            .collect();
        assert_eq!(names, vec!["Amy", "Bob"]);
    }

    #[tokio::test]
    async fn test_create_project_with_unknown_member_creates_nothing() {
        let store = MemoryStore::new();
        let owner = user(&store, "Owner").await;

        let result = store
            .create_project(
                CreateProject {
                    title: "Ghost".to_string(),
                    description: "Has a ghost member".to_string(),
                    owner_id: owner.id,
                },
                &MemberSet::from_ids([Uuid::new_v4()]),
            )
            .await;

        assert!(matches!(result, Err(StoreError::UnknownUser)));
        assert!(store.list_projects_for_user(owner.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replace_members_unknown_user_leaves_team_untouched() {
        let store = MemoryStore::new();
        let owner = user(&store, "Owner").await;
        let member = user(&store, "Member").await;
        let p = project(&store, owner.id, &[member.id]).await;

        let result = store
            .replace_members(p.id, &MemberSet::from_ids([Uuid::new_v4()]))
            .await;
        assert!(matches!(result, Err(StoreError::UnknownUser)));

        let access = store.load_project_access(p.id).await.unwrap().unwrap();
        assert_eq!(access.members, MemberSet::from_ids([member.id]));
    }

    #[tokio::test]
    async fn test_update_project_bundles_members_atomically() {
        let store = MemoryStore::new();
        let owner = user(&store, "Owner").await;
        let p = project(&store, owner.id, &[]).await;

        let result = store
            .update_project(
                p.id,
                UpdateProject {
                    title: Some("Renamed".to_string()),
                    description: None,
                },
                Some(&MemberSet::from_ids([Uuid::new_v4()])),
            )
            .await;
        assert!(matches!(result, Err(StoreError::UnknownUser)));

        let details = store.find_project_details(p.id).await.unwrap().unwrap();
        assert_eq!(details.summary.project.title, "Website");
    }

    #[tokio::test]
    async fn test_delete_project_cascades() {
        let store = MemoryStore::new();
        let owner = user(&store, "Owner").await;
        let member = user(&store, "Member").await;
        let p = project(&store, owner.id, &[member.id]).await;
        let task = store.create_task(new_task(p.id, member.id)).await.unwrap();

        assert!(store.delete_project(p.id).await.unwrap());
        assert!(!store.delete_project(p.id).await.unwrap());

        assert!(store.load_project_access(p.id).await.unwrap().is_none());
        assert!(store.find_task(task.id).await.unwrap().is_none());
        assert!(store.list_projects_for_user(member.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_task_checks_references() {
        let store = MemoryStore::new();
        let owner = user(&store, "Owner").await;
        let p = project(&store, owner.id, &[]).await;

        assert!(matches!(
            store.create_task(new_task(p.id, Uuid::new_v4())).await,
            Err(StoreError::UnknownUser)
        ));
        assert!(matches!(
            store.create_task(new_task(Uuid::new_v4(), owner.id)).await,
            Err(StoreError::MissingProject)
        ));
    }

    #[tokio::test]
    async fn test_tasks_listed_in_creation_order() {
        let store = MemoryStore::new();
        let owner = user(&store, "Owner").await;
        let p = project(&store, owner.id, &[]).await;

        let first = store.create_task(new_task(p.id, owner.id)).await.unwrap();
        let second = store.create_task(new_task(p.id, owner.id)).await.unwrap();

        let ids: Vec<Uuid> = store
            .list_tasks(p.id)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.task.id)
            .collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_readers_never_see_partial_team() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let owner = user(&store, "Owner").await;
        let mut ids = Vec::new();
        for i in 0..5 {
            ids.push(user(&store, &format!("Member{i}")).await.id);
        }
        let first = MemberSet::from_ids(ids[..2].iter().copied());
        let second = MemberSet::from_ids(ids[2..].iter().copied());
        let project_id = project(&store, owner.id, &ids[..2]).await.id;

        let writer = {
            let store = store.clone();
            let (first, second) = (first.clone(), second.clone());
            tokio::spawn(async move {
                for round in 0..200 {
                    let desired = if round % 2 == 0 { &second } else { &first };
                    store.replace_members(project_id, desired).await.unwrap();
                    tokio::task::yield_now().await;
                }
            })
        };

        let readers: Vec<_> = (0..3)
            .map(|_| {
                let store = store.clone();
                let (first, second) = (first.clone(), second.clone());
                tokio::spawn(async move {
                    for _ in 0..200 {
                        let access = store
                            .load_project_access(project_id)
                            .await
                            .unwrap()
                            .unwrap();
                        assert!(access.members == first || access.members == second);

                        let details = store
                            .find_project_details(project_id)
                            .await
                            .unwrap()
                            .unwrap();
                        let team = MemberSet::from_ids(
                            details.summary.team_members.iter().map(|member| member.id),
                        );
                        assert!(team == first || team == second);
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        writer.await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }
    }
}
