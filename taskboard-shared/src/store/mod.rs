/// Persistence layer
///
/// The access-control core never reaches for a global database handle; every
/// service function receives a `&dyn Store`. Two backends implement it:
///
/// - [`PgStore`]: PostgreSQL via sqlx, multi-statement writes in transactions
/// - [`MemoryStore`]: a single `RwLock` over in-process maps, used by tests
///
/// Both give the same guarantees: a membership replacement, alone or bundled
/// with a project field update, is applied entirely or not at all, and readers
/// never observe a half-applied member set.

use async_trait::async_trait;
use uuid::Uuid;

use crate::auth::authorization::ProjectAccess;
use crate::models::{
    CreateProject, CreateTask, CreateUser, MemberSet, MembershipDelta, Project, ProjectDetails,
    ProjectSummary, Task, TaskDetails, UpdateProject, UpdateTask, User, UserSummary,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Storage failure
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A referenced user (member or assignee) does not exist
    #[error("Referenced user does not exist")]
    UnknownUser,

    /// The project a write refers to no longer exists
    #[error("Referenced project does not exist")]
    MissingProject,

    #[error("Email address is already registered")]
    DuplicateEmail,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `DuplicateEmail` if the address is taken
    async fn create_user(&self, data: CreateUser) -> Result<User, StoreError>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Everyone but `user_id`, ordered by name
    async fn list_users_except(&self, user_id: Uuid) -> Result<Vec<UserSummary>, StoreError>;

    /// Verifies the backing storage is reachable
    async fn ping(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Loads the owner ID and member set of a project in one pass
    async fn load_project_access(
        &self,
        project_id: Uuid,
    ) -> Result<Option<ProjectAccess>, StoreError>;

    /// Project with owner, team and tasks
    async fn find_project_details(
        &self,
        project_id: Uuid,
    ) -> Result<Option<ProjectDetails>, StoreError>;

    /// Projects the user owns or is a member of, newest first
    async fn list_projects_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ProjectSummary>, StoreError>;

    /// Creates a project and its initial team atomically
    ///
    /// Fails with `UnknownUser` (and creates nothing) if any member ID does
    /// not reference a user.
    async fn create_project(
        &self,
        data: CreateProject,
        members: &MemberSet,
    ) -> Result<Project, StoreError>;

    /// Updates fields and, when `members` is given, replaces the team in the
    /// same atomic unit
    ///
    /// Returns `None` if the project does not exist.
    async fn update_project(
        &self,
        project_id: Uuid,
        data: UpdateProject,
        members: Option<&MemberSet>,
    ) -> Result<Option<Project>, StoreError>;

    /// Replaces the team with `desired`, returning the applied delta
    ///
    /// Returns `None` if the project does not exist. Fails with `UnknownUser`
    /// (leaving the team untouched) if any desired ID does not reference a user.
    async fn replace_members(
        &self,
        project_id: Uuid,
        desired: &MemberSet,
    ) -> Result<Option<MembershipDelta>, StoreError>;

    /// Deletes a project together with its tasks and membership rows
    ///
    /// Returns false if the project did not exist.
    async fn delete_project(&self, project_id: Uuid) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Tasks of a project with assignees, in creation order
    async fn list_tasks(&self, project_id: Uuid) -> Result<Vec<TaskDetails>, StoreError>;

    async fn find_task(&self, task_id: Uuid) -> Result<Option<Task>, StoreError>;

    async fn find_task_details(&self, task_id: Uuid) -> Result<Option<TaskDetails>, StoreError>;

    /// Fails with `UnknownUser` for a nonexistent assignee and
    /// `MissingProject` if the project vanished
    async fn create_task(&self, data: CreateTask) -> Result<Task, StoreError>;

    /// Returns `None` if the task does not exist
    async fn update_task(&self, task_id: Uuid, data: UpdateTask)
        -> Result<Option<Task>, StoreError>;

    /// Returns false if the task did not exist
    async fn delete_task(&self, task_id: Uuid) -> Result<bool, StoreError>;
}

/// Everything the services need from persistence
pub trait Store: UserStore + ProjectStore + TaskStore {}

impl<T> Store for T where T: UserStore + ProjectStore + TaskStore {}
