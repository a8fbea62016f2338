/// PostgreSQL store
///
/// Thin adapter from the store traits to the model SQL. Anything that touches
/// more than one statement runs in a transaction; membership replacement also
/// locks the project row so concurrent replacements on one project serialize.
///
/// Integrity failures are recognized by constraint name and surfaced as typed
/// [`StoreError`] variants so the services can report them as conflicts.

use async_trait::async_trait;
use sqlx::error::ErrorKind;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, error};
use uuid::Uuid;

use super::{ProjectStore, StoreError, TaskStore, UserStore};
use crate::auth::authorization::ProjectAccess;
use crate::db::pool::health_check;
use crate::models::membership::{self, MemberSet, MembershipDelta};
use crate::models::{
    CreateProject, CreateTask, CreateUser, Project, ProjectDetails, ProjectSummary, Task,
    TaskDetails, UpdateProject, UpdateTask, User, UserSummary,
};

const TASKS_PROJECT_FK: &str = "tasks_project_id_fkey";
const MEMBERS_PROJECT_FK: &str = "project_members_project_id_fkey";
const USERS_EMAIL_KEY: &str = "users_email_key";

/// Store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Maps constraint violations to typed store errors
fn map_db_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        match db.kind() {
            ErrorKind::ForeignKeyViolation => {
                return match db.constraint() {
                    Some(TASKS_PROJECT_FK) | Some(MEMBERS_PROJECT_FK) => StoreError::MissingProject,
                    _ => StoreError::UnknownUser,
                };
            }
            ErrorKind::UniqueViolation if db.constraint() == Some(USERS_EMAIL_KEY) => {
                return StoreError::DuplicateEmail;
            }
            _ => {}
        }
    }

    error!(error = %err, "Database operation failed");
    StoreError::Database(err)
}

/// Applies a membership replacement on a connection that already holds the
/// project row lock
async fn apply_membership(
    conn: &mut PgConnection,
    project_id: Uuid,
    desired: &MemberSet,
) -> Result<MembershipDelta, sqlx::Error> {
    let current = membership::load_member_ids(&mut *conn, project_id).await?;
    let delta = MembershipDelta::compute(&current, desired);

    membership::remove_members(&mut *conn, project_id, &delta.removed).await?;
    membership::add_members(&mut *conn, project_id, &delta.added).await?;

    debug!(
        project_id = %project_id,
        added = delta.added.len(),
        removed = delta.removed.len(),
        retained = delta.retained.len(),
        "Applied membership delta"
    );

    Ok(delta)
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, data: CreateUser) -> Result<User, StoreError> {
        User::create(&self.pool, data).await.map_err(map_db_error)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        User::find_by_id(&self.pool, id).await.map_err(map_db_error)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        User::find_by_email(&self.pool, email)
            .await
            .map_err(map_db_error)
    }

    async fn list_users_except(&self, user_id: Uuid) -> Result<Vec<UserSummary>, StoreError> {
        User::list_except(&self.pool, user_id)
            .await
            .map_err(map_db_error)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        health_check(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl ProjectStore for PgStore {
    async fn load_project_access(
        &self,
        project_id: Uuid,
    ) -> Result<Option<ProjectAccess>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(map_db_error)?;

        let access = Project::load_access(&mut conn, project_id)
            .await
            .map_err(map_db_error)?;

        Ok(access.map(|(owner_id, members)| ProjectAccess::new(project_id, owner_id, members)))
    }

    async fn find_project_details(
        &self,
        project_id: Uuid,
    ) -> Result<Option<ProjectDetails>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(map_db_error)?;

        let Some(summary) = Project::find_summary(&mut conn, project_id)
            .await
            .map_err(map_db_error)?
        else {
            return Ok(None);
        };

        let tasks = Task::list_for_project(&mut *conn, project_id)
            .await
            .map_err(map_db_error)?;

        Ok(Some(ProjectDetails { summary, tasks }))
    }

    async fn list_projects_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ProjectSummary>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(map_db_error)?;

        Project::list_visible_to(&mut conn, user_id)
            .await
            .map_err(map_db_error)
    }

    async fn create_project(
        &self,
        data: CreateProject,
        members: &MemberSet,
    ) -> Result<Project, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let project = Project::create(&mut *tx, data)
            .await
            .map_err(map_db_error)?;

        membership::add_members(&mut *tx, project.id, &members.to_vec())
            .await
            .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(project)
    }

    async fn update_project(
        &self,
        project_id: Uuid,
        data: UpdateProject,
        members: Option<&MemberSet>,
    ) -> Result<Option<Project>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        if Project::lock_for_update(&mut tx, project_id)
            .await
            .map_err(map_db_error)?
            .is_none()
        {
            return Ok(None);
        }

        let updated = Project::update(&mut *tx, project_id, data)
            .await
            .map_err(map_db_error)?;

        if let Some(desired) = members {
            apply_membership(&mut tx, project_id, desired)
                .await
                .map_err(map_db_error)?;
        }

        tx.commit().await.map_err(map_db_error)?;
        Ok(updated)
    }

    async fn replace_members(
        &self,
        project_id: Uuid,
        desired: &MemberSet,
    ) -> Result<Option<MembershipDelta>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        if Project::lock_for_update(&mut tx, project_id)
            .await
            .map_err(map_db_error)?
            .is_none()
        {
            return Ok(None);
        }

        let delta = apply_membership(&mut tx, project_id, desired)
            .await
            .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(Some(delta))
    }

    async fn delete_project(&self, project_id: Uuid) -> Result<bool, StoreError> {
        Project::delete(&self.pool, project_id)
            .await
            .map_err(map_db_error)
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn list_tasks(&self, project_id: Uuid) -> Result<Vec<TaskDetails>, StoreError> {
        Task::list_for_project(&self.pool, project_id)
            .await
            .map_err(map_db_error)
    }

    async fn find_task(&self, task_id: Uuid) -> Result<Option<Task>, StoreError> {
        Task::find_by_id(&self.pool, task_id)
            .await
            .map_err(map_db_error)
    }

    async fn find_task_details(&self, task_id: Uuid) -> Result<Option<TaskDetails>, StoreError> {
        Task::find_details(&self.pool, task_id)
            .await
            .map_err(map_db_error)
    }

    async fn create_task(&self, data: CreateTask) -> Result<Task, StoreError> {
        Task::create(&self.pool, data).await.map_err(map_db_error)
    }

    async fn update_task(
        &self,
        task_id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Task>, StoreError> {
        Task::update(&self.pool, task_id, data)
            .await
            .map_err(map_db_error)
    }

    async fn delete_task(&self, task_id: Uuid) -> Result<bool, StoreError> {
        Task::delete(&self.pool, task_id)
            .await
            .map_err(map_db_error)
    }
}
