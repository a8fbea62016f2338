/// Task model and database operations
///
/// Tasks belong to exactly one project and are assigned to exactly one user.
/// The assignee need not be a member of the project.
///
/// # Status
///
/// [`TaskStatus`] has three states and no workflow: any authorized update may
/// move a task to any status, including reopening a completed task.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('pending', 'in_progress', 'completed');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     assigned_to UUID NOT NULL REFERENCES users(id),
///     title VARCHAR(255) NOT NULL,
///     description TEXT NOT NULL,
///     status task_status NOT NULL DEFAULT 'pending',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

use super::user::UserSummary;

/// Task status
///
/// Serialized as the labels clients display (`"Pending"`, `"In Progress"`,
/// `"Completed"`); `"In-Progress"` is accepted on input. Stored as the
/// `task_status` PostgreSQL enum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "Pending")]
    Pending,

    #[serde(rename = "In Progress", alias = "In-Progress")]
    InProgress,

    #[serde(rename = "Completed")]
    Completed,
}

impl TaskStatus {
    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Completed => "Completed",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Task row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,

    /// Owning project (immutable)
    pub project_id: Uuid,

    /// Assignee; any existing user
    pub assigned_to: Uuid,

    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a task
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub project_id: Uuid,
    pub assigned_to: Uuid,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
}

/// Partial task update; `None` fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub assigned_to: Option<Uuid>,
}

impl UpdateTask {
    /// Applies the non-`None` fields to `task` in place
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(assigned_to) = self.assigned_to {
            task.assigned_to = assigned_to;
        }
    }
}

/// Task joined with its assignee's public profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDetails {
    #[serde(flatten)]
    pub task: Task,
    pub assignee: UserSummary,
}

#[derive(sqlx::FromRow)]
struct TaskDetailsRow {
    id: Uuid,
    project_id: Uuid,
    assigned_to: Uuid,
    title: String,
    description: String,
    status: TaskStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    assignee_name: String,
    assignee_email: String,
}

impl From<TaskDetailsRow> for TaskDetails {
    fn from(row: TaskDetailsRow) -> Self {
        Self {
            assignee: UserSummary {
                id: row.assigned_to,
                name: row.assignee_name,
                email: row.assignee_email,
            },
            task: Task {
                id: row.id,
                project_id: row.project_id,
                assigned_to: row.assigned_to,
                title: row.title,
                description: row.description,
                status: row.status,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
        }
    }
}

const TASK_COLUMNS: &str =
    "id, project_id, assigned_to, title, description, status, created_at, updated_at";

const TASK_DETAILS_SELECT: &str = r#"
    SELECT t.id, t.project_id, t.assigned_to, t.title, t.description, t.status,
           t.created_at, t.updated_at,
           u.name AS assignee_name, u.email AS assignee_email
    FROM tasks t
    JOIN users u ON u.id = t.assigned_to
"#;

impl Task {
    /// Creates a task
    ///
    /// # Errors
    ///
    /// Fails with a foreign key violation if the project
    /// (`tasks_project_id_fkey`) or the assignee (`tasks_assigned_to_fkey`)
    /// does not exist.
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        data: CreateTask,
    ) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO tasks (project_id, assigned_to, title, description, status)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {TASK_COLUMNS}"
        );

        sqlx::query_as::<_, Task>(&sql)
            .bind(data.project_id)
            .bind(data.assigned_to)
            .bind(data.title)
            .bind(data.description)
            .bind(data.status)
            .fetch_one(executor)
            .await
    }

    /// Finds a task by ID
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1");

        sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Finds a task with its assignee
    pub async fn find_details<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<TaskDetails>, sqlx::Error> {
        let sql = format!("{TASK_DETAILS_SELECT} WHERE t.id = $1");

        let row = sqlx::query_as::<_, TaskDetailsRow>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(row.map(TaskDetails::from))
    }

    /// Lists a project's tasks with assignees, in creation order
    pub async fn list_for_project<'e, E: PgExecutor<'e>>(
        executor: E,
        project_id: Uuid,
    ) -> Result<Vec<TaskDetails>, sqlx::Error> {
        let sql = format!(
            "{TASK_DETAILS_SELECT} WHERE t.project_id = $1 ORDER BY t.created_at ASC, t.id ASC"
        );

        let rows = sqlx::query_as::<_, TaskDetailsRow>(&sql)
            .bind(project_id)
            .fetch_all(executor)
            .await?;

        Ok(rows.into_iter().map(TaskDetails::from).collect())
    }

    /// Applies a partial update
    ///
    /// Returns `None` if the task does not exist.
    pub async fn update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE tasks
             SET title = COALESCE($2, title),
                 description = COALESCE($3, description),
                 status = COALESCE($4, status),
                 assigned_to = COALESCE($5, assigned_to),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {TASK_COLUMNS}"
        );

        sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .bind(data.title)
            .bind(data.description)
            .bind(data.status)
            .bind(data.assigned_to)
            .fetch_optional(executor)
            .await
    }

    /// Deletes a task
    ///
    /// Returns true if a row was deleted.
    pub async fn delete<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
