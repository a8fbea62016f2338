/// Project model and database operations
///
/// A project has exactly one owner (fixed at creation) and a set of team
/// members stored in `project_members`. Deleting a project cascades to its
/// tasks and membership rows.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(255) NOT NULL,
///     description TEXT NOT NULL,
///     owner_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgExecutor};
use std::collections::HashMap;
use uuid::Uuid;

use super::membership::{self, MemberSet};
use super::task::TaskDetails;
use super::user::UserSummary;

/// Project row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    pub description: String,

    /// Creator; never changes
    pub owner_id: Uuid,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a project
#[derive(Debug, Clone)]
pub struct CreateProject {
    pub title: String,
    pub description: String,
    pub owner_id: Uuid,
}

/// Partial update of project fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateProject {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl UpdateProject {
    pub fn apply_to(&self, project: &mut Project) {
        if let Some(title) = &self.title {
            project.title = title.clone();
        }
        if let Some(description) = &self.description {
            project.description = description.clone();
        }
    }
}

/// Project with its owner and team, as shown in listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSummary {
    #[serde(flatten)]
    pub project: Project,
    pub owner: UserSummary,
    pub team_members: Vec<UserSummary>,
}

/// Full project view: summary plus tasks in creation order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDetails {
    #[serde(flatten)]
    pub summary: ProjectSummary,
    pub tasks: Vec<TaskDetails>,
}

#[derive(sqlx::FromRow)]
struct ProjectWithOwnerRow {
    id: Uuid,
    title: String,
    description: String,
    owner_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    owner_name: String,
    owner_email: String,
}

impl ProjectWithOwnerRow {
    fn into_summary(self, team_members: Vec<UserSummary>) -> ProjectSummary {
        ProjectSummary {
            owner: UserSummary {
                id: self.owner_id,
                name: self.owner_name,
                email: self.owner_email,
            },
            project: Project {
                id: self.id,
                title: self.title,
                description: self.description,
                owner_id: self.owner_id,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
            team_members,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MemberRow {
    project_id: Uuid,
    id: Uuid,
    name: String,
    email: String,
}

const PROJECT_WITH_OWNER_SELECT: &str = r#"
    SELECT p.id, p.title, p.description, p.owner_id, p.created_at, p.updated_at,
           u.name AS owner_name, u.email AS owner_email
    FROM projects p
    JOIN users u ON u.id = p.owner_id
"#;

impl Project {
    /// Inserts a project row
    ///
    /// # Errors
    ///
    /// Fails with a foreign key violation (`projects_owner_id_fkey`) if the
    /// owner does not exist.
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        data: CreateProject,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (title, description, owner_id)
            VALUES ($1, $2, $3)
            RETURNING id, title, description, owner_id, created_at, updated_at
            "#,
        )
        .bind(data.title)
        .bind(data.description)
        .bind(data.owner_id)
        .fetch_one(executor)
        .await
    }

    /// Locks a project row for the rest of the transaction and returns its owner
    ///
    /// Concurrent membership replacements on the same project serialize on
    /// this lock.
    pub async fn lock_for_update(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<Uuid>, sqlx::Error> {
        sqlx::query_scalar("SELECT owner_id FROM projects WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Applies a partial field update
    ///
    /// Returns `None` if the project does not exist.
    pub async fn update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
        data: UpdateProject,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, title, description, owner_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(data.title)
        .bind(data.description)
        .fetch_optional(executor)
        .await
    }

    /// Deletes a project; tasks and membership rows go with it
    ///
    /// Returns true if a row was deleted.
    pub async fn delete<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Loads one project with owner and team
    pub async fn find_summary(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<ProjectSummary>, sqlx::Error> {
        let sql = format!("{PROJECT_WITH_OWNER_SELECT} WHERE p.id = $1");

        let Some(row) = sqlx::query_as::<_, ProjectWithOwnerRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
        else {
            return Ok(None);
        };

        let mut members = load_member_summaries(&mut *conn, &[id]).await?;
        let team = members.remove(&id).unwrap_or_default();

        Ok(Some(row.into_summary(team)))
    }

    /// Lists projects the user owns or belongs to, newest first
    pub async fn list_visible_to(
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<Vec<ProjectSummary>, sqlx::Error> {
        let sql = format!(
            "{PROJECT_WITH_OWNER_SELECT}
             WHERE p.owner_id = $1
                OR EXISTS (
                    SELECT 1 FROM project_members pm
                    WHERE pm.project_id = p.id AND pm.user_id = $1
                )
             ORDER BY p.created_at DESC, p.id ASC"
        );

        let rows = sqlx::query_as::<_, ProjectWithOwnerRow>(&sql)
            .bind(user_id)
            .fetch_all(&mut *conn)
            .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut members = load_member_summaries(&mut *conn, &ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let team = members.remove(&row.id).unwrap_or_default();
                row.into_summary(team)
            })
            .collect())
    }

    /// Loads owner ID and member set in one pass
    ///
    /// Returns `None` if the project does not exist.
    pub async fn load_access(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<(Uuid, MemberSet)>, sqlx::Error> {
        let owner_id: Option<Uuid> =
            sqlx::query_scalar("SELECT owner_id FROM projects WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;

        let Some(owner_id) = owner_id else {
            return Ok(None);
        };

        let members = membership::load_member_ids(&mut *conn, id).await?;
        Ok(Some((owner_id, members)))
    }
}

async fn load_member_summaries(
    conn: &mut PgConnection,
    project_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<UserSummary>>, sqlx::Error> {
    if project_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, MemberRow>(
        r#"
        SELECT pm.project_id, u.id, u.name, u.email
        FROM project_members pm
        JOIN users u ON u.id = pm.user_id
        WHERE pm.project_id = ANY($1)
        ORDER BY u.name ASC, u.id ASC
        "#,
    )
    .bind(project_ids)
    .fetch_all(conn)
    .await?;

    let mut grouped: HashMap<Uuid, Vec<UserSummary>> = HashMap::new();
    for row in rows {
        grouped.entry(row.project_id).or_default().push(UserSummary {
            id: row.id,
            name: row.name,
            email: row.email,
        });
    }

    Ok(grouped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_project() -> Project {
        Project {
            id: Uuid::new_v4(),
            title: "Launch".to_string(),
            description: "Ship the first release".to_string(),
            owner_id: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_update_project_partial() {
        let mut project = sample_project();
        let update = UpdateProject {
            title: Some("Relaunch".to_string()),
            description: None,
        };

        update.apply_to(&mut project);

        assert_eq!(project.title, "Relaunch");
        assert_eq!(project.description, "Ship the first release");
    }

    #[test]
    fn test_details_serialize_flat() {
        let project = sample_project();
        let details = ProjectDetails {
            summary: ProjectSummary {
                owner: UserSummary {
                    id: project.owner_id,
                    name: "Owner".to_string(),
                    email: "owner@example.com".to_string(),
                },
                project: project.clone(),
                team_members: vec![],
            },
            tasks: vec![],
        };

        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["title"], "Launch");
        assert_eq!(json["owner_id"], serde_json::json!(project.owner_id));
        assert_eq!(json["owner"]["email"], "owner@example.com");
        assert!(json["team_members"].as_array().unwrap().is_empty());
        assert!(json["tasks"].as_array().unwrap().is_empty());
    }
}
