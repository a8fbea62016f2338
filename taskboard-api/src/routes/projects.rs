/// Project endpoints
///
/// # Endpoints
///
/// - `GET /v1/projects` - Projects the caller owns or belongs to
/// - `POST /v1/projects` - Create a project owned by the caller
/// - `GET /v1/projects/:id` - One project with owner, team and tasks (member)
/// - `PATCH /v1/projects/:id` - Update title/description, optionally the team (owner)
/// - `PUT /v1/projects/:id/members` - Replace the team (owner)
/// - `DELETE /v1/projects/:id` - Delete with tasks and team (owner)
///
/// A missing project is always `404`, checked before access; a caller
/// without the required standing gets `403`.

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use taskboard_shared::{
    auth::middleware::AuthContext,
    models::{ProjectDetails, ProjectSummary, UpdateProject},
    services::projects::{self, NewProject, ProjectChanges},
};
use uuid::Uuid;
use validator::Validate;

/// Create project request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 3, max = 200, message = "Title must be between 3 and 200 characters"))]
    pub title: String,

    #[validate(length(min = 10, message = "Description must be at least 10 characters"))]
    pub description: String,

    /// Initial team (user IDs); the caller need not be listed
    #[serde(default)]
    pub team_members: Vec<Uuid>,
}

/// Update project request
///
/// Absent fields are left unchanged. When `team_members` is present it is the
/// complete desired team and is applied together with the field changes.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    #[validate(length(min = 3, max = 200, message = "Title must be between 3 and 200 characters"))]
    pub title: Option<String>,

    #[validate(length(min = 10, message = "Description must be at least 10 characters"))]
    pub description: Option<String>,

    pub team_members: Option<Vec<Uuid>>,
}

/// Replace team request
#[derive(Debug, Deserialize)]
pub struct ReplaceMembersRequest {
    pub user_ids: Vec<Uuid>,
}

pub async fn list_projects(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<ProjectSummary>>> {
    let projects = projects::list_projects(state.store.as_ref(), auth.user_id).await?;
    Ok(Json(projects))
}

/// Create a project
///
/// # Response
///
/// `201 Created` with the project, its owner, team and (empty) task list.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed
/// - `409 Conflict`: A team member ID does not reference a user
pub async fn create_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<CreateProjectRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ProjectDetails>)> {
    let Json(req) = payload?;
    req.validate()?;

    let project = projects::create_project(
        state.store.as_ref(),
        state.relay.as_ref(),
        auth.user_id,
        NewProject {
            title: req.title,
            description: req.description,
            team_members: req.team_members,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<ProjectDetails>> {
    let Path(project_id) = path?;
    let project = projects::get_project(state.store.as_ref(), auth.user_id, project_id).await?;
    Ok(Json(project))
}

/// Update a project (owner only)
///
/// # Errors
///
/// - `404 Not Found`, `403 Forbidden`
/// - `422 Unprocessable Entity`: Validation failed
/// - `409 Conflict`: A team member ID does not reference a user; nothing is changed
pub async fn update_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateProjectRequest>, JsonRejection>,
) -> ApiResult<Json<ProjectDetails>> {
    let Path(project_id) = path?;
    let Json(req) = payload?;
    req.validate()?;

    let project = projects::update_project(
        state.store.as_ref(),
        state.relay.as_ref(),
        auth.user_id,
        project_id,
        ProjectChanges {
            fields: UpdateProject {
                title: req.title,
                description: req.description,
            },
            team_members: req.team_members,
        },
    )
    .await?;

    Ok(Json(project))
}

/// Replace a project's team (owner only)
///
/// Idempotent. `{"user_ids": []}` removes every member; the owner keeps access.
pub async fn replace_members(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ReplaceMembersRequest>, JsonRejection>,
) -> ApiResult<Json<ProjectDetails>> {
    let Path(project_id) = path?;
    let Json(req) = payload?;

    let project = projects::replace_members(
        state.store.as_ref(),
        state.relay.as_ref(),
        auth.user_id,
        project_id,
        req.user_ids,
    )
    .await?;

    Ok(Json(project))
}

/// Delete a project (owner only); its tasks and team go with it
pub async fn delete_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(project_id) = path?;
    projects::delete_project(
        state.store.as_ref(),
        state.relay.as_ref(),
        auth.user_id,
        project_id,
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
