/// Task endpoints
///
/// Any owner or member of the parent project may list, create, update and
/// delete its tasks. Status moves freely between `Pending`, `In Progress`
/// and `Completed`.

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
    models::{TaskDetails, TaskStatus, UpdateTask},
    services::tasks::{self, NewTask},
};
use uuid::Uuid;
use validator::Validate;

/// Create task request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    pub project_id: Uuid,

    /// Any existing user
    pub assigned_to: Uuid,

    #[validate(length(min = 3, max = 200, message = "Title must be between 3 and 200 characters"))]
    pub title: String,

    #[validate(length(min = 10, message = "Description must be at least 10 characters"))]
    pub description: String,

    /// Defaults to `Pending`
    pub status: Option<TaskStatus>,
}

/// Update task request; absent fields are left unchanged
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 3, max = 200, message = "Title must be between 3 and 200 characters"))]
    pub title: Option<String>,

    #[validate(length(min = 10, message = "Description must be at least 10 characters"))]
    pub description: Option<String>,

    pub status: Option<TaskStatus>,

    pub assigned_to: Option<Uuid>,
}

/// `GET /v1/projects/:id/tasks`, in creation order with assignee summaries
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Vec<TaskDetails>>> {
    let Path(project_id) = path?;
    let tasks = tasks::list_tasks(state.store.as_ref(), auth.user_id, project_id).await?;
    Ok(Json(tasks))
}

/// `POST /v1/tasks`
///
/// # Errors
///
/// - `404 Not Found`: Project does not exist
/// - `403 Forbidden`: Caller is neither owner nor member
/// - `409 Conflict`: Assignee does not exist
/// - `422 Unprocessable Entity`: Validation failed or unknown status
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TaskDetails>)> {
    let Json(req) = payload?;
    req.validate()?;

    let task = tasks::create_task(
        state.store.as_ref(),
        state.relay.as_ref(),
        auth.user_id,
        NewTask {
            project_id: req.project_id,
            assigned_to: req.assigned_to,
            title: req.title,
            description: req.description,
            status: req.status,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(task)))
}

/// `PATCH /v1/tasks/:id`
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> ApiResult<Json<TaskDetails>> {
    let Path(task_id) = path?;
    let Json(req) = payload?;
    req.validate()?;

    let task = tasks::update_task(
        state.store.as_ref(),
        state.relay.as_ref(),
        auth.user_id,
        task_id,
        UpdateTask {
            title: req.title,
            description: req.description,
            status: req.status,
            assigned_to: req.assigned_to,
        },
    )
    .await?;

    Ok(Json(task))
}

/// `DELETE /v1/tasks/:id`
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(task_id) = path?;
    tasks::delete_task(
        state.store.as_ref(),
        state.relay.as_ref(),
        auth.user_id,
        task_id,
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
