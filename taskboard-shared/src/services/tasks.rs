/// Task operations
///
/// Tasks are gated by their parent project: any owner or member may list,
/// create, update or delete any task in it, whoever it is assigned to. Status
/// may be set to any value on any update.

use tracing::info;
use uuid::Uuid;

use super::{gate_project, ServiceError};
use crate::auth::authorization::{Operation, ProjectAccess};
use crate::events::{ChangeEvent, ChangeKind, Relay};
use crate::models::{CreateTask, Task, TaskDetails, TaskStatus, UpdateTask};
use crate::store::Store;

/// Input for [`create_task`]
#[derive(Debug, Clone)]
pub struct NewTask {
    pub project_id: Uuid,
    /// Any existing user; project membership is not required
    pub assigned_to: Uuid,
    pub title: String,
    pub description: String,
    /// Defaults to `Pending`
    pub status: Option<TaskStatus>,
}

/// Loads a task and gates the caller on its parent project
///
/// A task whose project is gone is reported as missing.
async fn gate_task(
    store: &dyn Store,
    caller: Uuid,
    task_id: Uuid,
    operation: Operation,
) -> Result<(Task, ProjectAccess), ServiceError> {
    let task = store
        .find_task(task_id)
        .await?
        .ok_or(ServiceError::TaskNotFound(task_id))?;

    let access = match gate_project(store, caller, task.project_id, operation).await {
        Err(ServiceError::ProjectNotFound(_)) => return Err(ServiceError::TaskNotFound(task_id)),
        other => other?,
    };

    Ok((task, access))
}

async fn load_details(store: &dyn Store, task_id: Uuid) -> Result<TaskDetails, ServiceError> {
    store
        .find_task_details(task_id)
        .await?
        .ok_or(ServiceError::TaskNotFound(task_id))
}

/// Tasks of a project, in creation order
pub async fn list_tasks(
    store: &dyn Store,
    caller: Uuid,
    project_id: Uuid,
) -> Result<Vec<TaskDetails>, ServiceError> {
    gate_project(store, caller, project_id, Operation::ListTasks).await?;
    Ok(store.list_tasks(project_id).await?)
}

/// Creates a task in a project the caller owns or belongs to
///
/// # Errors
///
/// - `ProjectNotFound` if the project does not exist
/// - `Forbidden` if the caller is neither owner nor member
/// - `UnknownUser` if the assignee does not exist
pub async fn create_task(
    store: &dyn Store,
    relay: &dyn Relay,
    caller: Uuid,
    input: NewTask,
) -> Result<TaskDetails, ServiceError> {
    let project_id = input.project_id;
    let access = gate_project(store, caller, project_id, Operation::CreateTask).await?;

    let task = store
        .create_task(CreateTask {
            project_id,
            assigned_to: input.assigned_to,
            title: input.title,
            description: input.description,
            status: input.status.unwrap_or_default(),
        })
        .await
        .map_err(|e| ServiceError::from_store(e, project_id))?;

    info!(
        user_id = %caller,
        project_id = %project_id,
        task_id = %task.id,
        assigned_to = %task.assigned_to,
        "Task created"
    );

    relay.publish(ChangeEvent::new(
        ChangeKind::TaskCreated,
        project_id,
        Some(task.id),
        caller,
        access.audience(),
    ));

    load_details(store, task.id).await
}

/// Applies a partial update to a task
///
/// Any status may follow any other.
pub async fn update_task(
    store: &dyn Store,
    relay: &dyn Relay,
    caller: Uuid,
    task_id: Uuid,
    changes: UpdateTask,
) -> Result<TaskDetails, ServiceError> {
    let (task, access) = gate_task(store, caller, task_id, Operation::UpdateTask).await?;

    let updated = store
        .update_task(task_id, changes)
        .await?
        .ok_or(ServiceError::TaskNotFound(task_id))?;

    info!(
        user_id = %caller,
        project_id = %task.project_id,
        task_id = %task_id,
        from = %task.status,
        to = %updated.status,
        "Task updated"
    );

    relay.publish(ChangeEvent::new(
        ChangeKind::TaskUpdated,
        task.project_id,
        Some(task_id),
        caller,
        access.audience(),
    ));

    load_details(store, task_id).await
}

/// Deletes a task
pub async fn delete_task(
    store: &dyn Store,
    relay: &dyn Relay,
    caller: Uuid,
    task_id: Uuid,
) -> Result<(), ServiceError> {
    let (task, access) = gate_task(store, caller, task_id, Operation::DeleteTask).await?;

    if !store.delete_task(task_id).await? {
        return Err(ServiceError::TaskNotFound(task_id));
    }

    info!(
        user_id = %caller,
        project_id = %task.project_id,
        task_id = %task_id,
        "Task deleted"
    );

    relay.publish(ChangeEvent::new(
        ChangeKind::TaskDeleted,
        task.project_id,
        Some(task_id),
        caller,
        access.audience(),
    ));

    Ok(())
}
