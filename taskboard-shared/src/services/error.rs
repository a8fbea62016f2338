use uuid::Uuid;

use crate::auth::authorization::AuthzError;
use crate::store::StoreError;

/// Failure of a gated project or task operation
///
/// `ProjectNotFound`/`TaskNotFound` and `Forbidden` are always reported
/// distinctly; existence is checked before access.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Project not found")]
    ProjectNotFound(Uuid),

    #[error("Task not found")]
    TaskNotFound(Uuid),

    #[error(transparent)]
    Forbidden(#[from] AuthzError),

    /// A member or assignee ID does not reference a user; nothing was written
    #[error("One or more referenced users do not exist")]
    UnknownUser,

    #[error("Email address is already registered")]
    DuplicateEmail,

    #[error("Storage error: {0}")]
    Storage(String),
}

impl ServiceError {
    /// Converts a store error raised while working on `project_id`
    pub fn from_store(err: StoreError, project_id: Uuid) -> Self {
        match err {
            StoreError::MissingProject => ServiceError::ProjectNotFound(project_id),
            other => other.into(),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UnknownUser => ServiceError::UnknownUser,
            StoreError::DuplicateEmail => ServiceError::DuplicateEmail,
            StoreError::MissingProject => {
                ServiceError::Storage("referenced project no longer exists".to_string())
            }
            StoreError::Database(e) => ServiceError::Storage(e.to_string()),
            StoreError::Unavailable(msg) => ServiceError::Storage(msg),
        }
    }
}
