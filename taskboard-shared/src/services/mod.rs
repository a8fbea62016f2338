/// Gated project and task operations
///
/// Every operation follows the same shape:
///
/// 1. load the target (a project, or a task and then its parent project)
/// 2. fail with `NotFound` if it does not exist
/// 3. evaluate the caller against the project's owner and member set
/// 4. fail with `Forbidden` if the level is below what the operation needs
/// 5. perform the read or write through the store
/// 6. publish a change event (writes only)
///
/// Nothing is cached between calls; each call reloads the access snapshot.
/// The caller ID is trusted: it comes from the identity resolver.
///
/// # Example
///
/// ```
/// use taskboard_shared::events::NoopRelay;
/// use taskboard_shared::models::CreateUser;
/// use taskboard_shared::services::projects::{self, NewProject};
/// use taskboard_shared::store::{MemoryStore, UserStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// let owner = store
///     .create_user(CreateUser {
///         name: "Owner".into(),
///         email: "owner@example.com".into(),
///         password_hash: "$argon2id$...".into(),
///     })
///     .await?;
///
/// let project = projects::create_project(
///     &store,
///     &NoopRelay,
///     owner.id,
///     NewProject {
///         title: "Roadmap".into(),
///         description: "Plan the next quarter".into(),
///         team_members: vec![],
///     },
/// )
/// .await?;
///
/// assert_eq!(project.summary.owner.id, owner.id);
/// # Ok(())
/// # }
/// ```

use tracing::warn;
use uuid::Uuid;

use crate::auth::authorization::{authorize, Operation, ProjectAccess};
use crate::store::Store;

pub mod error;
pub mod projects;
pub mod tasks;

pub use error::ServiceError;

/// Loads a project's access snapshot and checks the caller against `operation`
///
/// Existence is checked first: a missing project is `ProjectNotFound` no
/// matter who asks.
pub async fn gate_project(
    store: &dyn Store,
    caller: Uuid,
    project_id: Uuid,
    operation: Operation,
) -> Result<ProjectAccess, ServiceError> {
    let access = store
        .load_project_access(project_id)
        .await?
        .ok_or(ServiceError::ProjectNotFound(project_id))?;

    if let Err(err) = authorize(&access, caller, operation) {
        warn!(
            user_id = %caller,
            project_id = %project_id,
            operation = ?operation,
            "Access denied"
        );
        return Err(err.into());
    }

    Ok(access)
}
