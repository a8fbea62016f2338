/// Ownership and membership evaluation
///
/// Every project and task operation is gated on the caller's access level to
/// the project involved. Tasks have no membership of their own; they are
/// judged by their parent project.
///
/// # Permission Model
///
/// Access levels are ordered `None < Member < Owner`:
///
/// | Operation | Required |
/// |---|---|
/// | view project, list its tasks | Member |
/// | create, update, delete a task | Member |
/// | update project fields | Owner |
/// | replace membership | Owner |
/// | delete project | Owner |
///
/// Evaluation is a pure function of a loaded [`ProjectAccess`] snapshot. The
/// caller is assumed to exist; identity is resolved before this point.
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::authorization::{authorize, AccessLevel, Operation, ProjectAccess};
/// use taskboard_shared::models::MemberSet;
/// use uuid::Uuid;
///
/// let (owner, member, outsider) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
/// let access = ProjectAccess::new(Uuid::new_v4(), owner, MemberSet::from_ids([member]));
///
/// assert_eq!(access.level_for(owner), AccessLevel::Owner);
/// assert!(authorize(&access, member, Operation::CreateTask).is_ok());
/// assert!(authorize(&access, member, Operation::DeleteProject).is_err());
/// assert!(authorize(&access, outsider, Operation::ViewProject).is_err());
/// ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::membership::MemberSet;

/// Caller's standing on a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    None,
    Member,
    Owner,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::None => "none",
            AccessLevel::Member => "member",
            AccessLevel::Owner => "owner",
        }
    }

    /// Whether this level meets `required`
    pub fn satisfies(&self, required: AccessLevel) -> bool {
        *self >= required
    }
}

impl std::fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gated operations on projects and tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ViewProject,
    UpdateProject,
    ReplaceMembers,
    DeleteProject,
    ListTasks,
    CreateTask,
    UpdateTask,
    DeleteTask,
}

impl Operation {
    /// Minimum access level for this operation
    pub fn required_level(&self) -> AccessLevel {
        match self {
            Operation::ViewProject
            | Operation::ListTasks
            | Operation::CreateTask
            | Operation::UpdateTask
            | Operation::DeleteTask => AccessLevel::Member,
            Operation::UpdateProject | Operation::ReplaceMembers | Operation::DeleteProject => {
                AccessLevel::Owner
            }
        }
    }

    /// Human-readable description used in denial messages
    pub fn describe(&self) -> &'static str {
        match self {
            Operation::ViewProject => "view this project",
            Operation::UpdateProject => "update this project",
            Operation::ReplaceMembers => "change this project's team",
            Operation::DeleteProject => "delete this project",
            Operation::ListTasks => "view tasks in this project",
            Operation::CreateTask => "create tasks in this project",
            Operation::UpdateTask => "update tasks in this project",
            Operation::DeleteTask => "delete tasks in this project",
        }
    }
}

/// Authorization failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// The caller's access level is below what the operation needs
    #[error("You do not have permission to {}", .operation.describe())]
    Forbidden {
        operation: Operation,
        required: AccessLevel,
        actual: AccessLevel,
    },
}

/// Snapshot of who may touch a project: its owner and its member set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectAccess {
    pub project_id: Uuid,
    pub owner_id: Uuid,
    pub members: MemberSet,
}

impl ProjectAccess {
    pub fn new(project_id: Uuid, owner_id: Uuid, members: MemberSet) -> Self {
        Self {
            project_id,
            owner_id,
            members,
        }
    }

    /// Access level of `user_id`; ownership takes precedence over membership
    pub fn level_for(&self, user_id: Uuid) -> AccessLevel {
        can_access(self, user_id)
    }

    /// Everyone with at least member access
    pub fn audience(&self) -> Vec<Uuid> {
        let mut audience = Vec::with_capacity(self.members.len() + 1);
        audience.push(self.owner_id);
        audience.extend(self.members.iter().filter(|id| **id != self.owner_id));
        audience
    }
}

/// Evaluates a user's access level on a project
pub fn can_access(project: &ProjectAccess, user_id: Uuid) -> AccessLevel {
    if project.owner_id == user_id {
        AccessLevel::Owner
    } else if project.members.contains(&user_id) {
        AccessLevel::Member
    } else {
        AccessLevel::None
    }
}

/// Checks that `user_id` may perform `operation` on the project
///
/// # Returns
///
/// The caller's access level when allowed
///
/// # Errors
///
/// Returns `AuthzError::Forbidden` when the level is insufficient
pub fn authorize(
    project: &ProjectAccess,
    user_id: Uuid,
    operation: Operation,
) -> Result<AccessLevel, AuthzError> {
    let actual = can_access(project, user_id);
    let required = operation.required_level();

    if !actual.satisfies(required) {
        return Err(AuthzError::Forbidden {
            operation,
            required,
            actual,
        });
    }

    Ok(actual)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_OPERATIONS: [Operation; 8] = [
        Operation::ViewProject,
        Operation::UpdateProject,
        Operation::ReplaceMembers,
        Operation::DeleteProject,
        Operation::ListTasks,
        Operation::CreateTask,
        Operation::UpdateTask,
        Operation::DeleteTask,
    ];

    struct Fixture {
        owner: Uuid,
        member: Uuid,
        outsider: Uuid,
        access: ProjectAccess,
    }

    fn fixture() -> Fixture {
        let owner = Uuid::new_v4();
        let member = Uuid::new_v4();
        let outsider = Uuid::new_v4();

        Fixture {
            owner,
            member,
            outsider,
            access: ProjectAccess::new(Uuid::new_v4(), owner, MemberSet::from_ids([member])),
        }
    }

    #[test]
    fn test_access_level_ordering() {
        assert!(AccessLevel::None < AccessLevel::Member);
        assert!(AccessLevel::Member < AccessLevel::Owner);
        assert!(AccessLevel::Owner.satisfies(AccessLevel::Member));
        assert!(!AccessLevel::Member.satisfies(AccessLevel::Owner));
    }

    #[test]
    fn test_can_access_levels() {
        let f = fixture();

        assert_eq!(can_access(&f.access, f.owner), AccessLevel::Owner);
        assert_eq!(can_access(&f.access, f.member), AccessLevel::Member);
        assert_eq!(can_access(&f.access, f.outsider), AccessLevel::None);
    }

    #[test]
    fn test_owner_listed_as_member_reports_owner() {
        let owner = Uuid::new_v4();
        let access = ProjectAccess::new(Uuid::new_v4(), owner, MemberSet::from_ids([owner]));

        assert_eq!(can_access(&access, owner), AccessLevel::Owner);
        assert_eq!(access.audience(), vec![owner]);
    }

    #[test]
    fn test_owner_keeps_access_without_members() {
        let owner = Uuid::new_v4();
        let access = ProjectAccess::new(Uuid::new_v4(), owner, MemberSet::new());

        for op in ALL_OPERATIONS {
            assert_eq!(authorize(&access, owner, op), Ok(AccessLevel::Owner));
        }
    }

    #[test]
    fn test_member_gets_task_level_only() {
        let f = fixture();

        for op in ALL_OPERATIONS {
            let result = authorize(&f.access, f.member, op);
            match op.required_level() {
                AccessLevel::Member => assert_eq!(result, Ok(AccessLevel::Member), "{op:?}"),
                _ => assert!(result.is_err(), "{op:?}"),
            }
        }
    }

    #[test]
    fn test_outsider_forbidden_everywhere() {
        let f = fixture();

        for op in ALL_OPERATIONS {
            assert_eq!(
                authorize(&f.access, f.outsider, op),
                Err(AuthzError::Forbidden {
                    operation: op,
                    required: op.required_level(),
                    actual: AccessLevel::None,
                })
            );
        }
    }

    #[test]
    fn test_forbidden_message_names_operation() {
        let f = fixture();
        let err = authorize(&f.access, f.member, Operation::DeleteProject).unwrap_err();

        assert_eq!(
            err.to_string(),
            "You do not have permission to delete this project"
        );
    }
}
