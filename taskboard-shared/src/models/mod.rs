/// Database models for Taskboard
///
/// Each model carries its own SQL as associated functions that accept any
/// PostgreSQL executor (`&PgPool` or a transaction connection).
///
/// # Models
///
/// - `user`: Registered accounts and their public summary
/// - `project`: Projects, owner/team views
/// - `membership`: Team membership sets, deltas, and join-table SQL
/// - `task`: Tasks and the status enumeration

pub mod membership;
pub mod project;
pub mod task;
pub mod user;

pub use membership::{MemberSet, MembershipDelta};
pub use project::{CreateProject, Project, ProjectDetails, ProjectSummary, UpdateProject};
pub use task::{CreateTask, Task, TaskDetails, TaskStatus, UpdateTask};
pub use user::{CreateUser, User, UserSummary};
