/// Change notifications
///
/// After a successful mutation the services publish a [`ChangeEvent`] to a
/// [`Relay`]. Delivery is fire-and-forget: at most once, best effort, no
/// ordering guarantee and no acknowledgment. A failed or dropped publish never
/// affects the mutation that triggered it.
///
/// Each event carries its audience (the project's owner and members at the
/// time of the change) so subscribers only forward what a user may see.
///
/// # Example
///
/// ```
/// use taskboard_shared::events::{BroadcastRelay, ChangeEvent, ChangeKind, Relay};
/// use uuid::Uuid;
///
/// let relay = BroadcastRelay::new(16);
/// let mut rx = relay.subscribe();
///
/// let owner = Uuid::new_v4();
/// relay.publish(ChangeEvent::new(ChangeKind::ProjectUpdated, Uuid::new_v4(), None, owner, vec![owner]));
///
/// let event = rx.try_recv().unwrap();
/// assert!(event.is_visible_to(owner));
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod relay;

pub use relay::{BroadcastRelay, NoopRelay, Relay};

/// What changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    ProjectCreated,
    ProjectUpdated,
    MembersReplaced,
    ProjectDeleted,
    TaskCreated,
    TaskUpdated,
    TaskDeleted,
}

impl ChangeKind {
    /// Event name used on the wire (SSE `event:` field)
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::ProjectCreated => "project_created",
            ChangeKind::ProjectUpdated => "project_updated",
            ChangeKind::MembersReplaced => "members_replaced",
            ChangeKind::ProjectDeleted => "project_deleted",
            ChangeKind::TaskCreated => "task_created",
            ChangeKind::TaskUpdated => "task_updated",
            ChangeKind::TaskDeleted => "task_deleted",
        }
    }
}

/// A completed mutation on a project or one of its tasks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub project_id: Uuid,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<Uuid>,

    /// User who made the change
    pub actor: Uuid,

    pub at: DateTime<Utc>,

    /// Users allowed to see this event; never sent to clients
    #[serde(skip)]
    pub audience: Vec<Uuid>,
}

impl ChangeEvent {
    pub fn new(
        kind: ChangeKind,
        project_id: Uuid,
        task_id: Option<Uuid>,
        actor: Uuid,
        audience: Vec<Uuid>,
    ) -> Self {
        Self {
            kind,
            project_id,
            task_id,
            actor,
            at: Utc::now(),
            audience,
        }
    }

    pub fn is_visible_to(&self, user_id: Uuid) -> bool {
        self.audience.contains(&user_id)
    }
}
