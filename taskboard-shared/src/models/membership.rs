/// Project team membership
///
/// Membership is a plain (project, user) pairing with no payload. A project's
/// membership is always replaced wholesale: the caller supplies the complete
/// desired set, [`MembershipDelta::compute`] works out what changes, and the
/// store applies the delta inside one transaction.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE project_members (
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (project_id, user_id)
/// );
/// ```
///
/// # Example
///
/// ```
/// use taskboard_shared::models::membership::{MemberSet, MembershipDelta};
/// use uuid::Uuid;
///
/// let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
///
/// let current = MemberSet::from_ids([a, b]);
/// let desired = MemberSet::from_ids([b, c, c]);
///
/// let delta = MembershipDelta::compute(&current, &desired);
/// assert_eq!(delta.added, vec![c]);
/// assert_eq!(delta.removed, vec![a]);
/// assert_eq!(delta.retained, vec![b]);
/// ```

use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use std::collections::BTreeSet;
use uuid::Uuid;

/// Deduplicated set of member user IDs
///
/// Iteration order is the natural UUID order, which keeps deltas and SQL
/// parameter lists deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberSet(BTreeSet<Uuid>);

impl MemberSet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from any list of IDs, collapsing duplicates
    pub fn from_ids<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = Uuid>,
    {
        Self(ids.into_iter().collect())
    }

    pub fn contains(&self, user_id: &Uuid) -> bool {
        self.0.contains(user_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Uuid> {
        self.0.iter()
    }

    /// IDs as a vector, suitable for binding as a `uuid[]` parameter
    pub fn to_vec(&self) -> Vec<Uuid> {
        self.0.iter().copied().collect()
    }
}

impl IntoIterator for MemberSet {
    type Item = Uuid;
    type IntoIter = std::collections::btree_set::IntoIter<Uuid>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Difference between a project's current and desired membership
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipDelta {
    /// In desired but not current
    pub added: Vec<Uuid>,

    /// In current but not desired
    pub removed: Vec<Uuid>,

    /// In both; left untouched
    pub retained: Vec<Uuid>,
}

impl MembershipDelta {
    /// Computes the add/remove delta that turns `current` into `desired`
    pub fn compute(current: &MemberSet, desired: &MemberSet) -> Self {
        Self {
            added: desired.0.difference(&current.0).copied().collect(),
            removed: current.0.difference(&desired.0).copied().collect(),
            retained: current.0.intersection(&desired.0).copied().collect(),
        }
    }

    /// True when applying the delta would change nothing
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Loads the member IDs of a project
pub async fn load_member_ids<'e, E: PgExecutor<'e>>(
    executor: E,
    project_id: Uuid,
) -> Result<MemberSet, sqlx::Error> {
    let ids: Vec<Uuid> = sqlx::query_scalar(
        r#"
        SELECT user_id
        FROM project_members
        WHERE project_id = $1
        "#,
    )
    .bind(project_id)
    .fetch_all(executor)
    .await?;

    Ok(MemberSet::from_ids(ids))
}

/// Removes the given members from a project
///
/// Returns the number of rows deleted.
pub async fn remove_members<'e, E: PgExecutor<'e>>(
    executor: E,
    project_id: Uuid,
    user_ids: &[Uuid],
) -> Result<u64, sqlx::Error> {
    if user_ids.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query(
        r#"
        DELETE FROM project_members
        WHERE project_id = $1 AND user_id = ANY($2)
        "#,
    )
    .bind(project_id)
    .bind(user_ids)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// Adds the given members to a project
///
/// Existing pairs are ignored. An ID that does not reference a user fails
/// with a foreign key violation on `project_members_user_id_fkey`.
pub async fn add_members<'e, E: PgExecutor<'e>>(
    executor: E,
    project_id: Uuid,
    user_ids: &[Uuid],
) -> Result<u64, sqlx::Error> {
    if user_ids.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query(
        r#"
        INSERT INTO project_members (project_id, user_id)
        SELECT $1, UNNEST($2::uuid[])
        ON CONFLICT (project_id, user_id) DO NOTHING
        "#,
    )
    .bind(project_id)
    .bind(user_ids)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_set_deduplicates() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let set = MemberSet::from_ids([a, b, a, a]);
        assert_eq!(set.len(), 2);
        assert!(set.contains(&a));
        assert!(set.contains(&b));
    }

    #[test]
    fn test_delta_from_empty() {
        let a = Uuid::new_v4();
        let delta = MembershipDelta::compute(&MemberSet::new(), &MemberSet::from_ids([a]));

        assert_eq!(delta.added, vec![a]);
        assert!(delta.removed.is_empty());
        assert!(delta.retained.is_empty());
        assert!(!delta.is_noop());
    }

    #[test]
    fn test_delta_to_empty_removes_everyone() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let current = MemberSet::from_ids([a, b]);

        let delta = MembershipDelta::compute(&current, &MemberSet::new());
        assert!(delta.added.is_empty());
        assert_eq!(delta.removed, current.to_vec());
    }

    #[test]
    fn test_delta_same_set_is_noop() {
        let set = MemberSet::from_ids([Uuid::new_v4(), Uuid::new_v4()]);
        let delta = MembershipDelta::compute(&set, &set);

        assert!(delta.is_noop());
        assert_eq!(delta.retained, set.to_vec());
    }

    #[test]
    fn test_member_set_serializes_as_array() {
        let a = Uuid::new_v4();
        let json = serde_json::to_value(MemberSet::from_ids([a, a])).unwrap();
        assert_eq!(json, serde_json::json!([a]));
    }
}
