//! `UserStore` trait — single async interface for user records.

use async_trait::async_trait;

use super::model::{UserId, UserRecord};

/// Backend-agnostic store of committed user records.
///
/// Mutations go through `update`/`for_each_user` so a backend can hold its
/// lock for the whole read-modify-write. Two concurrent `/log_water` calls for
/// the same user must never lose an increment.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Snapshot of a user's record, if onboarding has completed.
    async fn get(&self, user_id: &UserId) -> Option<UserRecord>;

    /// Insert or fully replace a record.
    async fn commit(&self, user_id: UserId, record: UserRecord);

    /// Apply `f` to an existing record atomically. Returns the record as it
    /// is after the mutation, or `None` if the user has no record.
    async fn update(
        &self,
        user_id: &UserId,
        f: &mut (dyn for<'r> FnMut(&'r mut UserRecord) + Send),
    ) -> Option<UserRecord>;

    /// Apply `f` to every record. Returns the number of records visited.
    async fn for_each_user(
        &self,
        f: &mut (dyn for<'a, 'r> FnMut(&'a UserId, &'r mut UserRecord) + Send),
    ) -> usize;

    /// Number of committed users.
    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
