//! In-memory `UserStore` backend.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::model::{UserId, UserRecord};
use super::traits::UserStore;

/// Volatile user table. Lost on restart.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<UserId, UserRecord>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get(&self, user_id: &UserId) -> Option<UserRecord> {
        self.users.read().await.get(user_id).cloned()
    }

    async fn commit(&self, user_id: UserId, record: UserRecord) {
        let replaced = self.users.write().await.insert(user_id.clone(), record);
        if replaced.is_some() {
            tracing::debug!(user_id = %user_id, "Replaced existing user record");
        } else {
            tracing::debug!(user_id = %user_id, "Committed new user record");
        }
    }

    async fn update(
        &self,
        user_id: &UserId,
        f: &mut (dyn for<'r> FnMut(&'r mut UserRecord) + Send),
    ) -> Option<UserRecord> {
        let mut users = self.users.write().await;
        let record = users.get_mut(user_id)?;
        f(record);
        Some(record.clone())
    }

    async fn for_each_user(
        &self,
        f: &mut (dyn for<'a, 'r> FnMut(&'a UserId, &'r mut UserRecord) + Send),
    ) -> usize {
        let mut users = self.users.write().await;
        for (id, record) in users.iter_mut() {
            f(id, record);
        }
        users.len()
    }

    async fn len(&self) -> usize {
        self.users.read().await.len()
    }
}
