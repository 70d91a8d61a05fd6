// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process user store.

use async_trait::async_trait;
use dashmap::DashMap;
use parley_core::{ParleyError, User, UserDraft, UserId, UserStore, UserUpdate};

/// [`UserStore`] kept in memory. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: DashMap<UserId, User>,
    by_external_id: DashMap<String, UserId>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &UserId) -> Option<User> {
        self.users.get(id).map(|u| u.value().clone())
    }

    /// Inserts or replaces a user as-is.
    pub fn insert(&self, user: User) {
        self.by_external_id
            .insert(user.external_id.clone(), user.id.clone());
        self.users.insert(user.id.clone(), user);
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get_by_external_id(&self, external_id: &str) -> Result<Option<User>, ParleyError> {
        let Some(id) = self.by_external_id.get(external_id).map(|id| id.value().clone()) else {
            return Ok(None);
        };
        Ok(self.get(&id))
    }

    /// Creating an external id that already exists returns the existing user.
    async fn create(&self, draft: UserDraft) -> Result<User, ParleyError> {
        let id = self
            .by_external_id
            .entry(draft.external_id.clone())
            .or_insert_with(|| UserId(uuid::Uuid::new_v4().to_string()))
            .value()
            .clone();
        let user = self
            .users
            .entry(id.clone())
            .or_insert_with(|| User::from_draft(id, draft))
            .value()
            .clone();
        Ok(user)
    }

    async fn update(&self, id: &UserId, update: UserUpdate) -> Result<User, ParleyError> {
        let mut user = self
            .users
            .get_mut(id)
            .ok_or_else(|| ParleyError::not_found("user", id.to_string()))?;
        update.apply(&mut user);
        Ok(user.clone())
    }
}
