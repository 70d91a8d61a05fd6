// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User store trait for whatever persists users (SQL table, KV store, memory).

use async_trait::async_trait;

use crate::error::ParleyError;
use crate::types::{User, UserDraft, UserId, UserUpdate};

/// Persistence for users. The core never hard-deletes a user.
#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    /// Looks up a user by the stable identity derived from its address.
    async fn get_by_external_id(&self, external_id: &str) -> Result<Option<User>, ParleyError>;

    /// Creates a user from a draft and returns the stored record.
    async fn create(&self, draft: UserDraft) -> Result<User, ParleyError>;

    /// Applies a partial update and returns the updated record.
    async fn update(&self, id: &UserId, update: UserUpdate) -> Result<User, ParleyError>;
}
