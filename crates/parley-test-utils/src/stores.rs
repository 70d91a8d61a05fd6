// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User stores that fail on demand.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parley_core::{ParleyError, User, UserDraft, UserId, UserStore, UserUpdate};
use parley_pipeline::InMemoryUserStore;

fn offline() -> ParleyError {
    ParleyError::Storage {
        source: "user store offline".into(),
    }
}

/// Every call fails with [`ParleyError::Storage`].
#[derive(Debug, Default)]
pub struct FailingUserStore;

#[async_trait]
impl UserStore for FailingUserStore {
    async fn get_by_external_id(&self, _external_id: &str) -> Result<Option<User>, ParleyError> {
        Err(offline())
    }

    async fn create(&self, _draft: UserDraft) -> Result<User, ParleyError> {
        Err(offline())
    }

    async fn update(&self, _id: &UserId, _update: UserUpdate) -> Result<User, ParleyError> {
        Err(offline())
    }
}

/// Fails the first `failures` lookups, then behaves like an in-memory store.
#[derive(Debug)]
pub struct FlakyUserStore {
    remaining: AtomicUsize,
    inner: InMemoryUserStore,
}

impl FlakyUserStore {
    pub fn new(failures: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(failures),
            inner: InMemoryUserStore::new(),
        }
    }

    /// Lookups that will still fail.
    pub fn remaining_failures(&self) -> usize {
        self.remaining.load(Ordering::SeqCst)
    }

    pub fn users(&self) -> &InMemoryUserStore {
        &self.inner
    }
}

#[async_trait]
impl UserStore for FlakyUserStore {
    async fn get_by_external_id(&self, external_id: &str) -> Result<Option<User>, ParleyError> {
        let failed = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(offline());
        }
        self.inner.get_by_external_id(external_id).await
    }

    async fn create(&self, draft: UserDraft) -> Result<User, ParleyError> {
        self.inner.create(draft).await
    }

    async fn update(&self, id: &UserId, update: UserUpdate) -> Result<User, ParleyError> {
        self.inner.update(id, update).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn flaky_store_recovers_after_configured_failures() {
        let store = FlakyUserStore::new(2);
        assert!(store.get_by_external_id("1").await.is_err());
        assert!(store.get_by_external_id("1").await.is_err());
        assert_eq!(store.remaining_failures(), 0);
        assert!(store.get_by_external_id("1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failing_store_reports_storage_errors() {
        let err = FailingUserStore.create(UserDraft::default()).await.unwrap_err();
        assert!(matches!(err, ParleyError::Storage { .. }));
    }
}
