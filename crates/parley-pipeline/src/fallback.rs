// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! General message handlers tried when a message is neither a command nor
//! part of an active context.

use std::sync::Arc;

use async_trait::async_trait;
use parley_core::{HandlerResult, MessageRecord, ParleyError, User};

use crate::context::ContextService;

/// A fallback handler. Higher `priority` runs first.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    fn name(&self) -> &str;

    fn priority(&self) -> i32 {
        0
    }

    fn can_handle(&self, user: &User, message: &MessageRecord) -> bool;

    /// Only a `success = true` result is accepted; anything else lets the next
    /// handler try.
    async fn handle(&self, user: &User, message: &MessageRecord)
        -> Result<HandlerResult, ParleyError>;
}

/// Starts a new context when the message matches one.
pub struct ContextDetectionHandler {
    contexts: Arc<dyn ContextService>,
    priority: i32,
}

impl ContextDetectionHandler {
    pub fn new(contexts: Arc<dyn ContextService>) -> Self {
        Self {
            contexts,
            priority: 0,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

#[async_trait]
impl MessageHandler for ContextDetectionHandler {
    fn name(&self) -> &str {
        "context-detection"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn can_handle(&self, user: &User, message: &MessageRecord) -> bool {
        self.contexts.detect(&message.content, user).is_some()
    }

    async fn handle(
        &self,
        user: &User,
        message: &MessageRecord,
    ) -> Result<HandlerResult, ParleyError> {
        Ok(self.contexts.execute(user, message, None).await)
    }
}

/// Sorts handlers by descending priority, keeping insertion order on ties.
pub(crate) fn sort_by_priority(handlers: &mut [Arc<dyn MessageHandler>]) {
    handlers.sort_by_key(|h| std::cmp::Reverse(h.priority()));
}
