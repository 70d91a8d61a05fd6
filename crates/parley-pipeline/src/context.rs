// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The pipeline's view of conversation contexts.
//!
//! The orchestrator only needs three things from the context layer, so it
//! depends on this trait rather than on [`ContextManager`] directly. Tests
//! substitute implementations that fail on purpose.

use async_trait::async_trait;
use parley_context::{ContextManager, ConversationContext, Detection};
use parley_core::{HandlerResult, MessageRecord, ParleyError, User, UserId};

#[async_trait]
pub trait ContextService: Send + Sync {
    /// The user's live context, if any.
    fn active_context(&self, user_id: &UserId) -> Result<Option<ConversationContext>, ParleyError>;

    /// Which context, if any, `text` would start.
    fn detect(&self, text: &str, user: &User) -> Option<Detection>;

    /// Runs one turn. `None` means use the active context or detect one.
    async fn execute(
        &self,
        user: &User,
        message: &MessageRecord,
        context: Option<ConversationContext>,
    ) -> HandlerResult;
}

#[async_trait]
impl ContextService for ContextManager {
    fn active_context(&self, user_id: &UserId) -> Result<Option<ConversationContext>, ParleyError> {
        Ok(self.get_active_context(user_id))
    }

    fn detect(&self, text: &str, user: &User) -> Option<Detection> {
        self.detect_context(text, user)
    }

    async fn execute(
        &self,
        user: &User,
        message: &MessageRecord,
        context: Option<ConversationContext>,
    ) -> HandlerResult {
        self.execute_context(user, message, context).await
    }
}
