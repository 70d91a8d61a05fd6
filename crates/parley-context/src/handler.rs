// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;
use parley_core::{HandlerResult, MessageRecord, ParleyError, User, UserLevel};

use crate::context::{ContextType, ConversationContext};

/// Drives one kind of conversation context, one turn at a time.
///
/// The handler mutates `context.data` in place; the manager persists it after
/// the turn. Setting `expire_context` in the result data ends the context.
#[async_trait]
pub trait ContextHandler: Send + Sync {
    fn name(&self) -> &str;

    fn context_type(&self) -> ContextType;

    /// Lowest level allowed to enter this context through detection.
    fn required_level(&self) -> UserLevel {
        UserLevel::User
    }

    /// Detection keywords. Empty means the handler only serves as fallback.
    fn keywords(&self) -> &[&str] {
        &[]
    }

    async fn handle(
        &self,
        user: &User,
        message: &MessageRecord,
        context: &mut ConversationContext,
    ) -> Result<HandlerResult, ParleyError>;
}
