// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;
use parley_core::{HandlerResult, MessageRecord, ParleyError, User};
use rand::seq::SliceRandom;

use crate::context::{ContextType, ConversationContext};
use crate::handler::ContextHandler;

const REPLIES: &[&str] = &[
    "¡Hola, {name}! ¿En qué puedo ayudarte?",
    "Te leo, {name}. Escribe !help para ver lo que sé hacer.",
    "Interesante, {name}. Cuéntame más o prueba con !help.",
    "Aquí estoy, {name}. Si quieres registrarte escribe \"registro\".",
];

/// Keyword-less fallback. Answers one message and ends its context so that
/// the next message goes through detection again.
pub struct ConversationHandler;

fn pick_reply(name: &str) -> String {
    let template = REPLIES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(REPLIES[0]);
    template.replace("{name}", name)
}

#[async_trait]
impl ContextHandler for ConversationHandler {
    fn name(&self) -> &str {
        "conversation"
    }

    fn context_type(&self) -> ContextType {
        ContextType::Conversation
    }

    async fn handle(
        &self,
        user: &User,
        _message: &MessageRecord,
        _context: &mut ConversationContext,
    ) -> Result<HandlerResult, ParleyError> {
        Ok(HandlerResult::reply(pick_reply(user.greeting_name())).expiring_context())
    }
}
