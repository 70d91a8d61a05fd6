// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-step preference capture: the user answers with `key=value`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parley_core::{HandlerResult, MessageRecord, ParleyError, User, UserStore, UserUpdate};

use super::is_cancel;
use crate::context::{ContextType, ConversationContext};
use crate::handler::ContextHandler;

pub struct ConfigurationHandler {
    store: Option<Arc<dyn UserStore>>,
}

impl ConfigurationHandler {
    pub fn new(store: Option<Arc<dyn UserStore>>) -> Self {
        Self { store }
    }
}

/// Splits `key=value`, trimming both sides. Both must be non-empty.
fn parse_assignment(text: &str) -> Option<(String, String)> {
    let (key, value) = text.split_once('=')?;
    let (key, value) = (key.trim(), value.trim());
    if key.is_empty() || value.is_empty() || key.chars().any(char::is_whitespace) {
        return None;
    }
    Some((key.to_lowercase(), value.to_string()))
}

#[async_trait]
impl ContextHandler for ConfigurationHandler {
    fn name(&self) -> &str {
        "configuration"
    }

    fn context_type(&self) -> ContextType {
        ContextType::Configuration
    }

    fn keywords(&self) -> &[&str] {
        &["configurar", "configuración", "preferencias", "settings"]
    }

    async fn handle(
        &self,
        user: &User,
        message: &MessageRecord,
        context: &mut ConversationContext,
    ) -> Result<HandlerResult, ParleyError> {
        let text = message.content.trim();

        if context.step().is_none() {
            context.set_step("value");
            return Ok(HandlerResult::reply(
                "¿Qué quieres configurar? Responde con clave=valor, por ejemplo idioma=es.",
            ));
        }

        if is_cancel(text) {
            return Ok(HandlerResult::reply("Configuración cancelada.").expiring_context());
        }

        let Some((key, value)) = parse_assignment(text) else {
            return Ok(HandlerResult::reply(
                "Formato no válido. Usa clave=valor o escribe \"cancelar\".",
            ));
        };

        if let Some(store) = &self.store {
            store
                .update(
                    &user.id,
                    UserUpdate {
                        preferences: Some(HashMap::from([(key.clone(), value.clone())])),
                        ..Default::default()
                    },
                )
                .await?;
        }
        context.set_step("done");
        Ok(HandlerResult::reply(format!("Preferencia {key} = {value} guardada."))
            .with_data("key", key)
            .with_data("value", value)
            .expiring_context())
    }
}
