// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Multi-step registration: `start -> name -> confirm -> complete | cancel`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parley_core::{HandlerResult, MessageRecord, ParleyError, User, UserStore, UserUpdate};
use tracing::info;

use super::{affirmative, is_cancel};
use crate::context::{ContextType, ConversationContext};
use crate::handler::ContextHandler;

const NAME_KEY: &str = "name";
const MAX_NAME_LEN: usize = 64;

pub struct RegistrationHandler {
    store: Option<Arc<dyn UserStore>>,
}

impl RegistrationHandler {
    /// Without a store the flow still runs; the user record is just not updated.
    pub fn new(store: Option<Arc<dyn UserStore>>) -> Self {
        Self { store }
    }

    async fn complete(
        &self,
        user: &User,
        context: &mut ConversationContext,
    ) -> Result<HandlerResult, ParleyError> {
        let name = context.get_str(NAME_KEY).unwrap_or_default().to_string();
        if let Some(store) = &self.store {
            store
                .update(
                    &user.id,
                    UserUpdate {
                        display_name: Some(name.clone()),
                        is_registered: Some(true),
                        registration_date: Some(Utc::now()),
                        ..Default::default()
                    },
                )
                .await?;
        }
        context.set_step("complete");
        info!(user_id = %user.id, "user registered");
        Ok(HandlerResult::reply(format!("¡Registro completado! Bienvenido, {name}."))
            .with_data(NAME_KEY, name)
            .expiring_context())
    }
}

#[async_trait]
impl ContextHandler for RegistrationHandler {
    fn name(&self) -> &str {
        "registration"
    }

    fn context_type(&self) -> ContextType {
        ContextType::Registration
    }

    fn keywords(&self) -> &[&str] {
        &["registro", "registrar", "registrarme", "register"]
    }

    async fn handle(
        &self,
        user: &User,
        message: &MessageRecord,
        context: &mut ConversationContext,
    ) -> Result<HandlerResult, ParleyError> {
        let text = message.content.trim();

        if context.step().is_some() && is_cancel(text) {
            context.set_step("cancel");
            return Ok(HandlerResult::reply("Registro cancelado.").expiring_context());
        }

        let step = context.step().unwrap_or("start").to_string();
        match step.as_str() {
            "start" => {
                if user.is_registered {
                    return Ok(HandlerResult::reply(format!(
                        "Ya estás registrado como {}.",
                        user.greeting_name()
                    ))
                    .expiring_context());
                }
                context.set_step("name");
                Ok(HandlerResult::reply(
                    "¡Vamos a registrarte! ¿Cómo te llamas? (escribe \"cancelar\" para salir)",
                ))
            }
            "name" => {
                if text.is_empty() || text.chars().count() > MAX_NAME_LEN {
                    return Ok(HandlerResult::reply(format!(
                        "Escribe un nombre de 1 a {MAX_NAME_LEN} caracteres."
                    )));
                }
                context
                    .data
                    .insert(NAME_KEY.to_string(), text.to_string().into());
                context.set_step("confirm");
                Ok(HandlerResult::reply(format!(
                    "¿Confirmas que tu nombre es {text}? (sí/no)"
                )))
            }
            "confirm" => match affirmative(text) {
                Some(true) => self.complete(user, context).await,
                Some(false) => {
                    context.data.remove(NAME_KEY);
                    context.set_step("name");
                    Ok(HandlerResult::reply("De acuerdo. ¿Cómo te llamas?"))
                }
                None => Ok(HandlerResult::reply("Responde \"sí\" o \"no\".")),
            },
            other => Err(ParleyError::Internal(format!(
                "unknown registration step `{other}`"
            ))),
        }
    }
}
