// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;
use parley_core::{HandlerResult, ParleyError};

use crate::handler::{CommandContext, CommandHandler};

/// Shows the caller's own profile.
pub struct WhoamiCommand;

#[async_trait]
impl CommandHandler for WhoamiCommand {
    async fn execute(&self, ctx: CommandContext<'_>) -> Result<HandlerResult, ParleyError> {
        let user = ctx.user;
        let registered = match user.registration_date {
            Some(date) if user.is_registered => format!("sí (desde {})", date.format("%Y-%m-%d")),
            _ if user.is_registered => "sí".to_string(),
            _ => "no".to_string(),
        };
        let text = format!(
            "Nombre: {}\nNivel: {}\nRegistrado: {}\nMensajes: {}",
            user.greeting_name(),
            user.level,
            registered,
            user.message_count
        );
        Ok(HandlerResult::reply(text).with_data("level", user.level.to_string()))
    }
}
