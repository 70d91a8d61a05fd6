// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ping`, `help`, and `echo`.

use async_trait::async_trait;
use parley_core::{HandlerResult, ParleyError};

use crate::handler::{CommandContext, CommandHandler};

pub struct PingCommand;

#[async_trait]
impl CommandHandler for PingCommand {
    async fn execute(&self, _ctx: CommandContext<'_>) -> Result<HandlerResult, ParleyError> {
        Ok(HandlerResult::reply("Pong!"))
    }
}

/// Lists the commands the caller may run, grouped by category. With an
/// argument, shows usage for that one command.
pub struct HelpCommand;

#[async_trait]
impl CommandHandler for HelpCommand {
    async fn execute(&self, ctx: CommandContext<'_>) -> Result<HandlerResult, ParleyError> {
        let prefix = ctx.registry.prefix();

        if let Some(name) = ctx.param_str("command") {
            let visible = ctx
                .registry
                .resolve(name)
                .filter(|c| c.definition().enabled && ctx.registry.is_authorized(ctx.user, c.definition()));
            return Ok(match visible {
                Some(command) => {
                    let def = command.definition();
                    let mut text = format!("{}\n{}", def.usage(prefix), def.description);
                    if !def.aliases.is_empty() {
                        let aliases: Vec<String> =
                            def.aliases.iter().map(|a| format!("{prefix}{a}")).collect();
                        text.push_str(&format!("\nAlias: {}", aliases.join(", ")));
                    }
                    HandlerResult::reply(text)
                }
                None => HandlerResult::reply(format!(
                    "No conozco el comando `{name}`. Escribe {prefix}help para ver la lista."
                )),
            });
        }

        let mut text = String::from("Comandos disponibles:");
        let mut category = "";
        let commands = ctx.registry.list_for(ctx.user);
        for command in &commands {
            let def = command.definition();
            if def.category != category {
                category = &def.category;
                text.push_str(&format!("\n\n[{category}]"));
            }
            text.push_str(&format!("\n{}{} - {}", prefix, def.name, def.description));
        }
        Ok(HandlerResult::reply(text).with_data("count", commands.len()))
    }
}

/// Repeats its arguments back.
pub struct EchoCommand;

#[async_trait]
impl CommandHandler for EchoCommand {
    async fn execute(&self, ctx: CommandContext<'_>) -> Result<HandlerResult, ParleyError> {
        Ok(HandlerResult::reply(ctx.args.join(" ")))
    }
}
