// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;
use parley_core::{HandlerResult, ParleyError};
use serde_json::json;

use crate::handler::{CommandContext, CommandHandler};

/// Reports command usage counters. Registered at ADMIN level.
pub struct StatsCommand;

#[async_trait]
impl CommandHandler for StatsCommand {
    async fn execute(&self, ctx: CommandContext<'_>) -> Result<HandlerResult, ParleyError> {
        let counts = ctx.registry.usage_snapshot();
        let prefix = ctx.registry.prefix();

        let mut text = format!("Comandos registrados: {}", ctx.registry.len());
        if counts.is_empty() {
            text.push_str("\nSin usos todavía.");
        }
        for (name, count) in &counts {
            text.push_str(&format!("\n{prefix}{name}: {count}"));
        }

        let usage: serde_json::Map<String, serde_json::Value> = counts
            .into_iter()
            .map(|(name, count)| (name, json!(count)))
            .collect();
        Ok(HandlerResult::reply(text).with_data("usage", usage))
    }
}
