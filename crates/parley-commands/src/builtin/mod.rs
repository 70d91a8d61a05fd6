// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in commands.
//!
//! These are available without any extra capability wiring: the pipeline
//! registers them at startup through [`register_builtins`].

pub mod general;
pub mod profile;
pub mod stats;

pub use general::{EchoCommand, HelpCommand, PingCommand};
pub use profile::WhoamiCommand;
pub use stats::StatsCommand;

use std::sync::Arc;

use parley_core::{ParleyError, UserLevel};

use crate::definition::{CommandDefinition, ParameterKind, ParameterSpec};
use crate::handler::CapabilityMap;
use crate::registry::CommandRegistry;

/// Capability keys of the built-in handlers.
pub fn builtin_capabilities() -> CapabilityMap {
    CapabilityMap::new()
        .with("builtin.ping", Arc::new(PingCommand))
        .with("builtin.help", Arc::new(HelpCommand))
        .with("builtin.echo", Arc::new(EchoCommand))
        .with("builtin.whoami", Arc::new(WhoamiCommand))
        .with("builtin.stats", Arc::new(StatsCommand))
}

/// Definitions of the built-in commands.
pub fn builtin_commands() -> Vec<CommandDefinition> {
    vec![
        CommandDefinition::new(
            "ping",
            "Comprueba que el bot responde",
            "general",
            "builtin.ping",
        ),
        CommandDefinition::new(
            "help",
            "Muestra los comandos disponibles",
            "general",
            "builtin.help",
        )
        .with_alias("ayuda")
        .with_parameter(ParameterSpec::optional(
            "command",
            ParameterKind::String,
            None,
        )),
        CommandDefinition::new("echo", "Repite el texto enviado", "general", "builtin.echo")
            .with_cooldown(2)
            .with_parameter(ParameterSpec::required("text", ParameterKind::String)),
        CommandDefinition::new(
            "whoami",
            "Muestra tu perfil",
            "profile",
            "builtin.whoami",
        )
        .with_alias("perfil"),
        CommandDefinition::new(
            "stats",
            "Estadísticas de uso de comandos",
            "admin",
            "builtin.stats",
        )
        .with_level(UserLevel::Admin),
    ]
}

/// Registers every built-in command. The registry's resolver must know the
/// keys from [`builtin_capabilities`].
pub fn register_builtins(registry: &CommandRegistry) -> Result<(), ParleyError> {
    for definition in builtin_commands() {
        registry.register(definition)?;
    }
    Ok(())
}
