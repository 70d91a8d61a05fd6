// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The command registry.
//!
//! Commands are stored by lower-cased name with a separate alias index. All
//! tables are `DashMap`s so concurrent users only contend on the shard that
//! holds their key. Map guards are never held across an `.await`: lookups
//! clone the `Arc<RegisteredCommand>` out before the handler runs.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use futures::FutureExt;
use parley_config::model::CommandConfig;
use parley_core::{panic_message, HandlerResult, JsonMap, MessageRecord, ParleyError, User};
use regex::Regex;
use tracing::{debug, error, info, warn};

use crate::cooldown::CooldownTracker;
use crate::definition::{self, CommandDefinition, Invocation};
use crate::handler::{CapabilityResolver, CommandContext, CommandHandler};
use crate::params;

/// Outcome of a successful [`CommandRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Added,
    /// A command with the same name existed and was overwritten.
    Replaced,
}

/// A definition together with its resolved handler and compiled patterns.
pub struct RegisteredCommand {
    definition: CommandDefinition,
    handler: Arc<dyn CommandHandler>,
    patterns: Vec<Option<Regex>>,
}

impl RegisteredCommand {
    pub fn definition(&self) -> &CommandDefinition {
        &self.definition
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }
}

impl std::fmt::Debug for RegisteredCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredCommand")
            .field("definition", &self.definition)
            .finish_non_exhaustive()
    }
}

pub struct CommandRegistry {
    prefix: String,
    resolver: Arc<dyn CapabilityResolver>,
    commands: DashMap<String, Arc<RegisteredCommand>>,
    /// alias -> command name
    aliases: DashMap<String, String>,
    cooldowns: CooldownTracker,
    usage: DashMap<String, u64>,
}

impl CommandRegistry {
    pub fn new(prefix: impl Into<String>, resolver: Arc<dyn CapabilityResolver>) -> Self {
        Self {
            prefix: prefix.into(),
            resolver,
            commands: DashMap::new(),
            aliases: DashMap::new(),
            cooldowns: CooldownTracker::new(),
            usage: DashMap::new(),
        }
    }

    pub fn from_config(config: &CommandConfig, resolver: Arc<dyn CapabilityResolver>) -> Self {
        Self::new(config.prefix.clone(), resolver)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Validates and registers a command.
    ///
    /// Every problem with the definition is reported in a single
    /// [`ParleyError::Validation`]. Re-registering a name overwrites the old
    /// command and its aliases. An alias already pointing at another command
    /// is moved to the new one.
    pub fn register(&self, definition: CommandDefinition) -> Result<Registration, ParleyError> {
        let mut violations = definition.violations();

        let mut patterns = Vec::with_capacity(definition.parameters.len());
        for (i, param) in definition.parameters.iter().enumerate() {
            match param.pattern.as_deref().map(Regex::new).transpose() {
                Ok(compiled) => patterns.push(compiled),
                Err(e) => {
                    violations.push(format!("parameters[{i}].pattern is not a valid regex: {e}"));
                    patterns.push(None);
                }
            }
        }

        let handler = self.resolver.resolve(&definition.handler_ref);
        if handler.is_none() && !definition.handler_ref.trim().is_empty() {
            violations.push(format!(
                "handler_ref `{}` does not resolve to a handler",
                definition.handler_ref
            ));
        }

        let (Some(handler), true) = (handler, violations.is_empty()) else {
            return Err(ParleyError::Validation { violations });
        };

        let definition = normalize(definition);
        let name = definition.name.clone();
        let aliases = definition.aliases.clone();

        let registered = Arc::new(RegisteredCommand {
            definition,
            handler,
            patterns,
        });

        let previous = self.commands.insert(name.clone(), registered);
        let outcome = match previous {
            Some(old) => {
                warn!(command = %name, "command re-registered, overwriting previous definition");
                for alias in &old.definition.aliases {
                    self.aliases.remove_if(alias, |_, target| *target == name);
                }
                Registration::Replaced
            }
            None => Registration::Added,
        };

        for alias in aliases {
            if let Some(prev) = self.aliases.insert(alias.clone(), name.clone())
                && prev != name
            {
                warn!(alias = %alias, previous = %prev, command = %name, "alias reassigned");
            }
        }

        debug!(command = %name, outcome = ?outcome, "command registered");
        Ok(outcome)
    }

    /// Removes a command with its aliases, cooldowns, and usage counter.
    /// Returns `false` when no such command exists.
    pub fn unregister(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        if self.commands.remove(&name).is_none() {
            warn!(command = %name, "unregister of unknown command ignored");
            return false;
        }
        self.aliases.retain(|_, target| *target != name);
        self.cooldowns.clear_command(&name);
        self.usage.remove(&name);
        info!(command = %name, "command unregistered");
        true
    }

    /// Looks up by exact name first, then by alias. Case-insensitive.
    pub fn resolve(&self, name_or_alias: &str) -> Option<Arc<RegisteredCommand>> {
        let key = name_or_alias.to_lowercase();
        if let Some(command) = self.commands.get(&key) {
            return Some(Arc::clone(command.value()));
        }
        let target = self.aliases.get(&key).map(|t| t.value().clone())?;
        self.commands.get(&target).map(|c| Arc::clone(c.value()))
    }

    pub fn parse_invocation(&self, text: &str) -> Option<Invocation> {
        definition::parse_invocation(&self.prefix, text)
    }

    /// Whether `text` is addressed to the command path.
    pub fn is_command(&self, text: &str) -> bool {
        text.trim_start().starts_with(self.prefix.as_str())
    }

    /// Checks that `user` may run `command`.
    pub fn authorize(&self, user: &User, command: &CommandDefinition) -> Result<(), ParleyError> {
        if user.banned {
            return Err(ParleyError::Banned);
        }
        if user.level < command.level {
            return Err(ParleyError::PermissionDenied {
                required: command.level,
                actual: user.level,
            });
        }
        Ok(())
    }

    pub fn is_authorized(&self, user: &User, command: &CommandDefinition) -> bool {
        self.authorize(user, command).is_ok()
    }

    /// `true` when the user is not rate-limited on `command`.
    pub fn check_cooldown(&self, command: &CommandDefinition, user: &User) -> bool {
        self.remaining_cooldown(command, user) == 0
    }

    pub fn remaining_cooldown(&self, command: &CommandDefinition, user: &User) -> u64 {
        self.cooldowns
            .remaining_secs(&command.name, &user.id, command.cooldown())
    }

    pub fn parse_parameters(&self, command: &CommandDefinition, args: &[String]) -> JsonMap {
        params::parse_parameters(&command.parameters, args)
    }

    pub fn validate_parameters(
        &self,
        command: &RegisteredCommand,
        params: &JsonMap,
    ) -> Result<(), ParleyError> {
        let violations = params::validate_parameters(
            &command.definition.parameters,
            &command.patterns,
            params,
        );
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ParleyError::Validation { violations })
        }
    }

    /// Runs a command through every gate and returns its result.
    ///
    /// Never fails: unknown commands, permission and cooldown rejections,
    /// parameter problems, handler errors and handler panics all come back as
    /// a failed [`HandlerResult`]. The result is stamped with the command name
    /// and execution time.
    pub async fn execute(
        &self,
        name: &str,
        args: &[String],
        user: &User,
        message: &MessageRecord,
    ) -> HandlerResult {
        let started = Instant::now();
        let (command_name, mut result) = self.dispatch(name, args, user, message).await;
        result.execution_time = started.elapsed();
        result.command_name = Some(command_name);
        result
    }

    async fn dispatch(
        &self,
        name: &str,
        args: &[String],
        user: &User,
        message: &MessageRecord,
    ) -> (String, HandlerResult) {
        let Some(command) = self.resolve(name) else {
            debug!(command = %name, user_id = %user.id, "unknown command");
            let err = ParleyError::not_found("command", name.to_lowercase());
            return (name.to_lowercase(), HandlerResult::from_error(&err));
        };
        let definition = &command.definition;
        let command_name = definition.name.clone();

        let params = match self.gate(&command, args, user) {
            Ok(params) => params,
            Err(err) => {
                debug!(command = %command_name, user_id = %user.id, reason = %err, "command rejected");
                return (command_name, HandlerResult::from_error(&err));
            }
        };

        let ctx = CommandContext {
            command: definition,
            args,
            params,
            user,
            message,
            registry: self,
        };

        let outcome = AssertUnwindSafe(command.handler.execute(ctx))
            .catch_unwind()
            .await;
        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                warn!(command = %command_name, user_id = %user.id, error = %e, "command handler failed");
                HandlerResult::from_error(&ParleyError::HandlerExecution {
                    handler: command_name.clone(),
                    message: e.to_string(),
                })
            }
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                error!(command = %command_name, user_id = %user.id, panic = %reason, "command handler panicked");
                HandlerResult::from_error(&ParleyError::HandlerExecution {
                    handler: command_name.clone(),
                    message: format!("panicked: {reason}"),
                })
            }
        };

        if result.success {
            self.cooldowns
                .record(&command_name, &user.id, definition.cooldown());
            *self.usage.entry(command_name.clone()).or_insert(0) += 1;
        }

        (command_name, result)
    }

    /// Disabled, permission, cooldown, and parameter gates, in that order.
    /// Yields the parsed parameters when every gate passes.
    fn gate(
        &self,
        command: &RegisteredCommand,
        args: &[String],
        user: &User,
    ) -> Result<JsonMap, ParleyError> {
        let definition = &command.definition;
        if !definition.enabled {
            return Err(ParleyError::Disabled {
                command: definition.name.clone(),
            });
        }
        self.authorize(user, definition)?;
        let remaining_secs = self.remaining_cooldown(definition, user);
        if remaining_secs > 0 {
            return Err(ParleyError::Cooldown {
                command: definition.name.clone(),
                remaining_secs,
            });
        }
        let params = self.parse_parameters(definition, args);
        self.validate_parameters(command, &params)?;
        Ok(params)
    }

    /// Commands `user` may run, sorted by category then name.
    pub fn list_for(&self, user: &User) -> Vec<Arc<RegisteredCommand>> {
        let mut visible: Vec<Arc<RegisteredCommand>> = self
            .commands
            .iter()
            .filter(|c| c.definition.enabled && self.is_authorized(user, &c.definition))
            .map(|c| Arc::clone(c.value()))
            .collect();
        visible.sort_by(|a, b| {
            (&a.definition.category, &a.definition.name)
                .cmp(&(&b.definition.category, &b.definition.name))
        });
        visible
    }

    /// Number of successful runs of `name`.
    pub fn usage_count(&self, name: &str) -> u64 {
        self.usage
            .get(&name.to_lowercase())
            .map(|c| *c.value())
            .unwrap_or(0)
    }

    /// All usage counters, most used first.
    pub fn usage_snapshot(&self) -> Vec<(String, u64)> {
        let mut counts: Vec<(String, u64)> = self
            .usage
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("prefix", &self.prefix)
            .field("commands", &self.commands.len())
            .field("aliases", &self.aliases.len())
            .finish()
    }
}

/// Lower-cases name and aliases and drops duplicate or self-referencing aliases.
fn normalize(mut definition: CommandDefinition) -> CommandDefinition {
    definition.name = definition.name.to_lowercase();
    let mut aliases: Vec<String> = Vec::with_capacity(definition.aliases.len());
    for alias in definition.aliases.drain(..) {
        let alias = alias.to_lowercase();
        if alias != definition.name && !aliases.contains(&alias) {
            aliases.push(alias);
        }
    }
    definition.aliases = aliases;
    definition
}
