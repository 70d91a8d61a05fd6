// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command handler trait and capability resolution.
//!
//! A [`CommandDefinition`] names its implementation through an opaque
//! `handler_ref`. The registry asks a [`CapabilityResolver`] for the matching
//! [`CommandHandler`] once, at registration, and keeps the resolved trait
//! object next to the definition.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parley_core::{HandlerResult, JsonMap, MessageRecord, ParleyError, User};

use crate::definition::CommandDefinition;
use crate::registry::CommandRegistry;

/// Everything a handler sees for one invocation.
pub struct CommandContext<'a> {
    pub command: &'a CommandDefinition,
    /// Raw arguments after the command token.
    pub args: &'a [String],
    /// Typed parameters, keyed by parameter name.
    pub params: JsonMap,
    pub user: &'a User,
    pub message: &'a MessageRecord,
    pub registry: &'a CommandRegistry,
}

impl CommandContext<'_> {
    pub fn param_str(&self, name: &str) -> Option<&str> {
        self.params.get(name).and_then(|v| v.as_str())
    }

    pub fn param_i64(&self, name: &str) -> Option<i64> {
        self.params.get(name).and_then(|v| v.as_i64())
    }

    pub fn param_bool(&self, name: &str) -> Option<bool> {
        self.params.get(name).and_then(|v| v.as_bool())
    }
}

/// Implementation of a command.
///
/// Expected failures should come back as a failed [`HandlerResult`]; an `Err`
/// is converted into a handler-execution failure by the registry.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn execute(&self, ctx: CommandContext<'_>) -> Result<HandlerResult, ParleyError>;
}

/// Maps a `handler_ref` onto its implementation.
pub trait CapabilityResolver: Send + Sync {
    fn resolve(&self, handler_ref: &str) -> Option<Arc<dyn CommandHandler>>;
}

/// Static capability table.
#[derive(Default, Clone)]
pub struct CapabilityMap {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl CapabilityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the handler for `handler_ref`.
    pub fn insert(&mut self, handler_ref: impl Into<String>, handler: Arc<dyn CommandHandler>) {
        self.handlers.insert(handler_ref.into(), handler);
    }

    pub fn with(mut self, handler_ref: impl Into<String>, handler: Arc<dyn CommandHandler>) -> Self {
        self.insert(handler_ref, handler);
        self
    }

    /// Merges every entry of `other` into this map.
    pub fn extend(&mut self, other: CapabilityMap) {
        self.handlers.extend(other.handlers);
    }

    pub fn contains(&self, handler_ref: &str) -> bool {
        self.handlers.contains_key(handler_ref)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl CapabilityResolver for CapabilityMap {
    fn resolve(&self, handler_ref: &str) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.get(handler_ref).cloned()
    }
}

impl std::fmt::Debug for CapabilityMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("CapabilityMap").field("handlers", &keys).finish()
    }
}

/// Handler that always replies with a fixed text.
pub struct StaticReply(pub &'static str);

#[async_trait]
impl CommandHandler for StaticReply {
    async fn execute(&self, _ctx: CommandContext<'_>) -> Result<HandlerResult, ParleyError> {
        Ok(HandlerResult::reply(self.0))
    }
}
