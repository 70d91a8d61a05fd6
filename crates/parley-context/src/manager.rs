// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The context manager.
//!
//! Keeps at most one context per user in a `DashMap` keyed by user id, so
//! replacing an entry is the only way a second context can appear. Contexts
//! are read lazily: an expired entry is invisible to [`ContextManager::get_active_context`]
//! but stays in the table until [`ContextManager::sweep_expired`] runs.
//!
//! While a handler runs, its context id sits in an in-flight table until the
//! turn ends or its future is dropped. The sweep leaves those contexts alone;
//! they are collected by a later sweep once the turn is over.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use futures::FutureExt;
use parley_config::model::ContextConfig;
use parley_core::{panic_message, HandlerResult, JsonMap, MessageRecord, ParleyError, User, UserId};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::context::{ContextType, ConversationContext};
use crate::handler::ContextHandler;

/// Result of [`ContextManager::detect_context`].
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub handler: String,
    pub context_type: ContextType,
    /// Share of the handler's keywords found in the text. Zero for the fallback.
    pub confidence: f64,
}

pub struct ContextManager {
    ttl: Duration,
    max_active: usize,
    cleanup_interval: Duration,
    contexts: DashMap<UserId, ConversationContext>,
    /// Running turns per context id.
    in_flight: DashMap<String, usize>,
    handlers: RwLock<Vec<Arc<dyn ContextHandler>>>,
}

impl ContextManager {
    pub fn new(config: &ContextConfig) -> Self {
        Self {
            ttl: config.ttl(),
            max_active: config.max_active,
            cleanup_interval: config.cleanup_interval(),
            contexts: DashMap::new(),
            in_flight: DashMap::new(),
            handlers: RwLock::new(Vec::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Appends a handler. Each context type has at most one handler: a
    /// handler for a type already served replaces the previous one in place,
    /// keeping its position in the detection order.
    pub fn register_handler(&self, handler: Arc<dyn ContextHandler>) {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        let name = handler.name().to_string();
        let context_type = handler.context_type();
        match handlers.iter().position(|h| h.context_type() == context_type) {
            Some(i) => {
                warn!(
                    handler = %name,
                    previous = %handlers[i].name(),
                    context_type = %context_type,
                    "context handler re-registered, replacing previous"
                );
                handlers[i] = handler;
            }
            None => handlers.push(handler),
        }
        debug!(handler = %name, context_type = %context_type, "context handler registered");
    }

    pub fn handler_count(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// The handler serving `context_type`.
    pub fn handler_for(&self, context_type: ContextType) -> Option<Arc<dyn ContextHandler>> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|h| h.context_type() == context_type)
            .cloned()
    }

    /// Picks the handler whose keywords best match `text`.
    ///
    /// Handlers above the user's level are skipped. The highest keyword share
    /// wins, earlier registration breaking ties. A keyword-less handler is
    /// returned only when no keyword matched at all.
    pub fn detect_context(&self, text: &str, user: &User) -> Option<Detection> {
        let text = text.to_lowercase();
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);

        let mut best: Option<(f64, &Arc<dyn ContextHandler>)> = None;
        let mut fallback: Option<&Arc<dyn ContextHandler>> = None;

        for handler in handlers.iter() {
            if user.level < handler.required_level() {
                continue;
            }
            let keywords = handler.keywords();
            if keywords.is_empty() {
                fallback = fallback.or(Some(handler));
                continue;
            }
            let matched = keywords
                .iter()
                .filter(|k| text.contains(&k.to_lowercase()))
                .count();
            let confidence = matched as f64 / keywords.len() as f64;
            if confidence > 0.0 && best.is_none_or(|(top, _)| confidence > top) {
                best = Some((confidence, handler));
            }
        }

        best.or(fallback.map(|h| (0.0, h)))
            .map(|(confidence, handler)| Detection {
                handler: handler.name().to_string(),
                context_type: handler.context_type(),
                confidence,
            })
    }

    /// Creates a context expiring one TTL from now. Any previous entry for
    /// the user is overwritten without logging.
    pub fn create_context(
        &self,
        user_id: &UserId,
        context_type: ContextType,
        data: JsonMap,
    ) -> ConversationContext {
        if self.active_count() >= self.max_active {
            warn!(
                max_active = self.max_active,
                "active context soft cap reached, sweeping early"
            );
            self.sweep_expired();
        }

        let context =
            ConversationContext::new(user_id.clone(), context_type, data, Instant::now() + self.ttl);
        self.contexts.insert(user_id.clone(), context.clone());
        debug!(user_id = %user_id, context_type = %context_type, context_id = %context.id, "context created");
        context
    }

    /// Clears whatever the user had, then creates a fresh context.
    pub fn create_specific_context(
        &self,
        user_id: &UserId,
        context_type: ContextType,
        data: JsonMap,
    ) -> ConversationContext {
        if self.clear_context(user_id) {
            debug!(user_id = %user_id, "previous context cleared");
        }
        self.create_context(user_id, context_type, data)
    }

    /// Snapshot of the user's context if it is active and unexpired.
    pub fn get_active_context(&self, user_id: &UserId) -> Option<ConversationContext> {
        let now = Instant::now();
        self.contexts
            .get(user_id)
            .filter(|c| c.is_live(now))
            .map(|c| c.value().clone())
    }

    /// Removes the user's context. Returns whether one existed.
    pub fn clear_context(&self, user_id: &UserId) -> bool {
        self.contexts.remove(user_id).is_some()
    }

    /// Marks the user's context inactive. The sweep removes it later.
    pub fn expire_context(&self, user_id: &UserId) -> bool {
        match self.contexts.get_mut(user_id) {
            Some(mut context) if context.active => {
                context.active = false;
                debug!(user_id = %user_id, context_id = %context.id, "context expired");
                true
            }
            _ => false,
        }
    }

    /// Runs one turn of the user's context.
    ///
    /// With no `context` given, the active one is used; failing that, the
    /// message is run through detection and a context is created on a match.
    /// Every outcome, including a missing context, handler errors and
    /// handler panics, comes back as a [`HandlerResult`].
    pub async fn execute_context(
        &self,
        user: &User,
        message: &MessageRecord,
        context: Option<ConversationContext>,
    ) -> HandlerResult {
        let started = std::time::Instant::now();
        let mut result = self.run_turn(user, message, context).await;
        result.execution_time = started.elapsed();
        result
    }

    async fn run_turn(
        &self,
        user: &User,
        message: &MessageRecord,
        context: Option<ConversationContext>,
    ) -> HandlerResult {
        let context = context.or_else(|| self.get_active_context(&user.id));
        let mut context = match context {
            Some(context) => context,
            None => match self.detect_context(&message.content, user) {
                Some(detection) => {
                    debug!(
                        user_id = %user.id,
                        handler = %detection.handler,
                        confidence = detection.confidence,
                        "context detected"
                    );
                    self.create_context(&user.id, detection.context_type, JsonMap::new())
                }
                None => {
                    return HandlerResult::from_error(&ParleyError::not_found(
                        "context",
                        "no active context",
                    ));
                }
            },
        };

        let Some(handler) = self.handler_for(context.context_type) else {
            warn!(
                user_id = %user.id,
                context_type = %context.context_type,
                "no handler for context type, expiring context"
            );
            self.expire_context(&user.id);
            return HandlerResult::from_error(&ParleyError::not_found(
                "context handler",
                context.context_type.to_string(),
            ));
        };

        context.begin_turn(&message.content);

        let outcome = {
            let _turn = InFlight::enter(&self.in_flight, &context.id);
            AssertUnwindSafe(handler.handle(user, message, &mut context))
                .catch_unwind()
                .await
        };

        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                warn!(user_id = %user.id, handler = %handler.name(), error = %e, "context handler failed");
                HandlerResult::from_error(&ParleyError::HandlerExecution {
                    handler: handler.name().to_string(),
                    message: e.to_string(),
                })
            }
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                error!(user_id = %user.id, handler = %handler.name(), panic = %reason, "context handler panicked");
                HandlerResult::from_error(&ParleyError::HandlerExecution {
                    handler: handler.name().to_string(),
                    message: format!("panicked: {reason}"),
                })
            }
        };

        self.finish_turn(&user.id, context, result.expires_context());
        result
    }

    /// Persists the handler's data if the context is still the user's entry.
    fn finish_turn(&self, user_id: &UserId, context: ConversationContext, expire: bool) {
        let Some(mut entry) = self.contexts.get_mut(user_id) else {
            return;
        };
        if entry.id != context.id {
            debug!(user_id = %user_id, context_id = %context.id, "context replaced during turn, dropping update");
            return;
        }
        entry.data = context.data;
        entry.last_interaction = Utc::now();
        entry.expires_at = Instant::now() + self.ttl;
        if expire {
            entry.active = false;
            debug!(user_id = %user_id, context_id = %entry.id, "context completed");
        }
    }

    /// Removes inactive and expired contexts, skipping any mid-turn.
    /// Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        self.contexts.retain(|_, context| {
            let keep = context.is_live(now) || self.in_flight.contains_key(&context.id);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Spawns the periodic sweep. It stops when `cancel` fires.
    pub fn spawn_sweeper(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        let period = self.cleanup_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            info!(interval_ms = period.as_millis() as u64, "context sweeper started");
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("context sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let removed = manager.sweep_expired();
                        if removed > 0 {
                            debug!(removed, remaining = manager.len(), "swept expired contexts");
                        }
                    }
                }
            }
        })
    }

    /// Contexts with a turn currently running.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Live contexts.
    pub fn active_count(&self) -> usize {
        let now = Instant::now();
        self.contexts.iter().filter(|c| c.is_live(now)).count()
    }

    /// Entries in the table, including expired ones awaiting the sweep.
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

/// Marks a context as mid-turn until dropped, so a turn whose future is
/// abandoned still releases its context to the sweep.
struct InFlight<'a> {
    turns: &'a DashMap<String, usize>,
    id: String,
}

impl<'a> InFlight<'a> {
    fn enter(turns: &'a DashMap<String, usize>, id: &str) -> Self {
        *turns.entry(id.to_string()).or_insert(0) += 1;
        Self {
            turns,
            id: id.to_string(),
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(mut running) = self.turns.get_mut(&self.id) {
            *running = running.saturating_sub(1);
        }
        self.turns.remove_if(&self.id, |_, running| *running == 0);
    }
}

impl std::fmt::Debug for ContextManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextManager")
            .field("ttl", &self.ttl)
            .field("max_active", &self.max_active)
            .field("contexts", &self.contexts.len())
            .field("handlers", &self.handler_count())
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}
