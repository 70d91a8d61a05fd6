// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The five-stage message pipeline.
//!
//! 1. validate the inbound message and build a [`MessageRecord`]
//! 2. resolve the sender to a [`User`]
//! 3. look up the user's active context
//! 4. dispatch to a command, the context, or the fallback handlers
//! 5. deliver every successful response
//!
//! Stages 1 and 2 abort the run on failure. Stage 3 failures are logged and
//! ignored. Delivery is best-effort. Read receipts and the typing indicator
//! bracket the run; the indicator is switched off on every exit path.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use parley_commands::CommandRegistry;
use parley_config::model::{AutoReplyConfig, ParleyConfig, PipelineConfig};
use parley_context::ConversationContext;
use parley_core::{
    panic_message, DeliveryAdapter, Failure, HandlerResult, InboundMessage, MessageId,
    MessageRecord, ParleyError, Response, User, UserId, UserLevel, UserStore,
};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::context::ContextService;
use crate::fallback::{sort_by_priority, MessageHandler};
use crate::resolver::UserResolver;

/// Which dispatch path handled a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Route {
    /// Stage 1 or 2 failed.
    Aborted,
    Command { name: String },
    Context,
    Fallback { handler: String },
    AutoReply,
    /// Nothing accepted the message.
    Unhandled,
    /// The run exceeded its deadline and was abandoned.
    TimedOut,
}

/// Result of one [`MessagePipeline::process_message`] run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub success: bool,
    pub message_id: MessageId,
    pub user_id: Option<UserId>,
    pub route: Route,
    pub results: Vec<HandlerResult>,
    pub error: Option<Failure>,
    pub delivered: usize,
    pub delivery_failures: usize,
    pub elapsed: Duration,
}

impl PipelineOutcome {
    fn aborted(message_id: MessageId, user_id: Option<UserId>, err: &ParleyError) -> Self {
        Self::failed(Route::Aborted, message_id, user_id, err)
    }

    fn failed(
        route: Route,
        message_id: MessageId,
        user_id: Option<UserId>,
        err: &ParleyError,
    ) -> Self {
        Self {
            success: false,
            message_id,
            user_id,
            route,
            results: Vec::new(),
            error: Some(err.to_failure()),
            delivered: 0,
            delivery_failures: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Text of every successful text response, in order.
    pub fn replies(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter_map(HandlerResult::deliverable)
            .filter_map(|r| match r {
                Response::Text { content } => Some(content.as_str()),
                Response::Media { .. } => None,
            })
            .collect()
    }
}

/// Processing limits the pipeline declares but leaves to its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_concurrent: usize,
    pub processing_timeout: Duration,
    pub retry_count: u32,
    pub queue_size: usize,
}

impl From<&PipelineConfig> for Limits {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            max_concurrent: config.max_concurrent,
            processing_timeout: config.processing_timeout(),
            retry_count: config.retry_count,
            queue_size: config.queue_size,
        }
    }
}

pub struct MessagePipeline {
    config: PipelineConfig,
    auto_reply: AutoReplyConfig,
    error_replies: bool,
    commands: Arc<CommandRegistry>,
    contexts: Arc<dyn ContextService>,
    resolver: UserResolver,
    delivery: Arc<dyn DeliveryAdapter>,
    handlers: Vec<Arc<dyn MessageHandler>>,
}

impl MessagePipeline {
    pub fn new(
        config: &ParleyConfig,
        commands: Arc<CommandRegistry>,
        contexts: Arc<dyn ContextService>,
        store: Arc<dyn UserStore>,
        delivery: Arc<dyn DeliveryAdapter>,
    ) -> Self {
        info!(
            bot = config.bot.name.as_str(),
            prefix = commands.prefix(),
            delivery = delivery.name(),
            "message pipeline initialized"
        );
        Self {
            config: config.pipeline.clone(),
            auto_reply: config.auto_reply.clone(),
            error_replies: config.commands.error_replies,
            commands,
            contexts,
            resolver: UserResolver::new(store),
            delivery,
            handlers: Vec::new(),
        }
    }

    /// Adds a fallback handler.
    pub fn with_handler(mut self, handler: Arc<dyn MessageHandler>) -> Self {
        self.add_handler(handler);
        self
    }

    pub fn add_handler(&mut self, handler: Arc<dyn MessageHandler>) {
        debug!(handler = handler.name(), priority = handler.priority(), "fallback handler added");
        self.handlers.push(handler);
        sort_by_priority(&mut self.handlers);
    }

    pub fn limits(&self) -> Limits {
        Limits::from(&self.config)
    }

    pub fn commands(&self) -> &Arc<CommandRegistry> {
        &self.commands
    }

    /// Runs one inbound message through every stage.
    ///
    /// Never returns an error: aborts, handler failures and panics inside the
    /// run all end up in the outcome.
    pub async fn process_message(&self, inbound: &InboundMessage) -> PipelineOutcome {
        self.process(inbound, None).await
    }

    /// Like [`MessagePipeline::process_message`], but abandons the stages
    /// after `deadline` with a [`Route::TimedOut`] outcome. The read receipt
    /// and typing indicator stay outside the deadline, so the indicator is
    /// still switched off.
    pub async fn process_message_within(
        &self,
        inbound: &InboundMessage,
        deadline: Duration,
    ) -> PipelineOutcome {
        self.process(inbound, Some(deadline)).await
    }

    async fn process(
        &self,
        inbound: &InboundMessage,
        deadline: Option<Duration>,
    ) -> PipelineOutcome {
        let started = Instant::now();
        let recipient = inbound.chat_id().to_string();
        let has_recipient = !recipient.trim().is_empty();

        if self.config.mark_read && has_recipient {
            self.best_effort("mark_read", self.delivery.mark_read(&inbound.id, &recipient))
                .await;
        }

        let typing = self.config.typing_indicator && has_recipient;
        if typing {
            self.best_effort("typing_on", self.delivery.send_typing(&recipient, true))
                .await;
            let delay = self.config.typing_delay();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        let run = AssertUnwindSafe(self.run(inbound, &recipient)).catch_unwind();
        let run = match deadline {
            Some(limit) => tokio::time::timeout(limit, run).await.ok(),
            None => Some(run.await),
        };

        if typing {
            self.best_effort("typing_off", self.delivery.send_typing(&recipient, false))
                .await;
        }

        let Some(run) = run else {
            let limit_ms = deadline.map_or(0, |d| d.as_millis() as u64);
            warn!(message_id = %inbound.id, timeout_ms = limit_ms, "message processing timed out");
            let mut outcome = PipelineOutcome::failed(
                Route::TimedOut,
                inbound.id.clone(),
                None,
                &ParleyError::Internal(format!("processing timed out after {limit_ms}ms")),
            );
            outcome.elapsed = started.elapsed();
            return outcome;
        };

        let mut outcome = match run {
            Ok(outcome) => outcome,
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                error!(message_id = %inbound.id, panic = %reason, "pipeline run panicked");
                PipelineOutcome::aborted(
                    inbound.id.clone(),
                    None,
                    &ParleyError::Internal(format!("pipeline panicked: {reason}")),
                )
            }
        };
        outcome.elapsed = started.elapsed();
        debug!(
            message_id = %outcome.message_id,
            success = outcome.success,
            route = ?outcome.route,
            delivered = outcome.delivered,
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "message processed"
        );
        outcome
    }

    async fn run(&self, inbound: &InboundMessage, recipient: &str) -> PipelineOutcome {
        // Stage 1: validate & parse.
        let mut record = match validate(inbound) {
            Ok(record) => record,
            Err(e) => {
                warn!(message_id = %inbound.id, error = %e, "inbound message rejected");
                return PipelineOutcome::aborted(inbound.id.clone(), None, &e);
            }
        };

        // Stage 2: resolve user.
        let user = match self.resolver.resolve(&inbound.from).await {
            Ok(user) => user,
            Err(e) => {
                error!(message_id = %inbound.id, error = %e, "user resolution failed");
                return PipelineOutcome::aborted(inbound.id.clone(), None, &e);
            }
        };
        if user.banned || user.level == UserLevel::Banned {
            info!(user_id = %user.id, "message from banned user dropped");
            return PipelineOutcome::aborted(
                inbound.id.clone(),
                Some(user.id.clone()),
                &ParleyError::Banned,
            );
        }
        record.owner = Some(user.id.clone());

        // Stage 3: detect context.
        let active = self.active_context(&user);

        // Stage 4: dispatch.
        let (route, results) = self.dispatch(&user, &record, active).await;

        let primary = results.first();
        let success = primary.is_none_or(|r| r.success);
        let error = primary.and_then(|r| r.error.clone());

        let mut outcome = PipelineOutcome {
            success,
            message_id: record.id.clone(),
            user_id: Some(user.id.clone()),
            route,
            results,
            error,
            delivered: 0,
            delivery_failures: 0,
            elapsed: Duration::ZERO,
        };

        // Stage 5: generate & deliver.
        self.deliver(recipient, &mut outcome).await;
        outcome
    }

    /// Stage 3. Nothing here can abort the run.
    fn active_context(&self, user: &User) -> Option<ConversationContext> {
        let lookup = std::panic::catch_unwind(AssertUnwindSafe(|| {
            self.contexts.active_context(&user.id)
        }));
        match lookup {
            Ok(Ok(context)) => context,
            Ok(Err(e)) => {
                warn!(user_id = %user.id, error = %e, "context lookup failed, continuing without");
                None
            }
            Err(panic) => {
                warn!(
                    user_id = %user.id,
                    panic = %panic_message(panic.as_ref()),
                    "context lookup panicked, continuing without"
                );
                None
            }
        }
    }

    async fn dispatch(
        &self,
        user: &User,
        record: &MessageRecord,
        active: Option<ConversationContext>,
    ) -> (Route, Vec<HandlerResult>) {
        if self.commands.is_command(&record.content) {
            let Some(invocation) = self.commands.parse_invocation(&record.content) else {
                let err = ParleyError::validation("missing command name after prefix");
                return (
                    Route::Command {
                        name: String::new(),
                    },
                    vec![HandlerResult::from_error(&err)],
                );
            };
            debug!(user_id = %user.id, command = %invocation.command, "dispatching command");
            let result = self
                .commands
                .execute(&invocation.command, &invocation.args, user, record)
                .await;
            let name = result
                .command_name
                .clone()
                .unwrap_or(invocation.command);
            return (Route::Command { name }, vec![result]);
        }

        if let Some(context) = active {
            debug!(
                user_id = %user.id,
                context_type = %context.context_type,
                "dispatching to active context"
            );
            let result = self.contexts.execute(user, record, Some(context)).await;
            return (Route::Context, vec![result]);
        }

        for handler in &self.handlers {
            if !handler.can_handle(user, record) {
                continue;
            }
            let outcome = AssertUnwindSafe(handler.handle(user, record))
                .catch_unwind()
                .await;
            match outcome {
                Ok(Ok(result)) if result.success => {
                    debug!(user_id = %user.id, handler = handler.name(), "fallback handler accepted");
                    return (
                        Route::Fallback {
                            handler: handler.name().to_string(),
                        },
                        vec![result],
                    );
                }
                Ok(Ok(result)) => {
                    debug!(
                        handler = handler.name(),
                        error = ?result.error,
                        "fallback handler declined"
                    );
                }
                Ok(Err(e)) => {
                    warn!(handler = handler.name(), error = %e, "fallback handler failed");
                }
                Err(panic) => {
                    error!(
                        handler = handler.name(),
                        panic = %panic_message(panic.as_ref()),
                        "fallback handler panicked"
                    );
                }
            }
        }

        if self.auto_reply.enabled {
            return (
                Route::AutoReply,
                vec![HandlerResult::reply(self.auto_reply.message.clone())],
            );
        }
        (Route::Unhandled, Vec::new())
    }

    /// Stage 5. Failures are counted, never propagated.
    async fn deliver(&self, recipient: &str, outcome: &mut PipelineOutcome) {
        let notify_errors = self.error_replies && matches!(outcome.route, Route::Command { .. });
        let mut delivered = 0;
        let mut failures = 0;

        for result in &outcome.results {
            let sent = match result.deliverable() {
                Some(Response::Text { content }) => {
                    self.best_effort("send_text", self.delivery.send_text(recipient, content))
                        .await
                }
                Some(Response::Media {
                    path, caption, ..
                }) => {
                    self.best_effort(
                        "send_media",
                        self.delivery
                            .send_media(recipient, path, caption.as_deref()),
                    )
                    .await
                }
                None => match &result.error {
                    Some(failure) if notify_errors => {
                        self.best_effort(
                            "send_notice",
                            self.delivery.send_text(recipient, &failure.notice()),
                        )
                        .await
                    }
                    _ => continue,
                },
            };
            if sent {
                delivered += 1;
            } else {
                failures += 1;
            }
        }

        outcome.delivered = delivered;
        outcome.delivery_failures = failures;
    }

    /// Awaits a delivery call, logging instead of failing.
    async fn best_effort<F>(&self, action: &'static str, call: F) -> bool
    where
        F: std::future::Future<Output = Result<bool, ParleyError>>,
    {
        match call.await {
            Ok(true) => true,
            Ok(false) => {
                debug!(action, adapter = self.delivery.name(), "delivery adapter declined");
                false
            }
            Err(e) => {
                warn!(action, adapter = self.delivery.name(), error = %e, "delivery call failed");
                false
            }
        }
    }
}

/// Stage 1. Reports every problem with the message at once.
fn validate(inbound: &InboundMessage) -> Result<MessageRecord, ParleyError> {
    let mut violations = Vec::new();
    if inbound.from.trim().is_empty() {
        violations.push("sender address is empty".to_string());
    }
    if inbound.content.trim().is_empty() {
        violations.push("message content is empty".to_string());
    }
    if violations.is_empty() {
        Ok(MessageRecord::from_inbound(inbound))
    } else {
        Err(ParleyError::Validation { violations })
    }
}
