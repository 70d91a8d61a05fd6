// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the complete Parley pipeline.
//!
//! Each test builds an isolated TestHarness with an in-memory store and a mock
//! delivery adapter. Tests are independent and order-insensitive.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parley_commands::{CommandContext, CommandDefinition, CommandHandler};
use parley_context::{ConversationContext, Detection};
use parley_core::{
    FailureKind, HandlerResult, InboundMessage, MessageRecord, ParleyError, User, UserDraft,
    UserId, UserLevel,
};
use parley_pipeline::{ContextService, Ingress, MessageHandler, Route};
use parley_test_utils::{FailingUserStore, FlakyUserStore, MockDelivery, TestHarness};
use tokio_util::sync::CancellationToken;

const ALICE: &str = "+15550001";

/// Fallback handler with a fixed reply.
struct Fixed {
    name: &'static str,
    priority: i32,
    reply: &'static str,
    accept: bool,
}

#[async_trait]
impl MessageHandler for Fixed {
    fn name(&self) -> &str {
        self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn can_handle(&self, _user: &User, _message: &MessageRecord) -> bool {
        true
    }

    async fn handle(
        &self,
        _user: &User,
        _message: &MessageRecord,
    ) -> Result<HandlerResult, ParleyError> {
        if self.accept {
            Ok(HandlerResult::reply(self.reply))
        } else {
            Ok(HandlerResult::failed(parley_core::Failure::new(
                FailureKind::NotFound,
                "not mine",
            )))
        }
    }
}

/// Context service whose lookups blow up.
struct BrokenContexts {
    panic: bool,
}

#[async_trait]
impl ContextService for BrokenContexts {
    fn active_context(&self, _user_id: &UserId) -> Result<Option<ConversationContext>, ParleyError> {
        if self.panic {
            panic!("context table corrupted");
        }
        Err(ParleyError::Internal("context table unavailable".into()))
    }

    fn detect(&self, _text: &str, _user: &User) -> Option<Detection> {
        None
    }

    async fn execute(
        &self,
        _user: &User,
        _message: &MessageRecord,
        _context: Option<ConversationContext>,
    ) -> HandlerResult {
        HandlerResult::from_error(&ParleyError::Internal("unreachable".into()))
    }
}

struct Slow;

#[async_trait]
impl CommandHandler for Slow {
    async fn execute(&self, _ctx: CommandContext<'_>) -> Result<HandlerResult, ParleyError> {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok(HandlerResult::reply("too late"))
    }
}

// --- Command path ---

#[tokio::test]
async fn ping_from_new_user_creates_user_and_replies() {
    let harness = TestHarness::new().unwrap();

    let outcome = harness.send(ALICE, "!ping").await;

    assert!(outcome.success);
    assert_eq!(
        outcome.route,
        Route::Command {
            name: "ping".into()
        }
    );
    assert_eq!(outcome.replies(), vec!["Pong!"]);
    assert_eq!(outcome.delivered, 1);
    assert_eq!(harness.delivery.texts_to(ALICE).await, vec!["Pong!"]);

    let user = harness.user(ALICE).await.unwrap().unwrap();
    assert_eq!(user.external_id, "15550001");
    assert_eq!(user.phone_number.as_deref(), Some("+15550001"));
    assert_eq!(user.level, UserLevel::User);
    assert!(!user.is_registered);
    assert_eq!(user.message_count, 0);
    assert_eq!(outcome.user_id.as_ref(), Some(&user.id));
}

#[tokio::test]
async fn returning_user_is_counted_not_recreated() {
    let harness = TestHarness::new().unwrap();
    harness.send(ALICE, "!ping").await;
    harness.send("15550001@c.us", "!ping").await;

    assert_eq!(harness.users.len(), 1);
    let user = harness.user(ALICE).await.unwrap().unwrap();
    assert_eq!(user.message_count, 1);
}

#[tokio::test]
async fn read_receipt_and_typing_bracket_the_run() {
    let harness = TestHarness::new().unwrap();
    let inbound = InboundMessage::text(ALICE, "!ping");
    harness.pipeline.process_message(&inbound).await;

    assert_eq!(harness.delivery.read_receipts().await, vec![inbound.id]);
    assert_eq!(harness.delivery.typing_to(ALICE).await, vec![true, false]);
}

#[tokio::test]
async fn receipts_and_typing_follow_config() {
    let harness = TestHarness::builder()
        .with_config(|c| {
            c.pipeline.mark_read = false;
            c.pipeline.typing_indicator = false;
        })
        .build()
        .unwrap();
    harness.send(ALICE, "!ping").await;

    assert!(harness.delivery.read_receipts().await.is_empty());
    assert!(harness.delivery.typing_to(ALICE).await.is_empty());
    assert_eq!(harness.delivery.sent_texts().await, vec!["Pong!"]);
}

#[tokio::test]
async fn unknown_command_sends_error_notice() {
    let harness = TestHarness::new().unwrap();
    let outcome = harness.send(ALICE, "!nope").await;

    assert!(!outcome.success);
    assert_eq!(
        outcome.route,
        Route::Command {
            name: "nope".into()
        }
    );
    assert_eq!(outcome.error.as_ref().unwrap().kind, FailureKind::NotFound);
    let texts = harness.delivery.texts_to(ALICE).await;
    assert_eq!(texts.len(), 1);
    assert!(texts[0].starts_with("Not found:"), "got {texts:?}");
}

#[tokio::test]
async fn error_notices_can_be_switched_off() {
    let harness = TestHarness::builder()
        .with_config(|c| c.commands.error_replies = false)
        .build()
        .unwrap();
    let outcome = harness.send(ALICE, "!nope").await;

    assert!(!outcome.success);
    assert_eq!(outcome.delivered, 0);
    assert!(harness.delivery.sent_texts().await.is_empty());
}

#[tokio::test]
async fn bare_prefix_is_a_validation_failure() {
    let harness = TestHarness::new().unwrap();
    let outcome = harness.send(ALICE, "!").await;

    assert!(!outcome.success);
    assert_eq!(outcome.error.unwrap().kind, FailureKind::Validation);
    assert_eq!(harness.delivery.sent_texts().await.len(), 1);
}

#[tokio::test]
async fn admin_command_is_denied_to_regular_users() {
    let harness = TestHarness::new().unwrap();
    let outcome = harness.send(ALICE, "!stats").await;

    assert!(!outcome.success);
    assert_eq!(outcome.error.unwrap().kind, FailureKind::Permission);
    let texts = harness.delivery.texts_to(ALICE).await;
    assert!(texts[0].starts_with("Not allowed:"));
}

#[tokio::test]
async fn echo_cooldown_applies_across_messages() {
    let harness = TestHarness::new().unwrap();
    let first = harness.send(ALICE, "!echo hola").await;
    assert_eq!(first.replies(), vec!["hola"]);

    let second = harness.send(ALICE, "!echo otra vez").await;
    assert!(!second.success);
    assert_eq!(second.error.unwrap().kind, FailureKind::Cooldown);
}

// --- Aborts ---

#[tokio::test]
async fn empty_content_aborts_but_stops_typing() {
    let harness = TestHarness::new().unwrap();
    let outcome = harness.send(ALICE, "   ").await;

    assert!(!outcome.success);
    assert_eq!(outcome.route, Route::Aborted);
    assert_eq!(outcome.error.unwrap().kind, FailureKind::Validation);
    assert!(outcome.user_id.is_none());
    assert_eq!(harness.delivery.typing_to(ALICE).await, vec![true, false]);
    assert!(harness.delivery.sent_texts().await.is_empty());
    assert!(harness.users.is_empty());
}

#[tokio::test]
async fn store_failure_aborts_but_stops_typing() {
    let harness = TestHarness::builder()
        .with_store(Arc::new(FailingUserStore))
        .build()
        .unwrap();
    let outcome = harness.send(ALICE, "!ping").await;

    assert_eq!(outcome.route, Route::Aborted);
    assert_eq!(outcome.error.unwrap().kind, FailureKind::Storage);
    assert_eq!(harness.delivery.typing_to(ALICE).await, vec![true, false]);
    assert!(harness.delivery.sent_texts().await.is_empty());
}

#[tokio::test]
async fn banned_user_is_dropped() {
    let harness = TestHarness::new().unwrap();
    let mut user = User::from_draft(
        UserId("u-banned".into()),
        UserDraft {
            external_id: "15550009".into(),
            ..Default::default()
        },
    );
    user.banned = true;
    harness.users.insert(user);

    let outcome = harness.send("+15550009", "!ping").await;

    assert_eq!(outcome.route, Route::Aborted);
    assert_eq!(outcome.error.unwrap().kind, FailureKind::Permission);
    assert_eq!(outcome.user_id, Some(UserId("u-banned".into())));
    assert!(harness.delivery.sent_texts().await.is_empty());
}

// --- Resilience ---

#[tokio::test]
async fn context_lookup_error_is_ignored() {
    let harness = TestHarness::builder()
        .with_context_service(Arc::new(BrokenContexts { panic: false }))
        .build()
        .unwrap();
    let outcome = harness.send(ALICE, "!ping").await;

    assert!(outcome.success);
    assert_eq!(outcome.replies(), vec!["Pong!"]);
}

#[tokio::test]
async fn context_lookup_panic_is_ignored() {
    let harness = TestHarness::builder()
        .with_context_service(Arc::new(BrokenContexts { panic: true }))
        .build()
        .unwrap();

    let command = harness.send(ALICE, "!ping").await;
    assert_eq!(command.replies(), vec!["Pong!"]);

    let chat = harness.send(ALICE, "hola").await;
    assert!(chat.success);
    assert_eq!(chat.route, Route::Unhandled);
}

#[tokio::test]
async fn delivery_failure_does_not_fail_the_message() {
    let harness = TestHarness::builder()
        .with_delivery(Arc::new(MockDelivery::failing()))
        .build()
        .unwrap();
    let outcome = harness.send(ALICE, "!ping").await;

    assert!(outcome.success);
    assert_eq!(outcome.delivered, 0);
    assert_eq!(outcome.delivery_failures, 1);
    assert_eq!(harness.delivery.sent_texts().await, vec!["Pong!"]);
}

// --- Fallback path ---

#[tokio::test]
async fn fallback_handlers_run_by_priority() {
    let harness = TestHarness::builder()
        .without_context_handlers()
        .with_handler(Arc::new(Fixed {
            name: "low",
            priority: 1,
            reply: "baja",
            accept: true,
        }))
        .with_handler(Arc::new(Fixed {
            name: "decliner",
            priority: 20,
            reply: "nunca",
            accept: false,
        }))
        .with_handler(Arc::new(Fixed {
            name: "high",
            priority: 10,
            reply: "alta",
            accept: true,
        }))
        .build()
        .unwrap();

    let outcome = harness.send(ALICE, "hola").await;

    assert_eq!(
        outcome.route,
        Route::Fallback {
            handler: "high".into()
        }
    );
    assert_eq!(outcome.replies(), vec!["alta"]);
}

#[tokio::test]
async fn auto_reply_answers_unhandled_messages() {
    let harness = TestHarness::builder()
        .without_context_handlers()
        .with_config(|c| {
            c.auto_reply.enabled = true;
            c.auto_reply.message = "Estoy ocupado.".into();
        })
        .build()
        .unwrap();
    let outcome = harness.send(ALICE, "hola").await;

    assert!(outcome.success);
    assert_eq!(outcome.route, Route::AutoReply);
    assert_eq!(harness.delivery.texts_to(ALICE).await, vec!["Estoy ocupado."]);
}

#[tokio::test]
async fn unhandled_message_succeeds_silently() {
    let harness = TestHarness::builder()
        .without_context_handlers()
        .build()
        .unwrap();
    let outcome = harness.send(ALICE, "hola").await;

    assert!(outcome.success);
    assert_eq!(outcome.route, Route::Unhandled);
    assert!(outcome.results.is_empty());
    assert!(harness.delivery.sent_texts().await.is_empty());
    assert_eq!(harness.delivery.typing_to(ALICE).await, vec![true, false]);
}

// --- Context path ---

#[tokio::test]
async fn small_talk_falls_back_to_conversation() {
    let harness = TestHarness::new().unwrap();
    let outcome = harness.send(ALICE, "hola").await;

    assert!(outcome.success);
    assert_eq!(
        outcome.route,
        Route::Fallback {
            handler: "context-detection".into()
        }
    );
    let replies = outcome.replies();
    assert_eq!(replies.len(), 1);
    assert!(replies[0].contains(ALICE), "got {replies:?}");

    let user = harness.user(ALICE).await.unwrap().unwrap();
    assert!(harness.contexts.get_active_context(&user.id).is_none());
}

#[tokio::test]
async fn registration_flow_runs_through_the_pipeline() {
    let harness = TestHarness::new().unwrap();

    let start = harness.send(ALICE, "quiero registrarme").await;
    assert_eq!(
        start.route,
        Route::Fallback {
            handler: "context-detection".into()
        }
    );
    assert!(start.replies()[0].contains("¿Cómo te llamas?"));

    let name = harness.send(ALICE, "Ana").await;
    assert_eq!(name.route, Route::Context);
    assert_eq!(name.replies(), vec!["¿Confirmas que tu nombre es Ana? (sí/no)"]);

    // Commands still win while a context is active.
    let ping = harness.send(ALICE, "!ping").await;
    assert_eq!(ping.replies(), vec!["Pong!"]);

    let done = harness.send(ALICE, "sí").await;
    assert_eq!(done.route, Route::Context);
    assert_eq!(done.replies(), vec!["¡Registro completado! Bienvenido, Ana."]);

    let user = harness.user(ALICE).await.unwrap().unwrap();
    assert!(user.is_registered);
    assert_eq!(user.display_name.as_deref(), Some("Ana"));
    assert!(user.registration_date.is_some());
    assert!(harness.contexts.get_active_context(&user.id).is_none());
}

#[tokio::test]
async fn whoami_reflects_registration() {
    let harness = TestHarness::new().unwrap();
    for text in ["registro", "Ana", "sí"] {
        harness.send(ALICE, text).await;
    }
    let outcome = harness.send(ALICE, "!perfil").await;
    assert!(outcome.replies()[0].contains("Ana"));
}

// --- Concurrency ---

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_users_are_isolated() {
    let harness = Arc::new(TestHarness::new().unwrap());
    let senders: Vec<String> = (0..20).map(|i| format!("+1555100{i:02}")).collect();

    let runs = senders.iter().map(|from| {
        let harness = Arc::clone(&harness);
        let from = from.clone();
        async move { harness.send(&from, "!echo hola").await }
    });
    let outcomes = futures::future::join_all(runs).await;

    assert!(outcomes.iter().all(|o| o.success));
    assert_eq!(harness.users.len(), 20);
    for from in &senders {
        assert_eq!(harness.delivery.texts_to(from).await, vec!["hola"]);
    }
}

// --- Ingress ---

#[tokio::test]
async fn ingress_processes_queue_until_closed() {
    let harness = TestHarness::new().unwrap();
    let ingress = Ingress::new(Arc::clone(&harness.pipeline));
    let (tx, rx) = ingress.channel();

    for i in 0..5 {
        tx.send(InboundMessage::text(format!("+1555200{i}"), "!ping"))
            .await
            .unwrap();
    }
    drop(tx);

    let stats = ingress.run(rx, CancellationToken::new()).await;
    assert_eq!(stats.processed, 5);
    assert_eq!(stats.failed, 0);
    assert_eq!(harness.delivery.sent_texts().await.len(), 5);
}

#[tokio::test]
async fn ingress_retries_storage_failures() {
    let harness = TestHarness::builder()
        .with_store(Arc::new(FlakyUserStore::new(2)))
        .build()
        .unwrap();
    let ingress = Ingress::new(Arc::clone(&harness.pipeline));
    let (tx, rx) = ingress.channel();
    tx.send(InboundMessage::text(ALICE, "!ping")).await.unwrap();
    drop(tx);

    let stats = ingress.run(rx, CancellationToken::new()).await;
    assert_eq!(stats.retried, 2);
    assert_eq!(stats.failed, 0);
    assert_eq!(harness.delivery.sent_texts().await, vec!["Pong!"]);
}

#[tokio::test]
async fn ingress_gives_up_after_retry_count() {
    let harness = TestHarness::builder()
        .with_config(|c| c.pipeline.retry_count = 1)
        .with_store(Arc::new(FlakyUserStore::new(5)))
        .build()
        .unwrap();
    let ingress = Ingress::new(Arc::clone(&harness.pipeline));
    let (tx, rx) = ingress.channel();
    tx.send(InboundMessage::text(ALICE, "!ping")).await.unwrap();
    drop(tx);

    let stats = ingress.run(rx, CancellationToken::new()).await;
    assert_eq!(stats.retried, 1);
    assert_eq!(stats.failed, 1);
}

#[tokio::test(start_paused = true)]
async fn ingress_abandons_slow_messages() {
    let harness = TestHarness::builder()
        .with_config(|c| c.pipeline.processing_timeout_ms = 50)
        .with_command(
            CommandDefinition::new("slow", "Tarda mucho", "test", "test.slow"),
            Arc::new(Slow),
        )
        .build()
        .unwrap();
    let ingress = Ingress::new(Arc::clone(&harness.pipeline));
    let (tx, rx) = ingress.channel();
    tx.send(InboundMessage::text(ALICE, "!slow")).await.unwrap();
    drop(tx);

    let stats = ingress.run(rx, CancellationToken::new()).await;
    assert_eq!(stats.processed, 1);
    assert_eq!(stats.timed_out, 1);
    assert!(harness.delivery.sent_texts().await.is_empty());
    assert_eq!(harness.delivery.typing_to(ALICE).await, vec![true, false]);
}

#[tokio::test(start_paused = true)]
async fn deadline_keeps_the_typing_bracket() {
    let harness = TestHarness::builder()
        .with_command(
            CommandDefinition::new("slow", "Tarda mucho", "test", "test.slow"),
            Arc::new(Slow),
        )
        .build()
        .unwrap();

    let outcome = harness
        .pipeline
        .process_message_within(&InboundMessage::text(ALICE, "!slow"), Duration::from_millis(50))
        .await;
    assert!(!outcome.success);
    assert_eq!(outcome.route, Route::TimedOut);
    assert_eq!(outcome.error.as_ref().map(|e| e.kind), Some(FailureKind::Internal));
    assert_eq!(harness.delivery.typing_to(ALICE).await, vec![true, false]);
    assert!(harness.delivery.sent_texts().await.is_empty());

    let fast = harness
        .pipeline
        .process_message_within(&InboundMessage::text(ALICE, "!ping"), Duration::from_secs(5))
        .await;
    assert!(fast.success);
    assert_ne!(fast.route, Route::TimedOut);
}

#[tokio::test]
async fn ingress_stops_on_cancel() {
    let harness = TestHarness::new().unwrap();
    let ingress = Ingress::new(Arc::clone(&harness.pipeline));
    let (_tx, rx) = ingress.channel();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let stats = ingress.run(rx, cancel).await;
    assert_eq!(stats.processed, 0);
}
