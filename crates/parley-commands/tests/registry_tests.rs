// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the command registry.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parley_commands::{
    builtin_capabilities, register_builtins, CapabilityMap, CommandContext, CommandDefinition,
    CommandHandler, CommandRegistry, ParameterKind, ParameterSpec,
};
use parley_core::{
    FailureKind, HandlerResult, InboundMessage, MessageRecord, ParleyError, User, UserDraft,
    UserId, UserLevel,
};
use proptest::prelude::*;

struct Failing;

#[async_trait]
impl CommandHandler for Failing {
    async fn execute(&self, _ctx: CommandContext<'_>) -> Result<HandlerResult, ParleyError> {
        Err(ParleyError::Internal("database on fire".into()))
    }
}

struct Panicking;

#[async_trait]
impl CommandHandler for Panicking {
    async fn execute(&self, _ctx: CommandContext<'_>) -> Result<HandlerResult, ParleyError> {
        panic!("handler exploded");
    }
}

/// Succeeds only when the first argument is "ok".
struct Picky;

#[async_trait]
impl CommandHandler for Picky {
    async fn execute(&self, ctx: CommandContext<'_>) -> Result<HandlerResult, ParleyError> {
        if ctx.args.first().map(String::as_str) == Some("ok") {
            Ok(HandlerResult::reply("fine"))
        } else {
            Ok(HandlerResult::failed(parley_core::Failure::new(
                FailureKind::Validation,
                "not ok",
            )))
        }
    }
}

fn registry() -> CommandRegistry {
    let mut map = builtin_capabilities();
    map.extend(
        CapabilityMap::new()
            .with("test.failing", Arc::new(Failing))
            .with("test.panicking", Arc::new(Panicking))
            .with("test.picky", Arc::new(Picky)),
    );
    let registry = CommandRegistry::new("!", Arc::new(map));
    register_builtins(&registry).unwrap();
    registry
}

fn user_at(id: &str, level: UserLevel) -> User {
    let mut user = User::from_draft(
        UserId(id.to_string()),
        UserDraft {
            external_id: id.to_string(),
            ..Default::default()
        },
    );
    user.level = level;
    user
}

fn record(text: &str) -> MessageRecord {
    MessageRecord::from_inbound(&InboundMessage::text("15550001", text))
}

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn resolves_by_name_and_alias_case_insensitively() {
    let registry = registry();
    assert_eq!(registry.resolve("HELP").unwrap().name(), "help");
    assert_eq!(registry.resolve("Ayuda").unwrap().name(), "help");
    assert!(registry.resolve("nope").is_none());
}

#[tokio::test]
async fn ping_replies_and_is_stamped() {
    let registry = registry();
    let user = user_at("u1", UserLevel::User);
    let result = registry.execute("ping", &[], &user, &record("!ping")).await;
    assert!(result.success);
    assert_eq!(
        result.response,
        Some(parley_core::Response::text("Pong!"))
    );
    assert_eq!(result.command_name.as_deref(), Some("ping"));
    assert_eq!(registry.usage_count("ping"), 1);
}

#[tokio::test]
async fn unknown_command_is_a_not_found_failure() {
    let registry = registry();
    let user = user_at("u1", UserLevel::User);
    let result = registry.execute("Bogus", &[], &user, &record("!Bogus")).await;
    assert!(!result.success);
    assert_eq!(result.error.unwrap().kind, FailureKind::NotFound);
    assert_eq!(result.command_name.as_deref(), Some("bogus"));
}

#[tokio::test(start_paused = true)]
async fn owner_only_command_denied_to_user_without_cooldown() {
    let registry = registry();
    registry
        .register(
            CommandDefinition::new("shutdown", "Stop the bot", "admin", "builtin.ping")
                .with_level(UserLevel::Owner)
                .with_cooldown(60),
        )
        .unwrap();
    let user = user_at("u1", UserLevel::User);

    let result = registry.execute("shutdown", &[], &user, &record("!shutdown")).await;
    assert!(!result.success);
    assert_eq!(result.error.unwrap().kind, FailureKind::Permission);

    let def = registry.resolve("shutdown").unwrap();
    assert!(registry.check_cooldown(def.definition(), &user));
    assert_eq!(registry.usage_count("shutdown"), 0);
}

#[tokio::test(start_paused = true)]
async fn cooldown_blocks_until_elapsed() {
    let registry = registry();
    registry
        .register(CommandDefinition::new("slow", "Slow", "general", "builtin.ping").with_cooldown(10))
        .unwrap();
    let user = user_at("u1", UserLevel::User);
    let other = user_at("u2", UserLevel::User);

    assert!(registry.execute("slow", &[], &user, &record("!slow")).await.success);

    tokio::time::advance(Duration::from_millis(3_200)).await;
    let blocked = registry.execute("slow", &[], &user, &record("!slow")).await;
    assert!(!blocked.success);
    let failure = blocked.error.unwrap();
    assert_eq!(failure.kind, FailureKind::Cooldown);
    assert!(failure.message.contains("7s"), "{}", failure.message);

    assert!(registry.execute("slow", &[], &other, &record("!slow")).await.success);

    tokio::time::advance(Duration::from_millis(6_800)).await;
    assert!(registry.execute("slow", &[], &user, &record("!slow")).await.success);
    assert_eq!(registry.usage_count("slow"), 3);
}

#[tokio::test(start_paused = true)]
async fn unsuccessful_results_do_not_start_cooldown() {
    let registry = registry();
    registry
        .register(CommandDefinition::new("picky", "Picky", "general", "test.picky").with_cooldown(30))
        .unwrap();
    let user = user_at("u1", UserLevel::User);

    let failed = registry
        .execute("picky", &args(&["no"]), &user, &record("!picky no"))
        .await;
    assert!(!failed.success);
    let ok = registry
        .execute("picky", &args(&["ok"]), &user, &record("!picky ok"))
        .await;
    assert!(ok.success);
    let again = registry
        .execute("picky", &args(&["ok"]), &user, &record("!picky ok"))
        .await;
    assert_eq!(again.error.unwrap().kind, FailureKind::Cooldown);
}

#[tokio::test]
async fn handler_errors_and_panics_become_failures() {
    let registry = registry();
    registry
        .register(CommandDefinition::new("fail", "Fails", "test", "test.failing"))
        .unwrap();
    registry
        .register(CommandDefinition::new("boom", "Panics", "test", "test.panicking"))
        .unwrap();
    let user = user_at("u1", UserLevel::User);

    let failed = registry.execute("fail", &[], &user, &record("!fail")).await;
    let failure = failed.error.unwrap();
    assert_eq!(failure.kind, FailureKind::HandlerExecution);
    assert!(failure.message.contains("database on fire"));

    let panicked = registry.execute("boom", &[], &user, &record("!boom")).await;
    let failure = panicked.error.unwrap();
    assert_eq!(failure.kind, FailureKind::HandlerExecution);
    assert!(failure.message.contains("handler exploded"));
    assert_eq!(panicked.command_name.as_deref(), Some("boom"));
}

#[tokio::test]
async fn parameter_violations_are_aggregated() {
    let registry = registry();
    registry
        .register(
            CommandDefinition::new("pay", "Pay", "money", "builtin.ping")
                .with_parameter(
                    ParameterSpec::required("currency", ParameterKind::String)
                        .with_pattern("^[A-Z]{3}$"),
                )
                .with_parameter(ParameterSpec::required("amount", ParameterKind::Number)),
        )
        .unwrap();
    let user = user_at("u1", UserLevel::User);

    let result = registry
        .execute("pay", &args(&["usd"]), &user, &record("!pay usd"))
        .await;
    let failure = result.error.unwrap();
    assert_eq!(failure.kind, FailureKind::Validation);
    assert!(failure.message.contains("currency"));
    assert!(failure.message.contains("amount"));
}

#[tokio::test]
async fn help_lists_only_visible_commands() {
    let registry = registry();
    let user = user_at("u1", UserLevel::User);
    let admin = user_at("u2", UserLevel::Admin);

    let text = |r: HandlerResult| match r.response {
        Some(parley_core::Response::Text { content }) => content,
        other => panic!("unexpected response {other:?}"),
    };

    let for_user = text(registry.execute("ayuda", &[], &user, &record("!ayuda")).await);
    assert!(for_user.contains("!ping"));
    assert!(!for_user.contains("!stats"));

    let for_admin = text(registry.execute("help", &[], &admin, &record("!help")).await);
    assert!(for_admin.contains("!stats"));

    let single = text(
        registry
            .execute("help", &args(&["echo"]), &user, &record("!help echo"))
            .await,
    );
    assert!(single.starts_with("!echo <text>"));
}

#[tokio::test]
async fn echo_requires_text() {
    let registry = registry();
    let user = user_at("u1", UserLevel::User);
    let missing = registry.execute("echo", &[], &user, &record("!echo")).await;
    assert_eq!(missing.error.unwrap().kind, FailureKind::Validation);

    let echoed = registry
        .execute("echo", &args(&["hola", "mundo"]), &user, &record("!echo hola mundo"))
        .await;
    assert_eq!(
        echoed.response,
        Some(parley_core::Response::text("hola mundo"))
    );
}

#[tokio::test]
async fn stats_counts_successful_runs() {
    let registry = registry();
    let admin = user_at("admin", UserLevel::Admin);
    for _ in 0..3 {
        registry.execute("ping", &[], &admin, &record("!ping")).await;
    }
    let result = registry.execute("stats", &[], &admin, &record("!stats")).await;
    assert!(result.success);
    assert_eq!(result.data["usage"]["ping"], serde_json::json!(3));
}

fn level_strategy() -> impl Strategy<Value = UserLevel> {
    prop::sample::select(UserLevel::ALL.to_vec())
}

proptest! {
    #[test]
    fn authorization_is_monotonic(required in level_strategy(), a in level_strategy(), b in level_strategy()) {
        let registry = registry();
        let def = CommandDefinition::new("x", "X", "test", "builtin.ping").with_level(required);
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let low_ok = registry.is_authorized(&user_at("l", low), &def);
        let high_ok = registry.is_authorized(&user_at("h", high), &def);
        prop_assert!(!low_ok || high_ok);
        prop_assert_eq!(high_ok, high >= required);
    }

    #[test]
    fn invocation_token_is_lowercased_first_word(
        command in "[A-Za-z]{1,12}",
        rest in prop::collection::vec("[a-z0-9]{1,8}", 0..4),
    ) {
        let registry = registry();
        let text = format!("!{} {}", command, rest.join(" "));
        let inv = registry.parse_invocation(&text).unwrap();
        prop_assert_eq!(inv.command, command.to_lowercase());
        prop_assert_eq!(inv.args, rest);
    }
}
