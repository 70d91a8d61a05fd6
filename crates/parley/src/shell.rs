// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `parley shell` command implementation.
//!
//! Launches an interactive REPL with a colored prompt and readline history.
//! Every line is sent through the full pipeline as an inbound message from
//! the `--from` address, so commands, contexts and fallbacks behave exactly
//! as they would behind a messaging bridge.

use std::sync::Arc;

use colored::Colorize;
use parley_commands::{builtin_capabilities, register_builtins, CommandRegistry};
use parley_config::model::ParleyConfig;
use parley_context::{register_builtin_handlers, ContextManager};
use parley_core::{InboundMessage, ParleyError, UserStore};
use parley_pipeline::{
    ContextDetectionHandler, InMemoryUserStore, MessagePipeline, PipelineOutcome, Route,
};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::console::ConsoleDelivery;

/// Runs the `parley shell` interactive REPL.
pub async fn run_shell(config: ParleyConfig, from: String) -> Result<(), ParleyError> {
    let store: Arc<dyn UserStore> = Arc::new(InMemoryUserStore::new());

    let commands = Arc::new(CommandRegistry::from_config(
        &config.commands,
        Arc::new(builtin_capabilities()),
    ));
    register_builtins(&commands)?;
    info!(commands = commands.len(), "command registry initialized");

    let contexts = Arc::new(ContextManager::new(&config.context));
    register_builtin_handlers(&contexts, Some(Arc::clone(&store)));

    let cancel = CancellationToken::new();
    let sweeper = contexts.spawn_sweeper(cancel.clone());

    let delivery = Arc::new(ConsoleDelivery::new(config.bot.name.clone()));
    let pipeline = MessagePipeline::new(
        &config,
        commands,
        contexts.clone(),
        store,
        delivery,
    )
    .with_handler(Arc::new(ContextDetectionHandler::new(contexts)));

    let mut rl = DefaultEditor::new()
        .map_err(|e| ParleyError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", format!("{} shell", config.bot.name).bold().green());
    println!(
        "Chatting as {}. Type {} to exit.\n",
        from.cyan(),
        "/quit".yellow()
    );

    let prompt = format!("{}> ", from.as_str().cyan());
    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed == "/quit" || trimmed == "/exit" {
                    break;
                }
                if trimmed.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(&line);

                let outcome = pipeline
                    .process_message(&InboundMessage::text(from.as_str(), trimmed))
                    .await;
                report(&outcome);
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        }
    }

    cancel.cancel();
    if let Err(e) = sweeper.await {
        debug!(error = %e, "context sweeper did not shut down cleanly");
    }

    println!("{}", "goodbye".dimmed());
    Ok(())
}

/// Prints what the terminal user would not otherwise see.
fn report(outcome: &PipelineOutcome) {
    match (&outcome.route, &outcome.error) {
        (Route::Aborted, Some(failure)) => {
            eprintln!("{}: {}", "rejected".red(), failure.message);
        }
        (Route::Unhandled, _) => {
            println!("{}", "(no reply)".dimmed());
        }
        _ => {}
    }
    debug!(
        route = ?outcome.route,
        success = outcome.success,
        elapsed_ms = outcome.elapsed.as_millis() as u64,
        "shell message processed"
    );
}
