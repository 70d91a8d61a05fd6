// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parley - command and conversation pipeline for chat bots.
//!
//! This is the binary entry point. The messaging bridge is out of process;
//! `parley shell` drives the pipeline from the terminal instead.

mod console;
mod shell;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use parley_config::model::ParleyConfig;
use parley_config::ConfigError;

/// Parley - command and conversation pipeline for chat bots.
#[derive(Parser, Debug)]
#[command(name = "parley", version, about, long_about = None)]
struct Cli {
    /// Configuration file. Defaults to the XDG lookup.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Chat with the pipeline from the terminal.
    Shell {
        /// Sender address the messages appear to come from.
        #[arg(long, default_value = "+10000000000")]
        from: String,
    },
    /// Validate the configuration and print the effective values.
    Check,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            parley_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.bot.log_level);

    match cli.command {
        Some(Commands::Shell { from }) => {
            if let Err(e) = shell::run_shell(config, from).await {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Check) => match toml::to_string_pretty(&config) {
            Ok(rendered) => {
                eprintln!("parley: config ok (bot.name={})", config.bot.name);
                println!("{rendered}");
            }
            Err(e) => {
                eprintln!("error: failed to render config: {e}");
                std::process::exit(1);
            }
        },
        None => {
            println!("parley: use --help for available commands");
        }
    }
}

fn load(path: Option<&std::path::Path>) -> Result<ParleyConfig, Vec<ConfigError>> {
    match path {
        Some(path) => parley_config::load_and_validate_path(path),
        None => parley_config::load_and_validate(),
    }
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("parley={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}
