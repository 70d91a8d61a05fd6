// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Parley pipeline.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Parley configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ParleyConfig {
    /// Bot identity and logging.
    #[serde(default)]
    pub bot: BotConfig,

    /// Command parsing settings.
    #[serde(default)]
    pub commands: CommandConfig,

    /// Conversation-context lifetime settings.
    #[serde(default)]
    pub context: ContextConfig,

    /// Pipeline side effects and externally enforced limits.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Canned reply when no handler produced a response.
    #[serde(default)]
    pub auto_reply: AutoReplyConfig,
}

/// Bot identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Display name of the bot.
    #[serde(default = "default_bot_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_bot_name() -> String {
    "parley".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Command registry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CommandConfig {
    /// Prefix marking a message as a command invocation.
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Send a short notice back to the user when a command is rejected.
    #[serde(default = "default_true")]
    pub error_replies: bool,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            error_replies: true,
        }
    }
}

fn default_prefix() -> String {
    "!".to_string()
}

fn default_true() -> bool {
    true
}

/// Conversation-context configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ContextConfig {
    /// Time-to-live of a context since its last interaction, in milliseconds.
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: u64,

    /// Soft cap on simultaneously active contexts. Exceeding it only warns.
    #[serde(default = "default_max_active")]
    pub max_active: usize,

    /// Interval between expiry sweeps, in milliseconds.
    #[serde(default = "default_cleanup_interval_ms")]
    pub cleanup_interval_ms: u64,
}

impl ContextConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            ttl_ms: default_ttl_ms(),
            max_active: default_max_active(),
            cleanup_interval_ms: default_cleanup_interval_ms(),
        }
    }
}

fn default_ttl_ms() -> u64 {
    300_000
}

fn default_max_active() -> usize {
    100
}

fn default_cleanup_interval_ms() -> u64 {
    60_000
}

/// Pipeline configuration.
///
/// `max_concurrent`, `processing_timeout_ms`, `retry_count` and `queue_size`
/// are read by the ingress layer; the orchestrator only exposes them.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Mark inbound messages as read before processing.
    #[serde(default = "default_true")]
    pub mark_read: bool,

    /// Show a typing indicator while processing.
    #[serde(default = "default_true")]
    pub typing_indicator: bool,

    /// Pause after starting the typing indicator, in milliseconds.
    #[serde(default)]
    pub typing_delay_ms: u64,

    /// Maximum messages processed concurrently.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Upper bound for one message's processing, in milliseconds.
    #[serde(default = "default_processing_timeout_ms")]
    pub processing_timeout_ms: u64,

    /// Retries for a message whose processing failed.
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Maximum queued messages waiting for a slot.
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,
}

impl PipelineConfig {
    pub fn typing_delay(&self) -> Duration {
        Duration::from_millis(self.typing_delay_ms)
    }

    pub fn processing_timeout(&self) -> Duration {
        Duration::from_millis(self.processing_timeout_ms)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mark_read: true,
            typing_indicator: true,
            typing_delay_ms: 0,
            max_concurrent: default_max_concurrent(),
            processing_timeout_ms: default_processing_timeout_ms(),
            retry_count: default_retry_count(),
            queue_size: default_queue_size(),
        }
    }
}

fn default_max_concurrent() -> usize {
    10
}

fn default_processing_timeout_ms() -> u64 {
    30_000
}

fn default_retry_count() -> u32 {
    3
}

fn default_queue_size() -> usize {
    100
}

/// Auto-reply configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AutoReplyConfig {
    /// Send `message` when nothing else handled the message.
    #[serde(default)]
    pub enabled: bool,

    /// The canned reply.
    #[serde(default = "default_auto_reply_message")]
    pub message: String,
}

impl Default for AutoReplyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            message: default_auto_reply_message(),
        }
    }
}

fn default_auto_reply_message() -> String {
    "Gracias por tu mensaje. Escribe !help para ver los comandos disponibles.".to_string()
}
