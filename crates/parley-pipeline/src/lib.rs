// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message pipeline orchestrator for Parley.
//!
//! The [`MessagePipeline`] turns one inbound chat message into zero or more
//! outbound responses:
//! - Validates the message and resolves the sender to a user
//! - Routes it to a command, the user's active context, or fallback handlers
//! - Delivers every successful response through the delivery adapter
//!
//! The orchestrator is stateless between calls and safe to run concurrently;
//! the [`Ingress`] loop enforces concurrency, timeout and queue limits.

pub mod context;
pub mod fallback;
pub mod ingress;
pub mod memory;
pub mod pipeline;
pub mod resolver;

pub use context::ContextService;
pub use fallback::{ContextDetectionHandler, MessageHandler};
pub use ingress::{Ingress, IngressStats};
pub use memory::InMemoryUserStore;
pub use pipeline::{Limits, MessagePipeline, PipelineOutcome, Route};
pub use resolver::{normalize_address, UserResolver};
