// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation-context manager for the Parley message pipeline.
//!
//! A context is a resumable multi-turn flow (registration, configuration,
//! small talk) owned by a single user. The [`ContextManager`] keeps at most
//! one live context per user, picks a handler for new flows by keyword
//! detection, runs one turn per message, and sweeps expired contexts in the
//! background.

pub mod context;
pub mod handler;
pub mod handlers;
pub mod manager;

pub use context::{ContextType, ConversationContext};
pub use handler::ContextHandler;
pub use handlers::register_builtin_handlers;
pub use manager::{ContextManager, Detection};
