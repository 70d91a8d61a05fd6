// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Parley message pipeline.
//!
//! This crate provides the types shared by the command registry, the
//! conversation-context manager, and the pipeline orchestrator, together with
//! the error taxonomy and the collaborator traits (user store, delivery).

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{panic_message, Failure, FailureKind, ParleyError};
pub use types::{
    HandlerResult, InboundMessage, JsonMap, MediaKind, MessageId, MessageRecord, MessageType,
    Response, User, UserDraft, UserId, UserLevel, UserUpdate, EXPIRE_CONTEXT_KEY,
};

pub use traits::{DeliveryAdapter, UserStore};
