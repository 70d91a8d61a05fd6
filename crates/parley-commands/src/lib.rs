// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command registry for the Parley message pipeline.
//!
//! Holds command definitions with their aliases, resolves each definition's
//! handler once at registration, and runs invocations through the
//! disabled/permission/cooldown/parameter gates before dispatching.

pub mod builtin;
pub mod cooldown;
pub mod definition;
pub mod handler;
pub mod params;
pub mod registry;

pub use builtin::{builtin_capabilities, builtin_commands, register_builtins};
pub use definition::{parse_invocation, CommandDefinition, Invocation, ParameterKind, ParameterSpec};
pub use handler::{CapabilityMap, CapabilityResolver, CommandContext, CommandHandler, StaticReply};
pub use registry::{CommandRegistry, RegisteredCommand, Registration};
