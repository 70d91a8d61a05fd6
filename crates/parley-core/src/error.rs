// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Parley message pipeline.
//!
//! [`ParleyError`] is the rich error used at trait boundaries. Expected
//! outcomes (unknown command, permission denied, cooldown) are folded into a
//! serializable [`Failure`] and returned inside a result instead of being
//! propagated as `Err`.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

use crate::types::UserLevel;

/// The primary error type used across Parley components and collaborator traits.
#[derive(Debug, Error)]
pub enum ParleyError {
    /// Malformed invocation, message, or definition. Carries every violation found.
    #[error("validation failed: {}", violations.join("; "))]
    Validation { violations: Vec<String> },

    /// Unknown command, context type, handler, or user.
    #[error("{kind} not found: {name}")]
    NotFound { kind: String, name: String },

    /// Command exists but is switched off.
    #[error("command `{command}` is disabled")]
    Disabled { command: String },

    /// The user's level is below the required one.
    #[error("permission denied: requires {required}, user is {actual}")]
    PermissionDenied {
        required: UserLevel,
        actual: UserLevel,
    },

    /// The user is flagged as banned.
    #[error("permission denied: user is banned")]
    Banned,

    /// Rate-limited by a per-(command, user) cooldown.
    #[error("command `{command}` is on cooldown, retry in {remaining_secs}s")]
    Cooldown {
        command: String,
        remaining_secs: u64,
    },

    /// A command or context handler returned an error or panicked.
    #[error("handler `{handler}` failed: {message}")]
    HandlerExecution { handler: String, message: String },

    /// Best-effort delivery failed. Logged, never surfaced as a pipeline failure.
    #[error("delivery error: {message}")]
    Delivery {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// User store failure.
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration errors.
    #[error("configuration error: {0}")]
    Config(String),

    /// Invariant violations and other unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ParleyError {
    /// Builds a validation error from a single violation.
    pub fn validation(violation: impl Into<String>) -> Self {
        ParleyError::Validation {
            violations: vec![violation.into()],
        }
    }

    /// Builds a not-found error for the given kind of entity.
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        ParleyError::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Returns the failure category of this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            ParleyError::Validation { .. } => FailureKind::Validation,
            ParleyError::NotFound { .. } => FailureKind::NotFound,
            ParleyError::Disabled { .. } => FailureKind::Disabled,
            ParleyError::PermissionDenied { .. } | ParleyError::Banned => FailureKind::Permission,
            ParleyError::Cooldown { .. } => FailureKind::Cooldown,
            ParleyError::HandlerExecution { .. } => FailureKind::HandlerExecution,
            ParleyError::Delivery { .. } => FailureKind::Delivery,
            ParleyError::Storage { .. } => FailureKind::Storage,
            ParleyError::Config(_) => FailureKind::Config,
            ParleyError::Internal(_) => FailureKind::Internal,
        }
    }

    /// Folds this error into a serializable [`Failure`].
    pub fn to_failure(&self) -> Failure {
        Failure {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

/// Category of a failed result.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Validation,
    NotFound,
    Disabled,
    Permission,
    Cooldown,
    HandlerExecution,
    Delivery,
    Storage,
    Config,
    Internal,
}

impl FailureKind {
    /// Short user-facing label for this failure category.
    pub fn label(self) -> &'static str {
        match self {
            FailureKind::Validation => "Invalid input",
            FailureKind::NotFound => "Not found",
            FailureKind::Disabled => "Unavailable",
            FailureKind::Permission => "Not allowed",
            FailureKind::Cooldown => "Slow down",
            FailureKind::HandlerExecution => "Something went wrong",
            FailureKind::Delivery => "Delivery failed",
            FailureKind::Storage => "Storage unavailable",
            FailureKind::Config => "Misconfigured",
            FailureKind::Internal => "Internal error",
        }
    }
}

/// A tagged failure carried inside a [`HandlerResult`](crate::types::HandlerResult).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Short cause-annotated text suitable for sending back to the user.
    pub fn notice(&self) -> String {
        format!("{}: {}", self.kind.label(), self.message)
    }
}

impl From<&ParleyError> for Failure {
    fn from(err: &ParleyError) -> Self {
        err.to_failure()
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Extracts a readable message from a caught panic payload.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_lists_every_violation() {
        let err = ParleyError::Validation {
            violations: vec!["name is empty".into(), "category is empty".into()],
        };
        let text = err.to_string();
        assert!(text.contains("name is empty"));
        assert!(text.contains("category is empty"));
    }

    #[test]
    fn banned_and_level_errors_share_permission_kind() {
        let low = ParleyError::PermissionDenied {
            required: UserLevel::Owner,
            actual: UserLevel::User,
        };
        assert_eq!(low.kind(), FailureKind::Permission);
        assert_eq!(ParleyError::Banned.kind(), FailureKind::Permission);
        assert!(low.to_string().contains("OWNER"));
    }

    #[test]
    fn cooldown_failure_mentions_remaining_seconds() {
        let err = ParleyError::Cooldown {
            command: "ping".into(),
            remaining_secs: 7,
        };
        let failure = err.to_failure();
        assert_eq!(failure.kind, FailureKind::Cooldown);
        assert!(failure.notice().starts_with("Slow down:"));
        assert!(failure.notice().contains("7s"));
    }

    #[test]
    fn panic_message_reads_str_and_string_payloads() {
        let caught = std::panic::catch_unwind(|| panic!("boom")).unwrap_err();
        assert_eq!(panic_message(caught.as_ref()), "boom");
        let caught = std::panic::catch_unwind(|| panic!("{} {}", "late", 1)).unwrap_err();
        assert_eq!(panic_message(caught.as_ref()), "late 1");
    }

    #[test]
    fn failure_kind_serializes_snake_case() {
        let json = serde_json::to_string(&FailureKind::HandlerExecution).unwrap();
        assert_eq!(json, "\"handler_execution\"");
        assert_eq!(FailureKind::NotFound.to_string(), "not_found");
    }
}
