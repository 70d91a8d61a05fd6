// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation context records.

use chrono::{DateTime, Utc};
use parley_core::{JsonMap, UserId};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tokio::time::Instant;

/// Data key holding the text of the message that started the current turn.
pub const LAST_MESSAGE_KEY: &str = "last_message";

/// Data key holding the 1-based turn counter.
pub const TURN_KEY: &str = "turn";

/// Data key step-based handlers use for their state.
pub const STEP_KEY: &str = "step";

/// Kind of multi-turn flow a context belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContextType {
    Registration,
    Configuration,
    Conversation,
    CommandSequence,
}

/// One user's in-progress flow.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationContext {
    pub id: String,
    pub user_id: UserId,
    pub context_type: ContextType,
    /// Step state owned by the handler.
    pub data: JsonMap,
    pub created_at: DateTime<Utc>,
    pub last_interaction: DateTime<Utc>,
    pub expires_at: Instant,
    pub active: bool,
}

impl ConversationContext {
    pub(crate) fn new(
        user_id: UserId,
        context_type: ContextType,
        data: JsonMap,
        expires_at: Instant,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            context_type,
            data,
            created_at: now,
            last_interaction: now,
            expires_at,
            active: true,
        }
    }

    /// Active and not past its expiry at `now`.
    pub fn is_live(&self, now: Instant) -> bool {
        self.active && now < self.expires_at
    }

    pub fn step(&self) -> Option<&str> {
        self.data.get(STEP_KEY).and_then(|v| v.as_str())
    }

    pub fn set_step(&mut self, step: &str) {
        self.data.insert(STEP_KEY.to_string(), step.into());
    }

    pub fn turn(&self) -> u64 {
        self.data.get(TURN_KEY).and_then(|v| v.as_u64()).unwrap_or(0)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }

    /// Records the incoming message and advances the turn counter.
    pub(crate) fn begin_turn(&mut self, text: &str) {
        let turn = self.turn() + 1;
        self.data
            .insert(LAST_MESSAGE_KEY.to_string(), text.to_string().into());
        self.data.insert(TURN_KEY.to_string(), turn.into());
    }
}
