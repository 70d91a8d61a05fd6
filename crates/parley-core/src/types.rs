// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the command registry, context manager, and pipeline.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{Failure, ParleyError};

/// Free-form JSON object used for step state and result payloads.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Result data key a context handler sets to end its context before TTL.
pub const EXPIRE_CONTEXT_KEY: &str = "expire_context";

/// Unique identifier for a user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Permission level, ordered from least to most privileged.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserLevel {
    Banned,
    #[default]
    User,
    Moderator,
    Admin,
    Owner,
}

impl UserLevel {
    /// Every level in ascending order.
    pub const ALL: [UserLevel; 5] = [
        UserLevel::Banned,
        UserLevel::User,
        UserLevel::Moderator,
        UserLevel::Admin,
        UserLevel::Owner,
    ];

    /// Position of this level in the fixed ordering.
    pub fn index(self) -> usize {
        self as usize
    }
}

/// A messaging participant as known to the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Stable identity derived from the transport address.
    pub external_id: String,
    pub phone_number: Option<String>,
    pub display_name: Option<String>,
    pub level: UserLevel,
    pub is_registered: bool,
    pub registration_date: Option<DateTime<Utc>>,
    pub last_activity: DateTime<Utc>,
    pub message_count: u64,
    pub banned: bool,
    #[serde(default)]
    pub preferences: HashMap<String, String>,
}

impl User {
    /// Builds a fresh, unregistered user from a draft.
    pub fn from_draft(id: UserId, draft: UserDraft) -> Self {
        Self {
            id,
            external_id: draft.external_id,
            phone_number: draft.phone_number,
            display_name: draft.display_name,
            level: draft.level,
            is_registered: false,
            registration_date: None,
            last_activity: Utc::now(),
            message_count: 0,
            banned: false,
            preferences: HashMap::new(),
        }
    }

    /// Name to greet the user with.
    pub fn greeting_name(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.phone_number.as_deref())
            .unwrap_or(self.external_id.as_str())
    }
}

/// Fields required to create a user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserDraft {
    pub external_id: String,
    pub phone_number: Option<String>,
    pub display_name: Option<String>,
    pub level: UserLevel,
}

/// Partial update to a user. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserUpdate {
    pub display_name: Option<String>,
    pub level: Option<UserLevel>,
    pub is_registered: Option<bool>,
    pub registration_date: Option<DateTime<Utc>>,
    pub last_activity: Option<DateTime<Utc>>,
    pub message_count: Option<u64>,
    /// Added to the message count after `message_count` is applied.
    pub message_count_increment: Option<u64>,
    pub banned: Option<bool>,
    /// Merged into the existing preferences.
    pub preferences: Option<HashMap<String, String>>,
}

impl UserUpdate {
    /// Applies the set fields onto `user`.
    pub fn apply(self, user: &mut User) {
        if let Some(name) = self.display_name {
            user.display_name = Some(name);
        }
        if let Some(level) = self.level {
            user.level = level;
        }
        if let Some(registered) = self.is_registered {
            user.is_registered = registered;
        }
        if let Some(date) = self.registration_date {
            user.registration_date = Some(date);
        }
        if let Some(at) = self.last_activity {
            user.last_activity = at;
        }
        if let Some(count) = self.message_count {
            user.message_count = count;
        }
        if let Some(step) = self.message_count_increment {
            user.message_count = user.message_count.saturating_add(step);
        }
        if let Some(banned) = self.banned {
            user.banned = banned;
        }
        if let Some(prefs) = self.preferences {
            user.preferences.extend(prefs);
        }
    }
}

/// Kind of inbound message as reported by the transport.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Text,
    Image,
    Audio,
    Video,
    Document,
    Sticker,
    Location,
    Other,
}

/// A message as received from the messaging bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: MessageId,
    /// Opaque sender address. Normalization is the user resolver's job.
    pub from: String,
    pub content: String,
    #[serde(default)]
    pub message_type: MessageType,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: JsonMap,
}

impl InboundMessage {
    /// Builds a text message with a generated id and the current timestamp.
    pub fn text(from: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: MessageId(uuid::Uuid::new_v4().to_string()),
            from: from.into(),
            content: content.into(),
            message_type: MessageType::Text,
            timestamp: Utc::now(),
            metadata: JsonMap::new(),
        }
    }

    /// Chat the message belongs to: `metadata.chat_id` when present, else the sender.
    pub fn chat_id(&self) -> &str {
        self.metadata
            .get("chat_id")
            .and_then(|v| v.as_str())
            .unwrap_or(&self.from)
    }
}

/// Internal record of a message being processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: MessageId,
    pub from: String,
    pub content: String,
    pub message_type: MessageType,
    pub sent_at: DateTime<Utc>,
    pub received_at: DateTime<Utc>,
    pub metadata: JsonMap,
    /// Resolved user. Unset until the pipeline resolves the sender.
    pub owner: Option<UserId>,
}

impl MessageRecord {
    pub fn from_inbound(inbound: &InboundMessage) -> Self {
        Self {
            id: inbound.id.clone(),
            from: inbound.from.clone(),
            content: inbound.content.clone(),
            message_type: inbound.message_type,
            sent_at: inbound.timestamp,
            received_at: Utc::now(),
            metadata: inbound.metadata.clone(),
            owner: None,
        }
    }
}

/// Kind of media attached to a response.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
    Video,
    Document,
}

/// A reply to be delivered to the sender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Response {
    Text {
        content: String,
    },
    Media {
        kind: MediaKind,
        path: String,
        caption: Option<String>,
    },
}

impl Response {
    pub fn text(content: impl Into<String>) -> Self {
        Response::Text {
            content: content.into(),
        }
    }

    /// Whether there is nothing to deliver.
    pub fn is_empty(&self) -> bool {
        match self {
            Response::Text { content } => content.trim().is_empty(),
            Response::Media { path, .. } => path.trim().is_empty(),
        }
    }
}

/// Outcome shared by command execution and context execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerResult {
    pub success: bool,
    pub response: Option<Response>,
    #[serde(default)]
    pub data: JsonMap,
    pub error: Option<Failure>,
    pub execution_time: Duration,
    /// Stamped by the command registry.
    pub command_name: Option<String>,
}

impl HandlerResult {
    /// Successful result without a response.
    pub fn ok() -> Self {
        Self {
            success: true,
            response: None,
            data: JsonMap::new(),
            error: None,
            execution_time: Duration::ZERO,
            command_name: None,
        }
    }

    /// Successful text reply.
    pub fn reply(text: impl Into<String>) -> Self {
        Self::ok().with_response(Response::text(text))
    }

    /// Failed result carrying the given failure.
    pub fn failed(failure: Failure) -> Self {
        Self {
            success: false,
            error: Some(failure),
            ..Self::ok()
        }
    }

    /// Failed result built from an error.
    pub fn from_error(err: &ParleyError) -> Self {
        Self::failed(err.to_failure())
    }

    pub fn with_response(mut self, response: Response) -> Self {
        self.response = Some(response);
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Marks the owning context as complete.
    pub fn expiring_context(self) -> Self {
        self.with_data(EXPIRE_CONTEXT_KEY, true)
    }

    /// Whether the handler asked for its context to end.
    pub fn expires_context(&self) -> bool {
        self.data
            .get(EXPIRE_CONTEXT_KEY)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    /// The response to deliver, if the result succeeded and has one.
    pub fn deliverable(&self) -> Option<&Response> {
        if !self.success {
            return None;
        }
        self.response.as_ref().filter(|r| !r.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn user_levels_are_ordered() {
        for pair in UserLevel::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].index() < pair[1].index());
        }
        assert_eq!(UserLevel::default(), UserLevel::User);
    }

    #[test]
    fn user_level_parses_case_insensitively() {
        assert_eq!(UserLevel::from_str("owner").unwrap(), UserLevel::Owner);
        assert_eq!(UserLevel::from_str("Moderator").unwrap(), UserLevel::Moderator);
        assert_eq!(UserLevel::Admin.to_string(), "ADMIN");
        assert!(UserLevel::from_str("root").is_err());
    }

    #[test]
    fn update_applies_only_set_fields() {
        let mut user = User::from_draft(
            UserId("u1".into()),
            UserDraft {
                external_id: "15550001".into(),
                ..UserDraft::default()
            },
        );
        user.preferences.insert("lang".into(), "es".into());

        UserUpdate {
            message_count: Some(4),
            preferences: Some(HashMap::from([("tz".to_string(), "UTC".to_string())])),
            ..UserUpdate::default()
        }
        .apply(&mut user);

        assert_eq!(user.message_count, 4);
        assert_eq!(user.level, UserLevel::User);
        assert!(!user.is_registered);
        assert_eq!(user.preferences.len(), 2);
    }

    #[test]
    fn increment_adds_to_the_stored_count() {
        let mut user = User::from_draft(UserId("u1".into()), UserDraft::default());
        user.message_count = 7;

        let bump = UserUpdate {
            message_count_increment: Some(1),
            ..UserUpdate::default()
        };
        bump.clone().apply(&mut user);
        bump.apply(&mut user);
        assert_eq!(user.message_count, 9);

        UserUpdate {
            message_count: Some(u64::MAX),
            message_count_increment: Some(1),
            ..UserUpdate::default()
        }
        .apply(&mut user);
        assert_eq!(user.message_count, u64::MAX);
    }

    #[test]
    fn chat_id_prefers_metadata() {
        let mut msg = InboundMessage::text("+15550001", "hola");
        assert_eq!(msg.chat_id(), "+15550001");
        msg.metadata
            .insert("chat_id".into(), serde_json::json!("group-9"));
        assert_eq!(msg.chat_id(), "group-9");
    }

    #[test]
    fn deliverable_requires_success_and_content() {
        assert!(HandlerResult::reply("pong").deliverable().is_some());
        assert!(HandlerResult::reply("   ").deliverable().is_none());
        assert!(HandlerResult::ok().deliverable().is_none());

        let mut failed = HandlerResult::reply("hidden");
        failed.success = false;
        assert!(failed.deliverable().is_none());
    }

    #[test]
    fn expire_flag_round_trips_through_data() {
        let result = HandlerResult::reply("done").expiring_context();
        assert!(result.expires_context());
        assert!(!HandlerResult::ok().expires_context());
    }

    #[test]
    fn response_serializes_with_type_tag() {
        let json = serde_json::to_value(Response::text("hi")).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["content"], "hi");
    }
}
