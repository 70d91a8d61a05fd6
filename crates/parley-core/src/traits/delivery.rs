// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery adapter trait for the outbound side of the messaging bridge.

use async_trait::async_trait;

use crate::error::ParleyError;
use crate::types::MessageId;

/// Outbound calls to the messaging bridge.
///
/// Every call is best-effort: `Ok(false)` means the bridge refused, `Err`
/// means the call itself failed. The pipeline logs both and moves on.
#[async_trait]
pub trait DeliveryAdapter: Send + Sync + 'static {
    /// Human-readable name used in log fields.
    fn name(&self) -> &str;

    /// Sends a text message.
    async fn send_text(&self, recipient: &str, text: &str) -> Result<bool, ParleyError>;

    /// Sends a media file with an optional caption.
    async fn send_media(
        &self,
        recipient: &str,
        path: &str,
        caption: Option<&str>,
    ) -> Result<bool, ParleyError>;

    /// Starts (`true`) or stops (`false`) the typing indicator.
    async fn send_typing(&self, recipient: &str, typing: bool) -> Result<bool, ParleyError>;

    /// Marks an inbound message as read.
    async fn mark_read(&self, message_id: &MessageId, chat_id: &str) -> Result<bool, ParleyError>;
}
