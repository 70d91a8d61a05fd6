// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock delivery adapter for testing.
//!
//! Records every call in order so tests can assert on what the pipeline sent,
//! when the typing indicator toggled, and which messages were marked read.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parley_core::{DeliveryAdapter, MessageId, ParleyError};
use tokio::sync::Mutex;

/// One recorded adapter call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryCall {
    Text {
        recipient: String,
        text: String,
    },
    Media {
        recipient: String,
        path: String,
        caption: Option<String>,
    },
    Typing {
        recipient: String,
        on: bool,
    },
    MarkRead {
        message_id: MessageId,
        chat_id: String,
    },
}

/// A delivery adapter that captures calls instead of sending anything.
///
/// Sends can be made to fail with [`MockDelivery::set_failing`]; failed sends
/// are still recorded. Typing and read receipts always succeed.
#[derive(Debug, Default)]
pub struct MockDelivery {
    calls: Mutex<Vec<DeliveryCall>>,
    failing: AtomicBool,
}

impl MockDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    /// An adapter whose text and media sends return errors.
    pub fn failing() -> Self {
        let mock = Self::new();
        mock.set_failing(true);
        mock
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every call so far, in order.
    pub async fn calls(&self) -> Vec<DeliveryCall> {
        self.calls.lock().await.clone()
    }

    /// Texts sent to `recipient`, in order.
    pub async fn texts_to(&self, recipient: &str) -> Vec<String> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|c| match c {
                DeliveryCall::Text { recipient: r, text } if r == recipient => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// All texts sent, in order.
    pub async fn sent_texts(&self) -> Vec<String> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|c| match c {
                DeliveryCall::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Typing indicator states sent to `recipient`, in order.
    pub async fn typing_to(&self, recipient: &str) -> Vec<bool> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|c| match c {
                DeliveryCall::Typing { recipient: r, on } if r == recipient => Some(*on),
                _ => None,
            })
            .collect()
    }

    pub async fn read_receipts(&self) -> Vec<MessageId> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|c| match c {
                DeliveryCall::MarkRead { message_id, .. } => Some(message_id.clone()),
                _ => None,
            })
            .collect()
    }

    /// Clear all recorded calls.
    pub async fn clear(&self) {
        self.calls.lock().await.clear();
    }

    async fn record_send(&self, call: DeliveryCall) -> Result<bool, ParleyError> {
        self.calls.lock().await.push(call);
        if self.failing.load(Ordering::SeqCst) {
            return Err(ParleyError::Delivery {
                message: "mock delivery set to fail".into(),
                source: None,
            });
        }
        Ok(true)
    }
}

#[async_trait]
impl DeliveryAdapter for MockDelivery {
    fn name(&self) -> &str {
        "mock-delivery"
    }

    async fn send_text(&self, recipient: &str, text: &str) -> Result<bool, ParleyError> {
        self.record_send(DeliveryCall::Text {
            recipient: recipient.to_string(),
            text: text.to_string(),
        })
        .await
    }

    async fn send_media(
        &self,
        recipient: &str,
        path: &str,
        caption: Option<&str>,
    ) -> Result<bool, ParleyError> {
        self.record_send(DeliveryCall::Media {
            recipient: recipient.to_string(),
            path: path.to_string(),
            caption: caption.map(str::to_string),
        })
        .await
    }

    async fn send_typing(&self, recipient: &str, typing: bool) -> Result<bool, ParleyError> {
        self.calls.lock().await.push(DeliveryCall::Typing {
            recipient: recipient.to_string(),
            on: typing,
        });
        Ok(true)
    }

    async fn mark_read(&self, message_id: &MessageId, chat_id: &str) -> Result<bool, ParleyError> {
        self.calls.lock().await.push(DeliveryCall::MarkRead {
            message_id: message_id.clone(),
            chat_id: chat_id.to_string(),
        });
        Ok(true)
    }
}
