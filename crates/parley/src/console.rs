// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery adapter that prints replies to the terminal.

use async_trait::async_trait;
use colored::Colorize;
use parley_core::{DeliveryAdapter, MessageId, ParleyError};
use tracing::debug;

pub struct ConsoleDelivery {
    bot_name: String,
}

impl ConsoleDelivery {
    pub fn new(bot_name: impl Into<String>) -> Self {
        Self {
            bot_name: bot_name.into(),
        }
    }

    fn render_text(&self, text: &str) -> String {
        format!("{}: {text}", self.bot_name.as_str().green().bold())
    }

    fn render_media(&self, path: &str, caption: Option<&str>) -> String {
        let attachment = format!("[media: {path}]").cyan();
        match caption {
            Some(caption) => format!("{}: {attachment} {caption}", self.bot_name.as_str().green().bold()),
            None => format!("{}: {attachment}", self.bot_name.as_str().green().bold()),
        }
    }
}

#[async_trait]
impl DeliveryAdapter for ConsoleDelivery {
    fn name(&self) -> &str {
        "console"
    }

    async fn send_text(&self, _recipient: &str, text: &str) -> Result<bool, ParleyError> {
        println!("{}", self.render_text(text));
        Ok(true)
    }

    async fn send_media(
        &self,
        _recipient: &str,
        path: &str,
        caption: Option<&str>,
    ) -> Result<bool, ParleyError> {
        println!("{}", self.render_media(path, caption));
        Ok(true)
    }

    async fn send_typing(&self, recipient: &str, typing: bool) -> Result<bool, ParleyError> {
        debug!(recipient, typing, "typing indicator");
        Ok(true)
    }

    async fn mark_read(&self, message_id: &MessageId, chat_id: &str) -> Result<bool, ParleyError> {
        debug!(message_id = %message_id, chat_id, "marked read");
        Ok(true)
    }
}
