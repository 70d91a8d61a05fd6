// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sender address to user resolution.

use std::sync::Arc;

use chrono::Utc;
use parley_core::{ParleyError, User, UserDraft, UserLevel, UserStore, UserUpdate};
use tracing::{debug, info};

/// Derives a stable identity from a transport address.
///
/// Drops a transport suffix after `@` and a `scheme:` prefix, then keeps the
/// digits. Addresses without digits fall back to the trimmed raw address.
///
/// `"+1 555-0001@c.us"`, `"tel:+15550001"` and `"15550001"` all map to
/// `"15550001"`.
pub fn normalize_address(address: &str) -> String {
    let trimmed = address.trim();
    let local = trimmed.split_once('@').map_or(trimmed, |(local, _)| local);
    let local = match local.split_once(':') {
        Some((scheme, rest))
            if !scheme.is_empty() && scheme.chars().all(|c| c.is_ascii_alphabetic()) =>
        {
            rest
        }
        _ => local,
    };
    let digits: String = local.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        trimmed.to_string()
    } else {
        digits
    }
}

/// Looks users up by normalized address, creating them on first contact.
pub struct UserResolver {
    store: Arc<dyn UserStore>,
}

impl UserResolver {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn UserStore> {
        &self.store
    }

    /// Returns the user behind `address` with its activity refreshed.
    ///
    /// Known users get `last_activity` and `message_count` updated. Unknown
    /// addresses create an unregistered user at [`UserLevel::User`] with no
    /// messages counted yet. Store failures propagate.
    pub async fn resolve(&self, address: &str) -> Result<User, ParleyError> {
        let external_id = normalize_address(address);
        if external_id.is_empty() {
            return Err(ParleyError::validation("sender address is empty"));
        }

        if let Some(user) = self.store.get_by_external_id(&external_id).await? {
            let update = UserUpdate {
                last_activity: Some(Utc::now()),
                message_count_increment: Some(1),
                ..Default::default()
            };
            let user = self.store.update(&user.id, update).await?;
            debug!(user_id = %user.id, messages = user.message_count, "user resolved");
            return Ok(user);
        }

        let phone_number = external_id
            .chars()
            .all(|c| c.is_ascii_digit())
            .then(|| format!("+{external_id}"));
        let user = self
            .store
            .create(UserDraft {
                external_id,
                phone_number,
                display_name: None,
                level: UserLevel::User,
            })
            .await?;
        info!(user_id = %user.id, external_id = %user.external_id, "new user created");
        Ok(user)
    }
}
