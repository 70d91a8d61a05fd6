// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in context handlers.

pub mod configuration;
pub mod conversation;
pub mod registration;

pub use configuration::ConfigurationHandler;
pub use conversation::ConversationHandler;
pub use registration::RegistrationHandler;

use std::sync::Arc;

use parley_core::UserStore;

use crate::manager::ContextManager;

/// Registers the registration, configuration, and conversation handlers, in
/// that order. The conversation handler is keyword-less and so only ever
/// wins as fallback.
pub fn register_builtin_handlers(manager: &ContextManager, store: Option<Arc<dyn UserStore>>) {
    manager.register_handler(Arc::new(RegistrationHandler::new(store.clone())));
    manager.register_handler(Arc::new(ConfigurationHandler::new(store)));
    manager.register_handler(Arc::new(ConversationHandler));
}

/// Normalized yes/no reading of a reply.
pub(crate) fn affirmative(text: &str) -> Option<bool> {
    match text.trim().to_lowercase().as_str() {
        "sí" | "si" | "s" | "yes" | "y" | "ok" | "confirmar" => Some(true),
        "no" | "n" => Some(false),
        _ => None,
    }
}

pub(crate) fn is_cancel(text: &str) -> bool {
    matches!(
        text.trim().to_lowercase().as_str(),
        "cancelar" | "cancel" | "salir"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_yes_and_no() {
        assert_eq!(affirmative(" Sí "), Some(true));
        assert_eq!(affirmative("YES"), Some(true));
        assert_eq!(affirmative("no"), Some(false));
        assert_eq!(affirmative("quizás"), None);
        assert!(is_cancel("Cancelar"));
    }
}
