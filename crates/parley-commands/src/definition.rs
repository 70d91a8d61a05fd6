// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command definitions and invocation parsing.

use std::time::Duration;

use parley_core::UserLevel;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Declared type of a positional parameter.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    #[default]
    String,
    Number,
    Boolean,
}

/// One positional parameter of a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(default)]
    pub kind: ParameterKind,
    #[serde(default)]
    pub required: bool,
    /// Value used when an optional parameter is not supplied.
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    /// Regex the raw value must match.
    #[serde(default)]
    pub pattern: Option<String>,
}

impl ParameterSpec {
    pub fn required(name: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            default: None,
            pattern: None,
        }
    }

    pub fn optional(
        name: impl Into<String>,
        kind: ParameterKind,
        default: Option<serde_json::Value>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            default,
            pattern: None,
        }
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }
}

/// A command as declared by whoever registers it.
///
/// `handler_ref` is an opaque capability key resolved once at registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandDefinition {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub description: String,
    pub category: String,
    /// Minimum level allowed to run the command.
    #[serde(default)]
    pub level: UserLevel,
    #[serde(default)]
    pub cooldown_secs: u64,
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub handler_ref: String,
}

fn default_enabled() -> bool {
    true
}

impl CommandDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
        handler_ref: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            description: description.into(),
            category: category.into(),
            level: UserLevel::User,
            cooldown_secs: 0,
            parameters: Vec::new(),
            enabled: true,
            handler_ref: handler_ref.into(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn with_level(mut self, level: UserLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_cooldown(mut self, secs: u64) -> Self {
        self.cooldown_secs = secs;
        self
    }

    pub fn with_parameter(mut self, parameter: ParameterSpec) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    /// One-line usage string, e.g. `!echo <text> [times]`.
    pub fn usage(&self, prefix: &str) -> String {
        let mut usage = format!("{prefix}{}", self.name);
        for p in &self.parameters {
            if p.required {
                usage.push_str(&format!(" <{}>", p.name));
            } else {
                usage.push_str(&format!(" [{}]", p.name));
            }
        }
        usage
    }

    /// Every violation that makes this definition unusable, excluding
    /// capability resolution and pattern compilation.
    pub fn violations(&self) -> Vec<String> {
        let mut violations = Vec::new();

        if self.name.trim().is_empty() {
            violations.push("name must not be empty".to_string());
        } else if self.name.chars().any(char::is_whitespace) {
            violations.push(format!("name `{}` must not contain whitespace", self.name));
        }
        if self.description.trim().is_empty() {
            violations.push("description must not be empty".to_string());
        }
        if self.category.trim().is_empty() {
            violations.push("category must not be empty".to_string());
        }
        if self.handler_ref.trim().is_empty() {
            violations.push("handler_ref must not be empty".to_string());
        }
        for (i, alias) in self.aliases.iter().enumerate() {
            if alias.trim().is_empty() || alias.chars().any(char::is_whitespace) {
                violations.push(format!("aliases[{i}] `{alias}` is not a valid alias"));
            }
        }
        for (i, param) in self.parameters.iter().enumerate() {
            if param.name.trim().is_empty() {
                violations.push(format!("parameters[{i}].name must not be empty"));
            }
        }

        violations
    }
}

/// A parsed `<prefix><command> <args...>` message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Lower-cased command token.
    pub command: String,
    /// Raw whitespace-separated arguments.
    pub args: Vec<String>,
}

/// Parses `text` as a command invocation. `None` when the prefix is absent
/// or nothing follows it.
pub fn parse_invocation(prefix: &str, text: &str) -> Option<Invocation> {
    let rest = text.trim_start().strip_prefix(prefix)?;
    let mut tokens = rest.split_whitespace();
    let command = tokens.next()?.to_lowercase();
    Some(Invocation {
        command,
        args: tokens.map(str::to_string).collect(),
    })
}
