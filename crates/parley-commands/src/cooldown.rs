// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-(command, user) cooldown timestamps.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use parley_core::UserId;
use tokio::time::Instant;

/// Tracked entries below which `record` never sweeps.
const SWEEP_FLOOR: usize = 256;

/// Last successful use of each command by each user, with the cooldown that
/// applied at the time.
///
/// Expired entries are dropped when checked, and swept in bulk whenever the
/// map doubles past its size at the previous sweep.
#[derive(Debug, Default)]
pub struct CooldownTracker {
    last_used: DashMap<(String, UserId), (Instant, Duration)>,
    sweep_at: AtomicUsize,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds left before `user` may run `command` again, rounded up.
    /// Zero when allowed.
    pub fn remaining_secs(&self, command: &str, user: &UserId, cooldown: Duration) -> u64 {
        if cooldown.is_zero() {
            return 0;
        }
        let key = (command.to_string(), user.clone());
        let Some((last, _)) = self.last_used.get(&key).map(|entry| *entry.value()) else {
            return 0;
        };
        let cooldown_ms = cooldown.as_millis() as u64;
        let elapsed_ms = last.elapsed().as_millis() as u64;
        let remaining = cooldown_ms.saturating_sub(elapsed_ms).div_ceil(1000);
        if remaining == 0 {
            self.last_used
                .remove_if(&key, |_, (at, _)| at.elapsed() >= cooldown);
        }
        remaining
    }

    pub fn is_ready(&self, command: &str, user: &UserId, cooldown: Duration) -> bool {
        self.remaining_secs(command, user, cooldown) == 0
    }

    /// Records a use at the current instant. Commands without a cooldown are
    /// not tracked.
    pub fn record(&self, command: &str, user: &UserId, cooldown: Duration) {
        if cooldown.is_zero() {
            return;
        }
        self.last_used
            .insert((command.to_string(), user.clone()), (Instant::now(), cooldown));

        let len = self.last_used.len();
        if len >= self.sweep_at.load(Ordering::Relaxed) {
            self.prune();
            let next = (self.last_used.len() * 2).max(SWEEP_FLOOR);
            self.sweep_at.store(next, Ordering::Relaxed);
        }
    }

    /// Drops every entry whose recorded cooldown has run out. Returns how
    /// many were dropped.
    pub fn prune(&self) -> usize {
        let before = self.last_used.len();
        self.last_used
            .retain(|_, (at, cooldown)| at.elapsed() < *cooldown);
        before.saturating_sub(self.last_used.len())
    }

    /// Drops every timestamp stored for `command`.
    pub fn clear_command(&self, command: &str) {
        self.last_used.retain(|(name, _), _| name != command);
    }

    pub fn len(&self) -> usize {
        self.last_used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_used.is_empty()
    }
}
