//! Per-user command cooldowns
//!
//! One entry per (user, command) holding the instant the user may draw
//! again. A cooldown is armed only after a successful delivery, so a failed
//! or out-of-stock draw never burns the user's attempt. Expired entries are
//! dropped when observed.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

#[derive(Debug, Default)]
pub struct CooldownMap {
    entries: Mutex<HashMap<(String, String), Instant>>,
}

impl CooldownMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time remaining before the user may run the command again, if any.
    pub async fn remaining(&self, user: &str, command: &str) -> Option<Duration> {
        let mut entries = self.entries.lock().await;
        let key = (user.to_string(), command.to_string());
        let until = *entries.get(&key)?;
        let now = Instant::now();
        if until > now {
            Some(until - now)
        } else {
            entries.remove(&key);
            None
        }
    }

    /// Arm the cooldown after a successful delivery. A zero period means the
    /// command has no cooldown and nothing is stored.
    pub async fn arm(&self, user: &str, command: &str, period: Duration) {
        if period.is_zero() {
            return;
        }
        self.entries.lock().await.insert(
            (user.to_string(), command.to_string()),
            Instant::now() + period,
        );
    }
}
