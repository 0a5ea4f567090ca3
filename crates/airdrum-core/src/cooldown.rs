//! Per-zone debounce bookkeeping

use std::collections::HashMap;

/// Default minimum time between two accepted hits on the same zone (seconds)
pub const DEFAULT_COOLDOWN_SECS: f64 = 0.1;

/// Last accepted fire time per zone
#[derive(Debug, Clone)]
pub struct CooldownTable {
    window: f64,
    last_fire: HashMap<String, f64>,
}

impl Default for CooldownTable {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN_SECS)
    }
}

impl CooldownTable {
    /// Create a table with the given window in seconds
    pub fn new(window: f64) -> Self {
        Self {
            window,
            last_fire: HashMap::new(),
        }
    }

    /// Cooldown window in seconds
    pub fn window(&self) -> f64 {
        self.window
    }

    /// Whether `zone` may fire at `now`.
    ///
    /// A clock that moved backwards reads as "still cooling down".
    pub fn is_ready(&self, zone: &str, now: f64) -> bool {
        match self.last_fire.get(zone) {
            None => true,
            Some(&last) => now - last >= self.window,
        }
    }

    /// Record an accepted fire
    pub fn mark(&mut self, zone: &str, now: f64) {
        match self.last_fire.get_mut(zone) {
            Some(last) => *last = now,
            None => {
                self.last_fire.insert(zone.to_string(), now);
            }
        }
    }

    /// Check and mark in one step; returns whether the hit was accepted
    pub fn try_fire(&mut self, zone: &str, now: f64) -> bool {
        if self.is_ready(zone, now) {
            self.mark(zone, now);
            true
        } else {
            false
        }
    }

    /// Last fire time of a zone
    pub fn last_fire(&self, zone: &str) -> Option<f64> {
        self.last_fire.get(zone).copied()
    }

    /// Forget every zone (session restart)
    pub fn reset(&mut self) {
        self.last_fire.clear();
    }
}
