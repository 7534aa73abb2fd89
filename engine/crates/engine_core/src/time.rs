use std::time::{Duration, Instant};

use bevy_ecs::prelude::*;

/// Simulation clock, refreshed by the tick loop before each tick's systems run.
#[derive(Resource, Debug, Clone, Copy)]
pub struct TickTime {
    /// Time since the previous tick began (since construction on the first tick).
    pub delta: Duration,
    /// Time since the tick loop was created.
    pub lifetime: Duration,
    epoch: Instant,
    last: Instant,
}

impl TickTime {
    pub fn new(now: Instant) -> Self {
        Self {
            delta: Duration::ZERO,
            lifetime: Duration::ZERO,
            epoch: now,
            last: now,
        }
    }

    pub fn advance(&mut self, now: Instant) {
        self.delta = now.saturating_duration_since(self.last);
        self.lifetime = now.saturating_duration_since(self.epoch);
        self.last = now;
    }

    pub fn delta_secs(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    pub fn lifetime_ms(&self) -> u128 {
        self.lifetime.as_millis()
    }
}
