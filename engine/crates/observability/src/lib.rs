use std::ops::AddAssign;

use tracing_subscriber::{fmt, EnvFilter};

pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .init();
}

/// Packet handler outcomes for one channel over one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchCounts {
    /// Packets popped and offered to the dispatch table.
    pub dispatched: u64,
    /// Consumed by a registered handler.
    pub accepted: u64,
    /// Handed back by a handler and requeued.
    pub rejected: u64,
    /// No handler registered; consumed as a no-op.
    pub unhandled: u64,
}

impl AddAssign for DispatchCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.dispatched += rhs.dispatched;
        self.accepted += rhs.accepted;
        self.rejected += rhs.rejected;
        self.unhandled += rhs.unhandled;
    }
}

#[derive(Debug, Clone, Default)]
pub struct TickMetrics {
    pub tick_number: u64,
    pub duration_us: u128,
    /// Control messages drained this tick.
    pub message_count: usize,
    pub client_sessions: usize,
    pub internal_sessions: usize,
    pub client: DispatchCounts,
    pub internal: DispatchCounts,
}

impl TickMetrics {
    pub fn log(&self, budget_us: u128) {
        if self.duration_us > budget_us {
            tracing::warn!(
                tick = self.tick_number,
                duration_us = self.duration_us,
                messages = self.message_count,
                client_sessions = self.client_sessions,
                internal_sessions = self.internal_sessions,
                client_dispatched = self.client.dispatched,
                internal_dispatched = self.internal.dispatched,
                "tick exceeded budget ({}us > {}us)",
                self.duration_us,
                budget_us
            );
        } else {
            tracing::debug!(
                tick = self.tick_number,
                duration_us = self.duration_us,
                messages = self.message_count,
                client_sessions = self.client_sessions,
                internal_sessions = self.internal_sessions,
                client_dispatched = self.client.dispatched,
                client_requeued = self.client.rejected,
                internal_dispatched = self.internal.dispatched,
                internal_requeued = self.internal.rejected,
                "tick completed"
            );
        }
    }
}
