use std::marker::PhantomData;

use bevy_ecs::prelude::*;
use ecs_adapter::SessionComponent;
use observability::DispatchCounts;

use crate::dispatch::{Dispatch, DispatchTable};

/// Per-channel handler counters, accumulated by [`handle_packets`] and
/// collected by the tick loop.
#[derive(Resource)]
pub struct ChannelStats<C: SessionComponent> {
    counts: DispatchCounts,
    _channel: PhantomData<fn() -> C>,
}

impl<C: SessionComponent> ChannelStats<C> {
    /// Return the accumulated counts and reset them.
    pub fn take(&mut self) -> DispatchCounts {
        std::mem::take(&mut self.counts)
    }
}

impl<C: SessionComponent> Default for ChannelStats<C> {
    fn default() -> Self {
        Self {
            counts: DispatchCounts::default(),
            _channel: PhantomData,
        }
    }
}

/// Drain every `C` session's queue through the channel's dispatch table.
pub fn handle_packets<C: SessionComponent>(
    sessions: Query<&C>,
    table: Res<DispatchTable<C>>,
    mut stats: ResMut<ChannelStats<C>>,
) {
    for component in &sessions {
        stats.counts += drain_session(component, &table);
    }
}

/// Offer each packet queued at entry to the table exactly once.
///
/// The budget is the queue length on entry. Rejected packets go back on the
/// tail and are not seen again until the next call, so a handler that keeps
/// refusing cannot pin the tick.
pub fn drain_session<C: SessionComponent>(component: &C, table: &DispatchTable<C>) -> DispatchCounts {
    let queue = component.packets();
    let budget = queue.len();
    let mut counts = DispatchCounts::default();

    for _ in 0..budget {
        let Some(packet) = queue.pop() else {
            break;
        };
        counts.dispatched += 1;
        match table.dispatch(&packet, component) {
            Dispatch::Accepted => counts.accepted += 1,
            Dispatch::Unhandled => counts.unhandled += 1,
            Dispatch::Rejected => {
                counts.rejected += 1;
                queue.push(packet);
            }
        }
    }

    counts
}
