use bevy_ecs::prelude::*;
use bevy_ecs::schedule::ExecutorKind;
use ecs_adapter::{ClientConnection, InternalConnection};

use crate::systems::handle_packets;

/// The per-tick system graph: the client and internal packet handlers as
/// two independent nodes.
///
/// The nodes share no component or resource, so the multi-threaded executor
/// runs them side by side. [`TaskGraph::run`] returns only once both are
/// done, which is the barrier the tick waits on.
pub struct TaskGraph {
    schedule: Schedule,
}

impl TaskGraph {
    pub fn new(parallel: bool) -> Self {
        let mut schedule = Schedule::default();
        schedule.set_executor_kind(if parallel {
            ExecutorKind::MultiThreaded
        } else {
            ExecutorKind::SingleThreaded
        });
        schedule.add_systems((
            handle_packets::<ClientConnection>,
            handle_packets::<InternalConnection>,
        ));
        Self { schedule }
    }

    pub fn run(&mut self, world: &mut World) {
        self.schedule.run(world);
    }
}

impl std::fmt::Debug for TaskGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskGraph")
            .field("executor", &self.schedule.get_executor_kind())
            .finish()
    }
}
