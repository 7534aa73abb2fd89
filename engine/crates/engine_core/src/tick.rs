use std::time::{Duration, Instant};

use ecs_adapter::{ClientConnection, InternalConnection, SessionComponent, SessionRegistry};
use net::channels::{ControlRx, OutboundTx};
use net::{Channel, ControlMessage, OutboundMessage, Packet};
use observability::TickMetrics;

use crate::dispatch::{ClientDispatch, InternalDispatch};
use crate::graph::TaskGraph;
use crate::systems::ChannelStats;
use crate::time::TickTime;

/// Reply text for [`ControlMessage::Ping`].
pub const PONG: &str = "PONG!";

/// Below this much remaining time the pacing wait stops sleeping and yields.
const SPIN_MARGIN: Duration = Duration::from_micros(2500);

/// Tick loop configuration.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Ticks per second.
    pub tps: u32,
    /// Maximum ticks to run (0 = unlimited).
    pub max_ticks: u64,
    /// Run the channel systems on the multi-threaded executor.
    pub parallel: bool,
    /// Warn when a session queue grows past this many packets.
    pub queue_warn_len: usize,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tps: 30,
            max_ticks: 0,
            parallel: true,
            queue_warn_len: 1024,
        }
    }
}

impl TickConfig {
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tps.max(1) as f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStatus {
    Continue,
    /// An `Exit` was processed during this tick.
    Exit,
}

/// The simulation state driven once per tick.
pub struct TickLoop {
    pub registry: SessionRegistry,
    pub config: TickConfig,
    pub current_tick: u64,
    graph: TaskGraph,
    inbound: ControlRx,
    outbound: OutboundTx,
}

impl TickLoop {
    pub fn new(
        config: TickConfig,
        client: ClientDispatch,
        internal: InternalDispatch,
        inbound: ControlRx,
        outbound: OutboundTx,
    ) -> Self {
        let mut registry = SessionRegistry::new();
        let world = registry.world_mut();
        world.insert_resource(client);
        world.insert_resource(internal);
        world.insert_resource(ChannelStats::<ClientConnection>::default());
        world.insert_resource(ChannelStats::<InternalConnection>::default());
        world.insert_resource(TickTime::new(Instant::now()));

        Self {
            registry,
            graph: TaskGraph::new(config.parallel),
            config,
            current_tick: 0,
            inbound,
            outbound,
        }
    }

    /// Execute a single tick: drain control messages → run channel systems → metrics.
    pub fn step(&mut self) -> (TickStatus, TickMetrics) {
        let start = Instant::now();
        let mut status = TickStatus::Continue;
        self.registry.world_mut().resource_mut::<TickTime>().advance(start);

        // 1. Drain what was queued before this tick began; later arrivals wait.
        let pending = self.inbound.len();
        let mut message_count = 0;
        for _ in 0..pending {
            let Ok(message) = self.inbound.try_recv() else {
                break;
            };
            message_count += 1;
            if self.apply_message(message) == TickStatus::Exit {
                status = TickStatus::Exit;
            }
        }

        // 2. Run both packet handler systems to completion.
        self.graph.run(self.registry.world_mut());

        let world = self.registry.world_mut();
        let client = world.resource_mut::<ChannelStats<ClientConnection>>().take();
        let internal = world.resource_mut::<ChannelStats<InternalConnection>>().take();

        self.current_tick += 1;
        let metrics = TickMetrics {
            tick_number: self.current_tick,
            duration_us: start.elapsed().as_micros(),
            message_count,
            client_sessions: self.registry.session_count::<ClientConnection>(),
            internal_sessions: self.registry.session_count::<InternalConnection>(),
            client,
            internal,
        };
        (status, metrics)
    }

    /// Run ticks at the configured rate until an `Exit` message (or `max_ticks`).
    ///
    /// Announces `SetupComplete` before the first tick and `ExitConfirmed`
    /// after the last.
    pub fn run(&mut self) -> u64 {
        let tick_duration = self.config.tick_duration();
        let budget_us = tick_duration.as_micros();
        let first_tick = self.current_tick;

        self.emit(OutboundMessage::SetupComplete);
        tracing::info!(tps = self.config.tps, parallel = self.config.parallel, "tick loop started");

        loop {
            if self.config.max_ticks > 0 && self.current_tick >= self.config.max_ticks {
                break;
            }

            let tick_start = Instant::now();
            let (status, metrics) = self.step();
            metrics.log(budget_us);
            if status == TickStatus::Exit {
                break;
            }

            wait_for_next_tick(tick_start, tick_duration);
        }

        let ticks = self.current_tick - first_tick;
        tracing::info!(
            ticks,
            sessions = self.registry.len(),
            lifetime_ms = self.time().lifetime_ms(),
            "tick loop stopped"
        );
        self.emit(OutboundMessage::ExitConfirmed);
        ticks
    }

    /// The clock as of the most recent tick.
    pub fn time(&self) -> TickTime {
        *self.registry.world().resource::<TickTime>()
    }

    fn apply_message(&mut self, message: ControlMessage) -> TickStatus {
        match message {
            ControlMessage::Exit => {
                tracing::debug!("exit requested");
                return TickStatus::Exit;
            }
            ControlMessage::Ping => self.emit(OutboundMessage::Print(PONG.to_string())),
            ControlMessage::Print(text) => self.emit(OutboundMessage::Print(text)),
            ControlMessage::ClientPacket(packet) => self.route::<ClientConnection>(packet),
            ControlMessage::InternalPacket(packet) => self.route::<InternalConnection>(packet),
            ControlMessage::Disconnect { connection, channel } => {
                let Some(id) = connection.session_id() else {
                    tracing::debug!(peer = connection.peer(), %channel, "disconnect before first packet");
                    return TickStatus::Continue;
                };
                let result = match channel {
                    Channel::Client => self.registry.destroy_session::<ClientConnection>(id),
                    Channel::Internal => self.registry.destroy_session::<InternalConnection>(id),
                };
                match result {
                    Ok(dropped) if dropped > 0 => {
                        tracing::debug!(session = %id, dropped, "discarded queued packets on disconnect");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(peer = connection.peer(), %channel, error = %e, "disconnect ignored");
                    }
                }
            }
        }
        TickStatus::Continue
    }

    fn route<C: SessionComponent>(&mut self, packet: Packet) {
        let opcode = packet.opcode();
        let (id, queued) = self.registry.route::<C>(packet);
        if queued > self.config.queue_warn_len {
            tracing::warn!(session = %id, channel = %C::CHANNEL, %opcode, queued, "session packet queue is backing up");
        }
    }

    fn emit(&self, message: OutboundMessage) {
        if let Err(e) = self.outbound.send(message) {
            tracing::warn!(dropped = ?e.into_inner(), "outbound queue closed");
        }
    }
}

/// Hold the thread until `target` has elapsed since `tick_start`.
///
/// Sleeps in 1ms steps while there is plenty of time left, then yields
/// until the deadline. A tick that already overran returns immediately.
pub fn wait_for_next_tick(tick_start: Instant, target: Duration) {
    while tick_start.elapsed() + SPIN_MARGIN < target {
        std::thread::sleep(Duration::from_millis(1));
    }
    while tick_start.elapsed() < target {
        std::thread::yield_now();
    }
}
