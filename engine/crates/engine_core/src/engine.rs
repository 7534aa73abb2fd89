use std::sync::Mutex;
use std::thread::JoinHandle;
use std::time::Duration;

use net::channels::{control_channel, outbound_channel, ControlTx, OutboundRx};
use net::{ControlMessage, OutboundMessage};

use crate::dispatch::{ClientDispatch, InternalDispatch};
use crate::error::EngineError;
use crate::tick::{TickConfig, TickLoop};

enum LoopState {
    /// Not running; the tick loop is parked here between runs.
    Idle(Box<TickLoop>),
    /// The simulation thread owns the tick loop and hands it back on exit.
    Running(JoinHandle<Box<TickLoop>>),
    /// The simulation thread panicked and took the state with it.
    Lost,
}

/// Owns the simulation thread and both control queues.
///
/// Producers post into the inbound queue from any thread; the process polls
/// the outbound queue for `SetupComplete`, `Print` and `ExitConfirmed`.
pub struct EngineLoop {
    control_tx: ControlTx,
    outbound_rx: OutboundRx,
    state: Mutex<LoopState>,
}

impl EngineLoop {
    pub fn new(config: TickConfig, client: ClientDispatch, internal: InternalDispatch) -> Self {
        let (control_tx, control_rx) = control_channel();
        let (outbound_tx, outbound_rx) = outbound_channel();
        let tick_loop = TickLoop::new(config, client, internal, control_rx, outbound_tx);
        Self {
            control_tx,
            outbound_rx,
            state: Mutex::new(LoopState::Idle(Box::new(tick_loop))),
        }
    }

    /// Spawn the simulation thread. Does nothing if it is already running;
    /// after a stop it resumes with the sessions it had.
    pub fn start(&self) -> Result<(), EngineError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        let tick_loop = match std::mem::replace(&mut *state, LoopState::Lost) {
            LoopState::Running(handle) if !handle.is_finished() => {
                *state = LoopState::Running(handle);
                return Ok(());
            }
            LoopState::Running(handle) => handle.join().map_err(|_| EngineError::ThreadPanicked)?,
            LoopState::Idle(tick_loop) => tick_loop,
            LoopState::Lost => return Err(EngineError::ThreadPanicked),
        };

        let handle = std::thread::Builder::new()
            .name("simulation".to_string())
            .spawn(move || {
                let mut tick_loop = tick_loop;
                tick_loop.run();
                tick_loop
            })?;
        *state = LoopState::Running(handle);
        Ok(())
    }

    /// Ask the simulation thread to exit after its current tick.
    pub fn stop(&self) {
        if !self.is_running() {
            return;
        }
        if self.post_message(ControlMessage::Exit).is_err() {
            tracing::warn!("control queue closed before exit could be posted");
        }
    }

    /// Wait for the simulation thread to finish and park its state.
    pub fn join(&self) -> Result<(), EngineError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match std::mem::replace(&mut *state, LoopState::Lost) {
            LoopState::Running(handle) => {
                let tick_loop = handle.join().map_err(|_| EngineError::ThreadPanicked)?;
                *state = LoopState::Idle(tick_loop);
                Ok(())
            }
            LoopState::Idle(tick_loop) => {
                *state = LoopState::Idle(tick_loop);
                Ok(())
            }
            LoopState::Lost => Err(EngineError::ThreadPanicked),
        }
    }

    pub fn is_running(&self) -> bool {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        matches!(&*state, LoopState::Running(handle) if !handle.is_finished())
    }

    /// Enqueue a control message for the next tick. Callable from any thread.
    pub fn post_message(&self, message: ControlMessage) -> Result<(), EngineError> {
        self.control_tx.send(message).map_err(|_| EngineError::Closed)
    }

    /// A producer handle for network tasks.
    pub fn sender(&self) -> ControlTx {
        self.control_tx.clone()
    }

    /// Non-blocking poll of the outbound queue.
    pub fn try_receive_message(&self) -> Option<OutboundMessage> {
        self.outbound_rx.try_recv().ok()
    }

    pub fn receive_message_timeout(&self, timeout: Duration) -> Option<OutboundMessage> {
        self.outbound_rx.recv_timeout(timeout).ok()
    }

    /// Read the parked tick loop. `None` while the simulation thread runs.
    pub fn inspect<R>(&self, f: impl FnOnce(&TickLoop) -> R) -> Option<R> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match &*state {
            LoopState::Idle(tick_loop) => Some(f(tick_loop)),
            _ => None,
        }
    }
}

impl Drop for EngineLoop {
    fn drop(&mut self) {
        self.stop();
        if let Err(e) = self.join() {
            tracing::error!(error = %e, "simulation thread ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::tick::PONG;
    use ecs_adapter::ClientConnection;
    use net::{Connection, Opcode, Packet};

    const WAIT: Duration = Duration::from_secs(5);

    fn fast_config() -> TickConfig {
        TickConfig {
            tps: 200,
            ..TickConfig::default()
        }
    }

    #[test]
    fn start_is_idempotent() {
        let engine = EngineLoop::new(fast_config(), ClientDispatch::new(), InternalDispatch::new());
        engine.start().unwrap();
        engine.start().unwrap();

        assert_eq!(engine.receive_message_timeout(WAIT), Some(OutboundMessage::SetupComplete));
        engine.stop();
        engine.join().unwrap();

        assert_eq!(engine.receive_message_timeout(WAIT), Some(OutboundMessage::ExitConfirmed));
        // only one thread ever started
        assert_eq!(engine.try_receive_message(), None);
        assert!(!engine.is_running());
    }

    #[test]
    fn ping_produces_one_print() {
        let engine = EngineLoop::new(fast_config(), ClientDispatch::new(), InternalDispatch::new());
        engine.start().unwrap();
        assert_eq!(engine.receive_message_timeout(WAIT), Some(OutboundMessage::SetupComplete));

        engine.post_message(ControlMessage::Ping).unwrap();
        assert_eq!(
            engine.receive_message_timeout(WAIT),
            Some(OutboundMessage::Print(PONG.to_string()))
        );

        engine.stop();
        engine.join().unwrap();
        assert_eq!(engine.try_receive_message(), Some(OutboundMessage::ExitConfirmed));
        assert_eq!(engine.try_receive_message(), None);
    }

    #[test]
    fn stop_when_idle_posts_nothing() {
        let engine = EngineLoop::new(fast_config(), ClientDispatch::new(), InternalDispatch::new());
        engine.stop();
        engine.start().unwrap();
        assert_eq!(engine.receive_message_timeout(WAIT), Some(OutboundMessage::SetupComplete));

        // a stray Exit from the idle stop would have ended the loop already
        std::thread::sleep(Duration::from_millis(50));
        assert!(engine.is_running());
        engine.stop();
        engine.join().unwrap();
    }

    #[test]
    fn restart_keeps_sessions() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut client = ClientDispatch::new();
        let c = Arc::clone(&calls);
        client.register(Opcode::ClientLogonProof, move |_, _| {
            c.fetch_add(1, Ordering::SeqCst);
            false
        });
        let engine = EngineLoop::new(fast_config(), client, InternalDispatch::new());
        let conn = Arc::new(Connection::new("a"));

        engine.start().unwrap();
        engine
            .post_message(ControlMessage::ClientPacket(Packet::new(
                Opcode::ClientLogonProof,
                Arc::clone(&conn),
                vec![],
            )))
            .unwrap();
        engine.post_message(ControlMessage::Exit).unwrap();
        engine.join().unwrap();

        let id = conn.session_id().unwrap();
        let queued = engine
            .inspect(|l| l.registry.component::<ClientConnection>(id).map(|c| c.packets.len()))
            .flatten();
        assert_eq!(queued, Some(1));

        engine.start().unwrap();
        engine.stop();
        engine.join().unwrap();
        assert!(engine.inspect(|l| l.registry.contains(id)).unwrap());
        assert!(calls.load(Ordering::SeqCst) >= 2);
    }

    #[test]
    fn inspect_unavailable_while_running() {
        let engine = EngineLoop::new(fast_config(), ClientDispatch::new(), InternalDispatch::new());
        assert!(engine.inspect(|_| ()).is_some());
        engine.start().unwrap();
        assert_eq!(engine.receive_message_timeout(WAIT), Some(OutboundMessage::SetupComplete));
        assert!(engine.inspect(|_| ()).is_none());
        engine.stop();
        engine.join().unwrap();
    }
}
