use std::sync::Arc;

use crossbeam::channel;

use crate::connection::Connection;
use crate::protocol::Packet;

/// The two independent packet pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Game clients.
    Client,
    /// Other server processes.
    Internal,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Client => f.write_str("client"),
            Channel::Internal => f.write_str("internal"),
        }
    }
}

/// Messages from producers (network tasks, operators) to the simulation thread.
#[derive(Debug)]
pub enum ControlMessage {
    /// Stop the loop once the current tick completes.
    Exit,
    /// Liveness probe, answered with an outbound `Print`.
    Ping,
    /// Diagnostic text relayed to the outbound queue.
    Print(String),
    /// A packet received on a client connection.
    ClientPacket(Packet),
    /// A packet received on an internal connection.
    InternalPacket(Packet),
    /// The connection closed. Its identity is read when the message is
    /// processed, so packets posted earlier by the same producer have
    /// already been routed.
    Disconnect {
        connection: Arc<Connection>,
        channel: Channel,
    },
}

impl ControlMessage {
    pub fn packet(channel: Channel, packet: Packet) -> Self {
        match channel {
            Channel::Client => Self::ClientPacket(packet),
            Channel::Internal => Self::InternalPacket(packet),
        }
    }

    /// Short name for log fields.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Exit => "exit",
            Self::Ping => "ping",
            Self::Print(_) => "print",
            Self::ClientPacket(_) => "client_packet",
            Self::InternalPacket(_) => "internal_packet",
            Self::Disconnect { .. } => "disconnect",
        }
    }
}

/// Messages from the simulation thread back to the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    /// The simulation thread is up and about to run its first tick.
    SetupComplete,
    Print(String),
    /// The loop has stopped; no further ticks will run.
    ExitConfirmed,
}

/// Sender used by network tasks to reach the simulation thread.
pub type ControlTx = channel::Sender<ControlMessage>;
/// Receiver drained by the simulation thread each tick.
pub type ControlRx = channel::Receiver<ControlMessage>;

/// Sender held by the simulation thread.
pub type OutboundTx = channel::Sender<OutboundMessage>;
/// Receiver polled by the process.
pub type OutboundRx = channel::Receiver<OutboundMessage>;

pub fn control_channel() -> (ControlTx, ControlRx) {
    channel::unbounded()
}

pub fn outbound_channel() -> (OutboundTx, OutboundRx) {
    channel::unbounded()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Opcode;

    #[test]
    fn control_channel_preserves_order() {
        let (tx, rx) = control_channel();
        let conn = Arc::new(Connection::new("peer"));

        tx.send(ControlMessage::Ping).unwrap();
        tx.send(ControlMessage::packet(
            Channel::Client,
            Packet::new(Opcode::ClientPing, Arc::clone(&conn), vec![]),
        ))
        .unwrap();
        tx.send(ControlMessage::Disconnect {
            connection: conn,
            channel: Channel::Client,
        })
        .unwrap();

        assert!(matches!(rx.try_recv().unwrap(), ControlMessage::Ping));
        assert!(matches!(rx.try_recv().unwrap(), ControlMessage::ClientPacket(_)));
        assert!(matches!(rx.try_recv().unwrap(), ControlMessage::Disconnect { .. }));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn packet_constructor_picks_variant() {
        let conn = Arc::new(Connection::new("peer"));
        let msg = ControlMessage::packet(
            Channel::Internal,
            Packet::new(Opcode::InternalHandshake, conn, vec![]),
        );
        assert!(matches!(msg, ControlMessage::InternalPacket(_)));
        assert_eq!(msg.code(), "internal_packet");
    }

    #[test]
    fn outbound_roundtrip() {
        let (tx, rx) = outbound_channel();
        tx.send(OutboundMessage::Print("PONG!".into())).unwrap();
        assert_eq!(rx.try_recv().unwrap(), OutboundMessage::Print("PONG!".into()));
    }
}
