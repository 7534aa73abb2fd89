use std::sync::atomic::{AtomicU64, Ordering};

use session::SessionId;
use tokio::sync::mpsc;

use crate::protocol::{encode_frame, Opcode};

/// Per-connection write channel (handlers -> connection writer task).
pub type ConnectionWriteTx = mpsc::UnboundedSender<Vec<u8>>;
pub type ConnectionWriteRx = mpsc::UnboundedReceiver<Vec<u8>>;

/// A physical connection, shared between the I/O layer and the session registry.
///
/// The identity starts at [`SessionId::UNASSIGNED`] and is written by the
/// simulation thread when the connection's first packet is routed.
#[derive(Debug)]
pub struct Connection {
    peer: String,
    identity: AtomicU64,
    writer: Option<ConnectionWriteTx>,
}

impl Connection {
    /// A connection with no outbound path (tests, loopback producers).
    pub fn new(peer: impl Into<String>) -> Self {
        Self {
            peer: peer.into(),
            identity: AtomicU64::new(SessionId::UNASSIGNED),
            writer: None,
        }
    }

    pub fn with_writer(peer: impl Into<String>, writer: ConnectionWriteTx) -> Self {
        Self {
            writer: Some(writer),
            ..Self::new(peer)
        }
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Raw identity, `0` while unregistered.
    pub fn identity(&self) -> u64 {
        self.identity.load(Ordering::Acquire)
    }

    pub fn session_id(&self) -> Option<SessionId> {
        SessionId::from_identity(self.identity())
    }

    pub fn set_identity(&self, id: SessionId) {
        self.identity.store(id.to_u64(), Ordering::Release);
    }

    /// Queue a frame for the peer. Returns false when the connection has no
    /// writer or the writer task has gone away.
    pub fn send(&self, opcode: Opcode, payload: &[u8]) -> bool {
        match &self.writer {
            Some(tx) => tx.send(encode_frame(opcode, payload)).is_ok(),
            None => false,
        }
    }
}
