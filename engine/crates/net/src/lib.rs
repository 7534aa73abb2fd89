pub mod channels;
pub mod connection;
pub mod error;
pub mod packet_queue;
pub mod protocol;
pub mod server;

pub use channels::{Channel, ControlMessage, OutboundMessage};
pub use connection::Connection;
pub use error::ProtocolError;
pub use packet_queue::PacketQueue;
pub use protocol::{Opcode, Packet, PacketHeader};
