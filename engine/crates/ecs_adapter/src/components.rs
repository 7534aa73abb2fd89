use std::sync::Arc;

use bevy_ecs::prelude::*;
use net::{Channel, Connection, PacketQueue};

/// Connection state attached to a session entity, one type per channel.
///
/// Keeping the channels as distinct component types means the client and
/// internal handler systems touch disjoint storage and can run in parallel.
pub trait SessionComponent: Component + Sized {
    const CHANNEL: Channel;

    fn new(connection: Arc<Connection>) -> Self;

    fn connection(&self) -> &Arc<Connection>;

    fn packets(&self) -> &PacketQueue;
}

/// A game-client session.
#[derive(Component, Debug)]
pub struct ClientConnection {
    pub connection: Arc<Connection>,
    pub packets: PacketQueue,
}

/// A server-to-server session.
#[derive(Component, Debug)]
pub struct InternalConnection {
    pub connection: Arc<Connection>,
    pub packets: PacketQueue,
}

impl SessionComponent for ClientConnection {
    const CHANNEL: Channel = Channel::Client;

    fn new(connection: Arc<Connection>) -> Self {
        Self {
            connection,
            packets: PacketQueue::new(),
        }
    }

    fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    fn packets(&self) -> &PacketQueue {
        &self.packets
    }
}

impl SessionComponent for InternalConnection {
    const CHANNEL: Channel = Channel::Internal;

    fn new(connection: Arc<Connection>) -> Self {
        Self {
            connection,
            packets: PacketQueue::new(),
        }
    }

    fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    fn packets(&self) -> &PacketQueue {
        &self.packets
    }
}
