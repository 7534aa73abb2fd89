use bevy_ecs::prelude::*;
use ecs_adapter::{ClientConnection, InternalConnection, SessionComponent};
use net::{Opcode, Packet};

/// A packet handler. `true` consumes the packet, `false` asks for a retry on
/// a later tick.
pub type Handler<C> = Box<dyn Fn(&Packet, &C) -> bool + Send + Sync>;

/// What happened to a packet offered to a [`DispatchTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Accepted,
    Rejected,
    /// No handler for the opcode. Treated as consumed.
    Unhandled,
}

/// Opcode-indexed handler table for one channel.
#[derive(Resource)]
pub struct DispatchTable<C: SessionComponent> {
    handlers: [Option<Handler<C>>; Opcode::COUNT],
}

pub type ClientDispatch = DispatchTable<ClientConnection>;
pub type InternalDispatch = DispatchTable<InternalConnection>;

impl<C: SessionComponent> DispatchTable<C> {
    pub fn new() -> Self {
        Self {
            handlers: std::array::from_fn(|_| None),
        }
    }

    /// Bind `handler` to `opcode`. A later registration replaces an earlier one.
    pub fn register<F>(&mut self, opcode: Opcode, handler: F)
    where
        F: Fn(&Packet, &C) -> bool + Send + Sync + 'static,
    {
        let slot = &mut self.handlers[opcode.index()];
        if slot.is_some() {
            tracing::debug!(%opcode, channel = %C::CHANNEL, "replacing packet handler");
        }
        *slot = Some(Box::new(handler));
    }

    pub fn dispatch(&self, packet: &Packet, component: &C) -> Dispatch {
        match &self.handlers[packet.opcode().index()] {
            Some(handler) if handler(packet, component) => Dispatch::Accepted,
            Some(_) => Dispatch::Rejected,
            None => Dispatch::Unhandled,
        }
    }

    /// Run the handler for the packet's opcode; an empty slot counts as handled.
    pub fn invoke(&self, packet: &Packet, component: &C) -> bool {
        self.dispatch(packet, component) != Dispatch::Rejected
    }

    pub fn is_registered(&self, opcode: Opcode) -> bool {
        self.handlers[opcode.index()].is_some()
    }

    pub fn registered_count(&self) -> usize {
        self.handlers.iter().filter(|h| h.is_some()).count()
    }
}

impl<C: SessionComponent> Default for DispatchTable<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: SessionComponent> std::fmt::Debug for DispatchTable<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registered: Vec<Opcode> = (0..Opcode::COUNT as u16)
            .filter_map(Opcode::from_u16)
            .filter(|op| self.is_registered(*op))
            .collect();
        f.debug_struct("DispatchTable")
            .field("channel", &C::CHANNEL)
            .field("registered", &registered)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;
    use net::Connection;

    fn client_packet(opcode: Opcode) -> (Packet, ClientConnection) {
        let conn = Arc::new(Connection::new("peer"));
        let component = ClientConnection::new(Arc::clone(&conn));
        (Packet::new(opcode, conn, vec![]), component)
    }

    #[test]
    fn empty_slot_accepts() {
        let table = ClientDispatch::new();
        let (packet, component) = client_packet(Opcode::ClientChatMessage);
        assert_eq!(table.dispatch(&packet, &component), Dispatch::Unhandled);
        assert!(table.invoke(&packet, &component));
        assert_eq!(table.registered_count(), 0);
    }

    #[test]
    fn handler_result_is_returned() {
        let mut table = ClientDispatch::new();
        table.register(Opcode::ClientPing, |_, _| true);
        table.register(Opcode::ClientLogonProof, |_, _| false);

        let (ping, component) = client_packet(Opcode::ClientPing);
        assert_eq!(table.dispatch(&ping, &component), Dispatch::Accepted);

        let (proof, component) = client_packet(Opcode::ClientLogonProof);
        assert_eq!(table.dispatch(&proof, &component), Dispatch::Rejected);
        assert!(!table.invoke(&proof, &component));
    }

    #[test]
    fn last_registration_wins() {
        let first = Arc::new(AtomicU32::new(0));
        let second = Arc::new(AtomicU32::new(0));

        let mut table = ClientDispatch::new();
        let f = Arc::clone(&first);
        table.register(Opcode::ClientPing, move |_, _| {
            f.fetch_add(1, Ordering::SeqCst);
            true
        });
        let s = Arc::clone(&second);
        table.register(Opcode::ClientPing, move |_, _| {
            s.fetch_add(1, Ordering::SeqCst);
            true
        });

        let (packet, component) = client_packet(Opcode::ClientPing);
        table.invoke(&packet, &component);

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert_eq!(table.registered_count(), 1);
    }

    #[test]
    fn handler_sees_resolved_component() {
        let mut table = ClientDispatch::new();
        table.register(Opcode::ClientPing, |packet, component: &ClientConnection| {
            Arc::ptr_eq(packet.connection(), &component.connection)
        });
        let (packet, component) = client_packet(Opcode::ClientPing);
        assert!(table.invoke(&packet, &component));
    }

    #[test]
    fn debug_lists_registered_opcodes() {
        let mut table = InternalDispatch::new();
        table.register(Opcode::InternalHandshake, |_, _| true);
        let text = format!("{:?}", table);
        assert!(text.contains("InternalHandshake"));
        assert!(text.contains("Internal"));
    }
}
