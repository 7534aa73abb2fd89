//! Handlers registered at startup: the internal handshake, logon logging,
//! and ping/pong on both channels.

use ecs_adapter::{ClientConnection, InternalConnection};
use engine_core::{ClientDispatch, InternalDispatch};
use net::{Opcode, Packet};

pub fn build_client_dispatch() -> ClientDispatch {
    let mut table = ClientDispatch::new();
    table.register(Opcode::ClientLogonChallenge, logon_challenge);
    table.register(Opcode::ClientLogonProof, logon_proof);
    table.register(Opcode::ClientPing, client_ping);
    table
}

pub fn build_internal_dispatch() -> InternalDispatch {
    let mut table = InternalDispatch::new();
    table.register(Opcode::InternalHandshake, handshake);
    table.register(Opcode::InternalHandshakeResponse, handshake_response);
    table.register(Opcode::InternalPing, internal_ping);
    table
}

fn logon_challenge(packet: &Packet, component: &ClientConnection) -> bool {
    tracing::info!(peer = component.connection.peer(), len = packet.payload.len(), "received logon challenge");
    component.connection.send(Opcode::ServerLogonChallenge, &[]);
    true
}

fn logon_proof(packet: &Packet, component: &ClientConnection) -> bool {
    tracing::info!(peer = component.connection.peer(), len = packet.payload.len(), "received logon proof");
    component.connection.send(Opcode::ServerLogonProof, &[]);
    true
}

fn client_ping(packet: &Packet, component: &ClientConnection) -> bool {
    if !component.connection.send(Opcode::ServerPong, &packet.payload) {
        tracing::debug!(peer = component.connection.peer(), "pong not delivered");
    }
    true
}

fn handshake(_packet: &Packet, component: &InternalConnection) -> bool {
    tracing::info!(peer = component.connection.peer(), "received handshake");
    component.connection.send(Opcode::InternalHandshakeResponse, &[]);
    true
}

fn handshake_response(_packet: &Packet, component: &InternalConnection) -> bool {
    tracing::info!(peer = component.connection.peer(), "received handshake response");
    true
}

fn internal_ping(packet: &Packet, component: &InternalConnection) -> bool {
    if !component.connection.send(Opcode::InternalPong, &packet.payload) {
        tracing::debug!(peer = component.connection.peer(), "pong not delivered");
    }
    true
}
