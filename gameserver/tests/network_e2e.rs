//! Full stack over loopback TCP: listener → engine → handlers → peer.

use std::sync::Arc;
use std::time::Duration;

use engine_core::{EngineLoop, TickConfig};
use gameserver::handlers::{build_client_dispatch, build_internal_dispatch};
use net::protocol::{encode_frame, FrameBuffer, DEFAULT_MAX_PAYLOAD};
use net::server::{run_listener, ListenerConfig};
use net::{Channel, Opcode, OutboundMessage};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::watch;

const WAIT: Duration = Duration::from_secs(5);

async fn free_addr() -> String {
    let probe = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = probe.local_addr().unwrap().to_string();
    drop(probe);
    addr
}

async fn connect(addr: &str) -> TcpStream {
    for _ in 0..100 {
        if let Ok(stream) = TcpStream::connect(addr).await {
            return stream;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("listener at {} never came up", addr);
}

async fn read_frame(stream: &mut TcpStream) -> (Opcode, Vec<u8>) {
    let mut decoder = FrameBuffer::new(DEFAULT_MAX_PAYLOAD);
    let mut buf = [0u8; 256];
    loop {
        let n = tokio::time::timeout(WAIT, stream.read(&mut buf)).await.unwrap().unwrap();
        assert!(n > 0, "peer closed before a reply arrived");
        let mut frames = decoder.feed(&buf[..n]).unwrap();
        if !frames.is_empty() {
            return frames.remove(0);
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn handshake_and_ping_round_trip() {
    let config = TickConfig {
        tps: 100,
        ..TickConfig::default()
    };
    let engine = Arc::new(EngineLoop::new(config, build_client_dispatch(), build_internal_dispatch()));
    engine.start().unwrap();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let client_addr = free_addr().await;
    let internal_addr = free_addr().await;
    let mut listeners = Vec::new();
    for (addr, channel) in [(client_addr.clone(), Channel::Client), (internal_addr.clone(), Channel::Internal)] {
        let listener = ListenerConfig {
            addr,
            channel,
            max_payload: DEFAULT_MAX_PAYLOAD,
        };
        listeners.push(tokio::spawn(run_listener(
            listener,
            engine.sender(),
            shutdown_rx.clone(),
        )));
    }

    let mut shard = connect(&internal_addr).await;
    shard.write_all(&encode_frame(Opcode::InternalHandshake, &[])).await.unwrap();
    assert_eq!(read_frame(&mut shard).await, (Opcode::InternalHandshakeResponse, vec![]));

    let mut client = connect(&client_addr).await;
    client.write_all(&encode_frame(Opcode::ClientPing, b"abc")).await.unwrap();
    assert_eq!(read_frame(&mut client).await, (Opcode::ServerPong, b"abc".to_vec()));

    drop(client);
    drop(shard);
    shutdown_tx.send(true).unwrap();
    for listener in listeners {
        listener.await.unwrap().unwrap();
    }

    engine.stop();
    engine.join().unwrap();

    let mut messages = Vec::new();
    while let Some(m) = engine.try_receive_message() {
        messages.push(m);
    }
    assert_eq!(messages.first(), Some(&OutboundMessage::SetupComplete));
    assert_eq!(messages.last(), Some(&OutboundMessage::ExitConfirmed));
}
