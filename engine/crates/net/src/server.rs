use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};

use crate::channels::{Channel, ControlMessage, ControlTx};
use crate::connection::{Connection, ConnectionWriteRx};
use crate::protocol::{FrameBuffer, Packet};

/// One listening socket feeding a single channel.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    pub addr: String,
    pub channel: Channel,
    pub max_payload: usize,
}

/// Accept connections until shutdown is signaled, spawning a task per peer.
///
/// Each task only produces: frames become packets posted to `control_tx`,
/// and a `Disconnect` follows the last packet when the peer goes away.
pub async fn run_listener(
    config: ListenerConfig,
    control_tx: ControlTx,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(&config.addr).await?;
    tracing::info!(channel = %config.channel, addr = %config.addr, "listener started");

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer_addr) = accepted?;
                tracing::debug!(channel = %config.channel, %peer_addr, "new connection");
                let control_tx = control_tx.clone();
                let channel = config.channel;
                let max_payload = config.max_payload;
                tokio::spawn(async move {
                    handle_connection(stream, peer_addr.to_string(), channel, max_payload, control_tx).await;
                });
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    tracing::info!(channel = %config.channel, "listener shutting down");
                    return Ok(());
                }
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: String,
    channel: Channel,
    max_payload: usize,
    control_tx: ControlTx,
) {
    let (mut reader, mut writer) = stream.into_split();

    let (write_tx, mut write_rx): (_, ConnectionWriteRx) = mpsc::unbounded_channel();
    let connection = Arc::new(Connection::with_writer(peer.clone(), write_tx));

    let writer_handle = tokio::spawn(async move {
        while let Some(frame) = write_rx.recv().await {
            if writer.write_all(&frame).await.is_err() {
                break;
            }
        }
    });

    let mut frames = FrameBuffer::new(max_payload);
    let mut buf = [0u8; 4096];

    'read: loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => match frames.feed(&buf[..n]) {
                Ok(decoded) => {
                    for (opcode, payload) in decoded {
                        let packet = Packet::new(opcode, Arc::clone(&connection), payload);
                        if control_tx.send(ControlMessage::packet(channel, packet)).is_err() {
                            tracing::debug!(%peer, "engine gone, dropping connection");
                            break 'read;
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(%channel, %peer, error = %e, "protocol error, closing connection");
                    break;
                }
            },
            Err(_) => break,
        }
    }

    let _ = control_tx.send(ControlMessage::Disconnect {
        connection,
        channel,
    });

    writer_handle.abort();
    tracing::debug!(%channel, %peer, "connection ended");
}
