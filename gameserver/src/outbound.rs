use std::sync::Arc;
use std::time::Duration;

use engine_core::EngineLoop;
use net::OutboundMessage;

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Log everything the simulation thread reports until it confirms exit.
/// Returns the number of `Print` messages seen.
pub async fn drain_outbound(engine: Arc<EngineLoop>) -> usize {
    let mut prints = 0;
    loop {
        while let Some(message) = engine.try_receive_message() {
            match message {
                OutboundMessage::SetupComplete => tracing::info!("simulation setup complete"),
                OutboundMessage::Print(text) => {
                    prints += 1;
                    tracing::info!(%text, "simulation");
                }
                OutboundMessage::ExitConfirmed => {
                    tracing::info!("simulation exit confirmed");
                    return prints;
                }
            }
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
