use net::Channel;
use session::SessionId;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("stale session reference: {0} (already destroyed)")]
    StaleSession(SessionId),

    #[error("session {id} has no {channel} connection component")]
    ChannelMismatch { id: SessionId, channel: Channel },
}
