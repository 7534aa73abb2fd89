#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("unknown opcode: {0}")]
    UnknownOpcode(u16),

    #[error("payload too large: {len} bytes (max {max})")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
