#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("control queue closed")]
    Closed,

    #[error("simulation thread panicked")]
    ThreadPanicked,

    #[error("failed to spawn simulation thread: {0}")]
    Spawn(#[from] std::io::Error),
}
