pub mod dispatch;
pub mod engine;
pub mod error;
pub mod graph;
pub mod systems;
pub mod tick;
pub mod time;

pub use dispatch::{ClientDispatch, DispatchTable, InternalDispatch};
pub use engine::EngineLoop;
pub use error::EngineError;
pub use graph::TaskGraph;
pub use tick::{TickConfig, TickLoop, TickStatus};
pub use time::TickTime;
