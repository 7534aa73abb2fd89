pub mod allocator;
pub mod id;

pub use allocator::{IdStatus, SessionAllocator};
pub use id::SessionId;
