pub mod config;
pub mod handlers;
pub mod outbound;
pub mod shutdown;
