pub mod components;
pub mod error;
pub mod registry;

pub use components::{ClientConnection, InternalConnection, SessionComponent};
pub use error::RegistryError;
pub use registry::SessionRegistry;

pub use bevy_ecs::component::Component;
