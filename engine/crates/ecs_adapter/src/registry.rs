use std::collections::HashMap;
use std::sync::Arc;

use bevy_ecs::prelude::*;
use net::{Connection, Packet};
use session::{IdStatus, SessionAllocator, SessionId};

use crate::components::SessionComponent;
use crate::error::RegistryError;

/// Maps stable SessionIds to bevy's internal Entity.
#[derive(Debug, Default)]
struct EntityMapping {
    to_bevy: HashMap<SessionId, Entity>,
}

impl EntityMapping {
    fn insert(&mut self, id: SessionId, bevy: Entity) {
        self.to_bevy.insert(id, bevy);
    }

    fn remove(&mut self, id: &SessionId) -> Option<Entity> {
        self.to_bevy.remove(id)
    }

    fn get_bevy(&self, id: &SessionId) -> Option<Entity> {
        self.to_bevy.get(id).copied()
    }
}

/// Session store backed by a bevy `World`.
///
/// Only the simulation thread owns this; every identity assignment and every
/// session creation or removal happens through it.
pub struct SessionRegistry {
    world: World,
    mapping: EntityMapping,
    allocator: SessionAllocator,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            world: World::new(),
            mapping: EntityMapping::default(),
            allocator: SessionAllocator::new(),
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable world access for running schedules and inserting resources.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Find the session for `connection`, registering it on first sight.
    ///
    /// # Panics
    ///
    /// A non-zero identity this registry never issued, or a live session
    /// lacking the `C` component, means the identity mapping is corrupt.
    /// Continuing could route one peer's packets into another's session.
    pub fn resolve_or_create<C: SessionComponent>(&mut self, connection: &Arc<Connection>) -> SessionId {
        if let Some(id) = connection.session_id() {
            match self.allocator.status(id) {
                IdStatus::Alive => {
                    let has_component = self
                        .mapping
                        .get_bevy(&id)
                        .is_some_and(|entity| self.world.get::<C>(entity).is_some());
                    if !has_component {
                        panic!(
                            "session {} on {} has no {} connection component",
                            id,
                            connection.peer(),
                            C::CHANNEL
                        );
                    }
                    return id;
                }
                IdStatus::Stale => {
                    tracing::warn!(
                        session = %id,
                        peer = connection.peer(),
                        channel = %C::CHANNEL,
                        "packet for destroyed session, registering again"
                    );
                }
                IdStatus::Unknown => {
                    panic!(
                        "corrupt session identity {:#x} on {} ({} channel)",
                        id.to_u64(),
                        connection.peer(),
                        C::CHANNEL
                    );
                }
            }
        }

        let id = self.allocator.allocate();
        let entity = self.world.spawn(C::new(Arc::clone(connection))).id();
        self.mapping.insert(id, entity);
        connection.set_identity(id);
        tracing::debug!(session = %id, peer = connection.peer(), channel = %C::CHANNEL, "session created");
        id
    }

    /// Route a packet into its session's queue, creating the session if needed.
    /// Returns the session and its queue length after the push.
    pub fn route<C: SessionComponent>(&mut self, packet: Packet) -> (SessionId, usize) {
        let id = self.resolve_or_create::<C>(packet.connection());
        match self.component::<C>(id) {
            Some(component) => {
                component.packets().push(packet);
                (id, component.packets().len())
            }
            None => panic!("session {} vanished while routing", id),
        }
    }

    /// Remove a session and its connection component. Queued packets are
    /// dropped without reaching a handler; the count is returned.
    pub fn destroy_session<C: SessionComponent>(&mut self, id: SessionId) -> Result<usize, RegistryError> {
        match self.allocator.status(id) {
            IdStatus::Alive => {}
            IdStatus::Stale => return Err(RegistryError::StaleSession(id)),
            IdStatus::Unknown => return Err(RegistryError::SessionNotFound(id)),
        }
        let entity = self
            .mapping
            .get_bevy(&id)
            .ok_or(RegistryError::SessionNotFound(id))?;
        let dropped = self
            .world
            .get::<C>(entity)
            .ok_or(RegistryError::ChannelMismatch {
                id,
                channel: C::CHANNEL,
            })?
            .packets()
            .clear();

        self.mapping.remove(&id);
        self.world.despawn(entity);
        self.allocator.deallocate(id);
        tracing::debug!(session = %id, channel = %C::CHANNEL, dropped, "session destroyed");
        Ok(dropped)
    }

    pub fn component<C: SessionComponent>(&self, id: SessionId) -> Option<&C> {
        let entity = self.mapping.get_bevy(&id)?;
        self.world.get::<C>(entity)
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.allocator.is_alive(id)
    }

    /// Live sessions on the `C` channel (sorted for determinism).
    pub fn sessions<C: SessionComponent>(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self
            .mapping
            .to_bevy
            .iter()
            .filter(|(_, entity)| self.world.get::<C>(**entity).is_some())
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    pub fn session_count<C: SessionComponent>(&self) -> usize {
        self.mapping
            .to_bevy
            .values()
            .filter(|entity| self.world.get::<C>(**entity).is_some())
            .count()
    }

    /// Number of live sessions across both channels.
    pub fn len(&self) -> usize {
        self.allocator.alive_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
