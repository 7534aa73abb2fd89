use crate::id::SessionId;

/// Where an identity stands relative to the allocator's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdStatus {
    /// Issued and not yet released.
    Alive,
    /// Issued once, since released. The slot may have been reused.
    Stale,
    /// Never issued by this allocator.
    Unknown,
}

/// Generational index allocator for session identities.
#[derive(Debug, Clone)]
pub struct SessionAllocator {
    generations: Vec<u32>,
    alive: Vec<bool>,
    free_indices: Vec<u32>,
    next_index: u32,
}

impl SessionAllocator {
    pub fn new() -> Self {
        Self {
            generations: Vec::new(),
            alive: Vec::new(),
            free_indices: Vec::new(),
            next_index: 0,
        }
    }

    pub fn allocate(&mut self) -> SessionId {
        if let Some(index) = self.free_indices.pop() {
            let idx = index as usize;
            // generation 0 would make index 0 encode to the unassigned identity
            self.generations[idx] = self.generations[idx].wrapping_add(1).max(1);
            self.alive[idx] = true;
            SessionId::new(index, self.generations[idx])
        } else {
            let index = self.next_index;
            self.next_index += 1;
            self.generations.push(1);
            self.alive.push(true);
            SessionId::new(index, 1)
        }
    }

    pub fn deallocate(&mut self, id: SessionId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        self.alive[id.index as usize] = false;
        self.free_indices.push(id.index);
        true
    }

    pub fn is_alive(&self, id: SessionId) -> bool {
        self.status(id) == IdStatus::Alive
    }

    pub fn status(&self, id: SessionId) -> IdStatus {
        let idx = id.index as usize;
        if idx >= self.generations.len() || id.generation == 0 {
            return IdStatus::Unknown;
        }
        let current = self.generations[idx];
        if id.generation == current {
            if self.alive[idx] {
                IdStatus::Alive
            } else {
                IdStatus::Stale
            }
        } else if id.generation < current {
            IdStatus::Stale
        } else {
            IdStatus::Unknown
        }
    }

    pub fn alive_count(&self) -> usize {
        self.alive.iter().filter(|&&a| a).count()
    }
}

impl Default for SessionAllocator {
    fn default() -> Self {
        Self::new()
    }
}
