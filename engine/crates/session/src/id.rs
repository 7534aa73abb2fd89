/// Stable identity of a session entity.
///
/// Packs into a single `u64` as `(generation << 32) | index`. Generations
/// start at 1, so every issued id is non-zero and `0` stays free to mean
/// "not yet registered" on a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId {
    pub index: u32,
    pub generation: u32,
}

impl SessionId {
    /// Raw identity value of a connection that has no session yet.
    pub const UNASSIGNED: u64 = 0;

    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn to_u64(self) -> u64 {
        ((self.generation as u64) << 32) | (self.index as u64)
    }

    pub fn from_u64(val: u64) -> Self {
        Self {
            index: val as u32,
            generation: (val >> 32) as u32,
        }
    }

    /// Decode a raw connection identity, `None` when unassigned.
    pub fn from_identity(identity: u64) -> Option<Self> {
        if identity == Self::UNASSIGNED {
            None
        } else {
            Some(Self::from_u64(identity))
        }
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "S({}v{})", self.index, self.generation)
    }
}
