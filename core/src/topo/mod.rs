use serde::{Deserialize, Serialize};
use std::fmt;

pub mod generator;
pub use generator::IdGenerator;
pub mod registry;
pub use registry::EntityRegistry;

/// Identity of a body or part.
///
/// Issued once by an [`IdGenerator`] when the entity is built and never
/// reused while the generator lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl EntityId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
