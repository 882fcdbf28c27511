//! Shared world handle for concurrent readers with atomic replacement.
use std::sync::{Arc, RwLock};

use crate::world::WorldState;

/// A world slot readers clone out of and regeneration swaps into.
///
/// Readers hold an `Arc` to a consistent world; a replacement never tears a
/// query that started against the previous one.
#[derive(Debug)]
pub struct SharedWorld {
    slot: RwLock<Arc<WorldState>>,
}

impl SharedWorld {
    pub fn new(world: WorldState) -> Self {
        Self {
            slot: RwLock::new(Arc::new(world)),
        }
    }

    /// Snapshot handle to the current world.
    pub fn read(&self) -> Arc<WorldState> {
        match self.slot.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Install a new world; readers in flight keep the old one.
    pub fn replace(&self, world: WorldState) {
        let next = Arc::new(world);
        match self.slot.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    /// Mutate the current world in place when no other handle is held.
    ///
    /// Falls back to clone-and-swap if readers still hold the old world.
    pub fn update(&self, f: impl FnOnce(&mut WorldState)) {
        let mut guard = match self.slot.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(world) = Arc::get_mut(&mut guard) {
            f(world);
        } else {
            let mut world = (**guard).clone();
            f(&mut world);
            *guard = Arc::new(world);
        }
    }
}
