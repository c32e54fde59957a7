//! World-wide entity identifier allocation.

use shared::EntityId;
use std::collections::{HashSet, VecDeque};

/// Hands out identifiers that are unique among all live entities.
///
/// Fresh ids come from a monotonic counter; released ids go to the back of a
/// FIFO free list and are reused oldest-first, so an id that just appeared
/// in a deceased list is not immediately handed to a new entity.
#[derive(Debug, Clone)]
pub struct EntityRegistry {
    next_id: EntityId,
    free: VecDeque<EntityId>,
    live: HashSet<EntityId>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            free: VecDeque::new(),
            live: HashSet::new(),
        }
    }

    /// Returns an id not currently in use.
    pub fn allocate(&mut self) -> EntityId {
        let id = match self.free.pop_front() {
            Some(id) => id,
            None if self.next_id < EntityId::MAX => {
                let id = self.next_id;
                self.next_id += 1;
                id
            }
            None => self.first_unused(),
        };
        self.live.insert(id);
        id
    }

    /// Marks `id` as free. Releasing an unknown id does nothing.
    pub fn release(&mut self, id: EntityId) -> bool {
        if self.live.remove(&id) {
            self.free.push_back(id);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.live.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    fn first_unused(&self) -> EntityId {
        (1..EntityId::MAX)
            .find(|id| !self.live.contains(id))
            .unwrap_or(EntityId::MAX)
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
