//! Arena - Single source of truth for every tradable the book has seen.
//!
//! Price levels, id maps, and the archive all hold `ArenaIndex` handles into
//! this slab rather than duplicate copies, so one tradable is mutated in
//! place and every view stays consistent. The slab is append-only: a fully
//! resolved tradable stays addressable for the too-late-to-cancel lookup
//! instead of being freed.

use crate::tradable::Tradable;

/// Compressed handle into the arena. u32 keeps level queues and maps small.
pub type ArenaIndex = u32;

/// Append-only slab of tradables.
#[derive(Debug, Default)]
pub struct Arena {
    slots: Vec<Tradable>,
}

impl Arena {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Pre-allocate room for `capacity` tradables.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
        }
    }

    /// Store a tradable, returning its handle.
    #[inline]
    pub fn insert(&mut self, tradable: Tradable) -> ArenaIndex {
        let index = self.slots.len() as ArenaIndex;
        self.slots.push(tradable);
        index
    }

    #[inline]
    pub fn get(&self, index: ArenaIndex) -> &Tradable {
        &self.slots[index as usize]
    }

    #[inline]
    pub fn get_mut(&mut self, index: ArenaIndex) -> &mut Tradable {
        &mut self.slots[index as usize]
    }

    /// Number of tradables ever stored.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
