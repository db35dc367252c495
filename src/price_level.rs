//! Price Level - FIFO queue of tradables resting at a single price.
//!
//! Orders match in strict arrival order (price-time priority); there is no
//! other tie-break. A level exists only while non-empty: the owning book
//! side removes it as soon as the last entry leaves.

use crate::arena::{Arena, ArenaIndex};

/// Queue of arena handles at one price, oldest first.
#[derive(Clone, Debug, Default)]
pub struct PriceLevel {
    queue: Vec<ArenaIndex>,
}

impl PriceLevel {
    pub fn new() -> Self {
        Self { queue: Vec::new() }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Append a newly arrived tradable (lowest priority).
    #[inline]
    pub fn push_back(&mut self, index: ArenaIndex) {
        self.queue.push(index);
    }

    /// Oldest entry (next to match), if any.
    #[inline]
    pub fn front(&self) -> Option<ArenaIndex> {
        self.queue.first().copied()
    }

    /// Remove a specific entry, preserving arrival order of the rest.
    /// Returns true if the entry was present.
    pub fn remove(&mut self, index: ArenaIndex) -> bool {
        match self.queue.iter().position(|&i| i == index) {
            Some(pos) => {
                self.queue.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Entries in arrival order.
    #[inline]
    pub fn entries(&self) -> &[ArenaIndex] {
        &self.queue
    }

    /// Sum of remaining volumes across the level.
    pub fn remaining_volume(&self, arena: &Arena) -> u32 {
        self.queue
            .iter()
            .map(|&i| arena.get(i).remaining_volume())
            .sum()
    }
}
