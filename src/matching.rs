//! Matching - Price-time priority crossing step.
//!
//! One invocation consumes resting interest at the current top-of-book
//! price level against one incoming tradable. The book side re-enters this
//! in a loop: a single incoming order may sweep several resting entries
//! and, for market orders, several price levels.

use crate::arena::{Arena, ArenaIndex};
use crate::book_side::BookSide;
use crate::events::FillEvent;
use crate::price::Price;
use crate::product_book::Archive;
use crate::tradable::Tradable;

/// Fold a fill record into the accumulated set: records with the same
/// counterparty id and execution price sum their volumes and keep the
/// latest detail string.
pub(crate) fn merge_fill(fills: &mut Vec<FillEvent>, new: FillEvent) {
    match fills
        .iter_mut()
        .find(|f| f.id == new.id && f.price == new.price)
    {
        Some(existing) => {
            existing.volume += new.volume;
            existing.details = new.details;
        }
        None => fills.push(new),
    }
}

pub(crate) fn merge_all(fills: &mut Vec<FillEvent>, new: Vec<FillEvent>) {
    for f in new {
        merge_fill(fills, f);
    }
}

fn fill_for(t: &Tradable, price: Price, volume: u32, remainder: u32) -> FillEvent {
    FillEvent {
        user: t.user().to_string(),
        product: t.product().to_string(),
        price,
        volume,
        details: format!("leaving {remainder}"),
        side: t.side(),
        id: t.id(),
    }
}

/// Walk the resting side's best price level in FIFO order, filling against
/// the incoming tradable until one of them is exhausted.
///
/// Execution price is the resting entry's price, unless the resting entry
/// is itself market-priced, in which case the incoming price sets the
/// print. Fully filled resting entries are removed from the level and
/// archived; a fully filled incoming tradable is the caller's to archive.
/// The level is dropped from the side's index once it empties.
pub(crate) fn match_at_top(
    resting: &mut BookSide,
    arena: &mut Arena,
    archive: &mut Archive,
    incoming: ArenaIndex,
    fills: &mut Vec<FillEvent>,
) {
    let Some(top_price) = resting.top_of_book_price() else {
        return;
    };
    let queue: Vec<ArenaIndex> = resting
        .entries_at(top_price)
        .map(|level| level.entries().to_vec())
        .unwrap_or_default();

    for resting_idx in queue {
        let incoming_rem = arena.get(incoming).remaining_volume();
        if incoming_rem == 0 {
            break;
        }
        let resting_t = arena.get(resting_idx);
        let resting_rem = resting_t.remaining_volume();
        let exec_price = if resting_t.price().is_market() {
            arena.get(incoming).price()
        } else {
            resting_t.price()
        };

        if incoming_rem >= resting_rem {
            // Resting entry fully filled; it leaves the book.
            let qty = resting_rem;
            let remainder = incoming_rem - qty;
            merge_fill(fills, fill_for(arena.get(resting_idx), exec_price, qty, 0));
            merge_fill(fills, fill_for(arena.get(incoming), exec_price, qty, remainder));
            arena.get_mut(resting_idx).fill(qty);
            arena.get_mut(incoming).fill(qty);
            resting.remove_entry(arena, resting_idx);
            archive.insert(arena, resting_idx);
        } else {
            // Incoming exhausted; resting entry stays with a reduced remainder.
            let qty = incoming_rem;
            let remainder = resting_rem - qty;
            merge_fill(fills, fill_for(arena.get(resting_idx), exec_price, qty, remainder));
            merge_fill(fills, fill_for(arena.get(incoming), exec_price, qty, 0));
            arena.get_mut(resting_idx).fill(qty);
            arena.get_mut(incoming).fill(qty);
        }
    }

    resting.clear_if_empty(top_price);
}
