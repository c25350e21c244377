//! Entering, leaving and moving within the line.
//!
//! Every operation validates all of its preconditions before touching any
//! state, then applies the whole reindex in one go. No caller can observe a
//! half-shifted queue.

use queuecut_common::{EntityId, SlotIndex};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info};

use crate::context::SimContext;
use crate::detection::DetectionEngine;
use crate::events::GameEvent;
use crate::npc::{NPCRoster, NPC};
use crate::presentation::PresentationSink;

/// Reasons an insertion, exit or move is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InsertionError {
    /// No gap is open
    #[error("no gap is open")]
    NoGap,
    /// The requested slot is not the open gap
    #[error("slot {requested} is not the open gap ({gap})")]
    NotTheGap {
        /// Slot asked for
        requested: SlotIndex,
        /// Currently open gap
        gap: SlotIndex,
    },
    /// The player is too far from the requested slot
    #[error("player is too far from slot {0}")]
    OutOfRange(SlotIndex),
    /// The player is not close to any queue NPC
    #[error("player is not near the queue")]
    NotNearQueue,
    /// The slot lies beyond the end of the queue
    #[error("slot {index} is outside the queue (length {len})")]
    InvalidSlot {
        /// Slot asked for
        index: SlotIndex,
        /// Queue NPC count
        len: usize,
    },
    /// The player already stands in line
    #[error("player is already in the queue")]
    AlreadyInQueue,
    /// The player is not in line
    #[error("player is not in the queue")]
    NotInQueue,
    /// A catch is still being served
    #[error("player is still serving a catch")]
    Caught,
    /// A neighbour was watching; the player has been caught
    #[error("spotted by NPC {0}")]
    Spotted(EntityId),
}

/// Result type for queue operations.
pub type InsertionResult<T> = Result<T, InsertionError>;

/// Where the player ended up and who had to make room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotChange {
    /// Player's slot after the operation
    pub index: SlotIndex,
    /// NPCs whose slot changed, with their new slot
    pub shifted: Vec<(EntityId, SlotIndex)>,
}

/// Whether the player is in line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertionPhase {
    /// Outside the queue
    NotInQueue,
    /// Holding a slot
    InQueue(SlotIndex),
}

/// Checks that both neighbours of a prospective slot are distracted.
///
/// `occupant` is the NPC that would be pushed back, `ahead` the one that
/// would stand in front of the player. A missing neighbour is safe.
pub fn check_neighbours(
    occupant: Option<(EntityId, bool)>,
    ahead: Option<(EntityId, bool)>,
) -> Result<(), EntityId> {
    for (id, distracted) in [occupant, ahead].into_iter().flatten() {
        if !distracted {
            return Err(id);
        }
    }
    Ok(())
}

/// The NPC at `index` and the one ahead of it, with their distraction.
fn neighbours_of(
    roster: &NPCRoster,
    index: SlotIndex,
) -> (Option<(EntityId, bool)>, Option<(EntityId, bool)>) {
    let watch = |npc: &NPC| (npc.id, npc.is_distracted());
    (roster.at_slot(index).map(watch), roster.ahead_of(index).map(watch))
}

/// State machine for the player's place in the line.
#[derive(Debug, Clone, Copy, Default)]
pub struct InsertionProtocol;

impl InsertionProtocol {
    /// Creates the protocol.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Current phase, read from the player.
    #[must_use]
    pub fn phase<P: PresentationSink>(&self, ctx: &SimContext<P>) -> InsertionPhase {
        match (ctx.player.in_queue, ctx.player.queue_index) {
            (true, Some(index)) => InsertionPhase::InQueue(index),
            _ => InsertionPhase::NotInQueue,
        }
    }

    /// Cuts into the line.
    ///
    /// With `Some(index)` the slot must be the open gap and the player must
    /// be within range of it. With `None` the slot right behind the nearest
    /// queue NPC is used, provided the player is within range of that NPC.
    /// If a neighbour is watching, the player is caught.
    pub fn try_insert<P: PresentationSink>(
        &self,
        ctx: &mut SimContext<P>,
        detection: &DetectionEngine,
        target: Option<SlotIndex>,
    ) -> InsertionResult<SlotChange> {
        if ctx.player.in_queue {
            return Err(InsertionError::AlreadyInQueue);
        }
        if ctx.player.caught {
            return Err(InsertionError::Caught);
        }

        let position = ctx.player.position;
        let len = ctx.roster.queue_len();
        let index = match target {
            Some(index) => {
                let gap = ctx.queue.gap_index().ok_or(InsertionError::NoGap)?;
                if gap != index {
                    return Err(InsertionError::NotTheGap {
                        requested: index,
                        gap,
                    });
                }
                if index as usize > len {
                    return Err(InsertionError::InvalidSlot { index, len });
                }
                if !detection.is_near_slot(&ctx.queue, index, position) {
                    return Err(InsertionError::OutOfRange(index));
                }
                index
            },
            None => detection
                .nearest_slot(&ctx.roster, position)
                .ok_or(InsertionError::NotNearQueue)?,
        };

        let (occupant, ahead) = neighbours_of(&ctx.roster, index);
        if let Err(watcher) = check_neighbours(occupant, ahead) {
            debug!("Insertion at slot {} spotted by {}", index, watcher);
            detection.catch_player(ctx);
            return Err(InsertionError::Spotted(watcher));
        }

        let shifted = ctx.roster.shift_back_from(index);
        for &(id, new_index) in &shifted {
            ctx.order_npc_to_slot(id, new_index);
        }
        ctx.player.queue_index = Some(index);
        ctx.player.in_queue = true;
        ctx.order_player_to_slot(index);
        ctx.queue.clear_gap();
        ctx.announce_gap();
        ctx.events.publish(GameEvent::PlayerInserted {
            index,
            displaced: shifted.len(),
        });
        info!("Player cut into the line at slot {} ({} pushed back)", index, shifted.len());

        Ok(SlotChange { index, shifted })
    }

    /// Steps out of the line to its right-hand side.
    ///
    /// The player is placed directly, not animated. Everyone behind closes
    /// up and the vacated slot becomes the new gap.
    pub fn exit<P: PresentationSink>(&self, ctx: &mut SimContext<P>) -> InsertionResult<SlotChange> {
        let previous = match self.phase(ctx) {
            InsertionPhase::InQueue(index) => index,
            InsertionPhase::NotInQueue => return Err(InsertionError::NotInQueue),
        };

        let aside = ctx.player.position + ctx.queue.exit_offset();
        ctx.place_player(aside);
        ctx.player.in_queue = false;
        ctx.player.queue_index = None;

        let shifted = ctx.roster.shift_forward_after(previous);
        for &(id, new_index) in &shifted {
            ctx.order_npc_to_slot(id, new_index);
        }
        ctx.queue.set_gap(Some(previous));
        ctx.announce_gap();
        ctx.events.publish(GameEvent::PlayerExited { index: previous });
        info!("Player left the line from slot {}", previous);

        Ok(SlotChange {
            index: previous,
            shifted,
        })
    }

    /// Moves the player to `new_index` while already in line.
    ///
    /// `new_index` is the player's slot after the move and may range over
    /// `[0, queue length]`. The same neighbour check as insertion applies.
    pub fn move_to<P: PresentationSink>(
        &self,
        ctx: &mut SimContext<P>,
        detection: &DetectionEngine,
        new_index: SlotIndex,
    ) -> InsertionResult<SlotChange> {
        let current = match self.phase(ctx) {
            InsertionPhase::InQueue(index) => index,
            InsertionPhase::NotInQueue => return Err(InsertionError::NotInQueue),
        };
        if ctx.player.caught {
            return Err(InsertionError::Caught);
        }
        let len = ctx.roster.queue_len();
        if new_index as usize > len {
            return Err(InsertionError::InvalidSlot {
                index: new_index,
                len,
            });
        }
        if new_index == current {
            return Ok(SlotChange {
                index: current,
                shifted: Vec::new(),
            });
        }

        // Neighbours as they will stand once the player has left `current`.
        let closed_up = |slot: SlotIndex| if slot < current { slot } else { slot + 1 };
        let (occupant, ahead) = neighbours_of(&ctx.roster, closed_up(new_index));
        if let Err(watcher) = check_neighbours(occupant, ahead) {
            debug!("Move to slot {} spotted by {}", new_index, watcher);
            detection.catch_player(ctx);
            return Err(InsertionError::Spotted(watcher));
        }

        let before: BTreeMap<EntityId, Option<SlotIndex>> = ctx
            .roster
            .queue_in_order()
            .map(|npc| (npc.id, npc.queue_index))
            .collect();
        ctx.roster.shift_forward_after(current);
        ctx.roster.shift_back_from(new_index);

        let shifted: Vec<(EntityId, SlotIndex)> = ctx
            .roster
            .queue_in_order()
            .filter(|npc| before.get(&npc.id) != Some(&npc.queue_index))
            .filter_map(|npc| npc.queue_index.map(|index| (npc.id, index)))
            .collect();
        for &(id, index) in &shifted {
            ctx.order_npc_to_slot(id, index);
        }
        ctx.player.queue_index = Some(new_index);
        ctx.order_player_to_slot(new_index);
        ctx.events.publish(GameEvent::PlayerMoved {
            from: current,
            to: new_index,
        });
        info!("Player moved from slot {} to {}", current, new_index);

        Ok(SlotChange {
            index: new_index,
            shifted,
        })
    }
}
