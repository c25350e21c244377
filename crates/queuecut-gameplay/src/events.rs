//! Event bus for gameplay notifications.
//!
//! The simulation publishes a [`GameEvent`] for every observable outcome so
//! that HUDs, loggers and replays can follow along without polling state.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::trace;

use queuecut_common::{EntityId, SlotIndex};

use crate::abilities::AbilityKind;
use crate::npc::NPCState;

/// Event types that can be sent through the event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// An NPC changed mood
    NPCStateChanged {
        /// NPC
        npc: EntityId,
        /// Previous state
        from: NPCState,
        /// New state
        to: NPCState,
    },
    /// The player was caught cutting
    PlayerCaught {
        /// Seconds until recovery
        cooldown: f32,
    },
    /// The catch cooldown elapsed
    CooldownFinished,
    /// The player slipped into the line
    PlayerInserted {
        /// Slot taken
        index: SlotIndex,
        /// NPCs pushed back
        displaced: usize,
    },
    /// The player stepped out of the line
    PlayerExited {
        /// Slot vacated (now the gap)
        index: SlotIndex,
    },
    /// The player changed slot while in line
    PlayerMoved {
        /// Previous slot
        from: SlotIndex,
        /// New slot
        to: SlotIndex,
    },
    /// The open gap changed
    GapChanged {
        /// New gap slot, if any
        index: Option<SlotIndex>,
        /// World position of the gap, if any
        position: Option<Vec3>,
    },
    /// A queue-wide distraction window opened
    GlobalDistractionStarted {
        /// Window length in seconds
        duration: f32,
    },
    /// A queue-wide distraction window closed
    GlobalDistractionEnded,
    /// A distraction ability went off
    AbilityUsed {
        /// Which ability
        ability: AbilityKind,
        /// NPCs affected
        affected: usize,
    },
}

/// Events held before the oldest unread ones start getting dropped.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Outbox of [`GameEvent`]s between ticks.
///
/// The simulation publishes from inside `tick` without ever blocking; the
/// frontend drains once per frame. When nobody drains, new events are
/// discarded and counted instead of growing the backlog.
#[derive(Debug)]
pub struct EventBus {
    outbox: Sender<GameEvent>,
    inbox: Receiver<GameEvent>,
    dropped: AtomicUsize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventBus {
    /// Creates a bus holding at most `capacity` undrained events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (outbox, inbox) = bounded(capacity.max(1));
        Self {
            outbox,
            inbox,
            dropped: AtomicUsize::new(0),
        }
    }

    /// Queues `event` for the next drain, or drops it if the backlog is full.
    pub fn publish(&self, event: GameEvent) {
        if let Err(TrySendError::Full(event) | TrySendError::Disconnected(event)) =
            self.outbox.try_send(event)
        {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            trace!("Event backlog full, dropped {:?}", event);
        }
    }

    /// Takes every undrained event, oldest first.
    pub fn drain(&self) -> Vec<GameEvent> {
        self.inbox.try_iter().collect()
    }

    /// Events waiting to be drained.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inbox.len()
    }

    /// Events discarded so far because the backlog was full.
    #[must_use]
    pub fn dropped_count(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_and_drain() {
        let bus = EventBus::new(8);
        bus.publish(GameEvent::CooldownFinished);
        bus.publish(GameEvent::PlayerExited { index: 2 });

        assert_eq!(bus.pending_count(), 2);
        let events = bus.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], GameEvent::PlayerExited { index: 2 });
        assert_eq!(bus.pending_count(), 0);
    }

    #[test]
    fn test_full_backlog_drops_newest() {
        let bus = EventBus::new(1);
        bus.publish(GameEvent::CooldownFinished);
        bus.publish(GameEvent::GlobalDistractionEnded);
        bus.publish(GameEvent::PlayerCaught { cooldown: 15.0 });

        assert_eq!(bus.dropped_count(), 2);
        assert_eq!(bus.drain(), vec![GameEvent::CooldownFinished]);

        bus.publish(GameEvent::GlobalDistractionEnded);
        assert_eq!(bus.drain(), vec![GameEvent::GlobalDistractionEnded]);
        assert_eq!(bus.dropped_count(), 2);
    }

    #[test]
    fn test_zero_capacity_still_buffers() {
        let bus = EventBus::new(0);
        bus.publish(GameEvent::CooldownFinished);
        assert_eq!(bus.drain(), vec![GameEvent::CooldownFinished]);
    }
}
