//! Deferred player and ability commands.
//!
//! Input collaborators push commands at any time; the simulation drains them
//! inside the next tick, after detection and before movement is interpolated.

use queuecut_common::{EntityId, SlotIndex};
use serde::{Deserialize, Serialize};

use crate::abilities::{AbilityKind, AbilityResult};
use crate::insertion::{InsertionResult, SlotChange};

/// A single command for the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Cut into the line at a slot, or behind the nearest NPC
    Insert {
        /// Requested slot
        index: Option<SlotIndex>,
    },
    /// Step out of the line
    Exit,
    /// Change slot while in line
    MoveTo {
        /// Slot after the move
        index: SlotIndex,
    },
    /// Force some NPCs distracted
    ForceDistraction {
        /// NPCs to distract
        npcs: Vec<EntityId>,
        /// Milliseconds the distraction lasts
        duration_ms: f32,
    },
    /// Open a global distraction window now
    ForceGlobalDistraction {
        /// Seconds the window stays open
        duration: f32,
    },
    /// Fire an ability
    UseAbility {
        /// Ability to fire
        ability: AbilityKind,
    },
}

/// What applying a command produced.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    /// Result of an insertion
    Insert(InsertionResult<SlotChange>),
    /// Result of an exit
    Exit(InsertionResult<SlotChange>),
    /// Result of a move within the line
    MoveTo(InsertionResult<SlotChange>),
    /// Number of NPCs distracted
    Distracted(usize),
    /// A global window was opened
    GlobalDistraction,
    /// Result of an ability
    Ability(AbilityResult<usize>),
}

impl CommandOutcome {
    /// Whether the command did what was asked.
    #[must_use]
    pub fn is_success(&self) -> bool {
        match self {
            Self::Insert(result) | Self::Exit(result) | Self::MoveTo(result) => result.is_ok(),
            Self::Ability(result) => result.is_ok(),
            Self::Distracted(_) | Self::GlobalDistraction => true,
        }
    }
}

/// Commands waiting for the next tick, in submission order.
#[derive(Debug, Clone, Default)]
pub struct CommandQueue {
    pending: Vec<Command>,
}

impl CommandQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a command.
    pub fn push(&mut self, command: Command) {
        self.pending.push(command);
    }

    /// Takes every pending command.
    pub fn drain(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.pending)
    }

    /// Number of commands waiting.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drops every pending command.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abilities::AbilityError;
    use crate::insertion::InsertionError;

    #[test]
    fn test_drain_preserves_order() {
        let mut queue = CommandQueue::new();
        queue.push(Command::Insert { index: Some(2) });
        queue.push(Command::UseAbility {
            ability: AbilityKind::Bomb,
        });
        queue.push(Command::Exit);
        assert_eq!(queue.pending_count(), 3);

        let drained = queue.drain();
        assert_eq!(drained[0], Command::Insert { index: Some(2) });
        assert_eq!(drained[2], Command::Exit);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_outcome_success() {
        assert!(CommandOutcome::Distracted(0).is_success());
        assert!(!CommandOutcome::Exit(Err(InsertionError::NotInQueue)).is_success());
        assert!(!CommandOutcome::Ability(Err(AbilityError::OnCooldown {
            ability: AbilityKind::Sound,
            remaining_ms: 10.0,
        }))
        .is_success());
    }

    #[test]
    fn test_command_serializes() {
        let json = serde_json::to_string(&Command::MoveTo { index: 1 }).expect("serialize");
        let back: Command = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, Command::MoveTo { index: 1 });
    }
}
