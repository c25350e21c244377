//! The player entity.
//!
//! Holds the player's place in the world and in the line, plus the catch
//! flag and recovery timer. Free movement is accepted as-is while the player
//! is outside the queue; inside it, the queue owns the player's position.

use glam::Vec3;
use queuecut_common::{geometry::unit_or_forward, EntityId, SlotIndex};
use serde::{Deserialize, Serialize};

use crate::movement::{Pose, QueueMove};

/// Player state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    /// Entity id
    pub id: EntityId,
    /// Current world position
    pub position: Vec3,
    /// Unit vector the player is facing
    pub facing: Vec3,
    /// Slot held while in the queue
    pub queue_index: Option<SlotIndex>,
    /// Whether the player stands in line
    pub in_queue: bool,
    /// Whether the player has been caught cutting
    pub caught: bool,
    /// Seconds until the NPCs calm down again
    pub cooldown_remaining: f32,
    /// Animated transition into a slot
    pub movement: QueueMove,
    /// Pose last requested from the presentation layer
    pub pose: Pose,
}

impl Player {
    /// Creates a player standing at `position`, facing +Z.
    #[must_use]
    pub fn new(id: EntityId, position: Vec3) -> Self {
        Self {
            id,
            position,
            facing: Vec3::Z,
            queue_index: None,
            in_queue: false,
            caught: false,
            cooldown_remaining: 0.0,
            movement: QueueMove::settled(position),
            pose: Pose::Idle,
        }
    }

    /// Moves the player by `offset`. Ignored while in the queue.
    ///
    /// Returns whether the move was applied.
    pub fn translate(&mut self, offset: Vec3) -> bool {
        if self.in_queue {
            return false;
        }
        self.position += offset;
        if offset.x != 0.0 || offset.z != 0.0 {
            self.facing = unit_or_forward(Vec3::new(offset.x, 0.0, offset.z));
        }
        true
    }

    /// Places the player at `position`. Ignored while in the queue.
    pub fn place(&mut self, position: Vec3) -> bool {
        if self.in_queue {
            return false;
        }
        self.position = position;
        self.movement = QueueMove::settled(position);
        true
    }

    /// Turns the player to face `direction`.
    pub fn face(&mut self, direction: Vec3) {
        self.facing = unit_or_forward(direction);
    }
}
