//! NPC data and the slot-keyed roster that owns them.
//!
//! The roster keeps two views of the same NPCs: a map by entity id, and an
//! ordered map from queue slot to entity id. Reindexing a run of the queue
//! touches only the affected slots, and iterating the slot map always yields
//! NPCs front to back.

use glam::Vec3;
use queuecut_common::{EntityId, SlotIndex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::movement::{Pose, QueueMove};

/// Error types for roster operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NPCError {
    /// NPC not found
    #[error("NPC not found: {0}")]
    NotFound(EntityId),
    /// NPC already registered
    #[error("NPC already registered: {0}")]
    AlreadyRegistered(EntityId),
    /// Another NPC already stands in the slot
    #[error("queue slot {0} is already taken")]
    SlotTaken(SlotIndex),
}

/// Result type for roster operations.
pub type NPCResult<T> = Result<T, NPCError>;

/// What an NPC is doing in the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NPCRole {
    /// Standing in the line, holds a slot
    Queue,
    /// Milling about, never holds a slot
    Wandering,
}

/// Observable mood of an NPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NPCState {
    /// Watching the line; spots the player
    #[default]
    Alert,
    /// Not paying attention; cutting past is safe
    Distracted,
    /// Caught someone cutting
    Angry,
}

impl NPCState {
    /// Short tag the presentation layer maps to an icon.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            NPCState::Alert => "alert",
            NPCState::Distracted => "distracted",
            NPCState::Angry => "angry",
        }
    }

    /// Picks Alert or Distracted with equal odds.
    #[must_use]
    pub fn random_calm(rng: &mut fastrand::Rng) -> Self {
        if rng.bool() {
            NPCState::Alert
        } else {
            NPCState::Distracted
        }
    }
}

/// A single non-player character.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NPC {
    /// Entity id
    pub id: EntityId,
    /// Queue member or wanderer
    pub role: NPCRole,
    /// Slot held in the line (queue role only)
    pub queue_index: Option<SlotIndex>,
    /// Current mood
    pub state: NPCState,
    /// Free-running clock for the personal cycle, in seconds
    pub personal_timer: f32,
    /// Remaining externally forced distraction, in milliseconds
    pub forced_distraction_ms: Option<f32>,
    /// Current world position
    pub position: Vec3,
    /// Animated transition between slots
    pub movement: QueueMove,
    /// Pose last requested from the presentation layer
    pub pose: Pose,
}

impl NPC {
    /// Creates an NPC resting at `position`.
    #[must_use]
    pub fn new(id: EntityId, role: NPCRole, position: Vec3, personal_timer: f32) -> Self {
        Self {
            id,
            role,
            queue_index: None,
            state: NPCState::default(),
            personal_timer,
            forced_distraction_ms: None,
            position,
            movement: QueueMove::settled(position),
            pose: Pose::Idle,
        }
    }

    /// Whether this NPC stands in the line.
    #[must_use]
    pub fn is_queued(&self) -> bool {
        self.role == NPCRole::Queue
    }

    /// Whether the NPC is currently distracted.
    #[must_use]
    pub fn is_distracted(&self) -> bool {
        self.state == NPCState::Distracted
    }

    /// Returns distance to a position.
    #[must_use]
    pub fn distance_to(&self, pos: Vec3) -> f32 {
        self.position.distance(pos)
    }
}

/// Owns every NPC, keyed by id and by queue slot.
#[derive(Debug, Default, Clone)]
pub struct NPCRoster {
    npcs: BTreeMap<EntityId, NPC>,
    slots: BTreeMap<SlotIndex, EntityId>,
}

impl NPCRoster {
    /// Creates an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of NPCs of any role.
    #[must_use]
    pub fn len(&self) -> usize {
        self.npcs.len()
    }

    /// Returns whether there are no NPCs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.npcs.is_empty()
    }

    /// Number of NPCs holding a slot.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.slots.len()
    }

    /// Registers an NPC in the given slot.
    pub fn add_queued(&mut self, mut npc: NPC, index: SlotIndex) -> NPCResult<()> {
        if self.npcs.contains_key(&npc.id) {
            return Err(NPCError::AlreadyRegistered(npc.id));
        }
        if self.slots.contains_key(&index) {
            return Err(NPCError::SlotTaken(index));
        }
        npc.role = NPCRole::Queue;
        npc.queue_index = Some(index);
        self.slots.insert(index, npc.id);
        self.npcs.insert(npc.id, npc);
        Ok(())
    }

    /// Registers an NPC that does not stand in line.
    pub fn add_wanderer(&mut self, mut npc: NPC) -> NPCResult<()> {
        if self.npcs.contains_key(&npc.id) {
            return Err(NPCError::AlreadyRegistered(npc.id));
        }
        npc.role = NPCRole::Wandering;
        npc.queue_index = None;
        self.npcs.insert(npc.id, npc);
        Ok(())
    }

    /// Removes an NPC, freeing its slot without closing the hole.
    pub fn remove(&mut self, id: EntityId) -> NPCResult<NPC> {
        let npc = self.npcs.remove(&id).ok_or(NPCError::NotFound(id))?;
        if let Some(index) = npc.queue_index {
            self.slots.remove(&index);
        }
        Ok(npc)
    }

    /// Gets an NPC.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&NPC> {
        self.npcs.get(&id)
    }

    /// Gets a mutable NPC.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut NPC> {
        self.npcs.get_mut(&id)
    }

    /// The NPC holding `index`, if any.
    #[must_use]
    pub fn at_slot(&self, index: SlotIndex) -> Option<&NPC> {
        self.slots.get(&index).and_then(|id| self.npcs.get(id))
    }

    /// The NPC holding `index - 1`. Slot 0 has nobody ahead of it.
    #[must_use]
    pub fn ahead_of(&self, index: SlotIndex) -> Option<&NPC> {
        index.checked_sub(1).and_then(|ahead| self.at_slot(ahead))
    }

    /// Iterates all NPCs in id order.
    pub fn iter(&self) -> impl Iterator<Item = &NPC> {
        self.npcs.values()
    }

    /// Iterates all NPCs mutably in id order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut NPC> {
        self.npcs.values_mut()
    }

    /// Iterates queue NPCs front to back.
    pub fn queue_in_order(&self) -> impl Iterator<Item = &NPC> {
        self.slots.values().filter_map(|id| self.npcs.get(id))
    }

    /// Moves every NPC at `from` or beyond one slot back.
    ///
    /// Returns the moved NPCs with their new slots, front to back.
    pub fn shift_back_from(&mut self, from: SlotIndex) -> Vec<(EntityId, SlotIndex)> {
        let tail = self.slots.split_off(&from);
        self.reinsert(tail, |index| index + 1)
    }

    /// Moves every NPC beyond `vacated` one slot forward.
    ///
    /// `vacated` itself must not be held by an NPC.
    pub fn shift_forward_after(&mut self, vacated: SlotIndex) -> Vec<(EntityId, SlotIndex)> {
        debug_assert!(!self.slots.contains_key(&vacated));
        let tail = self.slots.split_off(&(vacated + 1));
        self.reinsert(tail, |index| index - 1)
    }

    fn reinsert(
        &mut self,
        tail: BTreeMap<SlotIndex, EntityId>,
        remap: impl Fn(SlotIndex) -> SlotIndex,
    ) -> Vec<(EntityId, SlotIndex)> {
        let mut moved = Vec::with_capacity(tail.len());
        for (index, id) in tail {
            let new_index = remap(index);
            self.slots.insert(new_index, id);
            if let Some(npc) = self.npcs.get_mut(&id) {
                npc.queue_index = Some(new_index);
            }
            moved.push((id, new_index));
        }
        moved
    }

    /// Queue NPC whose live position is closest to `pos`.
    #[must_use]
    pub fn nearest_queued(&self, pos: Vec3) -> Option<(&NPC, f32)> {
        self.queue_in_order()
            .map(|npc| (npc, npc.distance_to(pos)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Ids of NPCs within `radius` of `pos`.
    #[must_use]
    pub fn ids_within(&self, pos: Vec3, radius: f32) -> Vec<EntityId> {
        self.iter()
            .filter(|npc| npc.distance_to(pos) <= radius)
            .map(|npc| npc.id)
            .collect()
    }

    /// Whether any NPC holds the slot.
    #[must_use]
    pub fn is_held(&self, index: SlotIndex) -> bool {
        self.slots.contains_key(&index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queued(raw: u64) -> NPC {
        NPC::new(EntityId::from_raw(raw), NPCRole::Queue, Vec3::ZERO, 0.0)
    }

    fn roster_of(count: u64) -> NPCRoster {
        let mut roster = NPCRoster::new();
        for i in 0..count {
            roster
                .add_queued(queued(i + 1), i as SlotIndex)
                .expect("slot should be free");
        }
        roster
    }

    #[test]
    fn test_state_tags() {
        assert_eq!(NPCState::Alert.tag(), "alert");
        assert_eq!(NPCState::Distracted.tag(), "distracted");
        assert_eq!(NPCState::Angry.tag(), "angry");
        assert_eq!(NPCState::default(), NPCState::Alert);
    }

    #[test]
    fn test_random_calm_never_angry() {
        let mut rng = fastrand::Rng::with_seed(3);
        for _ in 0..100 {
            assert_ne!(NPCState::random_calm(&mut rng), NPCState::Angry);
        }
    }

    #[test]
    fn test_roster_add_and_lookup() {
        let roster = roster_of(3);
        assert_eq!(roster.len(), 3);
        assert_eq!(roster.queue_len(), 3);
        assert!(roster.at_slot(3).is_none());
        let npc = roster.at_slot(1).expect("slot 1 held");
        assert_eq!(npc.id, EntityId::from_raw(2));
        assert!(roster.ahead_of(0).is_none());
        assert_eq!(roster.ahead_of(1).map(|n| n.id), Some(EntityId::from_raw(1)));
    }

    #[test]
    fn test_roster_rejects_duplicates() {
        let mut roster = roster_of(2);
        assert_eq!(
            roster.add_queued(queued(1), 5),
            Err(NPCError::AlreadyRegistered(EntityId::from_raw(1)))
        );
        assert_eq!(roster.add_queued(queued(9), 1), Err(NPCError::SlotTaken(1)));
    }

    #[test]
    fn test_wanderer_holds_no_slot() {
        let mut roster = roster_of(2);
        let wanderer = NPC::new(EntityId::from_raw(50), NPCRole::Queue, Vec3::ONE, 0.0);
        roster.add_wanderer(wanderer).expect("new id");
        let stored = roster.get(EntityId::from_raw(50)).expect("registered");
        assert_eq!(stored.role, NPCRole::Wandering);
        assert!(stored.queue_index.is_none());
        assert_eq!(roster.queue_len(), 2);
    }

    #[test]
    fn test_shift_back_from() {
        let mut roster = roster_of(5);
        let moved = roster.shift_back_from(2);

        assert_eq!(moved.len(), 3);
        assert_eq!(moved[0], (EntityId::from_raw(3), 3));
        assert!(!roster.is_held(2));
        let held: Vec<_> = roster.queue_in_order().filter_map(|n| n.queue_index).collect();
        assert_eq!(held, vec![0, 1, 3, 4, 5]);
        let npc = roster.get(EntityId::from_raw(5)).expect("exists");
        assert_eq!(npc.queue_index, Some(5));
    }

    #[test]
    fn test_shift_forward_after() {
        let mut roster = roster_of(5);
        roster.shift_back_from(2);
        let moved = roster.shift_forward_after(2);

        assert_eq!(moved.len(), 3);
        let held: Vec<_> = roster.queue_in_order().filter_map(|n| n.queue_index).collect();
        assert_eq!(held, vec![0, 1, 2, 3, 4]);
        let order: Vec<_> = roster.queue_in_order().map(|n| n.id.raw()).collect();
        assert_eq!(order, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_remove_frees_slot() {
        let mut roster = roster_of(3);
        let npc = roster.remove(EntityId::from_raw(2)).expect("exists");
        assert_eq!(npc.queue_index, Some(1));
        assert!(!roster.is_held(1));
        assert_eq!(
            roster.remove(EntityId::from_raw(2)).map(|n| n.id),
            Err(NPCError::NotFound(EntityId::from_raw(2)))
        );
    }

    #[test]
    fn test_nearest_queued() {
        let mut roster = NPCRoster::new();
        for i in 0..3u64 {
            let npc = NPC::new(
                EntityId::from_raw(i + 1),
                NPCRole::Queue,
                Vec3::new(0.0, 0.0, i as f32 * 2.0),
                0.0,
            );
            roster.add_queued(npc, i as SlotIndex).expect("free");
        }
        let (npc, dist) = roster
            .nearest_queued(Vec3::new(0.5, 0.0, 3.9))
            .expect("queue not empty");
        assert_eq!(npc.queue_index, Some(2));
        assert!(dist < 1.0);
        assert_eq!(roster.ids_within(Vec3::ZERO, 2.5).len(), 2);
    }
}
