//! Narrow interface to the presentation layer.
//!
//! The core never reads from rendering, animation or audio. It pushes
//! intents through a [`PresentationSink`] unconditionally and the collaborator
//! decides how (or whether) to show them.

use glam::Vec3;
use queuecut_common::EntityId;
use serde::{Deserialize, Serialize};

use crate::movement::Pose;
use crate::npc::NPCState;

/// One-shot sounds the core asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundCue {
    /// Crowd booing after a catch
    Boo,
    /// Distraction bomb going off
    Bomb,
    /// Embarrassing noise
    Embarrassing,
    /// Loud whistle
    Whistle,
}

/// Receiver of presentation intents.
pub trait PresentationSink {
    /// Requests a pose for an entity.
    fn set_pose(&mut self, entity: EntityId, pose: Pose);
    /// Announces an NPC's new state so its indicator can update.
    fn set_indicator(&mut self, entity: EntityId, state: NPCState);
    /// Writes an entity's world position to its transform.
    fn set_position(&mut self, entity: EntityId, position: Vec3);
    /// Plays a sound.
    fn emit_sound(&mut self, cue: SoundCue);
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl PresentationSink for NullSink {
    fn set_pose(&mut self, _entity: EntityId, _pose: Pose) {}
    fn set_indicator(&mut self, _entity: EntityId, _state: NPCState) {}
    fn set_position(&mut self, _entity: EntityId, _position: Vec3) {}
    fn emit_sound(&mut self, _cue: SoundCue) {}
}

/// A call received by a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum PresentationCall {
    /// `set_pose`
    Pose(EntityId, Pose),
    /// `set_indicator`
    Indicator(EntityId, NPCState),
    /// `set_position`
    Position(EntityId, Vec3),
    /// `emit_sound`
    Sound(SoundCue),
}

/// Sink that records every call, for tests and replays.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    calls: Vec<PresentationCall>,
}

impl RecordingSink {
    /// Creates an empty recording.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All calls so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> &[PresentationCall] {
        &self.calls
    }

    /// Drops the recording.
    pub fn clear(&mut self) {
        self.calls.clear();
    }

    /// Sounds emitted so far.
    #[must_use]
    pub fn sounds(&self) -> Vec<SoundCue> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                PresentationCall::Sound(cue) => Some(*cue),
                _ => None,
            })
            .collect()
    }

    /// Last pose requested for `entity`.
    #[must_use]
    pub fn last_pose(&self, entity: EntityId) -> Option<Pose> {
        self.calls.iter().rev().find_map(|call| match call {
            PresentationCall::Pose(id, pose) if *id == entity => Some(*pose),
            _ => None,
        })
    }
}

impl PresentationSink for RecordingSink {
    fn set_pose(&mut self, entity: EntityId, pose: Pose) {
        self.calls.push(PresentationCall::Pose(entity, pose));
    }

    fn set_indicator(&mut self, entity: EntityId, state: NPCState) {
        self.calls.push(PresentationCall::Indicator(entity, state));
    }

    fn set_position(&mut self, entity: EntityId, position: Vec3) {
        self.calls.push(PresentationCall::Position(entity, position));
    }

    fn emit_sound(&mut self, cue: SoundCue) {
        self.calls.push(PresentationCall::Sound(cue));
    }
}
