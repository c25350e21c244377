//! Presentation sink for headless runs.
//!
//! There is nothing to draw, so intents go to the log and sounds are tallied
//! for the run summary.

use glam::Vec3;
use queuecut_common::EntityId;
use queuecut_gameplay::{NPCState, Pose, PresentationSink, SoundCue};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Logs presentation intents instead of rendering them.
#[derive(Debug, Default)]
pub struct LogSink {
    sounds: BTreeMap<String, u32>,
}

impl LogSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// How often each sound was played.
    #[must_use]
    pub fn sound_counts(&self) -> &BTreeMap<String, u32> {
        &self.sounds
    }
}

impl PresentationSink for LogSink {
    fn set_pose(&mut self, entity: EntityId, pose: Pose) {
        trace!("{} pose -> {}", entity, pose.name());
    }

    fn set_indicator(&mut self, entity: EntityId, state: NPCState) {
        trace!("{} indicator -> {}", entity, state.tag());
    }

    fn set_position(&mut self, _entity: EntityId, _position: Vec3) {}

    fn emit_sound(&mut self, cue: SoundCue) {
        debug!("Sound: {:?}", cue);
        *self.sounds.entry(format!("{cue:?}")).or_default() += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sounds_are_counted() {
        let mut sink = LogSink::new();
        sink.emit_sound(SoundCue::Boo);
        sink.emit_sound(SoundCue::Boo);
        sink.emit_sound(SoundCue::Whistle);
        sink.set_pose(EntityId::from_raw(2), Pose::Walk);

        assert_eq!(sink.sound_counts().get("Boo"), Some(&2));
        assert_eq!(sink.sound_counts().get("Whistle"), Some(&1));
        assert_eq!(sink.sound_counts().get("Bomb"), None);
    }
}
