//! Proximity checks and the catch signal.

use glam::Vec3;
use queuecut_common::SlotIndex;
use tracing::{info, trace};

use crate::config::{CooldownSettings, DetectionSettings};
use crate::context::SimContext;
use crate::events::GameEvent;
use crate::npc::{NPCRoster, NPCState};
use crate::presentation::{PresentationSink, SoundCue};
use crate::queue::QueueModel;

/// Decides whether sneaking succeeds or fails.
#[derive(Debug, Clone)]
pub struct DetectionEngine {
    detection_range: f32,
    catch_radius: f32,
    cooldown_duration: f32,
}

impl DetectionEngine {
    /// Creates the engine.
    #[must_use]
    pub fn new(detection: &DetectionSettings, cooldown: &CooldownSettings) -> Self {
        Self {
            detection_range: detection.detection_range,
            catch_radius: detection.catch_radius,
            cooldown_duration: cooldown.duration,
        }
    }

    /// Distance within which the player counts as near a slot.
    #[must_use]
    pub fn detection_range(&self) -> f32 {
        self.detection_range
    }

    /// Whether `position` is within range of the open gap's slot.
    #[must_use]
    pub fn is_near_gap(&self, queue: &QueueModel, position: Vec3) -> bool {
        queue
            .gap_position()
            .is_some_and(|gap| gap.distance(position) < self.detection_range)
    }

    /// Whether `position` is within range of a slot's static position.
    #[must_use]
    pub fn is_near_slot(&self, queue: &QueueModel, index: SlotIndex, position: Vec3) -> bool {
        queue.position_for(index).distance(position) < self.detection_range
    }

    /// Whether any alert NPC stands within the catch radius of `position`.
    #[must_use]
    pub fn is_spotted_by_alert_npc(&self, roster: &NPCRoster, position: Vec3) -> bool {
        roster
            .iter()
            .any(|npc| npc.state == NPCState::Alert && npc.distance_to(position) < self.catch_radius)
    }

    /// Slot just behind the queue NPC nearest to `position`, judged by
    /// that NPC's live position.
    ///
    /// `None` when the queue is empty or the nearest NPC is out of range.
    #[must_use]
    pub fn nearest_slot(&self, roster: &NPCRoster, position: Vec3) -> Option<SlotIndex> {
        let (npc, distance) = roster.nearest_queued(position)?;
        if distance >= self.detection_range {
            return None;
        }
        npc.queue_index.map(|index| index + 1)
    }

    /// Per-tick check: a player lurking at the gap in view of an alert NPC
    /// gets caught. Returns whether a catch happened.
    pub fn update<P: PresentationSink>(&self, ctx: &mut SimContext<P>) -> bool {
        let player = &ctx.player;
        if player.in_queue || player.caught {
            return false;
        }
        if !self.is_near_gap(&ctx.queue, player.position) {
            return false;
        }
        if self.is_spotted_by_alert_npc(&ctx.roster, player.position) {
            trace!("Player spotted lurking at gap {:?}", ctx.queue.gap_index());
            return self.catch_player(ctx);
        }
        false
    }

    /// Marks the player caught, starts the cooldown and angers the queue.
    ///
    /// Idempotent: returns `false` and changes nothing if the player is
    /// already caught.
    pub fn catch_player<P: PresentationSink>(&self, ctx: &mut SimContext<P>) -> bool {
        if ctx.player.caught {
            return false;
        }
        ctx.player.caught = true;
        ctx.player.cooldown_remaining = self.cooldown_duration;

        let queued: Vec<_> = ctx.roster.queue_in_order().map(|npc| npc.id).collect();
        for id in queued {
            if let Some(npc) = ctx.roster.get_mut(id) {
                npc.forced_distraction_ms = None;
            }
            ctx.set_npc_state(id, NPCState::Angry);
        }

        ctx.sink.emit_sound(SoundCue::Boo);
        ctx.events.publish(GameEvent::PlayerCaught {
            cooldown: self.cooldown_duration,
        });
        info!("Player caught cutting the line, cooldown {}s", self.cooldown_duration);
        true
    }
}
