//! Shared simulation context.
//!
//! Components do not hold references to each other or to global state; each
//! receives `&mut SimContext` for the duration of its step. Every mutation of
//! NPC state and every move order funnels through the helpers here, so the
//! presentation layer and the event bus always see a change exactly once.

use glam::Vec3;
use queuecut_common::{EntityId, SlotIndex};

use crate::events::{EventBus, GameEvent};
use crate::movement::Pose;
use crate::npc::{NPCRoster, NPCState};
use crate::player::Player;
use crate::presentation::PresentationSink;
use crate::queue::QueueModel;

/// Everything a component may read or mutate during a tick.
#[derive(Debug)]
pub struct SimContext<P: PresentationSink> {
    /// All NPCs
    pub roster: NPCRoster,
    /// The player
    pub player: Player,
    /// Queue geometry and gap
    pub queue: QueueModel,
    /// Random source for every stochastic decision
    pub rng: fastrand::Rng,
    /// Presentation collaborator
    pub sink: P,
    /// Gameplay notifications
    pub events: EventBus,
}

impl<P: PresentationSink> SimContext<P> {
    /// Assigns an NPC state, notifying only on actual change.
    ///
    /// Returns whether the state changed.
    pub fn set_npc_state(&mut self, id: EntityId, state: NPCState) -> bool {
        let Some(npc) = self.roster.get_mut(id) else {
            return false;
        };
        let previous = npc.state;
        if previous == state {
            return false;
        }
        npc.state = state;
        self.sink.set_indicator(id, state);
        self.events.publish(GameEvent::NPCStateChanged {
            npc: id,
            from: previous,
            to: state,
        });
        true
    }

    /// Orders an NPC to walk to `index`'s slot, starting from where it is now.
    pub fn order_npc_to_slot(&mut self, id: EntityId, index: SlotIndex) {
        let target = self.queue.position_for(index);
        let duration = self.queue.move_duration();
        if let Some(npc) = self.roster.get_mut(id) {
            npc.movement.begin(npc.position, target, duration);
            if npc.pose != Pose::Walk {
                npc.pose = Pose::Walk;
                self.sink.set_pose(id, Pose::Walk);
            }
        }
    }

    /// Orders the player to walk to `index`'s slot.
    pub fn order_player_to_slot(&mut self, index: SlotIndex) {
        let target = self.queue.position_for(index);
        let duration = self.queue.move_duration();
        let player = &mut self.player;
        player.movement.begin(player.position, target, duration);
        if player.pose != Pose::Walk {
            player.pose = Pose::Walk;
            self.sink.set_pose(player.id, Pose::Walk);
        }
    }

    /// Places the player directly, cancelling any move in flight.
    pub fn place_player(&mut self, position: Vec3) {
        let player = &mut self.player;
        player.movement.cancel();
        player.position = position;
        self.sink.set_position(player.id, position);
        if player.pose != Pose::Idle {
            player.pose = Pose::Idle;
            self.sink.set_pose(player.id, Pose::Idle);
        }
    }

    /// Publishes the current gap.
    pub fn announce_gap(&mut self) {
        self.events.publish(GameEvent::GapChanged {
            index: self.queue.gap_index(),
            position: self.queue.gap_position(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presentation::PresentationCall;
    use crate::testing::context_with_queue;

    #[test]
    fn test_state_change_notifies_once() {
        let mut ctx = context_with_queue(2, NPCState::Alert);
        let id = EntityId::from_raw(2);

        assert!(ctx.set_npc_state(id, NPCState::Distracted));
        assert!(!ctx.set_npc_state(id, NPCState::Distracted));
        assert!(!ctx.set_npc_state(EntityId::from_raw(99), NPCState::Angry));

        assert_eq!(ctx.sink.calls(), &[PresentationCall::Indicator(id, NPCState::Distracted)]);
        assert_eq!(
            ctx.events.drain(),
            vec![GameEvent::NPCStateChanged {
                npc: id,
                from: NPCState::Alert,
                to: NPCState::Distracted,
            }]
        );
    }

    #[test]
    fn test_order_to_slot_walks_from_current_position() {
        let mut ctx = context_with_queue(2, NPCState::Alert);
        let id = EntityId::from_raw(3);
        let halfway = ctx.queue.position_for(1).lerp(ctx.queue.position_for(2), 0.5);
        ctx.roster.get_mut(id).expect("npc").position = halfway;

        ctx.order_npc_to_slot(id, 2);

        let npc = ctx.roster.get(id).expect("npc");
        assert_eq!(npc.movement.start, halfway);
        assert_eq!(npc.movement.target, ctx.queue.position_for(2));
        assert_eq!(npc.pose, Pose::Walk);
        assert_eq!(ctx.sink.last_pose(id), Some(Pose::Walk));
    }

    #[test]
    fn test_place_player_cancels_move() {
        let mut ctx = context_with_queue(1, NPCState::Alert);
        ctx.order_player_to_slot(1);
        assert!(ctx.player.movement.active);

        ctx.place_player(Vec3::new(3.0, 0.0, 3.0));
        assert!(!ctx.player.movement.active);
        assert_eq!(ctx.player.position, Vec3::new(3.0, 0.0, 3.0));
        assert_eq!(ctx.player.pose, Pose::Idle);
    }
}
