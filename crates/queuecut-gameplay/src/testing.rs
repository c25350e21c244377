//! Shared fixtures for the simulation tests.

use glam::Vec3;
use queuecut_common::{EntityId, SlotIndex};

use crate::config::{QueueSettings, SimConfig};
use crate::context::SimContext;
use crate::events::EventBus;
use crate::npc::{NPCRole, NPCRoster, NPCState, NPC};
use crate::player::Player;
use crate::presentation::RecordingSink;
use crate::queue::QueueModel;
use crate::simulation::Simulation;

pub fn seeded_config() -> SimConfig {
    SimConfig {
        seed: Some(42),
        ..SimConfig::default()
    }
}

/// A seeded simulation with `count` NPCs in slots `0..count`.
pub fn queue_sim(count: usize) -> (Simulation<RecordingSink>, Vec<EntityId>) {
    let mut sim = Simulation::new(seeded_config(), RecordingSink::new());
    let ids = sim.spawn_queue(count).expect("spawn queue");
    (sim, ids)
}

pub fn set_state(sim: &mut Simulation<RecordingSink>, id: EntityId, state: NPCState) {
    sim.context_mut().set_npc_state(id, state);
}

/// Puts the player one unit to the side of a slot.
pub fn place_near_slot(sim: &mut Simulation<RecordingSink>, index: SlotIndex) {
    let position = sim.queue().position_for(index) + Vec3::X;
    assert!(sim.set_player_position(position));
}

/// Five NPCs in slots 0-4, all in `state`, gap at 2, player beside slot 2.
pub fn scenario_setup(state: NPCState) -> (Simulation<RecordingSink>, Vec<EntityId>) {
    let (mut sim, ids) = queue_sim(5);
    for &id in &ids {
        set_state(&mut sim, id, state);
    }
    sim.context_mut().queue.set_gap(Some(2));
    place_near_slot(&mut sim, 2);
    (sim, ids)
}

/// A bare context with `count` NPCs in slots `0..count`, all in `state`.
pub fn context_with_queue(count: u64, state: NPCState) -> SimContext<RecordingSink> {
    let queue = QueueModel::new(&QueueSettings::default());
    let mut roster = NPCRoster::new();
    for i in 0..count {
        let index = i as SlotIndex;
        let mut npc = NPC::new(
            EntityId::from_raw(i + 2),
            NPCRole::Queue,
            queue.position_for(index),
            0.0,
        );
        npc.state = state;
        roster.add_queued(npc, index).expect("free slot");
    }
    SimContext {
        roster,
        player: Player::new(EntityId::from_raw(1), Vec3::new(20.0, 0.0, 0.0)),
        queue,
        rng: fastrand::Rng::with_seed(7),
        sink: RecordingSink::new(),
        events: EventBus::default(),
    }
}
