//! The queue-cutting simulation.
//!
//! [`Simulation`] owns the shared [`SimContext`] and every component, and is
//! the only entry point a frontend needs. One [`Simulation::tick`] call per
//! frame runs the components in a fixed order:
//!
//! 1. behavior (global clock, then each NPC)
//! 2. queue upkeep (gap timer, shuffle rhythm)
//! 3. detection
//! 4. deferred commands, ability recharge
//! 5. move interpolation and transform/pose notifications
//! 6. catch cooldown

use glam::Vec3;
use queuecut_common::{EntityId, SlotIndex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::abilities::{AbilityKind, AbilityResult, AbilitySet};
use crate::behavior::BehaviorScheduler;
use crate::commands::{Command, CommandOutcome, CommandQueue};
use crate::config::SimConfig;
use crate::context::SimContext;
use crate::cooldown::CooldownManager;
use crate::detection::DetectionEngine;
use crate::events::EventBus;
use crate::insertion::{InsertionPhase, InsertionProtocol, InsertionResult, SlotChange};
use crate::movement::{MoveStep, Pose, QueueMove};
use crate::npc::{NPCResult, NPCRole, NPCRoster, NPCState, NPC};
use crate::player::Player;
use crate::presentation::PresentationSink;
use crate::queue::QueueModel;

/// Entity id reserved for the player.
pub const PLAYER_ID: EntityId = EntityId::from_raw(1);

/// A broken structural rule of the simulation state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// Two queue NPCs claim the same slot
    #[error("slot {0} is held by more than one NPC")]
    DuplicateSlot(SlotIndex),
    /// A queue NPC has no slot, or a wanderer has one
    #[error("NPC {0} has a slot that does not match its role")]
    RoleMismatch(EntityId),
    /// The player's slot is also held by an NPC
    #[error("player slot {0} is also held by an NPC")]
    PlayerSlotTaken(SlotIndex),
    /// The player is flagged in line without a slot, or the reverse
    #[error("player queue flag and slot disagree")]
    PlayerSlotMismatch,
    /// Occupied slots do not run from 0 without holes
    #[error("queue has a hole at slot {0}")]
    Hole(SlotIndex),
    /// The gap points past the end of the line
    #[error("gap {gap} lies beyond the end of the queue (length {len})")]
    GapOutOfBounds {
        /// Gap slot
        gap: SlotIndex,
        /// Occupied slot count
        len: usize,
    },
    /// A queue NPC is calm while a catch is being served
    #[error("NPC {0} is not angry while the player is caught")]
    CalmWhileCaught(EntityId),
}

/// Read-only state for HUD rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Whether a catch is being served
    pub caught: bool,
    /// Whether the player stands in line
    pub in_queue: bool,
    /// Whether the player is close enough to the gap to try cutting in
    pub near_gap: bool,
    /// Open gap slot
    pub gap_index: Option<SlotIndex>,
    /// World position of the open gap
    pub gap_position: Option<Vec3>,
    /// Seconds of cooldown left
    pub cooldown_remaining: f32,
    /// Whether any NPC is angry
    pub npcs_angry: bool,
    /// The player's slot
    pub player_queue_index: Option<SlotIndex>,
    /// Whether a global distraction window is open
    pub global_distraction_active: bool,
    /// Queue NPC count
    pub queue_length: usize,
}

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Tick number, starting at 1
    pub tick: u64,
    /// The player was spotted lurking at the gap
    pub caught: bool,
    /// The catch cooldown ran out
    pub recovered: bool,
    /// The gap was regenerated
    pub gap_changed: bool,
    /// Outcomes of the deferred commands, in submission order
    pub outcomes: Vec<CommandOutcome>,
}

/// The whole queue-cutting game state and its components.
#[derive(Debug)]
pub struct Simulation<P: PresentationSink> {
    ctx: SimContext<P>,
    config: SimConfig,
    scheduler: BehaviorScheduler,
    detection: DetectionEngine,
    insertion: InsertionProtocol,
    cooldown: CooldownManager,
    abilities: AbilitySet,
    commands: CommandQueue,
    next_id: u64,
    tick_count: u64,
    elapsed: f32,
}

impl<P: PresentationSink> Simulation<P> {
    /// Creates an empty scene: the player and no NPCs.
    ///
    /// The config is validated first. With no seed the RNG is seeded from
    /// the OS.
    pub fn new(config: SimConfig, sink: P) -> Self {
        let config = config.validated();
        let rng = match config.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        let ctx = SimContext {
            roster: NPCRoster::new(),
            player: Player::new(PLAYER_ID, config.player_start),
            queue: QueueModel::new(&config.queue),
            rng,
            sink,
            events: EventBus::default(),
        };

        info!("Simulation created (seed {:?})", config.seed);
        Self {
            ctx,
            scheduler: BehaviorScheduler::new(&config.behavior),
            detection: DetectionEngine::new(&config.detection, &config.cooldown),
            insertion: InsertionProtocol::new(),
            cooldown: CooldownManager::new(config.behavior.cycle_length),
            abilities: AbilitySet::new(&config.abilities),
            commands: CommandQueue::new(),
            config,
            next_id: PLAYER_ID.raw() + 1,
            tick_count: 0,
            elapsed: 0.0,
        }
    }

    fn allocate_id(&mut self) -> EntityId {
        let id = EntityId::from_raw(self.next_id);
        self.next_id += 1;
        id
    }

    fn occupied_slots(&self) -> usize {
        self.ctx.roster.queue_len() + usize::from(self.ctx.player.in_queue)
    }

    fn announce_npc(&mut self, id: EntityId) {
        let Some(npc) = self.ctx.roster.get(id) else {
            return;
        };
        let (position, state) = (npc.position, npc.state);
        self.ctx.sink.set_position(id, position);
        self.ctx.sink.set_indicator(id, state);
        if self.ctx.player.caught && npc.is_queued() {
            self.ctx.set_npc_state(id, NPCState::Angry);
        }
    }

    /// Appends `count` NPCs to the back of the line.
    pub fn spawn_queue(&mut self, count: usize) -> NPCResult<Vec<EntityId>> {
        let ids = (0..count)
            .map(|_| self.spawn_queue_npc())
            .collect::<NPCResult<Vec<_>>>()?;
        debug!("Spawned {} queue NPCs", ids.len());
        Ok(ids)
    }

    /// Appends one NPC to the back of the line.
    pub fn spawn_queue_npc(&mut self) -> NPCResult<EntityId> {
        let id = self.allocate_id();
        let index = self.occupied_slots() as SlotIndex;
        let position = self.ctx.queue.position_for(index);
        let timer = self.scheduler.spawn_timer(&mut self.ctx.rng);
        self.ctx
            .roster
            .add_queued(NPC::new(id, NPCRole::Queue, position, timer), index)?;
        self.announce_npc(id);
        Ok(id)
    }

    /// Adds an NPC milling about at `position`.
    pub fn spawn_wanderer(&mut self, position: Vec3) -> NPCResult<EntityId> {
        let id = self.allocate_id();
        let timer = self.scheduler.spawn_timer(&mut self.ctx.rng);
        self.ctx
            .roster
            .add_wanderer(NPC::new(id, NPCRole::Wandering, position, timer))?;
        self.announce_npc(id);
        debug!("Spawned wanderer {} at {:?}", id, position);
        Ok(id)
    }

    /// Advances the simulation by `dt` seconds.
    pub fn tick(&mut self, dt: f32) -> TickReport {
        let dt = dt.max(0.0);
        self.tick_count += 1;
        self.elapsed += dt;
        let mut report = TickReport {
            tick: self.tick_count,
            ..TickReport::default()
        };

        self.scheduler.update(&mut self.ctx, dt);

        let queue_len = self.ctx.roster.queue_len();
        let hold_gap = self.ctx.player.in_queue;
        report.gap_changed = self
            .ctx
            .queue
            .update(dt, queue_len, hold_gap, &mut self.ctx.rng);
        if report.gap_changed {
            self.ctx.announce_gap();
        }

        report.caught = self.detection.update(&mut self.ctx);

        for command in self.commands.drain() {
            let outcome = self.apply(command);
            report.outcomes.push(outcome);
        }
        self.abilities.update(dt);

        self.interpolate(dt);

        report.recovered = self.cooldown.update(&mut self.ctx, dt);
        report
    }

    fn apply(&mut self, command: Command) -> CommandOutcome {
        match command {
            Command::Insert { index } => CommandOutcome::Insert(self.try_insert(index)),
            Command::Exit => CommandOutcome::Exit(self.exit()),
            Command::MoveTo { index } => CommandOutcome::MoveTo(self.move_to(index)),
            Command::ForceDistraction { npcs, duration_ms } => {
                CommandOutcome::Distracted(self.force_distraction(&npcs, duration_ms))
            },
            Command::ForceGlobalDistraction { duration } => {
                self.force_global_distraction(duration);
                CommandOutcome::GlobalDistraction
            },
            Command::UseAbility { ability } => CommandOutcome::Ability(self.use_ability(ability)),
        }
    }

    fn interpolate(&mut self, dt: f32) {
        let ctx = &mut self.ctx;
        let shuffle_pose = ctx.queue.shuffle().pose();

        for npc in ctx.roster.iter_mut() {
            let settled = if npc.is_queued() { shuffle_pose } else { Pose::Idle };
            advance_move(
                &mut ctx.sink,
                npc.id,
                &mut npc.movement,
                &mut npc.position,
                &mut npc.pose,
                settled,
                dt,
            );
        }

        let player = &mut ctx.player;
        let settled = if player.in_queue { shuffle_pose } else { Pose::Idle };
        advance_move(
            &mut ctx.sink,
            player.id,
            &mut player.movement,
            &mut player.position,
            &mut player.pose,
            settled,
            dt,
        );
    }

    /// Queues a command for the next tick.
    pub fn queue_command(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Commands waiting for the next tick.
    #[must_use]
    pub fn pending_commands(&self) -> usize {
        self.commands.pending_count()
    }

    /// Cuts into the line now. See [`InsertionProtocol::try_insert`].
    pub fn try_insert(&mut self, index: Option<SlotIndex>) -> InsertionResult<SlotChange> {
        self.insertion.try_insert(&mut self.ctx, &self.detection, index)
    }

    /// Steps out of the line now.
    pub fn exit(&mut self) -> InsertionResult<SlotChange> {
        self.insertion.exit(&mut self.ctx)
    }

    /// Changes slot while in line.
    pub fn move_to(&mut self, index: SlotIndex) -> InsertionResult<SlotChange> {
        self.insertion.move_to(&mut self.ctx, &self.detection, index)
    }

    /// Forces NPCs distracted for `duration_ms`. Returns how many complied.
    pub fn force_distraction(&mut self, npcs: &[EntityId], duration_ms: f32) -> usize {
        self.scheduler.force_distraction(&mut self.ctx, npcs, duration_ms)
    }

    /// Opens a global distraction window of `duration` seconds.
    pub fn force_global_distraction(&mut self, duration: f32) {
        self.scheduler.force_global_distraction(&mut self.ctx, duration);
    }

    /// Fires an ability from the player's position.
    pub fn use_ability(&mut self, ability: AbilityKind) -> AbilityResult<usize> {
        self.abilities
            .use_ability(&mut self.ctx, &mut self.scheduler, ability)
    }

    /// Signals a catch. Idempotent while a catch is being served.
    pub fn catch_player(&mut self) -> bool {
        self.detection.catch_player(&mut self.ctx)
    }

    /// Moves the player by `offset`. Ignored while in line.
    pub fn move_player(&mut self, offset: Vec3) -> bool {
        let moved = self.ctx.player.translate(offset);
        if moved {
            self.ctx
                .sink
                .set_position(self.ctx.player.id, self.ctx.player.position);
        }
        moved
    }

    /// Places the player at `position`. Ignored while in line.
    pub fn set_player_position(&mut self, position: Vec3) -> bool {
        let placed = self.ctx.player.place(position);
        if placed {
            self.ctx.sink.set_position(self.ctx.player.id, position);
        }
        placed
    }

    /// Turns the player.
    pub fn face(&mut self, direction: Vec3) {
        self.ctx.player.face(direction);
    }

    /// Returns the scene to a calm state.
    ///
    /// The player leaves the line if needed, the catch is forgiven, pending
    /// commands are dropped and every NPC gets a fresh random mood and timer.
    pub fn reset(&mut self) {
        self.commands.clear();
        if self.ctx.player.in_queue {
            if let Err(err) = self.insertion.exit(&mut self.ctx) {
                warn!("Could not take player out of line on reset: {}", err);
            }
        }
        self.ctx.player.caught = false;
        self.ctx.player.cooldown_remaining = 0.0;

        let ids: Vec<EntityId> = self.ctx.roster.iter().map(|npc| npc.id).collect();
        for id in ids {
            let timer = self.scheduler.desync_timer(&mut self.ctx.rng);
            let state = NPCState::random_calm(&mut self.ctx.rng);
            if let Some(npc) = self.ctx.roster.get_mut(id) {
                npc.forced_distraction_ms = None;
                npc.personal_timer = timer;
            }
            self.ctx.set_npc_state(id, state);
        }
        info!("Simulation reset");
    }

    /// Current HUD state.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let player = &self.ctx.player;
        Snapshot {
            caught: player.caught,
            in_queue: player.in_queue,
            near_gap: self.detection.is_near_gap(&self.ctx.queue, player.position),
            gap_index: self.ctx.queue.gap_index(),
            gap_position: self.ctx.queue.gap_position(),
            cooldown_remaining: player.cooldown_remaining,
            npcs_angry: self
                .ctx
                .roster
                .iter()
                .any(|npc| npc.state == NPCState::Angry),
            player_queue_index: player.queue_index,
            global_distraction_active: self.scheduler.global().active,
            queue_length: self.ctx.roster.queue_len(),
        }
    }

    /// Checks the structural rules that must hold between ticks.
    pub fn verify_invariants(&self) -> Result<(), InvariantViolation> {
        let roster = &self.ctx.roster;
        let player = &self.ctx.player;

        let mut slots = BTreeSet::new();
        for npc in roster.iter() {
            match (npc.role, npc.queue_index) {
                (NPCRole::Queue, Some(index)) => {
                    if !slots.insert(index) {
                        return Err(InvariantViolation::DuplicateSlot(index));
                    }
                },
                (NPCRole::Wandering, None) => {},
                _ => return Err(InvariantViolation::RoleMismatch(npc.id)),
            }
        }

        match (self.insertion.phase(&self.ctx), player.in_queue, player.queue_index) {
            (InsertionPhase::InQueue(index), _, _) => {
                if !slots.insert(index) {
                    return Err(InvariantViolation::PlayerSlotTaken(index));
                }
            },
            (InsertionPhase::NotInQueue, false, None) => {},
            _ => return Err(InvariantViolation::PlayerSlotMismatch),
        }

        for (expected, &index) in (0..).zip(&slots) {
            if expected != index {
                return Err(InvariantViolation::Hole(expected));
            }
        }

        if let Some(gap) = self.ctx.queue.gap_index() {
            let len = roster.queue_len();
            if gap as usize > len {
                return Err(InvariantViolation::GapOutOfBounds { gap, len });
            }
        }

        if player.caught {
            if let Some(npc) = roster
                .queue_in_order()
                .find(|npc| npc.state != NPCState::Angry)
            {
                return Err(InvariantViolation::CalmWhileCaught(npc.id));
            }
        }
        Ok(())
    }

    /// The player.
    #[must_use]
    pub fn player(&self) -> &Player {
        &self.ctx.player
    }

    /// Every NPC.
    #[must_use]
    pub fn roster(&self) -> &NPCRoster {
        &self.ctx.roster
    }

    /// Queue geometry and gap.
    #[must_use]
    pub fn queue(&self) -> &QueueModel {
        &self.ctx.queue
    }

    /// Behavior scheduler, including the global clock.
    #[must_use]
    pub fn scheduler(&self) -> &BehaviorScheduler {
        &self.scheduler
    }

    /// Ability recharge state.
    #[must_use]
    pub fn abilities(&self) -> &AbilitySet {
        &self.abilities
    }

    /// Gameplay event bus.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.ctx.events
    }

    /// Presentation collaborator.
    #[must_use]
    pub fn sink(&self) -> &P {
        &self.ctx.sink
    }

    /// Mutable presentation collaborator.
    pub fn sink_mut(&mut self) -> &mut P {
        &mut self.ctx.sink
    }

    /// The validated configuration in use.
    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Ticks run so far.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Simulated seconds so far.
    #[must_use]
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    #[cfg(test)]
    pub(crate) fn context_mut(&mut self) -> &mut SimContext<P> {
        &mut self.ctx
    }
}

/// Steps one entity's slot move and reports position and pose changes.
///
/// `settled` is the pose taken when the entity is not walking.
fn advance_move<P: PresentationSink>(
    sink: &mut P,
    id: EntityId,
    movement: &mut QueueMove,
    position: &mut Vec3,
    pose: &mut Pose,
    settled: Pose,
    dt: f32,
) {
    let next = match movement.advance(dt) {
        MoveStep::Moving(at) => {
            *position = at;
            sink.set_position(id, at);
            Pose::Walk
        },
        MoveStep::Arrived(at) => {
            *position = at;
            sink.set_position(id, at);
            settled
        },
        MoveStep::Idle => settled,
    };
    if *pose != next {
        *pose = next;
        sink.set_pose(id, next);
    }
}
